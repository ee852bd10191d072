use gofi_domain::SettingsError;

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum Language {
    #[default]
    En,
    Zh,
}

impl Language {
    /// Picks the first language tag of an `Accept-Language` header; anything but Chinese
    /// falls back to English.
    pub fn from_accept_language(header: Option<&str>) -> Self {
        let Some(header) = header else {
            return Language::En;
        };
        let first = header
            .split(',')
            .next()
            .unwrap_or_default()
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        if first == "zh" || first.starts_with("zh-") {
            Language::Zh
        } else {
            Language::En
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum MessageKey {
    OperationNotAllowedInPreviewMode,
    GofiIsAlreadyInitialized,
    DirIsNotExist,
    IsNotDir,
    InvalidSettingsPayload,
    InvalidSettingValue,
    PersistenceFailure,
}

fn template(lang: Language, key: MessageKey) -> &'static str {
    match (lang, key) {
        (Language::En, MessageKey::OperationNotAllowedInPreviewMode) => {
            "Operation is not allowed in preview mode"
        }
        (Language::En, MessageKey::GofiIsAlreadyInitialized) => "Gofi is already initialized",
        (Language::En, MessageKey::DirIsNotExist) => "Directory {} does not exist",
        (Language::En, MessageKey::IsNotDir) => "{} is not a directory",
        (Language::En, MessageKey::InvalidSettingsPayload) => "Invalid settings payload: {}",
        (Language::En, MessageKey::InvalidSettingValue) => "{} must not be empty",
        (Language::En, MessageKey::PersistenceFailure) => "Failed to save settings",
        (Language::Zh, MessageKey::OperationNotAllowedInPreviewMode) => "预览模式下不允许该操作",
        (Language::Zh, MessageKey::GofiIsAlreadyInitialized) => "Gofi已经初始化",
        (Language::Zh, MessageKey::DirIsNotExist) => "目录{}不存在",
        (Language::Zh, MessageKey::IsNotDir) => "{}不是一个目录",
        (Language::Zh, MessageKey::InvalidSettingsPayload) => "设置参数格式错误: {}",
        (Language::Zh, MessageKey::InvalidSettingValue) => "{}不能为空",
        (Language::Zh, MessageKey::PersistenceFailure) => "保存设置失败",
    }
}

/// Renders `key` in `lang`, substituting `{}` placeholders with `args` in order.
pub fn translate(lang: Language, key: MessageKey, args: &[&str]) -> String {
    let mut out = String::new();
    let mut args = args.iter();
    let mut rest = template(lang, key);
    while let Some(idx) = rest.find("{}") {
        out.push_str(&rest[..idx]);
        out.push_str(args.next().copied().unwrap_or_default());
        rest = &rest[idx + 2..];
    }
    out.push_str(rest);
    out
}

pub fn error_message(lang: Language, err: &SettingsError) -> String {
    match err {
        SettingsError::OperationNotAllowed => {
            translate(lang, MessageKey::OperationNotAllowedInPreviewMode, &[])
        }
        SettingsError::AlreadyInitialized => {
            translate(lang, MessageKey::GofiIsAlreadyInitialized, &[])
        }
        SettingsError::DirNotFound(path) => {
            translate(lang, MessageKey::DirIsNotExist, &[path.as_str()])
        }
        SettingsError::NotADirectory(path) => {
            translate(lang, MessageKey::IsNotDir, &[path.as_str()])
        }
        SettingsError::InvalidField(field) => {
            translate(lang, MessageKey::InvalidSettingValue, &[*field])
        }
        SettingsError::Deserialization(detail) => {
            translate(lang, MessageKey::InvalidSettingsPayload, &[detail.as_str()])
        }
        SettingsError::Persistence(_) => translate(lang, MessageKey::PersistenceFailure, &[]),
    }
}
