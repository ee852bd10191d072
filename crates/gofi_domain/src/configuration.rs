use crate::SettingsError;
use serde::Deserialize;

pub const DEFAULT_THEME_STYLE: &str = "light";
pub const DEFAULT_THEME_COLOR: &str = "#1890FF";
pub const DEFAULT_NAV_MODE: &str = "top";

/// The persisted configuration row. Derived fields live in [`DynamicFields`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Configuration {
    pub id: i64,
    pub theme_style: String,
    pub theme_color: String,
    pub nav_mode: String,
    pub database_file_path: String,
    pub custom_storage_path: String,
    pub log_directory_path: String,
    pub initialized: bool,
    pub created: i64,
    pub updated: i64,
}

impl Configuration {
    pub fn update(&self) -> ConfigurationUpdate {
        ConfigurationUpdate::new(self.id)
    }
}

/// Values for the row written on first run.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct NewConfiguration {
    pub theme_style: String,
    pub theme_color: String,
    pub nav_mode: String,
    pub database_file_path: String,
    pub custom_storage_path: String,
    pub log_directory_path: String,
    pub initialized: bool,
    pub created: i64,
    pub updated: i64,
}

impl NewConfiguration {
    pub fn first_run(
        database_file_path: impl Into<String>,
        log_directory_path: impl Into<String>,
    ) -> Self {
        Self {
            theme_style: DEFAULT_THEME_STYLE.to_owned(),
            theme_color: DEFAULT_THEME_COLOR.to_owned(),
            nav_mode: DEFAULT_NAV_MODE.to_owned(),
            database_file_path: database_file_path.into(),
            custom_storage_path: String::new(),
            log_directory_path: log_directory_path.into(),
            initialized: false,
            created: 0,
            updated: 0,
        }
    }
}

/// Field changes accumulated for one transactional commit. Unset fields are left alone.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ConfigurationUpdate {
    pub id: i64,
    pub theme_style: Option<String>,
    pub theme_color: Option<String>,
    pub nav_mode: Option<String>,
    pub custom_storage_path: Option<String>,
    pub initialized: Option<bool>,
}

impl ConfigurationUpdate {
    pub fn new(id: i64) -> Self {
        Self {
            id,
            ..Self::default()
        }
    }

    pub fn set_theme_style(mut self, value: impl Into<String>) -> Self {
        self.theme_style = Some(value.into());
        self
    }

    pub fn set_theme_color(mut self, value: impl Into<String>) -> Self {
        self.theme_color = Some(value.into());
        self
    }

    pub fn set_nav_mode(mut self, value: impl Into<String>) -> Self {
        self.nav_mode = Some(value.into());
        self
    }

    pub fn set_custom_storage_path(mut self, value: impl Into<String>) -> Self {
        self.custom_storage_path = Some(value.into());
        self
    }

    pub fn set_initialized(mut self, value: bool) -> Self {
        self.initialized = Some(value);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.theme_style.is_none()
            && self.theme_color.is_none()
            && self.nav_mode.is_none()
            && self.custom_storage_path.is_none()
            && self.initialized.is_none()
    }

    /// In-memory equivalent of what a store does on commit, minus the `updated` stamp.
    pub fn apply_to(&self, configuration: &Configuration) -> Configuration {
        let mut out = configuration.clone();
        if let Some(value) = &self.theme_style {
            out.theme_style = value.clone();
        }
        if let Some(value) = &self.theme_color {
            out.theme_color = value.clone();
        }
        if let Some(value) = &self.nav_mode {
            out.nav_mode = value.clone();
        }
        if let Some(value) = &self.custom_storage_path {
            out.custom_storage_path = value.clone();
        }
        if let Some(value) = self.initialized {
            out.initialized = value;
        }
        out
    }
}

/// A client-supplied partial configuration. Absent or `null` fields keep the baseline value.
///
/// Fields that are derived or not user-editable (`version`, `appPath`, `databaseFilePath`,
/// `initialized`, ...) are accepted in the payload and ignored.
#[derive(Clone, Debug, Default, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigurationPatch {
    #[serde(default)]
    pub theme_style: Option<String>,
    #[serde(default)]
    pub theme_color: Option<String>,
    #[serde(default)]
    pub nav_mode: Option<String>,
    #[serde(default)]
    pub custom_storage_path: Option<String>,
}

impl ConfigurationPatch {
    /// Parses a request body. An empty body is an empty patch.
    pub fn from_json(body: &[u8]) -> Result<Self, SettingsError> {
        if body.is_empty() {
            return Ok(Self::default());
        }
        serde_json::from_slice(body).map_err(|err| SettingsError::Deserialization(err.to_string()))
    }

    pub fn merged_onto(&self, baseline: &Configuration) -> Result<Configuration, SettingsError> {
        let mut out = baseline.clone();
        if let Some(value) = &self.theme_style {
            out.theme_style = non_empty("themeStyle", value)?;
        }
        if let Some(value) = &self.theme_color {
            out.theme_color = non_empty("themeColor", value)?;
        }
        if let Some(value) = &self.nav_mode {
            out.nav_mode = non_empty("navMode", value)?;
        }
        if let Some(value) = &self.custom_storage_path {
            out.custom_storage_path = value.clone();
        }
        Ok(out)
    }
}

fn non_empty(field: &'static str, value: &str) -> Result<String, SettingsError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(SettingsError::InvalidField(field));
    }
    Ok(trimmed.to_owned())
}

/// Attributes computed from process state on every read, never persisted.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct DynamicFields {
    pub version: String,
    pub app_path: String,
    pub default_storage_path: String,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ConfigurationView {
    pub configuration: Configuration,
    pub dynamic: DynamicFields,
}

pub fn overlay(configuration: &Configuration, dynamic: &DynamicFields) -> ConfigurationView {
    ConfigurationView {
        configuration: configuration.clone(),
        dynamic: dynamic.clone(),
    }
}
