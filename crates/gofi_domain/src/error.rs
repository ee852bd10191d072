#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SettingsErrorKind {
    Validation,
    State,
    Deserialization,
    Persistence,
}

#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
pub enum SettingsError {
    #[error("operation is not allowed in preview mode")]
    OperationNotAllowed,
    #[error("already initialized")]
    AlreadyInitialized,
    #[error("directory does not exist: {0}")]
    DirNotFound(String),
    #[error("not a directory: {0}")]
    NotADirectory(String),
    #[error("{0} must not be empty")]
    InvalidField(&'static str),
    #[error("invalid settings payload: {0}")]
    Deserialization(String),
    #[error("failed to persist configuration: {0}")]
    Persistence(String),
}

impl SettingsError {
    pub fn kind(&self) -> SettingsErrorKind {
        match self {
            SettingsError::OperationNotAllowed | SettingsError::AlreadyInitialized => {
                SettingsErrorKind::State
            }
            SettingsError::DirNotFound(_)
            | SettingsError::NotADirectory(_)
            | SettingsError::InvalidField(_) => SettingsErrorKind::Validation,
            SettingsError::Deserialization(_) => SettingsErrorKind::Deserialization,
            SettingsError::Persistence(_) => SettingsErrorKind::Persistence,
        }
    }
}
