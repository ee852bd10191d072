use serde::{Deserialize, Serialize};

/// Envelope wrapping every API response.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub payload: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn ok(payload: T) -> Self {
        Self {
            success: true,
            message: String::new(),
            payload: Some(payload),
        }
    }

    pub fn fail(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            payload: None,
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigurationSnapshot {
    pub id: i64,
    pub version: String,
    pub app_path: String,
    pub default_storage_path: String,
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
