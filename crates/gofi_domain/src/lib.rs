mod adapters;
pub use adapters::ConfigurationStore;

mod configuration;
pub use configuration::{
    Configuration, ConfigurationPatch, ConfigurationUpdate, ConfigurationView, DEFAULT_NAV_MODE,
    DEFAULT_THEME_COLOR, DEFAULT_THEME_STYLE, DynamicFields, NewConfiguration, overlay,
};

mod error;
pub use error::{SettingsError, SettingsErrorKind};

pub mod paths;

pub const APP_NAME: &str = "gofi";
pub const DEFAULT_PORT: &str = "8080";
pub const LOOPBACK_IPV4: &str = "127.0.0.1";
