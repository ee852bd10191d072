use crate::{Configuration, ConfigurationUpdate, NewConfiguration};

/// Durable home of the single configuration row.
pub trait ConfigurationStore: Send + Sync {
    /// Returns the persisted row, inserting `defaults` when the store is empty.
    ///
    /// Repeated calls return the same row; implementations must never hold more than one.
    fn load_or_create(&self, defaults: NewConfiguration) -> Result<Configuration, String>;

    fn load(&self) -> Result<Option<Configuration>, String>;

    /// Applies the fields set on `update` inside one transaction and returns the committed row.
    fn commit(&self, update: ConfigurationUpdate) -> Result<Configuration, String>;
}
