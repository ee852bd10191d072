use crate::network::{InterfaceAddrs, NetworkResolutionError};
use gofi_domain::{Configuration, ConfigurationStore, ConfigurationUpdate, NewConfiguration};
use std::net::IpAddr;
use std::sync::Mutex;

pub(crate) struct StaticInterfaces(pub(crate) Vec<IpAddr>);

impl StaticInterfaces {
    pub(crate) fn lan() -> Self {
        Self(vec![
            "127.0.0.1".parse().unwrap(),
            "192.168.1.50".parse().unwrap(),
        ])
    }
}

impl InterfaceAddrs for StaticInterfaces {
    fn interface_addrs(&self) -> Result<Vec<IpAddr>, NetworkResolutionError> {
        Ok(self.0.clone())
    }
}

/// Keeps the row in memory and refuses every commit.
#[derive(Default)]
pub(crate) struct CommitRejectingStore {
    row: Mutex<Option<Configuration>>,
}

impl ConfigurationStore for CommitRejectingStore {
    fn load_or_create(&self, defaults: NewConfiguration) -> Result<Configuration, String> {
        let mut row = self.row.lock().unwrap();
        let created = row.get_or_insert_with(|| Configuration {
            id: 1,
            theme_style: defaults.theme_style,
            theme_color: defaults.theme_color,
            nav_mode: defaults.nav_mode,
            database_file_path: defaults.database_file_path,
            custom_storage_path: defaults.custom_storage_path,
            log_directory_path: defaults.log_directory_path,
            initialized: defaults.initialized,
            created: defaults.created,
            updated: defaults.updated,
        });
        Ok(created.clone())
    }

    fn load(&self) -> Result<Option<Configuration>, String> {
        Ok(self.row.lock().unwrap().clone())
    }

    fn commit(&self, _update: ConfigurationUpdate) -> Result<Configuration, String> {
        Err("committing a transaction: database is locked".to_owned())
    }
}
