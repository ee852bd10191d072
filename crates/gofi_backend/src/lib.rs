mod context;
pub mod fs_util;
pub mod network;
mod settings;
mod sqlite_store;
#[cfg(test)]
mod test_support;
mod time;

pub use context::{
    ContextCell, ProcessContext, StartupOptions, build_version, init_process_context,
    process_context,
};
pub use network::{
    InterfaceAddrs, NetworkResolutionError, SystemInterfaces, check_ip, resolve_advertised_ip,
};
pub use settings::{UpdateMode, WorkflowOptions, apply_settings, resolve_storage_path};
pub use sqlite_store::{SqliteStore, SqliteStoreOptions};
