use crate::network::{InterfaceAddrs, SystemInterfaces, resolve_advertised_ip};
use crate::sqlite_store::{SqliteStore, SqliteStoreOptions};
use anyhow::{Context as _, anyhow};
use gofi_domain::paths;
use gofi_domain::{
    APP_NAME, Configuration, ConfigurationStore, ConfigurationView, DEFAULT_PORT, DynamicFields,
    NewConfiguration, overlay,
};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, RwLock};

/// Build identifier, overridable at compile time through `GOFI_VERSION`.
pub fn build_version() -> &'static str {
    option_env!("GOFI_VERSION").unwrap_or(env!("CARGO_PKG_VERSION"))
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct StartupOptions {
    pub port: String,
    /// Address advertised to web clients. Empty or unparsable means "discover a LAN address".
    pub ip: String,
    /// Defaults to the current working directory.
    pub work_dir: Option<PathBuf>,
    pub skip_migrations: bool,
}

impl Default for StartupOptions {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT.to_owned(),
            ip: String::new(),
            work_dir: None,
            skip_migrations: false,
        }
    }
}

struct Layout {
    port: String,
    server_ip: String,
    work_dir: PathBuf,
    default_storage_dir: PathBuf,
    log_dir: PathBuf,
    database_file_path: PathBuf,
}

impl Layout {
    fn resolve(options: &StartupOptions, interfaces: &dyn InterfaceAddrs) -> anyhow::Result<Self> {
        let work_dir = match &options.work_dir {
            Some(dir) => dir.clone(),
            None => std::env::current_dir().unwrap_or_default(),
        };
        let server_ip = resolve_advertised_ip(&options.ip, interfaces)
            .context("failed to determine the address to advertise")?;

        Ok(Self {
            port: options.port.clone(),
            server_ip,
            default_storage_dir: paths::default_storage_root(&work_dir),
            log_dir: paths::log_root(&work_dir),
            database_file_path: paths::sqlite_path(&work_dir, APP_NAME),
            work_dir,
        })
    }
}

struct LiveState {
    custom_storage_dir: String,
    configuration: Configuration,
}

/// Process-wide state: derived paths, network identity, the configuration store and the
/// active configuration snapshot.
pub struct ProcessContext {
    version: RwLock<String>,
    port: String,
    server_ip: String,
    server_address: String,
    work_dir: PathBuf,
    default_storage_dir: PathBuf,
    log_dir: PathBuf,
    database_file_path: PathBuf,
    store: Arc<dyn ConfigurationStore>,
    live: RwLock<LiveState>,
    update_lock: Mutex<()>,
}

impl ProcessContext {
    pub fn init(options: &StartupOptions) -> anyhow::Result<Self> {
        Self::init_with_interfaces(options, &SystemInterfaces)
    }

    pub fn init_with_interfaces(
        options: &StartupOptions,
        interfaces: &dyn InterfaceAddrs,
    ) -> anyhow::Result<Self> {
        let layout = Layout::resolve(options, interfaces)?;
        let store = SqliteStore::new_with_options(
            layout.database_file_path.clone(),
            SqliteStoreOptions {
                run_migrations: !options.skip_migrations,
            },
        )
        .context("failed to open configuration store")?;
        Self::assemble(layout, Arc::new(store))
    }

    pub fn init_with_store(
        options: &StartupOptions,
        interfaces: &dyn InterfaceAddrs,
        store: Arc<dyn ConfigurationStore>,
    ) -> anyhow::Result<Self> {
        let layout = Layout::resolve(options, interfaces)?;
        Self::assemble(layout, store)
    }

    fn assemble(layout: Layout, store: Arc<dyn ConfigurationStore>) -> anyhow::Result<Self> {
        let defaults = NewConfiguration::first_run(
            layout.database_file_path.to_string_lossy(),
            layout.log_dir.to_string_lossy(),
        );
        let configuration = store
            .load_or_create(defaults)
            .map_err(|err| anyhow!(err))
            .context("failed to load configuration")?;

        let server_address = format!("{}:{}", layout.server_ip, layout.port);
        tracing::info!(
            address = %server_address,
            work_dir = %layout.work_dir.display(),
            initialized = configuration.initialized,
            "process context initialized"
        );

        Ok(Self {
            version: RwLock::new(build_version().to_owned()),
            port: layout.port,
            server_ip: layout.server_ip,
            server_address,
            work_dir: layout.work_dir,
            default_storage_dir: layout.default_storage_dir,
            log_dir: layout.log_dir,
            database_file_path: layout.database_file_path,
            store,
            live: RwLock::new(LiveState {
                custom_storage_dir: configuration.custom_storage_path.clone(),
                configuration,
            }),
            update_lock: Mutex::new(()),
        })
    }

    pub fn version(&self) -> String {
        self.version
            .read()
            .unwrap_or_else(|err| err.into_inner())
            .clone()
    }

    pub fn app_name(&self) -> &str {
        APP_NAME
    }

    pub fn port(&self) -> &str {
        &self.port
    }

    pub fn server_ip(&self) -> &str {
        &self.server_ip
    }

    /// `ip:port` advertised to web clients.
    pub fn server_address(&self) -> &str {
        &self.server_address
    }

    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    pub fn default_storage_dir(&self) -> &Path {
        &self.default_storage_dir
    }

    pub fn log_dir(&self) -> &Path {
        &self.log_dir
    }

    pub fn database_file_path(&self) -> &Path {
        &self.database_file_path
    }

    pub fn store(&self) -> &Arc<dyn ConfigurationStore> {
        &self.store
    }

    pub fn dynamic_fields(&self) -> DynamicFields {
        DynamicFields {
            version: self.version(),
            app_path: self.work_dir.to_string_lossy().into_owned(),
            default_storage_path: self.default_storage_dir.to_string_lossy().into_owned(),
        }
    }

    /// The active snapshot with dynamic fields computed from current state.
    pub fn configuration(&self) -> ConfigurationView {
        let live = self.live.read().unwrap_or_else(|err| err.into_inner());
        overlay(&live.configuration, &self.dynamic_fields())
    }

    /// The active snapshot as persisted, without dynamic fields.
    pub fn stored_configuration(&self) -> Configuration {
        self.live
            .read()
            .unwrap_or_else(|err| err.into_inner())
            .configuration
            .clone()
    }

    /// Replaces the active snapshot. `None` leaves it untouched.
    pub fn set_configuration(&self, configuration: Option<Configuration>) {
        let Some(configuration) = configuration else {
            return;
        };
        let mut live = self.live.write().unwrap_or_else(|err| err.into_inner());
        live.configuration = configuration;
    }

    /// The custom storage directory when one is active, otherwise the default one.
    pub fn storage_dir(&self) -> PathBuf {
        let live = self.live.read().unwrap_or_else(|err| err.into_inner());
        if live.custom_storage_dir.is_empty() {
            return self.default_storage_dir.clone();
        }
        PathBuf::from(&live.custom_storage_dir)
    }

    pub(crate) fn lock_updates(&self) -> MutexGuard<'_, ()> {
        self.update_lock.lock().unwrap_or_else(|err| err.into_inner())
    }

    /// Swaps in a committed row and its storage directory under one write.
    pub(crate) fn activate(&self, committed: Configuration, storage_dir: String) {
        let mut live = self.live.write().unwrap_or_else(|err| err.into_inner());
        live.custom_storage_dir = storage_dir;
        live.configuration = committed;
    }
}

/// One-shot holder for a [`ProcessContext`]; the first successful initializer wins.
pub struct ContextCell {
    instance: OnceLock<Arc<ProcessContext>>,
    init_lock: Mutex<()>,
}

impl ContextCell {
    pub const fn new() -> Self {
        Self {
            instance: OnceLock::new(),
            init_lock: Mutex::new(()),
        }
    }

    pub fn get(&self) -> Option<Arc<ProcessContext>> {
        self.instance.get().cloned()
    }

    pub fn get_or_init(
        &self,
        init: impl FnOnce() -> anyhow::Result<ProcessContext>,
    ) -> anyhow::Result<Arc<ProcessContext>> {
        if let Some(ctx) = self.instance.get() {
            return Ok(ctx.clone());
        }

        let _guard = self.init_lock.lock().unwrap_or_else(|err| err.into_inner());
        if let Some(ctx) = self.instance.get() {
            return Ok(ctx.clone());
        }

        let ctx = Arc::new(init()?);
        let _ = self.instance.set(ctx.clone());
        Ok(ctx)
    }
}

impl Default for ContextCell {
    fn default() -> Self {
        Self::new()
    }
}

static PROCESS_CONTEXT: ContextCell = ContextCell::new();

/// Initializes the process-wide context once; later calls return the existing instance.
pub fn init_process_context(options: &StartupOptions) -> anyhow::Result<Arc<ProcessContext>> {
    PROCESS_CONTEXT.get_or_init(|| ProcessContext::init(options))
}

pub fn process_context() -> Option<Arc<ProcessContext>> {
    PROCESS_CONTEXT.get()
}
