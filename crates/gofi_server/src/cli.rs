use clap::Parser;
use gofi_backend::{StartupOptions, build_version};
use gofi_domain::DEFAULT_PORT;

#[derive(Parser, Debug)]
#[command(name = "gofi", version = build_version(), about = "Self-hosted file server")]
pub struct Cli {
    /// Port to expose web services.
    #[arg(long, short = 'p', default_value = DEFAULT_PORT)]
    pub port: String,
    /// Server side ip for web clients to request; a LAN address is discovered when empty.
    #[arg(long, default_value = "")]
    pub ip: String,
    /// Open the database without creating or upgrading its schema.
    #[arg(long)]
    pub skip_migrations: bool,
}

impl Cli {
    pub fn startup_options(&self) -> StartupOptions {
        StartupOptions {
            port: self.port.clone(),
            ip: self.ip.trim().to_owned(),
            work_dir: None,
            skip_migrations: self.skip_migrations,
        }
    }
}
