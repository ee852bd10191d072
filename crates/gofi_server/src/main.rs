use anyhow::Context as _;
use clap::Parser as _;
use gofi_server::cli::Cli;
use std::net::{Ipv4Addr, SocketAddr};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let options = Cli::parse().startup_options();
    let port: u16 = options
        .port
        .parse()
        .with_context(|| format!("invalid port {:?}", options.port))?;

    let ctx = tokio::task::spawn_blocking(move || gofi_backend::init_process_context(&options))
        .await
        .context("process context initialization panicked")??;

    let addr = SocketAddr::from((Ipv4Addr::UNSPECIFIED, port));
    let server = gofi_server::start_server(addr, ctx.clone()).await?;
    tracing::info!(
        addr = %server.addr,
        advertised = %ctx.server_address(),
        storage = %ctx.storage_dir().display(),
        "gofi_server listening"
    );
    server.wait().await?;
    Ok(())
}
