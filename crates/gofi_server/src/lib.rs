use anyhow::Context as _;
use gofi_backend::ProcessContext;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

pub mod cli;
pub mod i18n;
pub mod server;

pub const GOFI_ENV: &str = "GOFI_ENV";

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct ServerConfig {
    /// Settings become read-only once the system is initialized.
    pub preview: bool,
}

impl ServerConfig {
    pub fn from_env() -> Self {
        Self::from_env_value(std::env::var(GOFI_ENV).ok().as_deref())
    }

    fn from_env_value(value: Option<&str>) -> Self {
        Self {
            preview: value.is_some_and(|v| v.trim().eq_ignore_ascii_case("preview")),
        }
    }
}

/// A running HTTP server. Dropping it stops the server.
pub struct StartedServer {
    pub addr: SocketAddr,
    shutdown: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<anyhow::Result<()>>>,
}

impl StartedServer {
    /// Resolves when the server stops serving.
    pub async fn wait(mut self) -> anyhow::Result<()> {
        let Some(task) = self.task.take() else {
            return Ok(());
        };
        task.await.context("server task panicked")?
    }

    /// Stops accepting connections and lets in-flight requests finish.
    pub async fn shutdown(mut self) -> anyhow::Result<()> {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        self.wait().await
    }
}

impl Drop for StartedServer {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

pub async fn start_server(
    addr: SocketAddr,
    ctx: Arc<ProcessContext>,
) -> anyhow::Result<StartedServer> {
    start_server_with_config(addr, ctx, ServerConfig::from_env()).await
}

pub async fn start_server_with_config(
    addr: SocketAddr,
    ctx: Arc<ProcessContext>,
    config: ServerConfig,
) -> anyhow::Result<StartedServer> {
    if config.preview {
        tracing::info!("preview mode: settings are read-only after setup");
    }

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    let bound = listener
        .local_addr()
        .context("failed to read bound address")?;

    let app = server::router(ctx, config);
    let (tx, rx) = oneshot::channel::<()>();
    let task = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = rx.await;
            })
            .await
            .context("server failed")
    });

    Ok(StartedServer {
        addr: bound,
        shutdown: Some(tx),
        task: Some(task),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preview_mode_is_read_from_env_value() {
        assert!(!ServerConfig::from_env_value(None).preview);
        assert!(!ServerConfig::from_env_value(Some("")).preview);
        assert!(!ServerConfig::from_env_value(Some("production")).preview);
        assert!(ServerConfig::from_env_value(Some("preview")).preview);
        assert!(ServerConfig::from_env_value(Some(" Preview\n")).preview);
    }
}
