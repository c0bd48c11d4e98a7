//! `CinderServer` builder and accept loop.
//!
//! This is the entry point for running a Cinder server. It ties the
//! layers together: transport → protocol table → connection handler.

use std::net::SocketAddr;
use std::sync::Arc;

use cinder_buffer::BufferPool;
use cinder_protocol::{ProtocolRegistries, ProtocolTable, Translations};
use cinder_registry::Manifest;
use cinder_transport::{TcpTransport, Transport};

use crate::config::ServerConfig;
use crate::error::ConfigError;
use crate::handler::{handle_connection, PacketHandler};
use crate::CinderError;

/// Shared server state passed to each connection handler task.
///
/// Everything in here is read-only once the server is built.
pub(crate) struct ServerState<H> {
    pub(crate) config: ServerConfig,
    pub(crate) registries: Arc<ProtocolRegistries>,
    pub(crate) table: ProtocolTable,
    pub(crate) pool: BufferPool,
    pub(crate) handler: H,
}

/// Builder for configuring and starting a Cinder server.
///
/// # Example
///
/// ```rust,ignore
/// let server = CinderServer::builder()
///     .config(ServerConfig::load("cinder.toml")?)
///     .handler(MyHandler)
///     .build()
///     .await?;
/// server.run().await
/// ```
pub struct CinderServerBuilder<H> {
    config: ServerConfig,
    registries: Option<ProtocolRegistries>,
    handler: H,
}

impl CinderServerBuilder<()> {
    pub fn new() -> Self {
        Self {
            config: ServerConfig::default(),
            registries: None,
            handler: (),
        }
    }
}

impl Default for CinderServerBuilder<()> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H: PacketHandler> CinderServerBuilder<H> {
    pub fn config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    /// Uses prebuilt registries instead of loading them from the
    /// manifest and translation files named in the config.
    pub fn registries(mut self, registries: ProtocolRegistries) -> Self {
        self.registries = Some(registries);
        self
    }

    /// Sets the application's packet handler.
    pub fn handler<P: PacketHandler>(self, handler: P) -> CinderServerBuilder<P> {
        CinderServerBuilder {
            config: self.config,
            registries: self.registries,
            handler,
        }
    }

    /// Loads registries if needed and binds the TCP listener.
    pub async fn build(self) -> Result<CinderServer<H>, CinderError> {
        self.config.validate()?;
        let registries = match self.registries {
            Some(registries) => registries,
            None => load_registries(&self.config)?,
        };
        let table = ProtocolTable::standard(registries.version());
        tracing::info!(
            version = %registries.version(),
            items = registries.catalog.len(),
            "registries ready"
        );

        let transport = TcpTransport::bind(self.config.bind_address.as_str())
            .await?
            .with_max_frame_len(self.config.max_frame_len);

        let pool = BufferPool::new(
            self.config.buffer_pool.initial_capacity,
            self.config.buffer_pool.max_pooled,
        );
        let state = Arc::new(ServerState {
            config: self.config,
            registries: Arc::new(registries),
            table,
            pool,
            handler: self.handler,
        });
        Ok(CinderServer { transport, state })
    }
}

fn read_file(path: &std::path::Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn load_registries(config: &ServerConfig) -> Result<ProtocolRegistries, CinderError> {
    let manifest = match &config.manifest {
        Some(path) => Manifest::from_json(&read_file(path)?)?,
        None => Manifest::builtin()?,
    };
    let mut registries = ProtocolRegistries::from_manifest(&manifest)?;
    if let Some(path) = &config.translations {
        registries.translations = Translations::from_json(&read_file(path)?)?;
    }
    Ok(registries)
}

/// A bound Cinder server.
///
/// Call [`run()`](Self::run) to start accepting connections.
pub struct CinderServer<H> {
    transport: TcpTransport,
    state: Arc<ServerState<H>>,
}

impl CinderServer<()> {
    pub fn builder() -> CinderServerBuilder<()> {
        CinderServerBuilder::new()
    }
}

impl<H: PacketHandler> CinderServer<H> {
    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> Result<SocketAddr, CinderError> {
        Ok(self.transport.local_addr()?)
    }

    pub fn registries(&self) -> &Arc<ProtocolRegistries> {
        &self.state.registries
    }

    /// Runs the accept loop, spawning a handler task for each connection.
    /// Runs until the process is terminated.
    pub async fn run(self) -> Result<(), CinderError> {
        self.run_until(std::future::pending()).await
    }

    /// Like [`run()`](Self::run), but stops accepting once `signal`
    /// completes. Connections already accepted keep running.
    pub async fn run_until(mut self, signal: impl Future<Output = ()>) -> Result<(), CinderError> {
        tracing::info!(addr = %self.state.config.bind_address, "Cinder server running");
        tokio::pin!(signal);

        loop {
            tokio::select! {
                () = &mut signal => {
                    self.transport.shutdown().await?;
                    return Ok(());
                }
                accepted = self.transport.accept() => match accepted {
                    Ok(conn) => {
                        let state = Arc::clone(&self.state);
                        tokio::spawn(async move {
                            let conn_id = cinder_transport::Connection::id(&conn);
                            if let Err(e) = handle_connection(conn, state).await {
                                tracing::debug!(%conn_id, error = %e, "connection ended with error");
                            }
                        });
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "accept failed");
                    }
                },
            }
        }
    }
}
