//! `cinder [config.toml]`: runs a server that answers keep-alives and
//! logs everything else.

use cinder::prelude::*;

struct LogHandler;

impl PacketHandler for LogHandler {
    async fn handle(
        &self,
        session: &Session,
        message: Serverbound,
    ) -> Result<Vec<Clientbound>, CinderError> {
        tracing::info!(id = %session.id(), locale = session.locale(), ?message, "message");
        Ok(Vec::new())
    }
}

#[tokio::main]
async fn main() -> Result<(), CinderError> {
    let config = match std::env::args().nth(1) {
        Some(path) => ServerConfig::load(path)?,
        None => ServerConfig::default(),
    };
    cinder::logging::init(&config.logging)?;

    let server = CinderServer::builder()
        .config(config)
        .handler(LogHandler)
        .build()
        .await?;
    server
        .run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::warn!(error = %e, "cannot listen for ctrl-c");
                std::future::pending::<()>().await;
            }
        })
        .await
}
