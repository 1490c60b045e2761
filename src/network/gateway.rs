//! Accept loop: one task per connection, handed the shared handles it
//! needs and nothing else (spec §5 "no other path to mutate the
//! directory").

use crate::config::Config;
use crate::db::Database;
use crate::handlers::context::{SecurityShared, SharedTopic};
use crate::hooks::Hooks;
use crate::state::HubHandle;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::net::TcpListener;

static NEXT_CONN_ID: AtomicU64 = AtomicU64::new(1);

/// Owns the listening socket and the handles every accepted connection
/// is handed a clone of.
pub struct Gateway {
    listener: TcpListener,
    hub: HubHandle,
    db: Database,
    config: Arc<Config>,
    security: Arc<SecurityShared>,
    topic: SharedTopic,
    hooks: Arc<Hooks>,
}

impl Gateway {
    #[allow(clippy::too_many_arguments)]
    pub async fn bind(
        addr: SocketAddr,
        hub: HubHandle,
        db: Database,
        config: Arc<Config>,
        security: Arc<SecurityShared>,
        topic: SharedTopic,
        hooks: Arc<Hooks>,
    ) -> std::io::Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        tracing::info!(%addr, "listening for NMDC connections");
        Ok(Gateway { listener, hub, db, config, security, topic, hooks })
    }

    /// Accept connections forever, spawning one task per peer. A single
    /// `accept()` failure (e.g. an ephemeral-port exhaustion blip) is
    /// logged and retried rather than tearing the whole hub down.
    pub async fn run(self) -> std::io::Result<()> {
        loop {
            let (socket, peer_addr) = match self.listener.accept().await {
                Ok(pair) => pair,
                Err(err) => {
                    tracing::warn!(%err, "accept failed");
                    continue;
                }
            };
            if let Err(err) = socket.set_nodelay(true) {
                tracing::warn!(%err, %peer_addr, "failed to set TCP_NODELAY");
            }

            let conn_id = NEXT_CONN_ID.fetch_add(1, Ordering::Relaxed);
            let hub = self.hub.clone();
            let db = self.db.clone();
            let config = self.config.clone();
            let security = self.security.clone();
            let topic = self.topic.clone();
            let hooks = self.hooks.clone();

            tokio::spawn(async move {
                if let Err(err) = super::connection::handle_connection(socket, peer_addr, conn_id, hub, db, config, security, topic, hooks).await
                {
                    tracing::debug!(conn_id, %peer_addr, %err, "connection ended with an I/O error");
                }
            });
        }
    }
}
