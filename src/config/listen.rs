//! Network listener configuration.

use serde::Deserialize;
use std::net::SocketAddr;

/// TCP listener configuration. TLS is terminated externally (see §1 of
/// the spec this hub implements); the hub only ever sees plaintext
/// sockets, with a TLS-fronting proxy injecting a `$MyIP` frame to
/// carry the true client address and negotiated TLS version.
#[derive(Debug, Clone, Deserialize)]
pub struct ListenConfig {
    /// Address to bind to (e.g. "0.0.0.0:411").
    pub address: SocketAddr,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn listen_config_deserializes() {
        let cfg: ListenConfig = toml::from_str(r#"address = "0.0.0.0:411""#).unwrap();
        assert_eq!(cfg.address.port(), 411);
    }
}
