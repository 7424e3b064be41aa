//! Listen address configuration

use ninja_utils::{EnvError, env_or, env_parse};
use std::net::{IpAddr, SocketAddr};

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 5000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
        }
    }
}

impl ServerConfig {
    /// Read `API_HOST` and `API_PORT`.
    pub fn from_env() -> Result<Self, EnvError> {
        Ok(Self {
            host: env_or("API_HOST", DEFAULT_HOST),
            port: env_parse("API_PORT", DEFAULT_PORT)?,
        })
    }

    pub fn socket_addr(&self) -> Result<SocketAddr, EnvError> {
        let ip: IpAddr = self.host.parse().map_err(|e: std::net::AddrParseError| {
            EnvError::Invalid {
                key: "API_HOST".to_string(),
                value: self.host.clone(),
                reason: e.to_string(),
            }
        })?;
        Ok(SocketAddr::new(ip, self.port))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_addr() {
        let addr = ServerConfig::default().socket_addr().unwrap();
        assert_eq!(addr.to_string(), "0.0.0.0:5000");
    }

    #[test]
    fn test_ipv6_and_invalid_host() {
        let config = ServerConfig {
            host: "::1".to_string(),
            port: 8080,
        };
        assert_eq!(config.socket_addr().unwrap().to_string(), "[::1]:8080");

        let config = ServerConfig {
            host: "localhost:80".to_string(),
            port: 8080,
        };
        assert!(config.socket_addr().is_err());
    }
}
