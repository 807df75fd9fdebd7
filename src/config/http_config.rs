//! HTTP/SSE facade configuration parsing from environment variables.

use std::env;

#[derive(Debug, Clone)]
pub struct HttpEnvConfig {
    pub port: u16,
    pub bind_address: String,
}

impl Default for HttpEnvConfig {
    fn default() -> Self {
        Self {
            port: 8001,
            bind_address: "0.0.0.0".to_string(),
        }
    }
}

impl HttpEnvConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let default = Self::default();
        let port = match env::var("SENTINEL_HTTP_PORT") {
            Ok(v) => v.parse::<u16>().map_err(|e| anyhow::anyhow!("invalid SENTINEL_HTTP_PORT: {e}"))?,
            Err(_) => default.port,
        };
        let bind_address = env::var("SENTINEL_HTTP_BIND").unwrap_or(default.bind_address);
        Ok(Self { port, bind_address })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_port_matches_spec() {
        assert_eq!(HttpEnvConfig::default().port, 8001);
    }
}
