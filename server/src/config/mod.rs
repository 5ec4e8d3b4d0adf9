use std::{io, path::Path, sync::Arc};

use idleio::config::IdleTimeoutBuilder;
use serde::Deserialize;
use thiserror::Error;

pub mod toml;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    #[serde(default)]
    pub idle_timeout: IdleTimeoutBuilder,
    #[serde(default)]
    pub sink: Vec<SinkServerConfig>,
    #[serde(default)]
    pub source: Vec<SourceServerConfig>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SinkServerConfig {
    pub listen_addr: Arc<str>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SourceServerConfig {
    pub listen_addr: Arc<str>,
    pub chunk_size: usize,
    pub chunks: usize,
}

impl ServerConfig {
    /// Rejects settings that deserialize fine but cannot be served.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for source in &self.source {
            source.body_len()?;
        }
        Ok(())
    }
}

impl SourceServerConfig {
    pub fn body_len(&self) -> Result<u64, ConfigError> {
        body_len(self.chunk_size, self.chunks)
    }
}

/// Length of a body made of `chunks` chunks of `chunk_size` bytes each.
pub fn body_len(chunk_size: usize, chunks: usize) -> Result<u64, ConfigError> {
    u64::try_from(chunk_size)
        .ok()
        .zip(u64::try_from(chunks).ok())
        .and_then(|(chunk_size, chunks)| chunk_size.checked_mul(chunks))
        .ok_or(ConfigError::BodyTooLarge { chunk_size, chunks })
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file `{path}`: {source}")]
    Read {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error("Failed to parse config file: {0}")]
    Parse(String),
    #[error("Body of {chunks} chunks of {chunk_size} bytes is too large")]
    BodyTooLarge { chunk_size: usize, chunks: usize },
}

pub async fn read_config(path: impl AsRef<Path>) -> Result<ServerConfig, ConfigError> {
    let path = path.as_ref().display().to_string();
    let src = tokio::fs::read_to_string(&path)
        .await
        .map_err(|source| ConfigError::Read {
            path: path.clone(),
            source,
        })?;
    let config: ServerConfig = ::toml::from_str(&src)
        .map_err(|e| ConfigError::Parse(toml::human_toml_error(&path, &src, e)))?;
    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn full_config() {
        let src = r#"
[idle_timeout]
read_ms = 1000
write_ms = 2000

[[sink]]
listen_addr = "127.0.0.1:8080"

[[source]]
listen_addr = "127.0.0.1:8081"
chunk_size = 1000000
chunks = 10
"#;
        let config: ServerConfig = ::toml::from_str(src).unwrap();
        let timeouts = config.idle_timeout.build();
        assert_eq!(timeouts.read, Duration::from_secs(1));
        assert_eq!(timeouts.write, Duration::from_secs(2));
        assert_eq!(config.sink[0].listen_addr.as_ref(), "127.0.0.1:8080");
        assert_eq!(config.source[0].chunk_size, 1_000_000);
        assert_eq!(config.source[0].chunks, 10);
    }

    #[test]
    fn empty_config() {
        let config: ServerConfig = ::toml::from_str("").unwrap();
        assert!(config.sink.is_empty());
        assert!(config.source.is_empty());
    }

    #[test]
    fn oversized_body_is_rejected() {
        let src = format!(
            r#"
[[source]]
listen_addr = "127.0.0.1:8081"
chunk_size = {}
chunks = 3
"#,
            i64::MAX
        );
        let config: ServerConfig = ::toml::from_str(&src).unwrap();
        let e = config.validate().unwrap_err();
        assert!(matches!(
            e,
            ConfigError::BodyTooLarge {
                chunk_size: 0x7fff_ffff_ffff_ffff,
                chunks: 3
            }
        ));
        assert_eq!(body_len(1_000_000, 10).unwrap(), 10_000_000);
    }

    #[tokio::test]
    async fn missing_file() {
        let e = read_config("/nonexistent/server.toml").await.unwrap_err();
        assert!(matches!(e, ConfigError::Read { .. }));
    }
}
