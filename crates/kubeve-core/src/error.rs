use std::path::PathBuf;

/// Failures reading or writing `~/.kubeve/config.yaml`.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("could not resolve config path: HOME is not set")]
    NoHome,
    #[error("read config {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("parse config {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("serialize config: {0}")]
    Serialize(#[source] serde_yaml::Error),
    #[error("write config {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
