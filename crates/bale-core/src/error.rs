use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to load config from {path}")]
    ConfigLoad {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config at {path}")]
    ConfigParse {
        path: PathBuf,
        source: toml::de::Error,
    },

    // ── Ignore rules ──
    #[error("failed to read ignore file {path}")]
    IgnoreFileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid ignore rule {rule:?}")]
    InvalidIgnoreRule {
        rule: String,
        source: globset::Error,
    },
}
