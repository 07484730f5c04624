use thiserror::Error;

/// Raised while turning host parameters into a plugin config.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid trial parameters: {0}")]
    Params(#[from] serde_json::Error),
    #[error("key code {0} is not a valid character")]
    KeyCode(u32),
}
