use thiserror::Error;

#[derive(Error, Debug)]
pub enum BylineError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },
}
