/// Error type shared by the startup path and the platform adapters.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("unsupported pixel width: {0} bits per pixel (expected 16 or 18)")]
    UnsupportedPixelWidth(u8),

    #[error("unsupported color space: {0:?} (expected \"rgb\" or \"bgr\")")]
    UnsupportedColorSpace(String),

    #[error("terminal error: {0}")]
    Terminal(#[from] std::io::Error),

    #[error("config error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, CoreError>;
