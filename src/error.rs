use std::io;
use thiserror::Error;

pub type Result<T> = ::std::result::Result<T, EmuError>;

/// Host-level failures.
///
/// Emulated-machine conditions (architectural exceptions, GTE saturation)
/// never surface here; they are routed through the emulated COP0 and flag
/// registers instead.
#[derive(Error, Debug)]
pub enum EmuError {
    #[error("Input output error: {0}")]
    IoError(#[from] io::Error),
    #[error("Invalid BIOS image: {0}")]
    BadBios(String),
    #[error("Invalid executable image: {0}")]
    BadExecutable(String),
    #[error("Deserialization error: {0}")]
    DeserializationError(String),
}
