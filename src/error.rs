use std::io;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("config error: {0}")]
    Config(String),

    #[error("{what} too short: {len} bytes, need {need}")]
    Truncated {
        what: &'static str,
        len: usize,
        need: usize,
    },

    #[error("unsupported {0}")]
    Unsupported(String),

    #[error("interface {name} not found")]
    InterfaceNotFound { name: String },
}

impl Error {
    pub(crate) fn truncated(what: &'static str, len: usize, need: usize) -> Self {
        Error::Truncated { what, len, need }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
