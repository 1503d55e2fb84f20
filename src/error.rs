use thiserror::Error;

/// Failure decoding a stored or imported card document.
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("malformed card data: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("unsupported card data layout: expected an array of cards or an object with a `cards` array")]
    UnsupportedShape,
}

#[derive(Debug, Error)]
pub enum ClipboardError {
    #[error("no clipboard tool available on this host")]
    Unavailable,
    #[error("clipboard access denied: {0}")]
    Denied(String),
    #[error("clipboard i/o failed")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum OpenError {
    #[error("opening {0} was blocked by the host")]
    Blocked(String),
    #[error("failed to open {url}: {reason}")]
    Failed { url: String, reason: String },
}

#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("an edit session is already open")]
    AlreadyOpen,
    #[error("no edit session is open")]
    NotOpen,
}

#[derive(Debug, Error)]
pub enum PlaceholderError {
    #[error(transparent)]
    Clipboard(#[from] ClipboardError),
    #[error("formatting timestamp")]
    Format(#[from] time::error::Format),
    #[error("{0}")]
    Resolve(String),
}
