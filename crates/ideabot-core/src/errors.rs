/// Core error type shared by the relay and the issue bridge.
///
/// Adapter crates map their specific failures into this type so the poll
/// loop and the dispatcher can handle them consistently (log-and-continue
/// vs fatal at startup).
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("telegram api {method}: {detail}")]
    Api { method: String, detail: String },

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("external error: {0}")]
    External(String),
}

impl Error {
    pub fn api(method: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::Api {
            method: method.into(),
            detail: detail.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
