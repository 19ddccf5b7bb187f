use thiserror::Error;

#[derive(Debug, Error)]
pub enum XeniaError {
    #[error("selector error: {0}")]
    Selector(String),

    #[error("document error: {0}")]
    Document(String),

    #[error("inject error: {0}")]
    Inject(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type XeniaResult<T> = Result<T, XeniaError>;
