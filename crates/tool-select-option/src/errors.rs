use cdp_adapter::AdapterError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SelectError {
    #[error("control has no options")]
    NoOptions,
    #[error("invalid selection target: {0}")]
    InvalidTarget(String),
    #[error("browser error: {0}")]
    Adapter(#[from] AdapterError),
}
