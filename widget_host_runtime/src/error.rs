use crate::value::ValueKind;

#[derive(Debug, thiserror::Error)]
pub enum WidgetError {
    #[error("widget {id} holds a {stored:?} value, refusing to write {written:?}")]
    ValueKindMismatch {
        id: String,
        stored: ValueKind,
        written: ValueKind,
    },

    #[error("invalid element descriptor: {0}")]
    InvalidElement(String),

    #[error("protocol error: {0}")]
    Protocol(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for WidgetError {
    fn from(err: serde_json::Error) -> Self {
        WidgetError::Protocol(err.to_string())
    }
}

pub type Result<T, E = WidgetError> = std::result::Result<T, E>;
