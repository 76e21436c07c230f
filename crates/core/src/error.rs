/// A status name outside the closed set, typically a corrupt stored value.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown request status: '{value}'")]
pub struct UnknownStateError {
    pub value: String,
}

impl UnknownStateError {
    pub fn new(value: impl Into<String>) -> Self {
        UnknownStateError {
            value: value.into(),
        }
    }
}
