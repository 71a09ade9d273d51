use hydrosense_api::ReadingError;

#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("Invalid JSON: {0}")]
    InvalidJson(#[source] serde_json::Error),

    #[error("Payload is not a JSON object")]
    NotAnObject,

    #[error("No recognized sensor field")]
    NoRecognizedFields,
}

impl From<ReadingError> for IngestError {
    fn from(error: ReadingError) -> Self {
        match error {
            ReadingError::InvalidJson(e) => IngestError::InvalidJson(e),
            ReadingError::NotAnObject => IngestError::NotAnObject,
        }
    }
}
