use reqwest::StatusCode;

#[derive(Debug, thiserror::Error)]
pub enum AlertError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Alert rejected with status {status}: {body}")]
    Rejected { status: StatusCode, body: String },
}
