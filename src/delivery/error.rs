use reqwest::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("Network request to {endpoint} failed")]
    Network {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Upload to {endpoint} rejected with status {status}")]
    Rejected {
        endpoint: String,
        status: StatusCode,
        body: String,
    },
}

impl UploadError {
    /// Transport failures may succeed on a later attempt, rejections will not.
    pub fn is_transient(&self) -> bool {
        matches!(self, UploadError::Network { .. })
    }
}
