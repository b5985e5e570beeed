use crate::config::error::ConfigError;
use crate::delivery::error::UploadError;
use crate::service::worker::ServiceStopped;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WnsError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Upload(#[from] UploadError),

    #[error(transparent)]
    ServiceStopped(#[from] ServiceStopped),
}
