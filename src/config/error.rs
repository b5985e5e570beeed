use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing mandatory option '{0}'")]
    MissingOption(&'static str),

    #[error("'{0}' is neither a known option nor a WNS parameter")]
    UnknownParameter(String),

    #[error("Invalid server URL '{0}'")]
    ServerUrl(String, #[source] url::ParseError),

    #[error("Failed to read config file '{0}'")]
    Read(PathBuf, #[source] std::io::Error),

    #[error("Failed to parse config")]
    Parse(#[from] toml::de::Error),

    #[error("Config has no [StdRESTful.Wns] section")]
    MissingSection,

    #[error("Failed to build HTTP client")]
    HttpClient(#[source] reqwest::Error),
}
