//! Reads the `[StdRESTful.Wns]` section of the host's configuration file.

use crate::config::error::ConfigError;
use crate::config::uploader_config::UploaderConfig;
use crate::service::worker::DeliveryOptions;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

/// The WNS section of the host configuration, as written by the user.
///
/// Besides the documented options, any key named after a WNS parameter
/// (`T5AKT_`, `SOD1D_`, `TSOI10`, ...) selects the observation type that
/// parameter is filled from, or `"None"` if the station has no such sensor.
///
/// ```toml
/// [StdRESTful]
///     [StdRESTful.Wns]
///         station = "12345"
///         api_key = "ABCDE"
///         T5AKT_ = "extraTemp1"
///         TSOI10 = "soilTemp1"
///         SOD1D_ = "None"
///         log_url = true
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct SiteConfig {
    #[serde(default = "enabled")]
    pub enable: bool,
    pub station: Option<String>,
    pub api_key: Option<String>,
    pub server_url: Option<String>,
    #[serde(default)]
    pub skip_upload: bool,
    #[serde(default)]
    pub log_url: bool,
    /// Seconds.
    pub timeout: Option<u64>,
    /// Seconds.
    pub post_interval: Option<u64>,
    /// Seconds.
    pub stale: Option<u64>,
    pub max_tries: Option<u32>,
    /// Seconds.
    pub retry_wait: Option<u64>,
    /// Unsent records kept while WNS is unreachable; unlimited when unset.
    pub max_backlog: Option<usize>,
    #[serde(default = "enabled")]
    pub log_success: bool,
    #[serde(default = "enabled")]
    pub log_failure: bool,
    /// WNS parameter overrides.
    #[serde(flatten)]
    pub fields: BTreeMap<String, String>,
}

fn enabled() -> bool {
    true
}

#[derive(Deserialize)]
struct HostConfig {
    #[serde(rename = "StdRESTful")]
    std_restful: Option<StdRestful>,
}

#[derive(Deserialize)]
struct StdRestful {
    #[serde(rename = "Wns")]
    wns: Option<SiteConfig>,
}

impl SiteConfig {
    /// Parses the WNS section out of a complete host configuration.
    ///
    /// # Errors
    ///
    /// * [`ConfigError::Parse`] if the text is not valid TOML or a value has the wrong type.
    /// * [`ConfigError::MissingSection`] if there is no `[StdRESTful.Wns]` section.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let host: HostConfig = toml::from_str(text)?;
        host.std_restful
            .and_then(|section| section.wns)
            .ok_or(ConfigError::MissingSection)
    }

    /// Reads and parses the host configuration file at `path`.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Read(path.to_path_buf(), e))?;
        Self::from_toml_str(&text)
    }

    /// Resolves the uploader part of the section.
    ///
    /// # Errors
    ///
    /// See [`UploaderConfig::builder()`].
    pub fn uploader_config(&self) -> Result<UploaderConfig, ConfigError> {
        UploaderConfig::builder()
            .maybe_station(self.station.clone())
            .maybe_api_key(self.api_key.clone())
            .maybe_server_url(self.server_url.clone())
            .overrides(self.fields.clone())
            .skip_upload(self.skip_upload)
            .log_url(self.log_url)
            .maybe_timeout(self.timeout.map(Duration::from_secs))
            .build()
    }

    /// The options for the delivery service, with the defaults applied.
    pub fn delivery_options(&self) -> DeliveryOptions {
        let defaults = DeliveryOptions::default();
        DeliveryOptions {
            post_interval: self.post_interval.map(Duration::from_secs),
            stale: self.stale.map(Duration::from_secs),
            max_tries: self.max_tries.unwrap_or(defaults.max_tries).max(1),
            retry_wait: self
                .retry_wait
                .map(Duration::from_secs)
                .unwrap_or(defaults.retry_wait),
            max_backlog: self.max_backlog,
            log_success: self.log_success,
            log_failure: self.log_failure,
        }
    }
}
