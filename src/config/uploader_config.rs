//! The resolved, immutable configuration every upload is built from.

use crate::config::error::ConfigError;
use crate::types::parameter::{parameter, Parameter, PARAMETERS};
use bon::bon;
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;
use url::Url;

pub const DEFAULT_SERVER_URL: &str = "http://www.wetternetz-sachsen.de/get_daten_23.php";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);
pub const DEFAULT_SOFTWARE: &str = concat!("WNS_RS_", env!("CARGO_PKG_VERSION"));

/// Configuration value that marks a parameter as unavailable at this station.
const NONE_SENTINEL: &str = "None";

/// The host observation type a WNS parameter is filled from.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SourceField(String);

impl SourceField {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SourceField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The source of every WNS parameter, resolved once from the built-in
/// defaults and the configured overrides.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldMapping {
    // index-aligned with PARAMETERS
    sources: Vec<Option<SourceField>>,
}

impl FieldMapping {
    /// Applies `overrides` (WNS parameter name → observation type or `None`)
    /// on top of the default sources.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnknownParameter`] if a key is not a WNS parameter name.
    pub fn resolve(overrides: &BTreeMap<String, String>) -> Result<Self, ConfigError> {
        if let Some(unknown) = overrides.keys().find(|name| parameter(name).is_none()) {
            return Err(ConfigError::UnknownParameter(unknown.clone()));
        }
        let sources = PARAMETERS
            .iter()
            .map(|p| match overrides.get(p.name) {
                Some(value) => parse_source(value),
                None => p.default_source.map(|s| SourceField(s.to_string())),
            })
            .collect();
        Ok(Self { sources })
    }

    /// The source configured for `parameter_name`, or `None` if the parameter is
    /// unknown or unavailable.
    pub fn source(&self, parameter_name: &str) -> Option<&SourceField> {
        PARAMETERS
            .iter()
            .position(|p| p.name == parameter_name)
            .and_then(|i| self.sources.get(i))
            .and_then(Option::as_ref)
    }

    /// Every parameter with its source, in the order they are sent.
    pub fn iter(&self) -> impl Iterator<Item = (&'static Parameter, Option<&SourceField>)> {
        PARAMETERS.iter().zip(self.sources.iter().map(Option::as_ref))
    }

    /// Only the parameters that have a source.
    pub fn active(&self) -> impl Iterator<Item = (&'static Parameter, &SourceField)> {
        self.iter()
            .filter_map(|(parameter, source)| source.map(|s| (parameter, s)))
    }
}

impl Default for FieldMapping {
    fn default() -> Self {
        Self {
            sources: PARAMETERS
                .iter()
                .map(|p| p.default_source.map(|s| SourceField(s.to_string())))
                .collect(),
        }
    }
}

fn parse_source(value: &str) -> Option<SourceField> {
    let value = value.trim();
    if value.is_empty() || value.eq_ignore_ascii_case(NONE_SENTINEL) {
        None
    } else {
        Some(SourceField(value.to_string()))
    }
}

/// Everything needed to turn a record into a WNS request and deliver it.
///
/// Built once at startup, either from the host configuration file
/// (see [`crate::SiteConfig`]) or directly with [`UploaderConfig::builder()`],
/// and shared read-only afterwards.
///
/// # Examples
///
/// ```
/// use std::collections::BTreeMap;
/// use wns::UploaderConfig;
///
/// let config = UploaderConfig::builder()
///     .station("12345")
///     .api_key("ABCDE")
///     .overrides(BTreeMap::from([("TSOI10".to_string(), "soilTemp1".to_string())]))
///     .log_url(true)
///     .build()?;
///
/// assert_eq!(config.station(), "12345");
/// assert_eq!(config.fields().source("TSOI10").map(|s| s.as_str()), Some("soilTemp1"));
/// # Ok::<(), wns::ConfigError>(())
/// ```
#[derive(Clone)]
pub struct UploaderConfig {
    station: String,
    api_key: String,
    server_url: Url,
    fields: FieldMapping,
    skip_upload: bool,
    log_url: bool,
    timeout: Duration,
    software: String,
}

#[bon]
impl UploaderConfig {
    /// Validates and resolves the configuration.
    ///
    /// # Arguments
    ///
    /// * `.station(..)`: **Required.** The WNS station identifier.
    /// * `.api_key(..)`: **Required.** The WNS credential.
    /// * `.server_url(..)`: Endpoint, defaults to [`DEFAULT_SERVER_URL`].
    /// * `.overrides(..)`: WNS parameter name → observation type, or `"None"` to
    ///   leave the parameter out.
    /// * `.skip_upload(bool)`: Build and log requests but never send them.
    /// * `.log_url(bool)`: Log every request URL.
    /// * `.timeout(Duration)`: HTTP timeout, defaults to [`DEFAULT_TIMEOUT`].
    /// * `.software(..)`: The software id sent as `WSOVER`, defaults to [`DEFAULT_SOFTWARE`].
    ///
    /// # Errors
    ///
    /// * [`ConfigError::MissingOption`] if the station or API key is missing or blank.
    /// * [`ConfigError::UnknownParameter`] if an override names no WNS parameter.
    /// * [`ConfigError::ServerUrl`] if the server URL does not parse.
    #[builder]
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        #[builder(into)] station: Option<String>,
        #[builder(into)] api_key: Option<String>,
        #[builder(into)] server_url: Option<String>,
        #[builder(default)] overrides: BTreeMap<String, String>,
        #[builder(default)] skip_upload: bool,
        #[builder(default)] log_url: bool,
        timeout: Option<Duration>,
        #[builder(into)] software: Option<String>,
    ) -> Result<Self, ConfigError> {
        let station = non_blank(station).ok_or(ConfigError::MissingOption("station"))?;
        let api_key = non_blank(api_key).ok_or(ConfigError::MissingOption("api_key"))?;
        let server_url = server_url.unwrap_or_else(|| DEFAULT_SERVER_URL.to_string());
        let server_url =
            Url::parse(&server_url).map_err(|e| ConfigError::ServerUrl(server_url.clone(), e))?;

        Ok(Self {
            station,
            api_key,
            server_url,
            fields: FieldMapping::resolve(&overrides)?,
            skip_upload,
            log_url,
            timeout: timeout.unwrap_or(DEFAULT_TIMEOUT),
            software: software.unwrap_or_else(|| DEFAULT_SOFTWARE.to_string()),
        })
    }

    pub fn station(&self) -> &str {
        &self.station
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    pub fn server_url(&self) -> &Url {
        &self.server_url
    }

    pub fn fields(&self) -> &FieldMapping {
        &self.fields
    }

    pub fn skip_upload(&self) -> bool {
        self.skip_upload
    }

    pub fn log_url(&self) -> bool {
        self.log_url
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn software(&self) -> &str {
        &self.software
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl fmt::Debug for UploaderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploaderConfig")
            .field("station", &self.station)
            .field("api_key", &"<redacted>")
            .field("server_url", &self.server_url.as_str())
            .field("skip_upload", &self.skip_upload)
            .field("log_url", &self.log_url)
            .field("timeout", &self.timeout)
            .field("software", &self.software)
            .finish_non_exhaustive()
    }
}
