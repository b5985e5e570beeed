//! Turns one observation record into the WNS request URL.

use crate::config::uploader_config::{SourceField, UploaderConfig};
use crate::types::parameter::{Parameter, ValueFormat};
use crate::types::record::ObservationRecord;
use log::{debug, warn};
use std::fmt;
use url::Url;

/// Template version of the parameter set below.
pub const TEMPLATE_VERSION: &str = "WNS_V2.3";

/// A fully assembled request for one upload attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadRequest {
    url: Url,
}

impl UploadRequest {
    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn as_str(&self) -> &str {
        self.url.as_str()
    }

    /// The decoded query parameters, in the order they are sent.
    pub fn params(&self) -> Vec<(String, String)> {
        self.url.query_pairs().into_owned().collect()
    }

    /// The decoded value of the first query parameter called `name`.
    pub fn param(&self, name: &str) -> Option<String> {
        self.url
            .query_pairs()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.into_owned())
    }

    pub fn into_url(self) -> Url {
        self.url
    }
}

impl fmt::Display for UploadRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.url.as_str())
    }
}

/// Builds the WNS request for `record`.
///
/// The query starts with `station` and `api_key`, followed by the template
/// header (`TMPVER`, `WSOVER`, `ZEIT__`, `DATUM_`, `UTCDIF`, all times in UTC)
/// and then every parameter that has a source and a value in the record,
/// converted to the unit WNS expects. Parameters without a value are left
/// out entirely; building never fails.
///
/// # Examples
///
/// ```
/// use chrono::{TimeZone, Utc};
/// use wns::{build_request, ObservationRecord, UnitSystem, UploaderConfig};
///
/// let config = UploaderConfig::builder().station("12345").api_key("ABCDE").build()?;
/// let record = ObservationRecord::new(
///     Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 0).unwrap(),
///     UnitSystem::Metric,
/// )
/// .with("outTemp", 20.0);
///
/// let request = build_request(&record, &config);
/// assert!(request.as_str().contains("?station=12345&api_key=ABCDE&"));
/// assert_eq!(request.param("T2AKT_").as_deref(), Some("20.0"));
/// assert_eq!(request.param("LFAKT_"), None);
/// # Ok::<(), wns::ConfigError>(())
/// ```
pub fn build_request(record: &ObservationRecord, config: &UploaderConfig) -> UploadRequest {
    let record = record.with_tendencies();
    let date_time = record.date_time();

    let mut url = config.server_url().clone();
    {
        let mut query = url.query_pairs_mut();
        query
            .append_pair("station", config.station())
            .append_pair("api_key", config.api_key())
            .append_pair("TMPVER", TEMPLATE_VERSION)
            .append_pair("WSOVER", config.software())
            .append_pair("ZEIT__", &date_time.format("%H:%M").to_string())
            .append_pair("DATUM_", &date_time.format("%d.%m.%Y").to_string())
            .append_pair("UTCDIF", "0");

        for (parameter, source) in config.fields().active() {
            if let Some(value) = resolve_value(&record, parameter, source) {
                query.append_pair(parameter.name, &value);
            }
        }
    }

    UploadRequest { url }
}

fn resolve_value(
    record: &ObservationRecord,
    parameter: &Parameter,
    source: &SourceField,
) -> Option<String> {
    let Some(value) = record.get(source.as_str()) else {
        debug!(
            "{} omitted: '{}' is not in the record",
            parameter.name, source
        );
        return None;
    };

    let converted = match parameter.format {
        ValueFormat::Date => value,
        ValueFormat::Decimals(_) => parameter
            .quantity
            .to_destination(value, record.unit_system()),
    };

    let formatted = parameter.format_value(converted);
    if formatted.is_none() {
        warn!(
            "{} omitted: '{}' has an unusable value {}",
            parameter.name, source, value
        );
    }
    formatted
}
