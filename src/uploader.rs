//! This module provides the main entry point of the crate: the [`Uploader`], which
//! turns observation records into Wetternetz Sachsen requests and delivers them.

use crate::config::error::ConfigError;
use crate::config::site_config::SiteConfig;
use crate::config::uploader_config::UploaderConfig;
use crate::delivery::error::UploadError;
use crate::delivery::Delivery;
use crate::request::upload_request::{build_request, UploadRequest};
use crate::service::sink::RecordSink;
use crate::types::record::ObservationRecord;
use log::{debug, info, warn};
use reqwest::Client;
use std::sync::Arc;

/// Uploads observation records to Wetternetz Sachsen.
///
/// Every call is independent: [`Uploader::upload`] builds the request for one
/// record from the immutable [`UploaderConfig`] and performs a single HTTP GET.
/// The uploader never retries; scheduling and retries belong to whoever feeds it
/// records (see [`crate::WnsService`]).
///
/// Cloning is cheap, clones share the configuration and the HTTP connection pool.
///
/// # Examples
///
/// ```rust
/// # use wns::{ObservationRecord, UnitSystem, Uploader, UploaderConfig, WnsError, Delivery};
/// # use chrono::Utc;
/// # #[tokio::main]
/// # async fn main() -> Result<(), WnsError> {
/// let config = UploaderConfig::builder()
///     .station("12345")
///     .api_key("ABCDE")
///     .skip_upload(true)
///     .build()?;
/// let uploader = Uploader::new(config)?;
///
/// let record = ObservationRecord::new(Utc::now(), UnitSystem::Metric).with("outTemp", 20.0);
/// let delivery = uploader.upload(&record).await?;
/// assert_eq!(delivery, Delivery::Skipped);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Uploader {
    config: Arc<UploaderConfig>,
    client: Client,
}

impl Uploader {
    /// Creates an uploader with an HTTP client bounded by the configured timeout.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::HttpClient`] if the HTTP client cannot be initialised.
    pub fn new(config: UploaderConfig) -> Result<Self, ConfigError> {
        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(ConfigError::HttpClient)?;
        info!("Station {}", config.station());
        info!("Data will be uploaded to {}", config.server_url());
        Ok(Self {
            config: Arc::new(config),
            client,
        })
    }

    /// Creates an uploader from the `[StdRESTful.Wns]` section of the host configuration.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the station or API key is missing, a parameter
    /// override is unknown, or the server URL is invalid.
    pub fn from_site_config(site: &SiteConfig) -> Result<Self, ConfigError> {
        Self::new(site.uploader_config()?)
    }

    pub fn config(&self) -> &UploaderConfig {
        &self.config
    }

    /// Builds the request for `record`. See [`build_request`].
    pub fn build_request(&self, record: &ObservationRecord) -> UploadRequest {
        build_request(record, &self.config)
    }

    /// Delivers an already built request.
    ///
    /// With `log_url` set, the URL is logged first, also when the upload is skipped.
    /// With `skip_upload` set, nothing is sent and [`Delivery::Skipped`] is returned.
    ///
    /// # Errors
    ///
    /// * [`UploadError::Network`] if the connection fails or times out.
    /// * [`UploadError::Rejected`] if WNS answers with anything but a 2xx status.
    pub async fn send(&self, request: &UploadRequest) -> Result<Delivery, UploadError> {
        if self.config.log_url() {
            info!("url {}", request);
        }
        if self.config.skip_upload() {
            debug!("skip_upload is set, not posting to {}", self.endpoint());
            return Ok(Delivery::Skipped);
        }

        let response = self
            .client
            .get(request.url().clone())
            .send()
            .await
            .map_err(|e| UploadError::Network {
                endpoint: self.endpoint(),
                // the request URL carries the api_key
                source: e.without_url(),
            })?;

        let status = response.status();
        if !status.is_success() {
            // the body only ends up in the log
            let body = response.text().await.unwrap_or_default();
            warn!(
                "WNS rejected upload for station {} with {}: {}",
                self.config.station(),
                status,
                body.trim()
            );
            return Err(UploadError::Rejected {
                endpoint: self.endpoint(),
                status,
                body,
            });
        }

        debug!("WNS accepted upload with {}", status);
        Ok(Delivery::Sent { status })
    }

    /// Builds the request for `record` and delivers it.
    pub async fn upload(&self, record: &ObservationRecord) -> Result<Delivery, UploadError> {
        let request = self.build_request(record);
        self.send(&request).await
    }

    /// The server URL without the query, safe to log.
    fn endpoint(&self) -> String {
        self.config.server_url().as_str().to_string()
    }
}

impl RecordSink for Uploader {
    async fn accept(&self, record: &ObservationRecord) -> Result<Delivery, UploadError> {
        self.upload(record).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::unit_system::UnitSystem;
    use chrono::Utc;
    use log::{Level, LevelFilter, Log, Metadata, Record};
    use std::sync::{Mutex, Once};
    use std::time::Duration;

    struct CaptureLogger {
        lines: Mutex<Vec<String>>,
    }

    impl Log for CaptureLogger {
        fn enabled(&self, metadata: &Metadata) -> bool {
            metadata.level() <= Level::Info
        }

        fn log(&self, record: &Record) {
            if self.enabled(record.metadata()) {
                if let Ok(mut lines) = self.lines.lock() {
                    lines.push(record.args().to_string());
                }
            }
        }

        fn flush(&self) {}
    }

    static LOGGER: CaptureLogger = CaptureLogger {
        lines: Mutex::new(Vec::new()),
    };
    static INIT: Once = Once::new();

    fn captured_lines() -> Vec<String> {
        INIT.call_once(|| {
            let _ = log::set_logger(&LOGGER);
            log::set_max_level(LevelFilter::Info);
        });
        LOGGER.lines.lock().map(|l| l.clone()).unwrap_or_default()
    }

    fn record() -> ObservationRecord {
        ObservationRecord::new(Utc::now(), UnitSystem::Metric).with("outTemp", 20.0)
    }

    #[tokio::test]
    async fn test_skip_upload_does_not_touch_the_network() -> Result<(), Box<dyn std::error::Error>> {
        // nothing listens on port 9, a real request would fail
        let config = UploaderConfig::builder()
            .station("skip-station")
            .api_key("ABCDE")
            .server_url("http://127.0.0.1:9/get_daten_23.php")
            .skip_upload(true)
            .build()?;
        let uploader = Uploader::new(config)?;

        assert_eq!(uploader.upload(&record()).await?, Delivery::Skipped);
        Ok(())
    }

    #[tokio::test]
    async fn test_log_url_is_honoured_when_skipping() -> Result<(), Box<dyn std::error::Error>> {
        captured_lines();
        let config = UploaderConfig::builder()
            .station("log-url-station")
            .api_key("ABCDE")
            .skip_upload(true)
            .log_url(true)
            .build()?;
        let uploader = Uploader::new(config)?;
        let request = uploader.build_request(&record());

        uploader.send(&request).await?;

        let expected = format!("url {}", request);
        assert!(captured_lines().iter().any(|line| line == &expected));
        Ok(())
    }

    #[tokio::test]
    async fn test_url_not_logged_by_default() -> Result<(), Box<dyn std::error::Error>> {
        captured_lines();
        let config = UploaderConfig::builder()
            .station("quiet-station")
            .api_key("ABCDE")
            .skip_upload(true)
            .build()?;
        let uploader = Uploader::new(config)?;

        uploader.upload(&record()).await?;

        assert!(!captured_lines()
            .iter()
            .any(|line| line.starts_with("url ") && line.contains("quiet-station")));
        Ok(())
    }

    #[tokio::test]
    async fn test_connection_failure_is_a_network_error() -> Result<(), Box<dyn std::error::Error>> {
        let config = UploaderConfig::builder()
            .station("12345")
            .api_key("ABCDE")
            .server_url("http://127.0.0.1:9/get_daten_23.php")
            .timeout(Duration::from_secs(5))
            .build()?;
        let uploader = Uploader::new(config)?;

        let error = uploader.upload(&record()).await.unwrap_err();
        assert!(matches!(error, UploadError::Network { .. }));
        assert!(error.is_transient());
        // the credential stays out of the whole error chain
        let mut cause: Option<&dyn std::error::Error> = Some(&error);
        let mut depth = 0;
        while let Some(current) = cause {
            assert!(!current.to_string().contains("ABCDE"), "{current}");
            assert!(!format!("{current:?}").contains("ABCDE"), "{current:?}");
            cause = current.source();
            depth += 1;
        }
        assert!(depth > 1);
        Ok(())
    }
}
