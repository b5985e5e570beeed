//! Upload weather station archive records to [Wetternetz Sachsen](http://wetternetz-sachsen.de).
//!
//! Each record is mapped onto the fixed WNS parameter set, converted into the
//! units WNS expects and sent as a single URL-encoded GET request. The
//! [`Uploader`] handles one record at a time; [`WnsService`] runs it behind a
//! queue the way a host application's REST thread would.

mod config;
mod delivery;
mod error;
mod request;
mod service;
mod types;
mod uploader;

pub use error::WnsError;
pub use uploader::Uploader;

pub use config::error::ConfigError;
pub use config::site_config::SiteConfig;
pub use config::uploader_config::{
    FieldMapping, SourceField, UploaderConfig, DEFAULT_SERVER_URL, DEFAULT_SOFTWARE,
    DEFAULT_TIMEOUT,
};

pub use delivery::error::UploadError;
pub use delivery::Delivery;

pub use request::upload_request::{build_request, UploadRequest, TEMPLATE_VERSION};

pub use service::history::ArchiveHistory;
pub use service::sink::RecordSink;
pub use service::worker::{DeliveryOptions, ServiceStopped, WnsService};

pub use types::parameter::{parameter, Parameter, ValueFormat, PARAMETERS};
pub use types::record::ObservationRecord;
pub use types::unit_system::{Quantity, UnitSystem, UnknownUnitSystem};
