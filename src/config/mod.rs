pub mod error;
pub mod site_config;
pub mod uploader_config;
