pub mod error;

use reqwest::StatusCode;

/// What happened to a request that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// WNS accepted the upload with this status.
    Sent { status: StatusCode },
    /// `skip_upload` is set; nothing went over the network.
    Skipped,
}
