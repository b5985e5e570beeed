use crate::delivery::error::UploadError;
use crate::delivery::Delivery;
use crate::types::record::ObservationRecord;
use std::future::Future;

/// Anything that accepts finished archive records, one at a time, on the
/// caller's schedule.
///
/// [`crate::Uploader`] is the production sink; [`crate::WnsService`] drives any sink
/// from its queue.
pub trait RecordSink: Send + Sync {
    fn accept(
        &self,
        record: &ObservationRecord,
    ) -> impl Future<Output = Result<Delivery, UploadError>> + Send;
}
