//! An exception consumer that logs.

use hermes_core::{ExceptionConsumer, Failure};
use tracing::error;

/// Logs every caught failure as one `error` event whose message is the
/// failure message, with an `exception_type` field.
///
/// ```
/// use hermes_server::Server;
/// use hermes_telemetry::LoggingExceptionConsumer;
///
/// let server = Server::new();
/// server.add_exception_consumer(LoggingExceptionConsumer);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingExceptionConsumer;

impl ExceptionConsumer for LoggingExceptionConsumer {
    fn accept(&self, failure: &Failure) {
        error!(
            exception_type = failure.type_name(),
            message = %failure.message()
        );
    }
}
