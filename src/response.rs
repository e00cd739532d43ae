use crate::error::FormatError;
use crate::exception::LoggableError;
use crate::normalizer::RecordNormalizer;
use serde::Serialize;
use serde_json::{Map, Value};

/// Body and status returned to API clients when a request fails.
///
/// `context` is only present for errors that carry one, and `trace` only
/// when the response is built in debug mode.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorResponse {
    #[serde(skip)]
    pub status: u16,
    pub message: String,
    pub exception: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<Map<String, Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace: Option<Vec<String>>,
}

impl RecordNormalizer {
    /// Build the client-facing description of `error`.
    ///
    /// Unlike log records, the error context stays nested under `context`
    /// and the trace is a list of compacted lines.
    pub fn error_response(&self, error: &dyn LoggableError, debug: bool) -> Result<ErrorResponse, FormatError> {
        let context = error
            .extension_context()
            .map(|fields| self.normalize_fields(fields))
            .transpose()?;

        let trace = if debug {
            Some(self.compactor().stack_trace_array(error.frames(), None, 0))
        } else {
            None
        };

        Ok(ErrorResponse {
            status: error.http_status(),
            message: error.message().into_owned(),
            exception: error.class_name().into_owned(),
            context,
            trace,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FormatterConfig;
    use crate::exception::{CapturedError, ContextError};
    use crate::trace::StackFrame;
    use serde_json::json;

    fn frames() -> Vec<StackFrame> {
        vec![
            StackFrame::new("/srv/api/src/orders.rs", 40),
            StackFrame::new("/vendor/acme/http/a.rs", 1),
            StackFrame::new("/vendor/acme/http/b.rs", 2),
        ]
    }

    #[test]
    fn context_error_with_debug_trace() {
        let normalizer = RecordNormalizer::new(FormatterConfig::default().with_base_path("/srv/api"));
        let error = ContextError::new("Order not found", 404)
            .with_context("orderID", 12i64)
            .with_frames(frames());

        let response = normalizer.error_response(&error, true).unwrap();
        assert_eq!(response.status, 404);
        assert_eq!(
            serde_json::to_value(&response).unwrap(),
            json!({
                "message": "Order not found",
                "exception": "json_log_formatter::exception::ContextError",
                "context": {"orderID": 12},
                "trace": ["/src/orders.rs (40)", "/vendor/acme/http (2 frames)"],
            })
        );
    }

    #[test]
    fn plain_error_without_debug() {
        let normalizer = RecordNormalizer::new(FormatterConfig::default());
        let error = CapturedError::new("Exception", "boom").with_frames(frames());

        let response = normalizer.error_response(&error, false).unwrap();
        assert_eq!(response.status, 500);
        assert_eq!(
            serde_json::to_value(&response).unwrap(),
            json!({"message": "boom", "exception": "Exception"})
        );
    }
}
