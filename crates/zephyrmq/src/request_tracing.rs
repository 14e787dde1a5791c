use http::Request;
use tower_http::{
    request_id::{MakeRequestId, RequestId},
    trace::MakeSpan,
};
use tracing::{Level, Span};
use uuid::Uuid;

use crate::api::X_REQUEST_ID_HEADER;

/// A `MakeSpan` implementation that attaches the `request_id` to the span.
/// tower-http's own `MakeSpan` does not do this.
#[derive(Debug, Clone)]
pub struct RestMakeSpan {
    level: Level,
}

impl RestMakeSpan {
    /// Create a [tracing span] with a certain [`Level`].
    ///
    /// [tracing span]: https://docs.rs/tracing/latest/tracing/#spans
    #[must_use]
    pub fn new(level: Level) -> Self {
        Self { level }
    }
}

impl<B> MakeSpan<B> for RestMakeSpan {
    fn make_span(&mut self, request: &Request<B>) -> Span {
        macro_rules! make_span {
            ($level:expr) => {
                tracing::span!(
                    $level,
                    "request",
                    method = %request.method(),
                    uri = %request.uri(),
                    version = ?request.version(),
                    request_id = %request
                                .headers()
                                .get(X_REQUEST_ID_HEADER)
                                .and_then(|v| v.to_str().ok())
                                .unwrap_or("MISSING-REQUEST-ID"),
                )
            }
        }
        match self.level {
            Level::TRACE => make_span!(tracing::Level::TRACE),
            Level::DEBUG => make_span!(tracing::Level::DEBUG),
            Level::INFO => make_span!(tracing::Level::INFO),
            Level::WARN => make_span!(tracing::Level::WARN),
            Level::ERROR => make_span!(tracing::Level::ERROR),
        }
    }
}

/// A [`MakeRequestId`] that generates `UUIDv7`s.
#[derive(Debug, Clone, Copy, Default)]
pub struct MakeRequestUuid7;

impl MakeRequestId for MakeRequestUuid7 {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        let request_id = Uuid::now_v7().to_string().parse().unwrap();
        Some(RequestId::new(request_id))
    }
}
