//! Optional OpenTelemetry bridging around the executor's per-request span.
//!
//! A tracing span is created for every attempt regardless of this module —
//! see `request_span`/`record_outcome`, used from `client.rs`. The `otel`
//! Cargo feature only adds the exporter glue an application wires up to
//! consume those spans, plus (here) propagation of the current trace
//! context onto the outgoing request as a W3C `traceparent` header.

use crate::headers::HeaderMap;
use tracing::Span;

/// Build the span every request execution runs inside of.
#[must_use]
pub fn request_span(method: &str, url: &str) -> Span {
    let stripped = url.split('?').next().unwrap_or(url);
    tracing::info_span!(
        "http_request",
        "otel.kind" = "client",
        "http.method" = method,
        "http.url" = stripped,
        "http.status_code" = tracing::field::Empty,
        "error" = tracing::field::Empty,
    )
}

/// Record the outcome of an attempt onto its span once it completes.
pub fn record_outcome(span: &Span, status: Option<u16>, failed: bool) {
    if let Some(status) = status {
        span.record("http.status_code", status);
    }
    span.record("error", failed);
}

#[cfg(feature = "otel")]
struct HeaderInjector<'a>(&'a mut HeaderMap);

#[cfg(feature = "otel")]
impl opentelemetry::propagation::Injector for HeaderInjector<'_> {
    fn set(&mut self, key: &str, value: String) {
        self.0.set(key.to_string(), value);
    }
}

/// Inject the current span's trace context onto `headers` as `traceparent`
/// (and `tracestate` if present), so a downstream service can continue the
/// same trace. No-op if the current span is not attached to an OTel
/// context (e.g. no subscriber layer installed).
#[cfg(feature = "otel")]
pub fn inject_current_span(headers: &mut HeaderMap) {
    use opentelemetry::propagation::TextMapPropagator;
    use opentelemetry_sdk::propagation::TraceContextPropagator;
    use tracing_opentelemetry::OpenTelemetrySpanExt;

    let context = Span::current().context();
    TraceContextPropagator::new().inject_context(&context, &mut HeaderInjector(headers));
}

#[cfg(not(feature = "otel"))]
pub fn inject_current_span(_headers: &mut HeaderMap) {}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn request_span_strips_query_string() {
        let span = request_span("GET", "https://example.com/x?token=secret");
        assert!(!span.is_disabled());
    }

    #[test]
    fn inject_current_span_is_a_harmless_no_op_without_a_live_context() {
        let mut headers = HeaderMap::new();
        inject_current_span(&mut headers);
        assert!(!headers.contains("traceparent") || cfg!(feature = "otel"));
    }
}
