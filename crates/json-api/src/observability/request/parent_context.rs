//! Parent trace context extraction from HTTP headers.

use opentelemetry::{
    Context, global,
    propagation::{Extractor, TextMapPropagator},
    trace::TraceContextExt as _,
};
use salvo::http::{HeaderMap, HeaderName};

pub(super) fn extract_parent_context(headers: &HeaderMap) -> Option<Context> {
    global::get_text_map_propagator(|propagator| extract_with(propagator, headers))
}

fn extract_with(propagator: &dyn TextMapPropagator, headers: &HeaderMap) -> Option<Context> {
    // A fresh base context keeps requests without trace headers from joining
    // whatever span happens to be active in-process.
    let context = propagator.extract_with_context(&Context::new(), &HeaderExtractor(headers));

    context
        .span()
        .span_context()
        .is_valid()
        .then_some(context)
}

#[derive(Debug)]
struct HeaderExtractor<'a>(&'a HeaderMap);

impl Extractor for HeaderExtractor<'_> {
    fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key)?.to_str().ok()
    }

    fn keys(&self) -> Vec<&str> {
        self.0.keys().map(HeaderName::as_str).collect()
    }
}

#[cfg(test)]
mod tests {
    use opentelemetry_sdk::propagation::TraceContextPropagator;
    use salvo::http::header::HeaderValue;

    use super::*;

    #[test]
    fn valid_traceparent_yields_parent() {
        let mut headers = HeaderMap::new();

        headers.insert(
            "traceparent",
            HeaderValue::from_static("00-4bf92f3577b34da6a3ce929d0e0e4736-00f067aa0ba902b7-01"),
        );

        assert!(
            extract_with(&TraceContextPropagator::new(), &headers).is_some(),
            "expected parent context"
        );
    }

    #[test]
    fn missing_or_malformed_traceparent_is_ignored() {
        let mut headers = HeaderMap::new();

        assert!(
            extract_with(&TraceContextPropagator::new(), &headers).is_none(),
            "no header"
        );

        headers.insert("traceparent", HeaderValue::from_static("garbage"));

        assert!(
            extract_with(&TraceContextPropagator::new(), &headers).is_none(),
            "malformed header"
        );
    }
}
