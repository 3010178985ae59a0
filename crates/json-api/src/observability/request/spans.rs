//! Route normalisation for span names and metric labels.

use uuid::Uuid;

/// Session tokens are 32 random bytes, hex encoded.
const SESSION_TOKEN_HEX_LEN: usize = 64;

/// Replace identifier segments so spans and metrics never carry secrets and
/// stay low-cardinality.
pub(super) fn normalise_route(path: &str) -> String {
    if path == "/" {
        return "/".to_owned();
    }

    let segments: Vec<&str> = path
        .trim_start_matches('/')
        .split('/')
        .map(|segment| {
            if Uuid::parse_str(segment).is_ok() {
                "{uuid}"
            } else if is_session_token(segment) {
                "{token}"
            } else {
                segment
            }
        })
        .collect();

    format!("/{}", segments.join("/"))
}

fn is_session_token(segment: &str) -> bool {
    segment.len() == SESSION_TOKEN_HEX_LEN && segment.bytes().all(|byte| byte.is_ascii_hexdigit())
}
