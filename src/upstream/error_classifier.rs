// Maps reqwest failures to a short kind and a user-facing message
use reqwest::Error;

/// Returns (error kind, English message)
pub fn classify_request_error(error: &Error) -> (&'static str, &'static str) {
    if error.is_timeout() {
        ("timeout_error", "Upstream request timed out")
    } else if error.is_connect() {
        ("connection_error", "Could not connect to upstream service")
    } else if error.is_decode() {
        ("decode_error", "Upstream returned an unreadable response")
    } else if error.is_body() {
        ("body_error", "Upstream response body was interrupted")
    } else if error.is_status() {
        ("status_error", "Upstream rejected the request")
    } else {
        ("unknown_error", "Unknown upstream error")
    }
}
