//! Validation of the caller-supplied `resource` path.
//!
//! The value is spliced into the upstream URL, so it is limited to plain path
//! segments: no traversal, no query or fragment, no percent-escapes.

use crate::error::GatewayError;

/// Check that `resource` is one or more `/`-separated segments of
/// `[A-Za-z0-9_.-]`, none empty and none `.` or `..`.
pub fn validate_resource(resource: &str) -> Result<&str, GatewayError> {
    if resource.is_empty() {
        return Err(GatewayError::MissingResource);
    }

    let valid = resource.split('/').all(|segment| {
        !segment.is_empty()
            && segment != "."
            && segment != ".."
            && segment
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'.'))
    });

    if valid {
        Ok(resource)
    } else {
        Err(GatewayError::InvalidResource(resource.to_owned()))
    }
}
