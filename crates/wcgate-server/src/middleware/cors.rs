//! CORS headers middleware.
//!
//! Adds the CORS headers browser clients need to every response:
//! - Access-Control-Allow-Origin
//! - Access-Control-Allow-Methods
//! - Access-Control-Allow-Headers

use axum::http::HeaderValue;
use axum::http::header::{
    ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS, ACCESS_CONTROL_ALLOW_ORIGIN,
};
use tower_http::set_header::SetResponseHeaderLayer;

/// Methods the gateway forwards.
pub(crate) const ALLOWED_METHODS: &str = "GET, POST";

/// Request headers browsers may send.
const ALLOWED_HEADERS: &str = "Origin, X-Requested-With, Content-Type, Accept";

/// Create layer that adds Access-Control-Allow-Origin header.
pub(crate) fn allow_origin_layer(origin: HeaderValue) -> SetResponseHeaderLayer<HeaderValue> {
    SetResponseHeaderLayer::overriding(ACCESS_CONTROL_ALLOW_ORIGIN, origin)
}

/// Create layer that adds Access-Control-Allow-Methods header.
pub(crate) fn allow_methods_layer() -> SetResponseHeaderLayer<HeaderValue> {
    SetResponseHeaderLayer::overriding(
        ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static(ALLOWED_METHODS),
    )
}

/// Create layer that adds Access-Control-Allow-Headers header.
pub(crate) fn allow_headers_layer() -> SetResponseHeaderLayer<HeaderValue> {
    SetResponseHeaderLayer::overriding(
        ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static(ALLOWED_HEADERS),
    )
}
