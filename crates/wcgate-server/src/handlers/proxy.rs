//! Signing proxy endpoint.
//!
//! Every path lands here; behaviour is chosen by method:
//! - `GET`: sign query parameters plus protocol parameters, forward.
//! - `POST`: require JSON, sign protocol parameters only, forward the body.
//! - `OPTIONS`: CORS preflight, answered locally.
//! - anything else: 405.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, Method, StatusCode, header};
use axum::response::{IntoResponse, Response};
use wcgate_oauth::{ParameterSet, normalize};

use crate::error::GatewayError;
use crate::resource::validate_resource;
use crate::state::AppState;
use crate::upstream::{UpstreamRequest, UpstreamResponse};

/// Query parameter selecting the upstream path.
const RESOURCE_PARAM: &str = "resource";

/// Handle any request.
pub(crate) async fn dispatch(
    State(state): State<Arc<AppState>>,
    method: Method,
    Query(query): Query<Vec<(String, String)>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, GatewayError> {
    match method {
        Method::GET => get(&state, query).await,
        Method::POST => post(&state, &query, &headers, &body).await,
        Method::OPTIONS => Ok(json_response(StatusCode::OK, Vec::new())),
        other => Err(GatewayError::MethodNotSupported(other)),
    }
}

/// Sign and forward a GET, carrying the caller's filters along.
async fn get(state: &AppState, query: Vec<(String, String)>) -> Result<Response, GatewayError> {
    let resource = resource_param(&query)?.to_owned();
    let forwarded = forwarded_parameters(query);

    let url = state.resource_url(&resource);
    let signed = state.authorize("GET", &url, &forwarded)?;

    let target = if forwarded.is_empty() {
        url
    } else {
        format!("{url}?{}", normalize(&forwarded))
    };

    tracing::info!(method = "GET", resource = %resource, "Forwarding request");
    relay(
        state,
        UpstreamRequest::Get {
            url: target,
            authorization: signed.header,
        },
    )
    .await
}

/// Sign and forward a JSON POST. Only protocol parameters are signed.
async fn post(
    state: &AppState,
    query: &[(String, String)],
    headers: &HeaderMap,
    body: &[u8],
) -> Result<Response, GatewayError> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    if !content_type.to_ascii_lowercase().contains("application/json") {
        let shown = if content_type.is_empty() {
            "(none)"
        } else {
            content_type
        };
        return Err(GatewayError::UnsupportedContentType(shown.to_owned()));
    }

    let resource = resource_param(query)?;
    let payload: serde_json::Value =
        serde_json::from_slice(body).map_err(|e| GatewayError::InvalidBody(e.to_string()))?;
    let body = serde_json::to_vec(&payload).map_err(|e| GatewayError::Internal(e.to_string()))?;

    let url = state.resource_url(resource);
    let signed = state.authorize("POST", &url, &ParameterSet::new())?;

    tracing::info!(method = "POST", resource = %resource, "Forwarding request");
    relay(
        state,
        UpstreamRequest::Post {
            url,
            authorization: signed.header,
            body,
        },
    )
    .await
}

/// Extract and validate the `resource` query parameter (first occurrence).
fn resource_param(query: &[(String, String)]) -> Result<&str, GatewayError> {
    let resource = query
        .iter()
        .find(|(k, _)| k == RESOURCE_PARAM)
        .map(|(_, v)| v.as_str())
        .ok_or(GatewayError::MissingResource)?;
    validate_resource(resource)
}

/// Query parameters forwarded to (and signed for) the upstream API.
///
/// Drops `resource` and every parameter with an empty value. For repeated
/// keys the last occurrence wins.
pub fn forwarded_parameters<I>(query: I) -> ParameterSet
where
    I: IntoIterator<Item = (String, String)>,
{
    query
        .into_iter()
        .filter(|(k, v)| k != RESOURCE_PARAM && !v.is_empty())
        .collect()
}

/// Perform the upstream call and shape its response.
async fn relay(state: &AppState, request: UpstreamRequest) -> Result<Response, GatewayError> {
    let upstream = Arc::clone(&state.upstream);
    let UpstreamResponse { status, body } =
        tokio::task::spawn_blocking(move || upstream.send(&request))
            .await
            .map_err(|e| GatewayError::Internal(format!("upstream task failed: {e}")))??;

    let status = StatusCode::from_u16(status)
        .map_err(|e| GatewayError::Internal(format!("invalid upstream status: {e}")))?;
    tracing::info!(status = status.as_u16(), "Upstream responded");

    // JSON is re-serialized, anything else passes through untouched
    let body = if let Ok(json) = serde_json::from_slice::<serde_json::Value>(&body) {
        serde_json::to_vec(&json).map_err(|e| GatewayError::Internal(e.to_string()))?
    } else {
        tracing::debug!(status = status.as_u16(), "Upstream body is not JSON");
        body
    };

    Ok(json_response(status, body))
}

/// Response tagged `Content-Type: application/json`, whatever the body holds.
fn json_response(status: StatusCode, body: Vec<u8>) -> Response {
    (status, [(header::CONTENT_TYPE, "application/json")], body).into_response()
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use axum::body::Body;
    use axum::http::{HeaderValue, Request};
    use pretty_assertions::assert_eq;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use tower::ServiceExt;
    use wcgate_oauth::{Credentials, NONCE_LENGTH, OAuthSigner, generate_nonce};

    use super::*;
    use crate::app::create_router;
    use crate::upstream::{Upstream, UpstreamError};

    const API_ROOT: &str = "https://shop.example.com/wp-json/wc/v3";
    const NONCE_SEED: u64 = 17;
    const TIMESTAMP: &str = "1700000000";

    /// Fake upstream that records every call and answers with a canned response.
    struct RecordingUpstream {
        requests: Mutex<Vec<UpstreamRequest>>,
        response: UpstreamResponse,
    }

    impl RecordingUpstream {
        fn answering(status: u16, body: &str) -> Arc<Self> {
            Arc::new(Self {
                requests: Mutex::new(Vec::new()),
                response: UpstreamResponse {
                    status,
                    body: body.as_bytes().to_vec(),
                },
            })
        }

        fn requests(&self) -> Vec<UpstreamRequest> {
            self.requests.lock().unwrap().clone()
        }
    }

    impl Upstream for RecordingUpstream {
        fn send(&self, request: &UpstreamRequest) -> Result<UpstreamResponse, UpstreamError> {
            self.requests.lock().unwrap().push(request.clone());
            Ok(self.response.clone())
        }
    }

    /// Upstream whose connection always fails.
    struct UnreachableUpstream;

    impl Upstream for UnreachableUpstream {
        fn send(&self, _request: &UpstreamRequest) -> Result<UpstreamResponse, UpstreamError> {
            Err(UpstreamError::Transport(ureq::Error::Io(std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                "connection refused",
            ))))
        }
    }

    fn signer() -> OAuthSigner {
        OAuthSigner::new(Credentials::new("ck_test", "cs_test"))
    }

    fn fixed_clock() -> String {
        TIMESTAMP.to_owned()
    }

    /// Router with a seeded nonce source and a frozen clock.
    fn app(upstream: Arc<dyn Upstream>) -> axum::Router {
        create_router(Arc::new(AppState {
            signer: signer(),
            nonces: Mutex::new(StdRng::seed_from_u64(NONCE_SEED)),
            clock: fixed_clock,
            upstream,
            api_root: API_ROOT.to_owned(),
            allowed_origin: HeaderValue::from_static("http://localhost:3000"),
        }))
    }

    fn recording_app(upstream: &Arc<RecordingUpstream>) -> axum::Router {
        app(Arc::clone(upstream) as Arc<dyn Upstream>)
    }

    /// Header the gateway must send for the first request after startup.
    fn expected_authorization(method: &str, url: &str, params: &ParameterSet) -> String {
        let nonce = generate_nonce(&mut StdRng::seed_from_u64(NONCE_SEED), NONCE_LENGTH);
        signer()
            .authorize_with(method, url, params, &nonce, TIMESTAMP)
            .unwrap()
            .header
    }

    async fn send(app: axum::Router, request: Request<Body>) -> (StatusCode, HeaderMap, String) {
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let body = axum::body::to_bytes(response.into_body(), 1024 * 1024)
            .await
            .unwrap();
        (status, headers, String::from_utf8(body.to_vec()).unwrap())
    }

    fn get_request(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn post_request(content_type: Option<&str>, body: &'static str) -> Request<Body> {
        let mut builder = Request::builder()
            .method(Method::POST)
            .uri("/?resource=orders");
        if let Some(content_type) = content_type {
            builder = builder.header(header::CONTENT_TYPE, content_type);
        }
        builder.body(Body::from(body)).unwrap()
    }

    fn assert_cors_headers(headers: &HeaderMap) {
        assert_eq!(
            headers[header::ACCESS_CONTROL_ALLOW_ORIGIN],
            "http://localhost:3000"
        );
        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_METHODS], "GET, POST");
        assert_eq!(
            headers[header::ACCESS_CONTROL_ALLOW_HEADERS],
            "Origin, X-Requested-With, Content-Type, Accept"
        );
    }

    #[tokio::test]
    async fn test_get_drops_reserved_and_empty_parameters() {
        let upstream = RecordingUpstream::answering(200, r#"[{"id": 1}]"#);
        let request = get_request("/?resource=orders&status=&per_page=5");

        let (status, headers, body) = send(recording_app(&upstream), request).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, r#"[{"id":1}]"#);
        assert_eq!(headers[header::CONTENT_TYPE], "application/json");
        assert_cors_headers(&headers);

        let requests = upstream.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].method(), Method::GET);
        assert_eq!(requests[0].url(), format!("{API_ROOT}/orders?per_page=5"));
    }

    #[tokio::test]
    async fn test_get_sends_exact_authorization() {
        let upstream = RecordingUpstream::answering(200, "[]");

        send(recording_app(&upstream), get_request("/?resource=orders&per_page=5")).await;

        // Only per_page plus the protocol parameters are signed
        let expected = expected_authorization(
            "GET",
            &format!("{API_ROOT}/orders"),
            &ParameterSet::new().with("per_page", "5"),
        );
        assert_eq!(upstream.requests()[0].authorization(), expected);
        assert!(expected.contains("oauth_timestamp=\"1700000000\""));
    }

    #[tokio::test]
    async fn test_get_sorts_and_encodes_forwarded_query() {
        let upstream = RecordingUpstream::answering(200, "[]");
        let request = get_request("/?search=blue%20shirt&resource=products&category=12");

        send(recording_app(&upstream), request).await;

        assert_eq!(
            upstream.requests()[0].url(),
            format!("{API_ROOT}/products?category=12&search=blue%20shirt")
        );
    }

    #[tokio::test]
    async fn test_get_without_filters_has_no_query_string() {
        let upstream = RecordingUpstream::answering(200, "[]");

        send(recording_app(&upstream), get_request("/?resource=orders/123&status=")).await;

        let requests = upstream.requests();
        assert_eq!(requests[0].url(), format!("{API_ROOT}/orders/123"));
        assert_eq!(
            requests[0].authorization(),
            expected_authorization(
                "GET",
                &format!("{API_ROOT}/orders/123"),
                &ParameterSet::new(),
            )
        );
    }

    #[tokio::test]
    async fn test_get_relays_upstream_error_status() {
        let upstream = RecordingUpstream::answering(
            401,
            r#"{ "code": "woocommerce_rest_cannot_view", "data": { "status": 401 } }"#,
        );

        let (status, _, body) = send(app(upstream), get_request("/?resource=orders")).await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(
            body,
            r#"{"code":"woocommerce_rest_cannot_view","data":{"status":401}}"#
        );
    }

    #[tokio::test]
    async fn test_get_passes_non_json_body_through() {
        let upstream = RecordingUpstream::answering(502, "<html>Bad Gateway</html>");

        let (status, _, body) = send(app(upstream), get_request("/?resource=orders")).await;

        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body, "<html>Bad Gateway</html>");
    }

    #[tokio::test]
    async fn test_get_missing_resource() {
        let upstream = RecordingUpstream::answering(200, "[]");

        let (status, _, _) = send(recording_app(&upstream), get_request("/?per_page=5")).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(upstream.requests().is_empty());
    }

    #[tokio::test]
    async fn test_get_rejects_path_traversal() {
        let upstream = RecordingUpstream::answering(200, "[]");
        let request = get_request("/?resource=../../wp/v2/users");

        let (status, _, body) = send(recording_app(&upstream), request).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body.contains("Invalid resource"));
        assert!(upstream.requests().is_empty());
    }

    #[tokio::test]
    async fn test_unreachable_upstream_is_bad_gateway() {
        let request = get_request("/?resource=orders");

        let (status, _, _) = send(app(Arc::new(UnreachableUpstream)), request).await;

        assert_eq!(status, StatusCode::BAD_GATEWAY);
    }

    #[tokio::test]
    async fn test_post_forwards_json_body() {
        let upstream = RecordingUpstream::answering(201, r#"{"id": 727}"#);
        let payload = r#"{ "status": "processing", "set_paid": true }"#;
        let request = Request::builder()
            .method(Method::POST)
            .uri("/?resource=orders&ignored=1")
            .header(header::CONTENT_TYPE, "application/json; charset=utf-8")
            .body(Body::from(payload))
            .unwrap();

        let (status, headers, body) = send(recording_app(&upstream), request).await;

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body, r#"{"id":727}"#);
        assert_cors_headers(&headers);

        let requests = upstream.requests();
        assert_eq!(requests.len(), 1);
        let UpstreamRequest::Post {
            url,
            authorization,
            body,
        } = &requests[0]
        else {
            panic!("expected POST, got {:?}", requests[0]);
        };
        assert_eq!(url, &format!("{API_ROOT}/orders"));
        assert_eq!(
            serde_json::from_slice::<serde_json::Value>(body).unwrap(),
            serde_json::json!({"status": "processing", "set_paid": true})
        );

        // Body and query are not part of the signature
        assert_eq!(
            authorization,
            &expected_authorization("POST", url, &ParameterSet::new())
        );
    }

    #[tokio::test]
    async fn test_post_content_type_is_case_insensitive() {
        let upstream = RecordingUpstream::answering(201, "{}");
        let request = post_request(Some("Application/JSON"), r#"{"status":"pending"}"#);

        let (status, _, _) = send(recording_app(&upstream), request).await;

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(upstream.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_post_wrong_content_type() {
        let upstream = RecordingUpstream::answering(200, "{}");

        let request = post_request(Some("text/plain"), "hello");

        let (status, _, body) = send(recording_app(&upstream), request).await;

        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
        assert!(body.contains("text/plain"));
        assert!(upstream.requests().is_empty());
    }

    #[tokio::test]
    async fn test_post_without_content_type() {
        let upstream = RecordingUpstream::answering(200, "{}");

        let (status, _, body) = send(recording_app(&upstream), post_request(None, "{}")).await;

        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
        assert!(body.contains("(none)"));
        assert!(upstream.requests().is_empty());
    }

    #[tokio::test]
    async fn test_post_malformed_json() {
        let upstream = RecordingUpstream::answering(200, "{}");
        let request = post_request(Some("application/json"), "{\"status\":");

        let (status, _, _) = send(recording_app(&upstream), request).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(upstream.requests().is_empty());
    }

    #[tokio::test]
    async fn test_options_preflight() {
        let upstream = RecordingUpstream::answering(200, "{}");
        let request = Request::builder()
            .method(Method::OPTIONS)
            .uri("/?resource=orders")
            .body(Body::empty())
            .unwrap();

        let (status, headers, body) = send(recording_app(&upstream), request).await;

        assert_eq!(status, StatusCode::OK);
        assert!(body.is_empty());
        assert_eq!(headers[header::CONTENT_TYPE], "application/json");
        assert_cors_headers(&headers);
        assert!(upstream.requests().is_empty());
    }

    #[tokio::test]
    async fn test_unsupported_method() {
        let upstream = RecordingUpstream::answering(200, "{}");
        let request = Request::builder()
            .method(Method::DELETE)
            .uri("/?resource=orders/1")
            .body(Body::empty())
            .unwrap();

        let (status, headers, body) = send(recording_app(&upstream), request).await;

        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(headers[header::ALLOW], "GET, POST");
        assert_eq!(body, "Method DELETE not allowed.");
        assert!(upstream.requests().is_empty());
    }

    #[test]
    fn test_forwarded_parameters_last_duplicate_wins() {
        let params = forwarded_parameters(vec![
            ("page".to_owned(), "1".to_owned()),
            ("resource".to_owned(), "orders".to_owned()),
            ("page".to_owned(), "2".to_owned()),
            ("status".to_owned(), String::new()),
        ]);

        assert_eq!(params.len(), 1);
        assert_eq!(params.get("page"), Some("2"));
    }
}
