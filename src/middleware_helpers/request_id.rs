use crate::tracing::RequestId;
use axum::{
    extract::Request,
    http::{header::HeaderName, HeaderValue},
    middleware::Next,
    response::Response,
};

/// Header name for the request ID
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Middleware to add request ID to every request
///
/// An incoming `x-request-id` is kept when it is a valid header value;
/// otherwise a fresh UUID is generated. The id is echoed on the response.
pub async fn request_id_middleware(mut request: Request, next: Next) -> Response {
    let (request_id, header_value) = request
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.trim().is_empty())
        .map(|v| (RequestId::new(v), HeaderValue::from_str(v).ok()))
        .and_then(|(id, value)| value.map(|value| (id, value)))
        .unwrap_or_else(|| {
            let id = RequestId::default();
            // uuid strings are always valid header values
            let value = HeaderValue::from_str(id.as_str()).unwrap_or(HeaderValue::from_static("unknown"));
            (id, value)
        });

    let header_name = HeaderName::from_static(REQUEST_ID_HEADER);
    request
        .headers_mut()
        .insert(header_name.clone(), header_value.clone());
    request.extensions_mut().insert(request_id.clone());

    // the trace layer's `http.request` span picks the id up from the extension
    let mut response = crate::tracing::scope_request_id(request_id, next.run(request)).await;

    response.headers_mut().insert(header_name, header_value);
    response
}
