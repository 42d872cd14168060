use bytes::Bytes;
use http::{header, HeaderValue, Response, StatusCode};
use http_body_util::Full;

/// Fully buffered response, the only body type hoard ever writes to clients.
pub type HttpResponse = Response<Full<Bytes>>;

const SERVER: &str = "hoard/0.1.0";

/// Builds a response with a binary body and an exact Content-Length.
pub fn response(status: StatusCode, content_type: &'static str, body: Bytes) -> HttpResponse {
    let len = body.len();
    let mut resp = Response::new(Full::new(body));
    *resp.status_mut() = status;

    let headers = resp.headers_mut();
    headers.insert(header::SERVER, HeaderValue::from_static(SERVER));
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(content_type));
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(len));
    resp
}

/// Plain-text helper for the canned error pages.
fn text_response(status: StatusCode, body: &'static str) -> HttpResponse {
    response(
        status,
        "text/plain; charset=utf-8",
        Bytes::from_static(body.as_bytes()),
    )
}

pub fn bad_gateway() -> HttpResponse {
    text_response(StatusCode::BAD_GATEWAY, "502 Bad Gateway\n")
}

pub fn bad_request() -> HttpResponse {
    text_response(StatusCode::BAD_REQUEST, "400 Bad Request\n")
}
