//! Header rules shared by the director, the interceptor and HIT replay.

use std::net::IpAddr;

use http::header::{self, HeaderMap, HeaderName, HeaderValue};
use http::StatusCode;

/// Hop-by-hop headers (RFC 9110 §7.6.1). A proxy never forwards these.
const HOP_BY_HOP: [HeaderName; 7] = [
    header::CONNECTION,
    HeaderName::from_static("keep-alive"),
    HeaderName::from_static("proxy-connection"),
    header::TE,
    header::TRAILER,
    header::TRANSFER_ENCODING,
    header::UPGRADE,
];

/// Removes hop-by-hop headers, including any header named in `Connection`.
pub(super) fn strip_hop_by_hop(headers: &mut HeaderMap) {
    for name in connection_tokens(headers) {
        headers.remove(name);
    }
    for name in &HOP_BY_HOP {
        headers.remove(name);
    }
}

/// Copies stored headers onto a HIT response.
///
/// Values of a repeated header keep their order. `Connection` and
/// `Transfer-Encoding` belonged to the original origin connection and are
/// never replayed.
pub(super) fn copy_replayable(from: &HeaderMap, to: &mut HeaderMap) {
    for (name, value) in from {
        if *name == header::CONNECTION || *name == header::TRANSFER_ENCODING {
            continue;
        }
        to.append(name.clone(), value.clone());
    }
}

/// Appends the client address to `X-Forwarded-For`, keeping earlier hops.
pub(super) fn append_forwarded_for(headers: &mut HeaderMap, client_ip: IpAddr) {
    const X_FORWARDED_FOR: HeaderName = HeaderName::from_static("x-forwarded-for");

    let prior: Vec<&str> = headers
        .get_all(&X_FORWARDED_FOR)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .collect();

    let value = if prior.is_empty() {
        client_ip.to_string()
    } else {
        format!("{}, {}", prior.join(", "), client_ip)
    };

    if let Ok(value) = HeaderValue::from_str(&value) {
        headers.insert(X_FORWARDED_FOR, value);
    }
}

/// Sets `Content-Length` to the length of the body actually written.
///
/// 204 never carries a length; 304 keeps whatever the origin sent.
pub(super) fn set_content_length(headers: &mut HeaderMap, status: StatusCode, len: usize) {
    match status {
        StatusCode::NO_CONTENT => {
            headers.remove(header::CONTENT_LENGTH);
        }
        StatusCode::NOT_MODIFIED => {}
        _ => {
            headers.insert(header::CONTENT_LENGTH, HeaderValue::from(len));
        }
    }
}

fn connection_tokens(headers: &HeaderMap) -> Vec<HeaderName> {
    headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .filter_map(|token| {
            let token = token.trim().trim_matches(|c| c == '"' || c == '\'');
            if token.is_empty() {
                None
            } else {
                HeaderName::from_bytes(token.to_ascii_lowercase().as_bytes()).ok()
            }
        })
        .collect()
}
