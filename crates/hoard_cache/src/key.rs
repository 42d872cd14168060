use std::collections::BTreeMap;
use std::fmt;

use http::{Method, Request, Uri};
use percent_encoding::percent_decode_str;

/// Normalized identity of a request in the cache.
///
/// Layout:
///   "<METHOD>:<PATH>"                      (no query parameters)
///   "<METHOD>:<PATH>?<name=value&...>"     (parameters present)
///
/// Parameter names are sorted; the values of a repeated parameter keep the
/// order in which the client sent them.
#[derive(Clone, Debug, Hash, Eq, PartialEq, Ord, PartialOrd)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn new(method: &Method, uri: &Uri) -> Self {
        let mut key = format!("{}:{}", method.as_str(), uri.path());

        let params = query_params(uri.query());
        if params.is_empty() {
            return Self(key);
        }

        let mut pairs = Vec::new();
        for (name, values) in &params {
            for value in values {
                pairs.push(format!(
                    "{}={}",
                    escape_component(name),
                    escape_component(value)
                ));
            }
        }

        key.push('?');
        key.push_str(&pairs.join("&"));
        Self(key)
    }

    /// Key of the request as the client sent it.
    pub fn for_request<B>(req: &Request<B>) -> Self {
        Self::new(req.method(), req.uri())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

type RawParams = BTreeMap<Vec<u8>, Vec<Vec<u8>>>;

/// Decodes a query string into name -> values, names in byte order.
///
/// Decoding stays in bytes: escapes that do not form valid UTF-8 must not
/// collapse into one replacement character.
fn query_params(query: Option<&str>) -> RawParams {
    let mut params = RawParams::new();

    let Some(query) = query else {
        return params;
    };

    for pair in query.split('&').filter(|pair| !pair.is_empty()) {
        let (name, value) = pair.split_once('=').unwrap_or((pair, ""));
        params.entry(form_decode(name)).or_default().push(form_decode(value));
    }

    params
}

/// `application/x-www-form-urlencoded` decoding: `+` is a space.
fn form_decode(raw: &str) -> Vec<u8> {
    let spaced = raw.replace('+', " ");
    percent_decode_str(&spaced).collect()
}

/// Writes a decoded component into the key.
///
/// `%`, `&` and `=` are escaped so a decoded delimiter cannot forge a pair
/// boundary (`?a=x%26b%3Dy` vs `?a=x&b=y`). Bytes that are not valid UTF-8
/// are written as `%XX`; since `%` itself is escaped the mapping is injective.
fn escape_component(raw: &[u8]) -> String {
    let mut out = String::with_capacity(raw.len());
    for chunk in raw.utf8_chunks() {
        for c in chunk.valid().chars() {
            match c {
                '%' => out.push_str("%25"),
                '&' => out.push_str("%26"),
                '=' => out.push_str("%3D"),
                _ => out.push(c),
            }
        }
        for byte in chunk.invalid() {
            out.push_str(&format!("%{byte:02X}"));
        }
    }
    out
}
