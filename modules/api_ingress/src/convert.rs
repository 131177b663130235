//! Translation between axum's HTTP types and apiary's transport-agnostic
//! request and response.

use apiary::ParamBag;
use axum::body::{Body, Bytes};
use axum::http::{header, HeaderMap, HeaderName, HeaderValue, StatusCode};
use http_body_util::LengthLimitError;
use serde_json::Value;

use crate::error::IngressError;

/// Path relative to `mountpoint`, or `None` when the request lies outside it.
/// The mountpoint only matches on a segment boundary.
pub fn strip_mountpoint<'a>(mountpoint: &str, path: &'a str) -> Option<&'a str> {
    if mountpoint.is_empty() {
        return Some(path);
    }
    match path.strip_prefix(mountpoint)? {
        "" => Some("/"),
        rest if rest.starts_with('/') => Some(rest),
        _ => None,
    }
}

/// Decode a query string into string parameters. Repeated keys keep the last value.
pub fn parse_query(query: Option<&str>) -> ParamBag {
    query
        .map(|q| form_params(q.as_bytes()))
        .unwrap_or_default()
}

fn form_params(bytes: &[u8]) -> ParamBag {
    url::form_urlencoded::parse(bytes)
        .map(|(k, v)| (k.into_owned(), Value::String(v.into_owned())))
        .collect()
}

/// Collect at most `limit` bytes of request body.
pub async fn read_body(body: Body, limit: usize) -> Result<Bytes, IngressError> {
    axum::body::to_bytes(body, limit)
        .await
        .map_err(body_read_error)
}

/// Only an exceeded length limit is a 413; a broken or aborted stream is a 400.
pub fn body_read_error(err: axum::Error) -> IngressError {
    let inner = err.into_inner();
    if inner.downcast_ref::<LengthLimitError>().is_some() {
        IngressError::PayloadTooLarge
    } else {
        IngressError::BadRequest(format!("Failed to read request body: {inner}"))
    }
}

/// Decode a JSON object or form-encoded body. Other content types carry no
/// parameters.
pub fn parse_body(headers: &HeaderMap, bytes: &[u8]) -> Result<ParamBag, IngressError> {
    if bytes.is_empty() {
        return Ok(ParamBag::new());
    }

    let mime = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .map(|v| v.trim().to_ascii_lowercase())
        .unwrap_or_default();

    if mime == "application/json" || mime.ends_with("+json") {
        match serde_json::from_slice::<Value>(bytes) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(_) => Err(IngressError::BadRequest(
                "Request body must be a JSON object".into(),
            )),
            Err(_) => Err(IngressError::BadRequest("Malformed JSON body".into())),
        }
    } else if mime == "application/x-www-form-urlencoded" {
        Ok(form_params(bytes))
    } else {
        Ok(ParamBag::new())
    }
}

/// Headers that are not valid HTTP are dropped with a warning.
pub fn into_http_response(response: apiary::Response) -> axum::response::Response {
    let status = StatusCode::from_u16(response.status).unwrap_or_else(|_| {
        tracing::warn!(status = response.status, "invalid status code from handler");
        StatusCode::INTERNAL_SERVER_ERROR
    });

    let mut builder = axum::response::Response::builder().status(status);
    if let Some(headers) = builder.headers_mut() {
        for (name, value) in &response.headers {
            match (
                HeaderName::try_from(name.as_str()),
                HeaderValue::try_from(value.as_str()),
            ) {
                (Ok(name), Ok(value)) => {
                    headers.append(name, value);
                }
                _ => tracing::warn!(header = %name, "dropping invalid response header"),
            }
        }
    }

    let body = Body::from(response.body_bytes());
    builder.body(body).unwrap_or_else(|_| {
        let mut fallback = axum::response::Response::new(Body::empty());
        *fallback.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
        fallback
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn json_headers(content_type: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_str(content_type).unwrap(),
        );
        headers
    }

    #[tokio::test]
    async fn test_read_body_within_limit() {
        let bytes = read_body(Body::from("diameter=20"), 64).await.unwrap();
        assert_eq!(&bytes[..], b"diameter=20");
    }

    #[tokio::test]
    async fn test_read_body_over_limit_is_payload_too_large() {
        let err = read_body(Body::from(vec![b'x'; 32]), 8).await.unwrap_err();
        assert!(matches!(err, IngressError::PayloadTooLarge));
        assert_eq!(err.status(), 413);
    }

    #[test]
    fn test_broken_body_stream_is_bad_request() {
        let err = body_read_error(axum::Error::new(std::io::Error::other("connection reset")));
        assert!(matches!(err, IngressError::BadRequest(_)));
        assert_eq!(err.status(), 400);
        assert!(err.to_string().contains("connection reset"));
    }

    #[test]
    fn test_strip_mountpoint() {
        assert_eq!(strip_mountpoint("", "/pancakes"), Some("/pancakes"));
        assert_eq!(strip_mountpoint("/api", "/api/pancakes"), Some("/pancakes"));
        assert_eq!(strip_mountpoint("/api", "/api"), Some("/"));
        assert_eq!(strip_mountpoint("/api", "/apis/pancakes"), None);
        assert_eq!(strip_mountpoint("/api", "/pancakes"), None);
    }

    #[test]
    fn test_parse_query_decodes_values() {
        let bag = parse_query(Some("topping=maple%20syrup&n=1&n=2"));
        assert_eq!(bag["topping"], json!("maple syrup"));
        assert_eq!(bag["n"], json!("2"));
        assert!(parse_query(None).is_empty());
    }

    #[test]
    fn test_parse_json_body() {
        let headers = json_headers("application/json; charset=utf-8");
        let bag = parse_body(&headers, br#"{"diameter": 20, "topping": "jam"}"#).unwrap();
        assert_eq!(bag["diameter"], json!(20));
        assert_eq!(bag["topping"], json!("jam"));
    }

    #[test]
    fn test_parse_json_body_rejects_non_objects() {
        let headers = json_headers("application/json");
        let err = parse_body(&headers, b"[1, 2]").unwrap_err();
        assert_eq!(err.to_string(), "Request body must be a JSON object");
        let err = parse_body(&headers, b"{nope").unwrap_err();
        assert_eq!(err.to_string(), "Malformed JSON body");
    }

    #[test]
    fn test_parse_form_body() {
        let headers = json_headers("application/x-www-form-urlencoded");
        let bag = parse_body(&headers, b"diameter=20&topping=jam").unwrap();
        assert_eq!(bag["diameter"], json!("20"));
    }

    #[test]
    fn test_unknown_content_type_carries_no_params() {
        let headers = json_headers("text/plain");
        assert!(parse_body(&headers, b"diameter=20").unwrap().is_empty());
        assert!(parse_body(&HeaderMap::new(), b"").unwrap().is_empty());
    }

    #[test]
    fn test_into_http_response_copies_parts() {
        let response = into_http_response(apiary::Response::json(201, &json!({"id": 1})));
        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "application/json"
        );
    }

    #[test]
    fn test_into_http_response_drops_bad_headers() {
        let mut headers = apiary::Headers::new();
        headers.insert("X-Ok".into(), "yes".into());
        headers.insert("bad header".into(), "no".into());
        let response = into_http_response(apiary::Response::new(200, headers, vec![]));
        assert_eq!(response.headers().get("x-ok").unwrap(), "yes");
        assert_eq!(response.headers().len(), 1);
    }
}
