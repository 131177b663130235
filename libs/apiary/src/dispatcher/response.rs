use std::collections::BTreeMap;

use serde_json::Value;

use crate::definition::ParamBag;

pub type Headers = BTreeMap<String, String>;

pub const CONTENT_TYPE: &str = "Content-Type";
pub const JSON_CONTENT_TYPE: &str = "application/json";
pub const TEXT_CONTENT_TYPE: &str = "text/plain;charset=utf-8";
pub const HTML_CONTENT_TYPE: &str = "text/html;charset=utf-8";

/// Status, headers and body chunks, independent of any HTTP server.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Response {
    pub status: u16,
    pub headers: Headers,
    pub body: Vec<Vec<u8>>,
}

impl Response {
    pub fn new(status: u16, headers: Headers, body: Vec<Vec<u8>>) -> Self {
        Self {
            status,
            headers,
            body,
        }
    }

    pub fn with_content(status: u16, content_type: &str, body: impl Into<Vec<u8>>) -> Self {
        let mut headers = Headers::new();
        headers.insert(CONTENT_TYPE.to_string(), content_type.to_string());
        Self::new(status, headers, vec![body.into()])
    }

    pub fn text(status: u16, body: impl Into<String>) -> Self {
        Self::with_content(status, TEXT_CONTENT_TYPE, body.into())
    }

    pub fn html(status: u16, body: impl Into<String>) -> Self {
        Self::with_content(status, HTML_CONTENT_TYPE, body.into())
    }

    /// Pretty-printed JSON body.
    pub fn json(status: u16, body: &Value) -> Self {
        Self::with_content(status, JSON_CONTENT_TYPE, pretty_json(body))
    }

    /// `{"error": message}` merged with `extras`, pretty-printed and
    /// newline-terminated.
    pub fn json_error(status: u16, message: &str, extras: ParamBag) -> Self {
        let mut payload = ParamBag::new();
        payload.insert("error".to_string(), Value::String(message.to_string()));
        payload.extend(extras);

        let mut body = pretty_json(&Value::Object(payload));
        body.push('\n');
        Self::with_content(status, JSON_CONTENT_TYPE, body)
    }

    pub fn not_found(method: &http::Method, path: &str) -> Self {
        Self::json_error(
            404,
            &format!("No matching action found for {method} {path}"),
            ParamBag::new(),
        )
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn content_type(&self) -> Option<&str> {
        self.header(CONTENT_TYPE)
    }

    pub fn body_bytes(&self) -> Vec<u8> {
        self.body.concat()
    }

    pub fn body_string(&self) -> String {
        String::from_utf8_lossy(&self.body_bytes()).into_owned()
    }
}

impl From<(u16, Headers, Vec<Vec<u8>>)> for Response {
    fn from((status, headers, body): (u16, Headers, Vec<Vec<u8>>)) -> Self {
        Self::new(status, headers, body)
    }
}

pub(crate) fn pretty_json(value: &Value) -> String {
    // Serializing a `Value` cannot fail; fall back to the compact form anyway.
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

/// What a handler hands back to the dispatcher.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Reply {
    /// Complete response; status and headers from the context are ignored.
    Response(Response),
    /// Body only; status and content type come from the context.
    Body(Vec<u8>),
    Empty,
}

impl From<Response> for Reply {
    fn from(response: Response) -> Self {
        Self::Response(response)
    }
}

impl From<(u16, Headers, Vec<Vec<u8>>)> for Reply {
    fn from(triplet: (u16, Headers, Vec<Vec<u8>>)) -> Self {
        Self::Response(triplet.into())
    }
}

impl From<String> for Reply {
    fn from(body: String) -> Self {
        Self::Body(body.into_bytes())
    }
}

impl From<&str> for Reply {
    fn from(body: &str) -> Self {
        Self::Body(body.as_bytes().to_vec())
    }
}

impl From<Vec<u8>> for Reply {
    fn from(body: Vec<u8>) -> Self {
        Self::Body(body)
    }
}

impl From<()> for Reply {
    fn from(_: ()) -> Self {
        Self::Empty
    }
}
