//! Results produced by handler methods and the rendering seam they are handed to.
use serde::Serialize;
use serde_json::Value;

pub const CONTENT_TYPE_JSON: &str = "application/json";
pub const CONTENT_TYPE_HTML: &str = "text/html; charset=utf-8";
pub const CONTENT_TYPE_TEXT: &str = "text/plain; charset=utf-8";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ViewBody {
    Empty,
    Text(String),
    Json(Value),
}

/// What a dispatch produces. Content agnostic: the renderer decides the bytes.
#[derive(Debug, Clone, PartialEq)]
pub struct View {
    pub status: u16,
    pub content_type: &'static str,
    pub body: ViewBody,
}

impl View {
    pub fn json(body: Value) -> Self {
        Self {
            status: 200,
            content_type: CONTENT_TYPE_JSON,
            body: ViewBody::Json(body),
        }
    }

    /// Serializes any `Serialize` value; fails if serialization does.
    pub fn json_of<T: Serialize>(value: &T) -> anyhow::Result<Self> {
        Ok(Self::json(serde_json::to_value(value)?))
    }

    pub fn html(body: impl Into<String>) -> Self {
        Self {
            status: 200,
            content_type: CONTENT_TYPE_HTML,
            body: ViewBody::Text(body.into()),
        }
    }

    pub fn text(body: impl Into<String>) -> Self {
        Self {
            status: 200,
            content_type: CONTENT_TYPE_TEXT,
            body: ViewBody::Text(body.into()),
        }
    }

    pub fn no_content() -> Self {
        Self {
            status: 204,
            content_type: CONTENT_TYPE_TEXT,
            body: ViewBody::Empty,
        }
    }

    pub fn error(status: u16, message: &str) -> Self {
        Self::json(serde_json::json!({ "error": message })).with_status(status)
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }

    /// Text content, if this is a text/html view.
    pub fn as_text(&self) -> Option<&str> {
        match &self.body {
            ViewBody::Text(s) => Some(s),
            _ => None,
        }
    }
}

/// Transport-level rendering of a final view.
pub trait Renderer: Send + Sync {
    type Output;
    fn render(&self, view: View) -> Self::Output;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rendered {
    pub status: u16,
    pub content_type: &'static str,
    pub body: Vec<u8>,
}

/// Default renderer: text as UTF-8, JSON through `serde_json`.
#[derive(Debug, Default, Clone, Copy)]
pub struct BodyRenderer;

impl Renderer for BodyRenderer {
    type Output = Rendered;

    fn render(&self, view: View) -> Rendered {
        let body = match view.body {
            ViewBody::Empty => Vec::new(),
            ViewBody::Text(s) => s.into_bytes(),
            // Value serialization cannot fail: keys are always strings
            ViewBody::Json(v) => serde_json::to_vec(&v).unwrap_or_default(),
        };
        Rendered {
            status: view.status,
            content_type: view.content_type,
            body,
        }
    }
}
