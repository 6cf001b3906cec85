//! What route handlers return
//!
//! Handlers return anything implementing [`IntoHandlerResult`]: text,
//! `()`, a `serde_json::Value`, a [`Redirect`] or [`Rewrite`], an
//! [`ArrayLike`] payload such as [`JsonSuccess`], or a `Result` of those.

use serde_json::{Map, Value};

/// Normalized handler output
pub enum HandlerResult {
    /// The handler produced no output; the route still counts as matched
    Empty,
    Text(String),
    Structured(Value),
    /// Converted to `Structured` by the dispatcher
    Array(Box<dyn ArrayLike>),
    Redirect(Redirect),
    Rewrite(Rewrite),
}

impl HandlerResult {
    pub fn array(value: impl ArrayLike + 'static) -> Self {
        Self::Array(Box::new(value))
    }
}

impl std::fmt::Debug for HandlerResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Empty => f.write_str("Empty"),
            Self::Text(text) => f.debug_tuple("Text").field(text).finish(),
            Self::Structured(value) => f.debug_tuple("Structured").field(value).finish(),
            Self::Array(value) => f.debug_tuple("Array").field(&value.to_array()).finish(),
            Self::Redirect(redirect) => f.debug_tuple("Redirect").field(redirect).finish(),
            Self::Rewrite(rewrite) => f.debug_tuple("Rewrite").field(rewrite).finish(),
        }
    }
}

/// Payload that knows how to present itself as a structured value
pub trait ArrayLike: Send {
    fn to_array(&self) -> Value;
}

/// External redirect, answered with a `Location` header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redirect {
    pub path: String,
    pub status: u16,
}

impl Redirect {
    /// 302 redirect
    pub fn to(path: impl Into<String>) -> Self {
        Self { path: path.into(), status: 302 }
    }

    /// 301 redirect
    pub fn permanent(path: impl Into<String>) -> Self {
        Self { path: path.into(), status: 301 }
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }
}

/// Internal re-dispatch as a `GET` to another path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rewrite {
    pub path: String,
    pub status: u16,
}

impl Rewrite {
    pub fn to(path: impl Into<String>) -> Self {
        Self { path: path.into(), status: 200 }
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }
}

/// `{"status": 1, ...data}`
#[derive(Debug, Clone, Default)]
pub struct JsonSuccess {
    data: Map<String, Value>,
}

impl JsonSuccess {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }
}

impl ArrayLike for JsonSuccess {
    fn to_array(&self) -> Value {
        let mut object = Map::new();
        object.insert("status".to_string(), Value::from(1));
        object.extend(self.data.clone());
        Value::Object(object)
    }
}

/// `{"status": -1, "error": message, ...data}`
#[derive(Debug, Clone, Default)]
pub struct JsonError {
    error: String,
    data: Map<String, Value>,
}

impl JsonError {
    pub fn new(error: impl Into<String>) -> Self {
        Self { error: error.into(), data: Map::new() }
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }
}

impl ArrayLike for JsonError {
    fn to_array(&self) -> Value {
        let mut object = Map::new();
        object.insert("status".to_string(), Value::from(-1));
        object.insert("error".to_string(), Value::from(self.error.clone()));
        object.extend(self.data.clone());
        Value::Object(object)
    }
}

/// Conversion from a handler's return value
pub trait IntoHandlerResult {
    fn into_handler_result(self) -> anyhow::Result<HandlerResult>;
}

impl IntoHandlerResult for HandlerResult {
    fn into_handler_result(self) -> anyhow::Result<HandlerResult> {
        Ok(self)
    }
}

impl IntoHandlerResult for () {
    fn into_handler_result(self) -> anyhow::Result<HandlerResult> {
        Ok(HandlerResult::Empty)
    }
}

impl IntoHandlerResult for String {
    fn into_handler_result(self) -> anyhow::Result<HandlerResult> {
        Ok(HandlerResult::Text(self))
    }
}

impl IntoHandlerResult for &str {
    fn into_handler_result(self) -> anyhow::Result<HandlerResult> {
        Ok(HandlerResult::Text(self.to_string()))
    }
}

impl IntoHandlerResult for Value {
    fn into_handler_result(self) -> anyhow::Result<HandlerResult> {
        Ok(HandlerResult::Structured(self))
    }
}

impl IntoHandlerResult for Redirect {
    fn into_handler_result(self) -> anyhow::Result<HandlerResult> {
        Ok(HandlerResult::Redirect(self))
    }
}

impl IntoHandlerResult for Rewrite {
    fn into_handler_result(self) -> anyhow::Result<HandlerResult> {
        Ok(HandlerResult::Rewrite(self))
    }
}

impl IntoHandlerResult for JsonSuccess {
    fn into_handler_result(self) -> anyhow::Result<HandlerResult> {
        Ok(HandlerResult::array(self))
    }
}

impl IntoHandlerResult for JsonError {
    fn into_handler_result(self) -> anyhow::Result<HandlerResult> {
        Ok(HandlerResult::array(self))
    }
}

impl<T: IntoHandlerResult> IntoHandlerResult for Option<T> {
    fn into_handler_result(self) -> anyhow::Result<HandlerResult> {
        match self {
            Some(value) => value.into_handler_result(),
            None => Ok(HandlerResult::Empty),
        }
    }
}

impl<T, E> IntoHandlerResult for Result<T, E>
where
    T: IntoHandlerResult,
    E: Into<anyhow::Error>,
{
    fn into_handler_result(self) -> anyhow::Result<HandlerResult> {
        self.map_err(Into::into)?.into_handler_result()
    }
}
