use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use axum::http::StatusCode;
use axum::http::request::Parts;
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::catchable::{Catchable, ErrorTag};
use crate::error::{BoxError, CatcherError};

/// Message returned by the default scenario when nothing else is configured.
pub const DEFAULT_MESSAGE: &str = "Internal server error";

/// Boxed future returned by message resolvers.
pub type MessageFuture<'a> = Pin<Box<dyn Future<Output = Result<Value, BoxError>> + Send + 'a>>;

/// Boxed future returned by additional-field resolvers.
pub type FieldsFuture<'a> =
    Pin<Box<dyn Future<Output = Result<Map<String, Value>, BoxError>> + Send + 'a>>;

type MessageFn = Arc<dyn for<'a> Fn(&'a dyn Catchable, &'a Parts) -> MessageFuture<'a> + Send + Sync>;
type FieldsFn = Arc<dyn for<'a> Fn(&'a dyn Catchable, &'a Parts) -> FieldsFuture<'a> + Send + Sync>;

#[derive(Clone)]
enum MessageMode {
    Constant(Value),
    Stringify,
    Call(MessageFn),
}

impl fmt::Debug for MessageMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Constant(value) => f.debug_tuple("Constant").field(value).finish(),
            Self::Stringify => f.write_str("Stringify"),
            Self::Call(_) => f.write_str("Call(..)"),
        }
    }
}

#[derive(Clone, Default)]
enum AdditionalFields {
    #[default]
    None,
    Fixed(Map<String, Value>),
    Call(FieldsFn),
}

impl fmt::Debug for AdditionalFields {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => f.write_str("None"),
            Self::Fixed(map) => f.debug_tuple("Fixed").field(map).finish(),
            Self::Call(_) => f.write_str("Call(..)"),
        }
    }
}

/// A response policy for one or more error tags.
///
/// A scenario couples the tags it matches with an HTTP status code, a
/// message strategy and optional additional response fields. It is built
/// once during application setup with the fluent methods below and is
/// read-only while requests are being handled, so a registered scenario is
/// shared across concurrent requests without locking.
///
/// Message strategies are mutually exclusive; the last setter called wins.
///
/// # Example
/// ```
/// use axum::http::StatusCode;
/// use axum_catcher::catch;
///
/// let scenario = catch("app.divide_by_zero")
///     .with_status_code(StatusCode::FORBIDDEN)
///     .and_return("Zero division makes zero sense");
/// assert_eq!(scenario.status_code(), StatusCode::FORBIDDEN);
/// ```
#[derive(Clone)]
pub struct Scenario {
    tags: Vec<ErrorTag>,
    status_code: StatusCode,
    message: MessageMode,
    additional_fields: AdditionalFields,
}

impl fmt::Debug for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scenario")
            .field("tags", &self.tags)
            .field("status_code", &self.status_code)
            .field("message", &self.message)
            .field("additional_fields", &self.additional_fields)
            .finish()
    }
}

impl Default for Scenario {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

/// Start a scenario matching a single tag.
pub fn catch(tag: impl Into<ErrorTag>) -> Scenario {
    Scenario::new(vec![tag.into()])
}

/// Start a scenario matching several tags at once.
pub fn catch_all<I>(tags: I) -> Scenario
where
    I: IntoIterator,
    I::Item: Into<ErrorTag>,
{
    Scenario::new(tags.into_iter().map(Into::into).collect())
}

impl Scenario {
    /// Defaults: status 500, constant [`DEFAULT_MESSAGE`], no extra fields.
    pub fn new(tags: Vec<ErrorTag>) -> Self {
        Self {
            tags,
            status_code: StatusCode::INTERNAL_SERVER_ERROR,
            message: MessageMode::Constant(Value::String(DEFAULT_MESSAGE.to_string())),
            additional_fields: AdditionalFields::None,
        }
    }

    pub fn tags(&self) -> &[ErrorTag] {
        &self.tags
    }

    pub fn status_code(&self) -> StatusCode {
        self.status_code
    }

    pub fn with_status_code(mut self, status_code: StatusCode) -> Self {
        self.status_code = status_code;
        self
    }

    /// Respond with the error's `Display` rendering.
    pub fn and_stringify(mut self) -> Self {
        self.message = MessageMode::Stringify;
        self
    }

    /// Respond with a fixed message value.
    pub fn and_return(mut self, message: impl Into<Value>) -> Self {
        self.message = MessageMode::Constant(message.into());
        self
    }

    /// Compute the message from the error and the request head.
    pub fn and_call<F, V>(mut self, f: F) -> Self
    where
        F: Fn(&dyn Catchable, &Parts) -> V + Send + Sync + 'static,
        V: Into<Value>,
    {
        self.message = MessageMode::Call(Arc::new(move |err: &dyn Catchable, parts: &Parts| {
            let value = f(err, parts).into();
            let fut: MessageFuture<'_> = Box::pin(std::future::ready(Ok(value)));
            fut
        }));
        self
    }

    /// Like [`and_call`](Self::and_call), but the closure returns a future.
    ///
    /// The closure runs synchronously over the borrowed error and request
    /// head and must hand back an owned future, so clone what the future
    /// needs before the `async move` block.
    pub fn and_call_async<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(&dyn Catchable, &Parts) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, BoxError>> + Send + 'static,
    {
        self.message = MessageMode::Call(Arc::new(move |err: &dyn Catchable, parts: &Parts| {
            let fut: MessageFuture<'_> = Box::pin(f(err, parts));
            fut
        }));
        self
    }

    /// Merge a fixed map of extra fields into the response envelope.
    pub fn with_additional_fields(mut self, fields: Map<String, Value>) -> Self {
        self.additional_fields = AdditionalFields::Fixed(fields);
        self
    }

    /// Compute extra envelope fields from the error and the request head.
    pub fn with_additional_fields_fn<F>(mut self, f: F) -> Self
    where
        F: Fn(&dyn Catchable, &Parts) -> Map<String, Value> + Send + Sync + 'static,
    {
        self.additional_fields =
            AdditionalFields::Call(Arc::new(move |err: &dyn Catchable, parts: &Parts| {
                let fields = f(err, parts);
                let fut: FieldsFuture<'_> = Box::pin(std::future::ready(Ok(fields)));
                fut
            }));
        self
    }

    /// Like [`with_additional_fields_fn`](Self::with_additional_fields_fn),
    /// but the closure returns a future.
    pub fn with_additional_fields_async<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(&dyn Catchable, &Parts) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Map<String, Value>, BoxError>> + Send + 'static,
    {
        self.additional_fields =
            AdditionalFields::Call(Arc::new(move |err: &dyn Catchable, parts: &Parts| {
                let fut: FieldsFuture<'_> = Box::pin(f(err, parts));
                fut
            }));
        self
    }

    /// Resolve the response message for a caught error.
    ///
    /// Errors raised by a callable resolver are propagated untouched; the
    /// catcher never remaps them (see the crate docs on resolver faults).
    pub async fn resolve_message(
        &self,
        err: &dyn Catchable,
        parts: &Parts,
    ) -> Result<Value, BoxError> {
        match &self.message {
            MessageMode::Call(f) => f(err, parts).await,
            MessageMode::Stringify => Ok(Value::String(err.to_string())),
            MessageMode::Constant(value) => Ok(value.clone()),
        }
    }

    /// Resolve the extra envelope fields; empty when unset.
    pub async fn resolve_additional_fields(
        &self,
        err: &dyn Catchable,
        parts: &Parts,
    ) -> Result<Map<String, Value>, BoxError> {
        match &self.additional_fields {
            AdditionalFields::None => Ok(Map::new()),
            AdditionalFields::Fixed(map) => Ok(map.clone()),
            AdditionalFields::Call(f) => f(err, parts).await,
        }
    }
}

/// Plain configuration record, interchangeable with the builder API for
/// everything that can be expressed as data. Callable resolvers cannot be
/// configured this way.
///
/// ```
/// use axum_catcher::{Scenario, ScenarioConfig};
///
/// let config: ScenarioConfig = serde_json::from_str(
///     r#"{"tags": ["app.teapot"], "status_code": 418, "message": "I'm a teapot"}"#,
/// ).unwrap();
/// let scenario = Scenario::try_from(config).unwrap();
/// assert_eq!(scenario.status_code().as_u16(), 418);
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ScenarioConfig {
    pub tags: Vec<String>,
    pub status_code: Option<u16>,
    pub message: Option<Value>,
    pub stringify: bool,
    pub additional_fields: Option<Map<String, Value>>,
}

impl TryFrom<ScenarioConfig> for Scenario {
    type Error = CatcherError;

    fn try_from(config: ScenarioConfig) -> Result<Self, CatcherError> {
        if config.tags.is_empty() {
            return Err(CatcherError::EmptyTags);
        }
        let mut scenario = Scenario::new(config.tags.into_iter().map(ErrorTag::from).collect());
        if let Some(code) = config.status_code {
            let status =
                StatusCode::from_u16(code).map_err(|_| CatcherError::InvalidStatusCode(code))?;
            scenario = scenario.with_status_code(status);
        }
        if let Some(message) = config.message {
            scenario = scenario.and_return(message);
        }
        if config.stringify {
            scenario = scenario.and_stringify();
        }
        if let Some(fields) = config.additional_fields {
            scenario = scenario.with_additional_fields(fields);
        }
        Ok(scenario)
    }
}
