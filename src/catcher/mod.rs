use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use axum::body::Body;
use axum::http::header;
use axum::http::request::Parts;
use axum::response::Response;
use serde_json::{Map, Value};
use tracing::{error, warn};

use crate::catchable::{Catchable, Caught, ErrorTag};
use crate::error::{BoxError, Result};
use crate::scenario::{Scenario, ScenarioConfig};

mod layer;

pub use layer::{CatcherLayer, CatcherService};

type Encoder = Arc<dyn Fn(&Map<String, Value>) -> std::result::Result<String, BoxError> + Send + Sync>;

/// Registry of [`Scenario`]s plus the interception logic that turns a caught
/// error into an HTTP response.
///
/// A catcher is assembled during application setup: configure the envelope
/// keys and encoder, register scenarios, then hand it to [`CatcherLayer`]
/// and install that as the outermost fallible layer of the stack. From that
/// point on the registry is behind an `Arc` and is never mutated while
/// requests resolve against it; replacing scenarios at runtime means
/// building a new catcher and swapping the whole `Arc`.
pub struct Catcher {
    registry: HashMap<ErrorTag, Arc<Scenario>>,
    message_key: String,
    code_key: String,
    encoder: Encoder,
    content_type: String,
}

impl fmt::Debug for Catcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Catcher")
            .field("registry", &self.registry)
            .field("message_key", &self.message_key)
            .field("code_key", &self.code_key)
            .field("content_type", &self.content_type)
            .finish()
    }
}

impl Default for Catcher {
    fn default() -> Self {
        Self::new()
    }
}

/// Tag carried by boxed errors that are not a [`Caught`].
///
/// Register a scenario for this tag to map unrecognized errors instead of
/// falling through to the default 500.
pub const UNMAPPED: ErrorTag = ErrorTag::from_static("catcher.unmapped");

/// Stand-in identity for boxed errors that are not a [`Caught`]; carries
/// their rendered text under the [`UNMAPPED`] tag.
#[derive(Debug)]
struct Unmapped(String);

impl fmt::Display for Unmapped {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Catchable for Unmapped {
    fn tag(&self) -> ErrorTag {
        UNMAPPED
    }
}

impl Catcher {
    /// Empty registry, `"message"`/`"code"` envelope keys, JSON encoder.
    pub fn new() -> Self {
        Self {
            registry: HashMap::new(),
            message_key: "message".to_string(),
            code_key: "code".to_string(),
            encoder: Arc::new(|envelope| serde_json::to_string(envelope).map_err(Into::into)),
            content_type: "application/json".to_string(),
        }
    }

    /// Rename the top-level envelope fields.
    pub fn with_envelope_keys(
        mut self,
        message_key: impl Into<String>,
        code_key: impl Into<String>,
    ) -> Self {
        self.message_key = message_key.into();
        self.code_key = code_key.into();
        self
    }

    /// Replace the default JSON encoder. The content type is sent verbatim
    /// on every mapped response.
    pub fn with_encoder<F>(mut self, content_type: impl Into<String>, encoder: F) -> Self
    where
        F: Fn(&Map<String, Value>) -> std::result::Result<String, BoxError> + Send + Sync + 'static,
    {
        self.encoder = Arc::new(encoder);
        self.content_type = content_type.into();
        self
    }

    /// Register a scenario under every tag it matches.
    ///
    /// Registering a second scenario for a tag replaces the first; the
    /// override is logged but is not an error.
    pub fn register(&mut self, scenario: Scenario) {
        if scenario.tags().is_empty() {
            warn!("a scenario with no tags has been registered; it will never match");
            return;
        }
        let scenario = Arc::new(scenario);
        for tag in scenario.tags() {
            if self.registry.insert(tag.clone(), scenario.clone()).is_some() {
                warn!(tag = %tag, "a new scenario has been registered for this tag; it replaces the existing one");
            }
        }
    }

    /// Register scenarios in order; for a shared tag the last one wins.
    pub fn register_all<I>(&mut self, scenarios: I)
    where
        I: IntoIterator<Item = Scenario>,
    {
        for scenario in scenarios {
            self.register(scenario);
        }
    }

    /// Validate and register a plain configuration record.
    pub fn register_config(&mut self, config: ScenarioConfig) -> Result<()> {
        self.register(Scenario::try_from(config)?);
        Ok(())
    }

    /// Find the scenario for an error.
    ///
    /// The exact tag is checked first; otherwise the error's ancestor chain
    /// is walked nearest-first and the first registered ancestor wins,
    /// regardless of registration order.
    pub fn resolve(&self, err: &dyn Catchable) -> Option<Arc<Scenario>> {
        if let Some(scenario) = self.registry.get(&err.tag()) {
            return Some(scenario.clone());
        }
        err.ancestors()
            .iter()
            .find_map(|tag| self.registry.get(tag).cloned())
    }

    /// Turn a boxed error from the inner service into an HTTP response.
    ///
    /// Boxed errors that are not a [`Caught`] resolve under the [`UNMAPPED`]
    /// tag. Errors with no matching scenario are logged and answered by the
    /// default 500 scenario.
    /// A fault inside a callable resolver or the encoder is returned as
    /// `Err` and left for the host's own fallback path; remapping it here
    /// would hide resolver bugs behind generic 500s and invite recursive
    /// catching.
    pub async fn catch_error(
        &self,
        err: BoxError,
        parts: &Parts,
    ) -> std::result::Result<Response, BoxError> {
        match err.downcast::<Caught>() {
            Ok(caught) => match self.resolve(caught.inner()) {
                Some(scenario) => self.respond(&scenario, caught.inner(), parts).await,
                None => {
                    error!(tag = %caught.tag(), error = %caught, "no scenario registered for error; answering with the default 500");
                    self.respond(&Scenario::default(), caught.inner(), parts).await
                }
            },
            Err(other) => {
                let unmapped = Unmapped(other.to_string());
                match self.resolve(&unmapped) {
                    Some(scenario) => self.respond(&scenario, &unmapped, parts).await,
                    None => {
                        error!(error = %other, "unrecognized error reached the catcher; answering with the default 500");
                        self.respond(&Scenario::default(), &unmapped, parts).await
                    }
                }
            }
        }
    }

    async fn respond(
        &self,
        scenario: &Scenario,
        err: &dyn Catchable,
        parts: &Parts,
    ) -> std::result::Result<Response, BoxError> {
        let message = scenario.resolve_message(err, parts).await?;
        let extra = scenario.resolve_additional_fields(err, parts).await?;

        let mut envelope = Map::new();
        for (key, value) in extra {
            // Envelope keys always win over additional fields.
            if key == self.message_key || key == self.code_key {
                warn!(key = %key, "additional field collides with an envelope key and is dropped");
                continue;
            }
            envelope.insert(key, value);
        }
        envelope.insert(self.message_key.clone(), message);
        envelope.insert(
            self.code_key.clone(),
            Value::from(scenario.status_code().as_u16()),
        );

        let body = (self.encoder)(&envelope)?;
        let response = Response::builder()
            .status(scenario.status_code())
            .header(header::CONTENT_TYPE, self.content_type.as_str())
            .body(Body::from(body))?;
        Ok(response)
    }

    /// Consume the catcher and produce the tower layer that installs it.
    pub fn into_layer(self) -> CatcherLayer {
        CatcherLayer::new(self)
    }
}
