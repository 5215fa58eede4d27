//! # axum-catcher
//!
//! Scenario-based error catching middleware for axum and tower.
//!
//! Applications register *scenarios* — policies that map an error identity
//! to an HTTP status code, a message strategy and optional extra response
//! fields — and install the catcher as the outermost fallible layer of the
//! request pipeline. Every error escaping an inner handler is matched
//! against the registry and answered with a structured envelope such as
//! `{"message": "...", "code": 403}`.
//!
//! ## Features
//!
//! - **Tag-based matching**: errors declare an [`ErrorTag`] and an explicit
//!   ancestor chain; lookup prefers the exact tag and otherwise the nearest
//!   registered ancestor, so a scenario for a broad category catches every
//!   descendant that has no scenario of its own
//! - **Fluent scenarios**: `catch("app.not_found").with_status_code(...)`
//!   with constant, stringified or computed (sync or async) messages
//! - **Config records**: scenarios deserialized from plain data via
//!   [`ScenarioConfig`]
//! - **Pluggable encoding**: JSON by default, any `Map -> String` encoder
//!   on request
//! - **Canned table**: [`canned::scenarios`] covers the standard HTTP error
//!   statuses in one registration call
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use axum::body::Body;
//! use axum::http::{Request, StatusCode};
//! use axum::response::Response;
//! use axum_catcher::{Catchable, Catcher, Caught, ErrorTag, catch};
//! use tower::{BoxError, ServiceBuilder, ServiceExt};
//!
//! #[derive(Debug)]
//! struct DivideByZero;
//!
//! impl std::fmt::Display for DivideByZero {
//!     fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
//!         f.write_str("division by zero")
//!     }
//! }
//!
//! impl Catchable for DivideByZero {
//!     fn tag(&self) -> ErrorTag {
//!         ErrorTag::from_static("app.divide_by_zero")
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() {
//!     let mut catcher = Catcher::new();
//!     catcher.register(
//!         catch("app.divide_by_zero")
//!             .with_status_code(StatusCode::FORBIDDEN)
//!             .and_return("Zero division makes zero sense"),
//!     );
//!
//!     let service = ServiceBuilder::new()
//!         .layer(catcher.into_layer())
//!         .service_fn(|_req: Request<Body>| async move {
//!             // A real application would run its handler here.
//!             Err::<Response, BoxError>(Caught::new(DivideByZero).into())
//!         });
//!
//!     let response = service
//!         .oneshot(Request::builder().uri("/divide").body(Body::empty()).unwrap())
//!         .await
//!         .unwrap();
//!     assert_eq!(response.status(), StatusCode::FORBIDDEN);
//! }
//! ```
//!
//! ## Error handling inside the catcher
//!
//! Unmapped errors are answered by a default 500 scenario and logged at
//! error severity. Boxed errors that never went through [`Caught`] resolve
//! under the [`UNMAPPED`] tag, so a catch-all scenario for them is one
//! registration away. A fault raised by a user-supplied resolver (or a custom
//! encoder) is *not* remapped: it propagates as a service error to the
//! host's own fallback path, so resolver bugs never masquerade as ordinary
//! mapped responses.

pub mod canned;
pub mod catchable;
pub mod catcher;
pub mod error;
pub mod scenario;

// Re-export core types
pub use catchable::{Catchable, Caught, ErrorTag};
pub use catcher::{Catcher, CatcherLayer, CatcherService, UNMAPPED};
pub use error::{BoxError, CatcherError, Result};
pub use scenario::{
    DEFAULT_MESSAGE, FieldsFuture, MessageFuture, Scenario, ScenarioConfig, catch, catch_all,
};

/// Prelude module for convenient imports
///
/// ```
/// use axum_catcher::prelude::*;
/// ```
pub mod prelude {
    pub use crate::canned;
    pub use crate::catchable::{Catchable, Caught, ErrorTag};
    pub use crate::catcher::{Catcher, CatcherLayer, CatcherService, UNMAPPED};
    pub use crate::error::{BoxError, CatcherError};
    pub use crate::scenario::{Scenario, ScenarioConfig, catch, catch_all};
}
