//! Ready-made scenarios for the standard HTTP error statuses.
//!
//! Register the whole table in one call:
//!
//! ```
//! use axum_catcher::{Catcher, canned};
//!
//! let mut catcher = Catcher::new();
//! catcher.register_all(canned::scenarios());
//! ```

use std::fmt;

use axum::http::StatusCode;
use axum::http::request::Parts;

use crate::catchable::{Catchable, ErrorTag};
use crate::scenario::{Scenario, catch};

/// Common ancestor of every canned HTTP error tag.
pub const HTTP_ERROR: ErrorTag = ErrorTag::from_static("http.error");

pub const BAD_REQUEST: ErrorTag = ErrorTag::from_static("http.bad_request");
pub const UNAUTHORIZED: ErrorTag = ErrorTag::from_static("http.unauthorized");
pub const PAYMENT_REQUIRED: ErrorTag = ErrorTag::from_static("http.payment_required");
pub const FORBIDDEN: ErrorTag = ErrorTag::from_static("http.forbidden");
pub const NOT_FOUND: ErrorTag = ErrorTag::from_static("http.not_found");
pub const METHOD_NOT_ALLOWED: ErrorTag = ErrorTag::from_static("http.method_not_allowed");
pub const NOT_ACCEPTABLE: ErrorTag = ErrorTag::from_static("http.not_acceptable");
pub const PROXY_AUTHENTICATION_REQUIRED: ErrorTag =
    ErrorTag::from_static("http.proxy_authentication_required");
pub const REQUEST_TIMEOUT: ErrorTag = ErrorTag::from_static("http.request_timeout");
pub const CONFLICT: ErrorTag = ErrorTag::from_static("http.conflict");
pub const GONE: ErrorTag = ErrorTag::from_static("http.gone");
pub const LENGTH_REQUIRED: ErrorTag = ErrorTag::from_static("http.length_required");
pub const PRECONDITION_FAILED: ErrorTag = ErrorTag::from_static("http.precondition_failed");
pub const PAYLOAD_TOO_LARGE: ErrorTag = ErrorTag::from_static("http.payload_too_large");
pub const URI_TOO_LONG: ErrorTag = ErrorTag::from_static("http.uri_too_long");
pub const UNSUPPORTED_MEDIA_TYPE: ErrorTag = ErrorTag::from_static("http.unsupported_media_type");
pub const RANGE_NOT_SATISFIABLE: ErrorTag = ErrorTag::from_static("http.range_not_satisfiable");
pub const EXPECTATION_FAILED: ErrorTag = ErrorTag::from_static("http.expectation_failed");
pub const MISDIRECTED_REQUEST: ErrorTag = ErrorTag::from_static("http.misdirected_request");
pub const UNPROCESSABLE_ENTITY: ErrorTag = ErrorTag::from_static("http.unprocessable_entity");
pub const FAILED_DEPENDENCY: ErrorTag = ErrorTag::from_static("http.failed_dependency");
pub const UPGRADE_REQUIRED: ErrorTag = ErrorTag::from_static("http.upgrade_required");
pub const PRECONDITION_REQUIRED: ErrorTag = ErrorTag::from_static("http.precondition_required");
pub const TOO_MANY_REQUESTS: ErrorTag = ErrorTag::from_static("http.too_many_requests");
pub const REQUEST_HEADER_FIELDS_TOO_LARGE: ErrorTag =
    ErrorTag::from_static("http.request_header_fields_too_large");
pub const UNAVAILABLE_FOR_LEGAL_REASONS: ErrorTag =
    ErrorTag::from_static("http.unavailable_for_legal_reasons");
pub const INTERNAL_SERVER_ERROR: ErrorTag = ErrorTag::from_static("http.internal_server_error");
pub const NOT_IMPLEMENTED: ErrorTag = ErrorTag::from_static("http.not_implemented");
pub const BAD_GATEWAY: ErrorTag = ErrorTag::from_static("http.bad_gateway");
pub const SERVICE_UNAVAILABLE: ErrorTag = ErrorTag::from_static("http.service_unavailable");
pub const GATEWAY_TIMEOUT: ErrorTag = ErrorTag::from_static("http.gateway_timeout");
pub const HTTP_VERSION_NOT_SUPPORTED: ErrorTag =
    ErrorTag::from_static("http.http_version_not_supported");
pub const VARIANT_ALSO_NEGOTIATES: ErrorTag = ErrorTag::from_static("http.variant_also_negotiates");
pub const INSUFFICIENT_STORAGE: ErrorTag = ErrorTag::from_static("http.insufficient_storage");
pub const NOT_EXTENDED: ErrorTag = ErrorTag::from_static("http.not_extended");
pub const NETWORK_AUTHENTICATION_REQUIRED: ErrorTag =
    ErrorTag::from_static("http.network_authentication_required");

const TABLE: &[(ErrorTag, StatusCode)] = &[
    (BAD_REQUEST, StatusCode::BAD_REQUEST),
    (UNAUTHORIZED, StatusCode::UNAUTHORIZED),
    (PAYMENT_REQUIRED, StatusCode::PAYMENT_REQUIRED),
    (FORBIDDEN, StatusCode::FORBIDDEN),
    (NOT_FOUND, StatusCode::NOT_FOUND),
    (METHOD_NOT_ALLOWED, StatusCode::METHOD_NOT_ALLOWED),
    (NOT_ACCEPTABLE, StatusCode::NOT_ACCEPTABLE),
    (
        PROXY_AUTHENTICATION_REQUIRED,
        StatusCode::PROXY_AUTHENTICATION_REQUIRED,
    ),
    (REQUEST_TIMEOUT, StatusCode::REQUEST_TIMEOUT),
    (CONFLICT, StatusCode::CONFLICT),
    (GONE, StatusCode::GONE),
    (LENGTH_REQUIRED, StatusCode::LENGTH_REQUIRED),
    (PRECONDITION_FAILED, StatusCode::PRECONDITION_FAILED),
    (PAYLOAD_TOO_LARGE, StatusCode::PAYLOAD_TOO_LARGE),
    (URI_TOO_LONG, StatusCode::URI_TOO_LONG),
    (UNSUPPORTED_MEDIA_TYPE, StatusCode::UNSUPPORTED_MEDIA_TYPE),
    (RANGE_NOT_SATISFIABLE, StatusCode::RANGE_NOT_SATISFIABLE),
    (EXPECTATION_FAILED, StatusCode::EXPECTATION_FAILED),
    (MISDIRECTED_REQUEST, StatusCode::MISDIRECTED_REQUEST),
    (UNPROCESSABLE_ENTITY, StatusCode::UNPROCESSABLE_ENTITY),
    (FAILED_DEPENDENCY, StatusCode::FAILED_DEPENDENCY),
    (UPGRADE_REQUIRED, StatusCode::UPGRADE_REQUIRED),
    (PRECONDITION_REQUIRED, StatusCode::PRECONDITION_REQUIRED),
    (TOO_MANY_REQUESTS, StatusCode::TOO_MANY_REQUESTS),
    (
        REQUEST_HEADER_FIELDS_TOO_LARGE,
        StatusCode::REQUEST_HEADER_FIELDS_TOO_LARGE,
    ),
    (
        UNAVAILABLE_FOR_LEGAL_REASONS,
        StatusCode::UNAVAILABLE_FOR_LEGAL_REASONS,
    ),
    (INTERNAL_SERVER_ERROR, StatusCode::INTERNAL_SERVER_ERROR),
    (NOT_IMPLEMENTED, StatusCode::NOT_IMPLEMENTED),
    (BAD_GATEWAY, StatusCode::BAD_GATEWAY),
    (SERVICE_UNAVAILABLE, StatusCode::SERVICE_UNAVAILABLE),
    (GATEWAY_TIMEOUT, StatusCode::GATEWAY_TIMEOUT),
    (
        HTTP_VERSION_NOT_SUPPORTED,
        StatusCode::HTTP_VERSION_NOT_SUPPORTED,
    ),
    (VARIANT_ALSO_NEGOTIATES, StatusCode::VARIANT_ALSO_NEGOTIATES),
    (INSUFFICIENT_STORAGE, StatusCode::INSUFFICIENT_STORAGE),
    (NOT_EXTENDED, StatusCode::NOT_EXTENDED),
    (
        NETWORK_AUTHENTICATION_REQUIRED,
        StatusCode::NETWORK_AUTHENTICATION_REQUIRED,
    ),
];

/// Tag for a standard HTTP error status, if the table knows it.
pub fn tag_for(status: StatusCode) -> Option<ErrorTag> {
    TABLE
        .iter()
        .find(|(_, s)| *s == status)
        .map(|(tag, _)| tag.clone())
}

/// One scenario per standard HTTP error status, each answering with that
/// status and the error's `Display` text as the message.
pub fn scenarios() -> Vec<Scenario> {
    TABLE
        .iter()
        .map(|(tag, status)| {
            catch(tag.clone())
                .with_status_code(*status)
                .and_call(|err: &dyn Catchable, _parts: &Parts| err.to_string())
        })
        .collect()
}

/// Ready-made catchable error carrying an HTTP status.
///
/// Its tag follows the status, so it resolves against the canned table
/// without any application-defined error types.
#[derive(Debug, Clone)]
pub struct HttpError {
    status: StatusCode,
    message: Option<String>,
}

impl HttpError {
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            message: None,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl fmt::Display for HttpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.message, self.status.canonical_reason()) {
            (Some(message), _) => f.write_str(message),
            (None, Some(reason)) => f.write_str(reason),
            (None, None) => write!(f, "{}", self.status.as_u16()),
        }
    }
}

impl std::error::Error for HttpError {}

impl Catchable for HttpError {
    fn tag(&self) -> ErrorTag {
        // Statuses outside the table get a numeric tag, so the exact tag
        // never duplicates the http.error ancestor.
        tag_for(self.status)
            .unwrap_or_else(|| ErrorTag::new(format!("http.{}", self.status.as_u16())))
    }

    fn ancestors(&self) -> &[ErrorTag] {
        const ANCESTORS: &[ErrorTag] = &[HTTP_ERROR];
        ANCESTORS
    }
}
