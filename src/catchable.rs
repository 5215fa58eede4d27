use std::borrow::Cow;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Identity of an error kind.
///
/// Tags stand in for runtime type information: every catchable error names
/// itself with one tag and may list ancestor tags, which is what scenario
/// lookup walks. Tags can be declared as constants from static strings or
/// built at runtime from configuration data.
///
/// # Example
/// ```
/// use axum_catcher::ErrorTag;
///
/// const ENTITY_NOT_FOUND: ErrorTag = ErrorTag::from_static("app.entity_not_found");
/// ```
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ErrorTag(Cow<'static, str>);

impl ErrorTag {
    pub const fn from_static(tag: &'static str) -> Self {
        Self(Cow::Borrowed(tag))
    }

    pub fn new(tag: impl Into<String>) -> Self {
        Self(Cow::Owned(tag.into()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ErrorTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for ErrorTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ErrorTag({})", self.0)
    }
}

impl From<&'static str> for ErrorTag {
    fn from(tag: &'static str) -> Self {
        Self::from_static(tag)
    }
}

impl From<String> for ErrorTag {
    fn from(tag: String) -> Self {
        Self(Cow::Owned(tag))
    }
}

/// An error the catcher can map to a scenario.
///
/// Implementors declare their identity through [`ErrorTag`]s instead of
/// relying on `TypeId` downcasts, so scenario lookup works the same for
/// concrete error types and for abstract categories that have no type of
/// their own.
///
/// `ancestors` must be ordered most-specific first and must not contain the
/// exact tag; lookup checks the exact tag before walking the chain, and the
/// first registered ancestor found wins.
pub trait Catchable: fmt::Debug + fmt::Display + Send + Sync + 'static {
    /// Exact identity of this error's kind.
    fn tag(&self) -> ErrorTag;

    /// Ancestor chain, nearest first. Defaults to none.
    fn ancestors(&self) -> &[ErrorTag] {
        &[]
    }
}

/// Boxed carrier that moves a [`Catchable`] error through type-erased tower
/// error channels.
///
/// Handlers and inner middleware return `Err(Caught::new(err).into())`; the
/// catcher recovers the `Caught` by downcast at the interception boundary.
/// Boxed errors that are not a `Caught` are treated as unmapped and answered
/// with the default 500 scenario.
pub struct Caught(Box<dyn Catchable>);

impl Caught {
    pub fn new(err: impl Catchable) -> Self {
        Self(Box::new(err))
    }

    pub fn inner(&self) -> &dyn Catchable {
        self.0.as_ref()
    }

    pub fn tag(&self) -> ErrorTag {
        self.0.tag()
    }
}

impl fmt::Debug for Caught {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Caught({:?})", self.0)
    }
}

impl fmt::Display for Caught {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl std::error::Error for Caught {}

impl<E: Catchable> From<E> for Caught {
    fn from(err: E) -> Self {
        Self::new(err)
    }
}
