use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use axum::body::Body;
use axum::http::Request;
use axum::response::Response;
use tower::{Layer, Service};

use crate::catcher::Catcher;
use crate::error::BoxError;

/// Tower layer that installs a [`Catcher`] around a fallible service.
///
/// Install it as the outermost fallible layer so it observes errors from
/// every inner layer and handler. Successful responses pass through
/// untouched; errors are mapped by the catcher. Resolver faults surface as
/// service errors, so a host-level fallback (axum's `HandleErrorLayer`, for
/// instance) still belongs above this layer.
#[derive(Clone)]
pub struct CatcherLayer {
    catcher: Arc<Catcher>,
}

impl CatcherLayer {
    pub fn new(catcher: Catcher) -> Self {
        Self {
            catcher: Arc::new(catcher),
        }
    }

    /// Share an already wrapped catcher, e.g. one that is also consulted
    /// elsewhere in the application.
    pub fn from_arc(catcher: Arc<Catcher>) -> Self {
        Self { catcher }
    }
}

impl<S> Layer<S> for CatcherLayer {
    type Service = CatcherService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        CatcherService {
            inner,
            catcher: self.catcher.clone(),
        }
    }
}

#[derive(Clone)]
pub struct CatcherService<S> {
    inner: S,
    catcher: Arc<Catcher>,
}

impl<S> Service<Request<Body>> for CatcherService<S>
where
    S: Service<Request<Body>, Response = Response> + Clone + Send + 'static,
    S::Future: Send + 'static,
    S::Error: Into<BoxError> + Send,
{
    type Response = Response;
    type Error = BoxError;
    type Future = Pin<Box<dyn Future<Output = Result<Response, BoxError>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx).map_err(Into::into)
    }

    fn call(&mut self, request: Request<Body>) -> Self::Future {
        let catcher = self.catcher.clone();
        let mut inner = self.inner.clone();

        Box::pin(async move {
            // Keep a copy of the request head so resolvers can inspect the
            // method, URI and headers after the request has been consumed.
            let (parts, body) = request.into_parts();
            let request = Request::from_parts(parts.clone(), body);

            match inner.call(request).await {
                Ok(response) => Ok(response),
                Err(err) => catcher.catch_error(err.into(), &parts).await,
            }
        })
    }
}
