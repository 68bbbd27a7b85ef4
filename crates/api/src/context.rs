//! Per-request execution context.

use std::convert::Infallible;
use std::time::Duration;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use adminhub_infra::Ctx;

/// Storage deadline applied to every request, installed as an extension.
#[derive(Debug, Clone, Copy)]
pub struct RequestTimeout(pub Duration);

/// Cancellation/deadline context for the current request.
///
/// Dropping the handler future (client gone, outer timeout) drops the context
/// with it, abandoning any in-flight storage call.
#[derive(Debug, Clone)]
pub struct RequestCtx(pub Ctx);

#[axum::async_trait]
impl<S: Send + Sync> FromRequestParts<S> for RequestCtx {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let ctx = match parts.extensions.get::<RequestTimeout>() {
            Some(RequestTimeout(timeout)) => Ctx::with_timeout(*timeout),
            None => Ctx::background(),
        };
        Ok(Self(ctx))
    }
}
