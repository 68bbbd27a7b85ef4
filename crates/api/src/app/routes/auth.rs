//! Public session endpoints: `POST /login`, `POST /refresh-token`.

use std::sync::Arc;

use axum::{extract::rejection::JsonRejection, Extension, Json};

use adminhub_users::{AuthToken, Credentials, RefreshTokenRequest};

use crate::app::errors::ApiResult;
use crate::app::services::AppServices;
use crate::context::RequestCtx;

pub async fn login(
    Extension(services): Extension<Arc<AppServices>>,
    RequestCtx(ctx): RequestCtx,
    body: Result<Json<Credentials>, JsonRejection>,
) -> ApiResult<Json<AuthToken>> {
    let Json(creds) = body?;
    Ok(Json(services.sessions.authenticate(&ctx, creds).await?))
}

pub async fn refresh(
    Extension(services): Extension<Arc<AppServices>>,
    RequestCtx(ctx): RequestCtx,
    body: Result<Json<RefreshTokenRequest>, JsonRejection>,
) -> ApiResult<Json<AuthToken>> {
    let Json(req) = body?;
    Ok(Json(services.sessions.refresh(&ctx, &req.refresh_token).await?))
}
