use std::sync::Arc;

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Extension, Path, Query,
    },
    http::StatusCode,
    routing::{get, patch, post},
    Json, Router,
};

use adminhub_auth::AuthUser;
use adminhub_infra::Page;
use adminhub_users::{
    CreateUserRequest, PasswordChangeRequest, USER_SCHEMA, UpdateUserRequest, User,
};

use crate::app::dto;
use crate::app::errors::ApiResult;
use crate::app::services::AppServices;
use crate::context::RequestCtx;

pub fn router() -> Router {
    Router::new()
        .route("/", post(create_user).get(list_users))
        .route("/me", get(me))
        .route("/me/password", patch(change_password))
        .route("/:id", get(view_user).patch(update_user).delete(delete_user))
}

pub async fn create_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<AuthUser>,
    RequestCtx(ctx): RequestCtx,
    body: Result<Json<CreateUserRequest>, JsonRejection>,
) -> ApiResult<Json<User>> {
    let Json(req) = body?;
    let user = services.users.create(&ctx, &caller, req.validate()?).await?;
    Ok(Json(user))
}

pub async fn list_users(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<AuthUser>,
    RequestCtx(ctx): RequestCtx,
    params: Result<Query<Vec<(String, String)>>, QueryRejection>,
) -> ApiResult<Json<Page<User>>> {
    let Query(params) = params?;
    let query = dto::list_query(&USER_SCHEMA, params)?;
    Ok(Json(services.users.list(&ctx, &caller, &query).await?))
}

pub async fn view_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<AuthUser>,
    RequestCtx(ctx): RequestCtx,
    Path(id): Path<String>,
) -> ApiResult<Json<User>> {
    let id = dto::parse_id(&id)?;
    Ok(Json(services.users.view(&ctx, &caller, id).await?))
}

pub async fn update_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<AuthUser>,
    RequestCtx(ctx): RequestCtx,
    Path(id): Path<String>,
    body: Result<Json<UpdateUserRequest>, JsonRejection>,
) -> ApiResult<Json<User>> {
    let id = dto::parse_id(&id)?;
    let Json(req) = body?;
    let user = services.users.update(&ctx, &caller, id, req.validate()?).await?;
    Ok(Json(user))
}

pub async fn delete_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<AuthUser>,
    RequestCtx(ctx): RequestCtx,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    let id = dto::parse_id(&id)?;
    services.users.delete(&ctx, &caller, id).await?;
    Ok(StatusCode::OK)
}

pub async fn me(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<AuthUser>,
    RequestCtx(ctx): RequestCtx,
) -> ApiResult<Json<User>> {
    Ok(Json(services.users.me(&ctx, &caller).await?))
}

pub async fn change_password(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<AuthUser>,
    RequestCtx(ctx): RequestCtx,
    body: Result<Json<PasswordChangeRequest>, JsonRejection>,
) -> ApiResult<StatusCode> {
    let Json(req) = body?;
    services
        .users
        .change_password(&ctx, &caller, req.validate()?)
        .await?;
    Ok(StatusCode::OK)
}
