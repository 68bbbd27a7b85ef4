use std::sync::Arc;

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Extension, Path, Query,
    },
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};

use adminhub_auth::AuthUser;
use adminhub_countries::{COUNTRY_SCHEMA, Country, CreateCountryRequest, UpdateCountryRequest};
use adminhub_infra::Page;

use crate::app::dto;
use crate::app::errors::ApiResult;
use crate::app::services::AppServices;
use crate::context::RequestCtx;

pub fn router() -> Router {
    Router::new()
        .route("/", post(create_country).get(list_countries))
        .route(
            "/:id",
            get(view_country).patch(update_country).delete(delete_country),
        )
}

pub async fn create_country(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<AuthUser>,
    RequestCtx(ctx): RequestCtx,
    body: Result<Json<CreateCountryRequest>, JsonRejection>,
) -> ApiResult<Json<Country>> {
    let Json(req) = body?;
    let country = services.countries.create(&ctx, &caller, req.validate()?).await?;
    Ok(Json(country))
}

pub async fn list_countries(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<AuthUser>,
    RequestCtx(ctx): RequestCtx,
    params: Result<Query<Vec<(String, String)>>, QueryRejection>,
) -> ApiResult<Json<Page<Country>>> {
    let Query(params) = params?;
    let query = dto::list_query(&COUNTRY_SCHEMA, params)?;
    Ok(Json(services.countries.list(&ctx, &caller, &query).await?))
}

pub async fn view_country(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<AuthUser>,
    RequestCtx(ctx): RequestCtx,
    Path(id): Path<String>,
) -> ApiResult<Json<Country>> {
    let id = dto::parse_id(&id)?;
    Ok(Json(services.countries.view(&ctx, &caller, id).await?))
}

pub async fn update_country(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<AuthUser>,
    RequestCtx(ctx): RequestCtx,
    Path(id): Path<String>,
    body: Result<Json<UpdateCountryRequest>, JsonRejection>,
) -> ApiResult<Json<Country>> {
    let id = dto::parse_id(&id)?;
    let Json(req) = body?;
    let country = services
        .countries
        .update(&ctx, &caller, id, req.validate()?)
        .await?;
    Ok(Json(country))
}

pub async fn delete_country(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<AuthUser>,
    RequestCtx(ctx): RequestCtx,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    let id = dto::parse_id(&id)?;
    services.countries.delete(&ctx, &caller, id).await?;
    Ok(StatusCode::OK)
}
