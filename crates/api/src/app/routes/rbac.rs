//! Authorization diagnostics: why the caller may or may not do something.

use std::sync::Arc;

use axum::{
    extract::{rejection::QueryRejection, Extension, Query},
    Json,
};
use serde::Deserialize;

use adminhub_auth::{Action, AuthUser, AuthorizationExplanation, ResourceObject};

use crate::app::errors::ApiResult;
use crate::app::services::AppServices;

#[derive(Debug, Deserialize)]
pub struct ExplainQuery {
    pub object: ResourceObject,
    pub action: Action,
}

/// GET /v1/permissions/explain?object=country&action=delete_all
///
/// Always answers for the caller's own role.
pub async fn explain(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<AuthUser>,
    query: Result<Query<ExplainQuery>, QueryRejection>,
) -> ApiResult<Json<AuthorizationExplanation>> {
    let Query(q) = query?;
    Ok(Json(services.policy.explain(caller.role, q.object, q.action)))
}
