use axum::{routing::get, Router};

pub mod auth;
pub mod countries;
pub mod rbac;
pub mod system;
pub mod users;

/// Router for all authenticated `/v1` endpoints.
pub fn router() -> Router {
    Router::new()
        .nest("/users", users::router())
        .nest("/countries", countries::router())
        .route("/permissions/explain", get(rbac::explain))
}
