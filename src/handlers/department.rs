use crate::config::departments::departments;
use crate::error::AppResult;
use crate::response::ApiResponse;
use axum::response::IntoResponse;

#[utoipa::path(
    get,
    path = "/api/v1/departments",
    security(("jwt_token" = [])),
    responses(
        (status = 200, description = "Departments reports can be referred to", body = Vec<String>),
    ),
    tag = "reports"
)]
pub async fn list_departments() -> AppResult<impl IntoResponse> {
    Ok(ApiResponse::ok(departments().names().to_vec()))
}
