use crate::error::{AppError, AppResult};
use crate::handlers::auth::UserResponse;
use crate::middleware::auth::AuthUser;
use crate::models::Role;
use crate::response::{page_bounds, ApiResponse, PaginatedResponse};
use crate::services::access::{authorize, Operation};
use crate::services::admin::{AdminService, NewUser, UserUpdate};
use axum::{
    extract::{rejection::JsonRejection, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use sea_orm::DatabaseConnection;
use serde::Deserialize;
use utoipa::ToSchema;
use validator::Validate;

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserRequest {
    #[validate(length(min = 3, max = 50))]
    pub username: String,
    #[validate(length(min = 1, max = 100))]
    pub display_name: String,
    #[validate(length(min = 8))]
    pub password: String,
    pub role: Role,
    /// Required when role is `department`
    pub department: Option<String>,
    pub employee_id: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserRequest {
    #[validate(length(min = 1, max = 100))]
    pub display_name: Option<String>,
    #[validate(length(min = 8))]
    pub password: Option<String>,
    pub role: Option<Role>,
    /// Empty string clears it
    pub department: Option<String>,
    pub employee_id: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ListUsersQuery {
    pub role: Option<Role>,
    pub page: Option<u64>,
    #[serde(alias = "per_page")]
    pub per_page: Option<u64>,
}

#[utoipa::path(
    get,
    path = "/api/v1/admin/users",
    security(("jwt_token" = [])),
    params(
        ("role" = Option<Role>, Query, description = "Filter by role"),
        ("page" = Option<u64>, Query, description = "Page number"),
        ("perPage" = Option<u64>, Query, description = "Items per page"),
    ),
    responses(
        (status = 200, description = "List of users", body = PaginatedResponse<UserResponse>),
        (status = 403, description = "Admin only", body = AppError),
    ),
    tag = "admin"
)]
pub async fn list_users(
    Extension(db): Extension<DatabaseConnection>,
    auth_user: AuthUser,
    Query(params): Query<ListUsersQuery>,
) -> AppResult<impl IntoResponse> {
    let (page, per_page) = page_bounds(params.page, params.per_page);

    let service = AdminService::new(db);
    let (users, total) = service
        .list_users(&auth_user, params.role, page, per_page)
        .await?;
    let items = users.into_iter().map(UserResponse::from).collect();

    Ok(ApiResponse::ok(PaginatedResponse::new(
        items, total, page, per_page,
    )))
}

#[utoipa::path(
    post,
    path = "/api/v1/admin/users",
    security(("jwt_token" = [])),
    request_body = CreateUserRequest,
    responses(
        (status = 201, description = "User created", body = UserResponse),
        (status = 400, description = "Validation error", body = AppError),
        (status = 403, description = "Admin only", body = AppError),
        (status = 409, description = "Username or employee ID already taken", body = AppError),
    ),
    tag = "admin"
)]
pub async fn create_user(
    Extension(db): Extension<DatabaseConnection>,
    auth_user: AuthUser,
    payload: Result<Json<CreateUserRequest>, JsonRejection>,
) -> AppResult<impl IntoResponse> {
    authorize(Some(&auth_user), Operation::ManageUsers, None)?;
    let Json(payload) = payload.map_err(|e| AppError::Validation(e.body_text()))?;
    payload
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let service = AdminService::new(db);
    let user = service
        .create_user(
            &auth_user,
            NewUser {
                username: payload.username,
                display_name: payload.display_name,
                password: payload.password,
                role: payload.role,
                department: payload.department,
                employee_id: payload.employee_id,
            },
        )
        .await?;

    Ok((StatusCode::CREATED, ApiResponse::ok(UserResponse::from(user))))
}

#[utoipa::path(
    put,
    path = "/api/v1/admin/users/{id}",
    security(("jwt_token" = [])),
    params(("id" = i32, Path, description = "User ID")),
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "User updated", body = UserResponse),
        (status = 400, description = "Validation error", body = AppError),
        (status = 403, description = "Admin only, or disabling own account", body = AppError),
        (status = 404, description = "User not found", body = AppError),
    ),
    tag = "admin"
)]
pub async fn update_user(
    Extension(db): Extension<DatabaseConnection>,
    auth_user: AuthUser,
    Path(id): Path<i32>,
    payload: Result<Json<UpdateUserRequest>, JsonRejection>,
) -> AppResult<impl IntoResponse> {
    authorize(Some(&auth_user), Operation::ManageUsers, None)?;
    let Json(payload) = payload.map_err(|e| AppError::Validation(e.body_text()))?;
    payload
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let service = AdminService::new(db);
    let user = service
        .update_user(
            &auth_user,
            id,
            UserUpdate {
                display_name: payload.display_name,
                password: payload.password,
                role: payload.role,
                department: payload.department,
                employee_id: payload.employee_id,
                is_active: payload.is_active,
            },
        )
        .await?;

    Ok(ApiResponse::ok(UserResponse::from(user)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/admin/users/{id}",
    security(("jwt_token" = [])),
    params(("id" = i32, Path, description = "User ID")),
    responses(
        (status = 200, description = "User deleted", body = String),
        (status = 403, description = "Admin only, or deleting own account", body = AppError),
        (status = 404, description = "User not found", body = AppError),
        (status = 409, description = "User has filed reports", body = AppError),
    ),
    tag = "admin"
)]
pub async fn delete_user(
    Extension(db): Extension<DatabaseConnection>,
    auth_user: AuthUser,
    Path(id): Path<i32>,
) -> AppResult<impl IntoResponse> {
    let service = AdminService::new(db);
    service.delete_user(&auth_user, id).await?;
    Ok(ApiResponse::ok("User deleted"))
}
