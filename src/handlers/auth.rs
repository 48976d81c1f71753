use crate::error::{AppError, AppResult};
use crate::middleware::AuthUser;
use crate::models::{Role, UserModel};
use crate::response::ApiResponse;
use crate::services::auth::{AuthService, LoginIdentity};
use crate::utils::cookie::{build_auth_cookie, build_clear_cookie};
use anyhow::anyhow;
use axum::{
    extract::rejection::JsonRejection,
    http::{header, HeaderValue},
    response::{IntoResponse, Response},
    Extension, Json,
};
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

/// Either `username`, or `employeeId` together with `department`.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub username: Option<String>,
    /// Department staff employee number
    pub employee_id: Option<String>,
    pub department: Option<String>,
    pub password: String,
}

impl LoginRequest {
    fn identity(&self) -> AppResult<LoginIdentity> {
        let present = |v: &Option<String>| {
            v.as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };

        if let Some(username) = present(&self.username) {
            return Ok(LoginIdentity::Username(username));
        }
        match (present(&self.employee_id), present(&self.department)) {
            (Some(employee_id), Some(department)) => Ok(LoginIdentity::Employee {
                employee_id,
                department,
            }),
            _ => Err(AppError::Validation(
                "Provide a username, or an employee ID together with a department".to_string(),
            )),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    /// JWT access token
    pub token: String,
    /// Token lifetime in seconds
    pub expires_in: u64,
    pub user: UserResponse,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: i32,
    pub username: String,
    pub display_name: String,
    pub role: Role,
    pub department: Option<String>,
    pub employee_id: Option<String>,
    pub is_active: bool,
}

impl From<UserModel> for UserResponse {
    fn from(user: UserModel) -> Self {
        Self {
            id: user.id,
            username: user.username,
            display_name: user.display_name,
            role: user.role,
            department: user.department,
            employee_id: user.employee_id,
            is_active: user.is_active,
        }
    }
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = AuthResponse),
        (status = 400, description = "Missing credentials", body = AppError),
        (status = 401, description = "Invalid credentials", body = AppError),
        (status = 403, description = "Account disabled", body = AppError),
    ),
    tag = "auth"
)]
pub async fn login(
    Extension(db): Extension<DatabaseConnection>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> AppResult<impl IntoResponse> {
    let Json(payload) = payload.map_err(|e| AppError::Validation(e.body_text()))?;
    let identity = payload.identity()?;

    let service = AuthService::new(db);
    let (user, access_token) = service.login(identity, &payload.password).await?;

    let expires_in = crate::utils::jwt::access_token_expiry_seconds();
    let response = AuthResponse {
        token: access_token.clone(),
        expires_in,
        user: UserResponse::from(user),
    };

    let mut http_response = ApiResponse::ok(response).into_response();
    append_set_cookie(
        &mut http_response,
        &build_auth_cookie(&access_token, expires_in),
    )?;
    Ok(http_response)
}

#[utoipa::path(
    get,
    path = "/api/v1/auth/me",
    security(("jwt_token" = [])),
    responses(
        (status = 200, description = "Current user retrieved successfully", body = UserResponse),
        (status = 401, description = "Unauthorized", body = AppError),
    ),
    tag = "auth"
)]
pub async fn get_current_user(
    Extension(db): Extension<DatabaseConnection>,
    auth_user: AuthUser,
) -> AppResult<impl IntoResponse> {
    let service = AuthService::new(db);
    let user = service.get_user_by_id(auth_user.user_id).await?;

    Ok(ApiResponse::ok(UserResponse::from(user)))
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    pub current_password: String,
    /// New password (min 8 characters)
    #[validate(length(min = 8))]
    pub new_password: String,
}

#[utoipa::path(
    put,
    path = "/api/v1/auth/password",
    security(("jwt_token" = [])),
    request_body = ChangePasswordRequest,
    responses(
        (status = 200, description = "Password changed successfully", body = String),
        (status = 400, description = "Validation error", body = AppError),
        (status = 401, description = "Unauthorized", body = AppError),
    ),
    tag = "auth"
)]
pub async fn change_password(
    Extension(db): Extension<DatabaseConnection>,
    auth_user: AuthUser,
    payload: Result<Json<ChangePasswordRequest>, JsonRejection>,
) -> AppResult<impl IntoResponse> {
    let Json(payload) = payload.map_err(|e| AppError::Validation(e.body_text()))?;
    payload
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let service = AuthService::new(db);
    service
        .change_password(
            auth_user.user_id,
            &payload.current_password,
            &payload.new_password,
        )
        .await?;

    Ok(ApiResponse::ok("Password changed successfully"))
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/logout",
    security(("jwt_token" = [])),
    responses(
        (status = 200, description = "Logout successful", body = String),
    ),
    tag = "auth"
)]
pub async fn logout() -> AppResult<impl IntoResponse> {
    let mut response = ApiResponse::ok("Logout successful").into_response();
    append_set_cookie(&mut response, &build_clear_cookie())?;
    Ok(response)
}

fn append_set_cookie(response: &mut Response, cookie_value: &str) -> AppResult<()> {
    let value = HeaderValue::from_str(cookie_value).map_err(|e| {
        AppError::Internal(anyhow!("Failed to build Set-Cookie header value: {}", e))
    })?;
    response.headers_mut().append(header::SET_COOKIE, value);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(username: Option<&str>, employee_id: Option<&str>, department: Option<&str>) -> LoginRequest {
        LoginRequest {
            username: username.map(str::to_string),
            employee_id: employee_id.map(str::to_string),
            department: department.map(str::to_string),
            password: "irrelevant".to_string(),
        }
    }

    #[test]
    fn username_wins_when_present() {
        let identity = request(Some(" re1 "), Some("E-7"), Some("EME (P)"))
            .identity()
            .unwrap();
        assert_eq!(identity, LoginIdentity::Username("re1".to_string()));
    }

    #[test]
    fn employee_login_needs_both_parts() {
        assert_eq!(
            request(None, Some("E-7"), Some("EME (P)")).identity().unwrap(),
            LoginIdentity::Employee {
                employee_id: "E-7".to_string(),
                department: "EME (P)".to_string(),
            }
        );
        assert!(request(None, Some("E-7"), None).identity().is_err());
        assert!(request(Some("  "), None, None).identity().is_err());
    }
}
