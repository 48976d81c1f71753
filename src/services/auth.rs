use crate::{
    config::departments::departments,
    error::{AppError, AppResult},
    models::{user, User, UserModel},
    utils::{encode_access_token, hash_password, password::check_password_policy, verify_password},
};
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};

/// How an account identifies itself at login.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginIdentity {
    Username(String),
    /// Department staff sign in with their employee number and department.
    Employee {
        employee_id: String,
        department: String,
    },
}

pub struct AuthService {
    db: DatabaseConnection,
}

impl AuthService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Login user
    /// Returns (user_model, access_token)
    pub async fn login(
        &self,
        identity: LoginIdentity,
        password: &str,
    ) -> AppResult<(UserModel, String)> {
        let user = self
            .find_by_identity(&identity)
            .await?
            .ok_or(AppError::Unauthorized)?;

        let is_valid = verify_password(password, &user.password_hash)?;
        if !is_valid {
            tracing::debug!(user_id = user.id, "Login rejected: wrong password");
            return Err(AppError::Unauthorized);
        }

        if !user.is_active {
            return Err(AppError::Forbidden("Account is disabled".to_string()));
        }

        let access_token = encode_access_token(user.id)?;
        tracing::info!(user_id = user.id, role = %user.role, "User logged in");

        Ok((user, access_token))
    }

    /// Get user by ID
    pub async fn get_user_by_id(&self, id: i32) -> AppResult<UserModel> {
        User::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or_else(|| AppError::not_found("User"))
    }

    /// Change password for authenticated user
    pub async fn change_password(
        &self,
        user_id: i32,
        current_password: &str,
        new_password: &str,
    ) -> AppResult<()> {
        let user = self.get_user_by_id(user_id).await?;
        let is_valid = verify_password(current_password, &user.password_hash)?;
        if !is_valid {
            return Err(AppError::Validation(
                "Current password is incorrect".to_string(),
            ));
        }
        check_password_policy(new_password).map_err(AppError::Validation)?;

        let new_hash = hash_password(new_password)?;
        let now = chrono::Utc::now().naive_utc();
        let mut active: user::ActiveModel = user.into();
        active.password_hash = Set(new_hash);
        active.updated_at = Set(now);
        active.update(&self.db).await?;
        Ok(())
    }

    async fn find_by_identity(&self, identity: &LoginIdentity) -> AppResult<Option<UserModel>> {
        let user = match identity {
            LoginIdentity::Username(username) => {
                User::find()
                    .filter(user::Column::Username.eq(username.trim()))
                    .one(&self.db)
                    .await?
            }
            LoginIdentity::Employee {
                employee_id,
                department,
            } => {
                // An unknown department can never match an account.
                let Some(department) = departments().resolve(department) else {
                    return Ok(None);
                };
                User::find()
                    .filter(user::Column::EmployeeId.eq(employee_id.trim()))
                    .filter(user::Column::Department.eq(department))
                    .one(&self.db)
                    .await?
            }
        };
        Ok(user)
    }
}
