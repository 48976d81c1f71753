use crate::{
    config::departments::departments,
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::{user, Role, User, UserModel},
    services::access::{authorize, guard_self_account, AccountChange, Operation},
    utils::{hash_password, password::check_password_policy},
};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set,
};

#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub display_name: String,
    pub password: String,
    pub role: Role,
    pub department: Option<String>,
    pub employee_id: Option<String>,
}

/// Partial account update. Empty `department`/`employee_id` strings clear
/// the value.
#[derive(Debug, Clone, Default)]
pub struct UserUpdate {
    pub display_name: Option<String>,
    pub password: Option<String>,
    pub role: Option<Role>,
    pub department: Option<String>,
    pub employee_id: Option<String>,
    pub is_active: Option<bool>,
}

pub struct AdminService {
    db: DatabaseConnection,
}

impl AdminService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn list_users(
        &self,
        actor: &AuthUser,
        role: Option<Role>,
        page: u64,
        per_page: u64,
    ) -> AppResult<(Vec<UserModel>, u64)> {
        authorize(Some(actor), Operation::ManageUsers, None)?;

        let mut query = User::find();
        if let Some(role) = role {
            query = query.filter(user::Column::Role.eq(role));
        }
        let paginator = query
            .order_by_asc(user::Column::Username)
            .paginate(&self.db, per_page);

        let total = paginator.num_items().await?;
        let users = paginator.fetch_page(page.saturating_sub(1)).await?;
        Ok((users, total))
    }

    pub async fn create_user(&self, actor: &AuthUser, input: NewUser) -> AppResult<UserModel> {
        authorize(Some(actor), Operation::ManageUsers, None)?;

        let username = input.username.trim();
        if username.is_empty() {
            return Err(AppError::Validation("Username is required".to_string()));
        }
        let display_name = input.display_name.trim();
        if display_name.is_empty() {
            return Err(AppError::Validation("Display name is required".to_string()));
        }
        check_password_policy(&input.password).map_err(AppError::Validation)?;

        let department = affiliation(input.role, input.department.as_deref())?;
        let employee_id = blank_to_none(input.employee_id.as_deref());

        let taken = User::find()
            .filter(user::Column::Username.eq(username))
            .count(&self.db)
            .await?;
        if taken > 0 {
            return Err(AppError::Conflict(format!(
                "Username '{}' is already taken",
                username
            )));
        }
        self.ensure_employee_unique(employee_id.as_deref(), department.as_deref(), None)
            .await?;

        let now = chrono::Utc::now().naive_utc();
        let model = user::ActiveModel {
            username: Set(username.to_string()),
            display_name: Set(display_name.to_string()),
            password_hash: Set(hash_password(&input.password)?),
            role: Set(input.role),
            department: Set(department),
            employee_id: Set(employee_id),
            is_active: Set(true),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };
        let created = model.insert(&self.db).await?;

        tracing::info!(
            user_id = created.id,
            role = %created.role,
            actor_id = actor.user_id,
            "User account created"
        );
        Ok(created)
    }

    pub async fn update_user(
        &self,
        actor: &AuthUser,
        user_id: i32,
        update: UserUpdate,
    ) -> AppResult<UserModel> {
        authorize(Some(actor), Operation::ManageUsers, None)?;
        if update.is_active == Some(false) {
            guard_self_account(actor, user_id, AccountChange::Disable)?;
        }

        let existing = User::find_by_id(user_id)
            .one(&self.db)
            .await?
            .ok_or_else(|| AppError::not_found("User"))?;

        let role = update.role.unwrap_or(existing.role);
        let department_input = match update.department.as_deref() {
            Some(raw) => Some(raw),
            None => existing.department.as_deref(),
        };
        let department = affiliation(role, department_input)?;
        let employee_id = match update.employee_id.as_deref() {
            Some(raw) => blank_to_none(Some(raw)),
            None => existing.employee_id.clone(),
        };
        if employee_id != existing.employee_id || department != existing.department {
            self.ensure_employee_unique(employee_id.as_deref(), department.as_deref(), Some(user_id))
                .await?;
        }

        let mut active: user::ActiveModel = existing.into();
        if let Some(display_name) = update.display_name.as_deref() {
            let display_name = display_name.trim();
            if display_name.is_empty() {
                return Err(AppError::Validation("Display name is required".to_string()));
            }
            active.display_name = Set(display_name.to_string());
        }
        if let Some(password) = update.password.as_deref() {
            check_password_policy(password).map_err(AppError::Validation)?;
            active.password_hash = Set(hash_password(password)?);
        }
        if let Some(is_active) = update.is_active {
            active.is_active = Set(is_active);
        }
        active.role = Set(role);
        active.department = Set(department);
        active.employee_id = Set(employee_id);
        active.updated_at = Set(chrono::Utc::now().naive_utc());

        let updated = active.update(&self.db).await?;
        tracing::info!(user_id, actor_id = actor.user_id, "User account updated");
        Ok(updated)
    }

    pub async fn delete_user(&self, actor: &AuthUser, user_id: i32) -> AppResult<()> {
        authorize(Some(actor), Operation::ManageUsers, None)?;
        guard_self_account(actor, user_id, AccountChange::Delete)?;

        User::find_by_id(user_id)
            .one(&self.db)
            .await?
            .ok_or_else(|| AppError::not_found("User"))?;

        let result = User::delete_by_id(user_id).exec(&self.db).await;
        if let Err(err) = result {
            // Reports keep a foreign key to their creator.
            if matches!(
                err.sql_err(),
                Some(sea_orm::SqlErr::ForeignKeyConstraintViolation(_))
            ) {
                return Err(AppError::Conflict(
                    "User has filed reports; disable the account instead".to_string(),
                ));
            }
            return Err(err.into());
        }

        tracing::warn!(user_id, actor_id = actor.user_id, "User account deleted");
        Ok(())
    }

    async fn ensure_employee_unique(
        &self,
        employee_id: Option<&str>,
        department: Option<&str>,
        exclude_user: Option<i32>,
    ) -> AppResult<()> {
        let Some(employee_id) = employee_id else {
            return Ok(());
        };

        let mut query = User::find().filter(user::Column::EmployeeId.eq(employee_id));
        query = match department {
            Some(department) => query.filter(user::Column::Department.eq(department)),
            None => query.filter(user::Column::Department.is_null()),
        };
        if let Some(id) = exclude_user {
            query = query.filter(user::Column::Id.ne(id));
        }

        if query.count(&self.db).await? > 0 {
            return Err(AppError::Conflict(format!(
                "Employee ID '{}' is already registered for this department",
                employee_id
            )));
        }
        Ok(())
    }
}

/// Canonical department for an account. Department accounts must name a
/// known department; other roles may carry one optionally.
fn affiliation(role: Role, raw: Option<&str>) -> AppResult<Option<String>> {
    match blank_to_none(raw) {
        Some(name) => departments()
            .resolve(&name)
            .map(|canonical| Some(canonical.to_string()))
            .ok_or_else(|| AppError::Validation(format!("Unknown department '{}'", name))),
        None if role == Role::Department => Err(AppError::Validation(
            "Department accounts require a department".to_string(),
        )),
        None => Ok(None),
    }
}

fn blank_to_none(raw: Option<&str>) -> Option<String> {
    raw.map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn department_role_requires_known_department() {
        assert!(matches!(
            affiliation(Role::Department, None),
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            affiliation(Role::Department, Some("  ")),
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            affiliation(Role::Department, Some("Accounts")),
            Err(AppError::Validation(_))
        ));
        assert_eq!(
            affiliation(Role::Department, Some("mme (p)")).unwrap(),
            Some("MME (P)".to_string())
        );
    }

    #[test]
    fn other_roles_may_omit_department() {
        assert_eq!(affiliation(Role::Oe, None).unwrap(), None);
        assert_eq!(affiliation(Role::Admin, Some("")).unwrap(), None);
    }
}
