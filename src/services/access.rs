//! Authorization checks that run before any report or account mutation.

use crate::{
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::Role,
};

const ALL_ROLES: &[Role] = &[
    Role::ShiftEngineer,
    Role::Department,
    Role::Oe,
    Role::ResidentEngineer,
    Role::Admin,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    ViewReports,
    CreateReport,
    DepartmentAction,
    OeAction,
    OeRemark,
    ResidentAction,
    AddRemark,
    AdminUpdateReport,
    AdminDeleteReport,
    ManageUsers,
}

impl Operation {
    /// The role × operation table.
    pub const fn allowed_roles(self) -> &'static [Role] {
        match self {
            Operation::ViewReports | Operation::AddRemark => ALL_ROLES,
            Operation::CreateReport => &[Role::ShiftEngineer],
            Operation::DepartmentAction => &[Role::Department],
            Operation::OeAction | Operation::OeRemark => &[Role::Oe],
            Operation::ResidentAction => &[Role::ResidentEngineer],
            Operation::AdminUpdateReport | Operation::AdminDeleteReport | Operation::ManageUsers => {
                &[Role::Admin]
            }
        }
    }

    /// Department accounts may only perform these on reports referred to
    /// their own department.
    pub const fn is_department_scoped(self) -> bool {
        matches!(self, Operation::DepartmentAction | Operation::AddRemark)
    }

    pub fn permits(self, role: Role) -> bool {
        self.allowed_roles().contains(&role)
    }
}

/// Check that `actor` may perform `op`, optionally against a report
/// currently referred to `refer_to`.
pub fn authorize(actor: Option<&AuthUser>, op: Operation, refer_to: Option<&str>) -> AppResult<()> {
    let actor = actor.ok_or(AppError::Unauthorized)?;

    if !op.permits(actor.role) {
        return Err(AppError::Forbidden(format!(
            "Role '{}' may not perform {:?}",
            actor.role, op
        )));
    }

    if actor.role == Role::Department && op.is_department_scoped() {
        if let Some(refer_to) = refer_to {
            let own = actor.department.as_deref().unwrap_or_default();
            if !own.eq_ignore_ascii_case(refer_to.trim()) {
                return Err(AppError::Forbidden(format!(
                    "Report is assigned to {}, not your department",
                    refer_to
                )));
            }
        }
    }

    Ok(())
}

/// Account changes an administrator may not apply to their own account.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccountChange {
    Delete,
    Disable,
}

pub fn guard_self_account(actor: &AuthUser, target_user_id: i32, change: AccountChange) -> AppResult<()> {
    if actor.user_id != target_user_id {
        return Ok(());
    }
    let verb = match change {
        AccountChange::Delete => "delete",
        AccountChange::Disable => "disable",
    };
    Err(AppError::Forbidden(format!("You cannot {verb} your own account")))
}
