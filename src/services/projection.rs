//! Role-specific report views, computed at read time.

use crate::{
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::{report, LifecycleState, ReportStage, ReportStatus, Role},
};
use sea_orm::{ColumnTrait, QueryFilter, Select};
use serde::Serialize;
use utoipa::ToSchema;

/// Which reports an actor sees in the default listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportScope {
    All,
    States(Vec<LifecycleState>),
    Department {
        department: String,
        states: Vec<LifecycleState>,
    },
}

pub fn scope_for(actor: &AuthUser) -> AppResult<ReportScope> {
    match actor.role {
        Role::ShiftEngineer | Role::Admin => Ok(ReportScope::All),
        Role::Department => {
            let department = actor.department.clone().ok_or_else(|| {
                AppError::Forbidden("Department account has no department assigned".to_string())
            })?;
            let states = LifecycleState::matching(|s| {
                s.stage() == ReportStage::Department
                    && !matches!(s.status(), ReportStatus::Closed | ReportStatus::Rejected)
            });
            Ok(ReportScope::Department { department, states })
        }
        Role::Oe => Ok(ReportScope::States(LifecycleState::matching(|s| {
            s.stage() == ReportStage::OeDepartment && s.status() != ReportStatus::Closed
        }))),
        Role::ResidentEngineer => Ok(ReportScope::States(LifecycleState::matching(|s| {
            s.stage() == ReportStage::ResidentEngineer
        }))),
    }
}

impl ReportScope {
    pub fn apply(&self, query: Select<report::Entity>) -> Select<report::Entity> {
        match self {
            ReportScope::All => query,
            ReportScope::States(states) => {
                query.filter(report::Column::State.is_in(states.iter().copied()))
            }
            ReportScope::Department { department, states } => query
                .filter(report::Column::ReferTo.eq(department.as_str()))
                .filter(report::Column::State.is_in(states.iter().copied())),
        }
    }
}

/// States whose projected status is `status`.
pub fn states_with_status(status: ReportStatus) -> Vec<LifecycleState> {
    LifecycleState::matching(|s| s.status() == status)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct StatusCount {
    pub status: ReportStatus,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReportStats {
    pub total: u64,
    pub by_status: Vec<StatusCount>,
}

/// Fold per-state counts into per-status counts, listing every status.
pub fn fold_status_counts(per_state: &[(LifecycleState, i64)]) -> ReportStats {
    let by_status: Vec<StatusCount> = ReportStatus::ALL
        .into_iter()
        .map(|status| StatusCount {
            status,
            count: per_state
                .iter()
                .filter(|(state, _)| state.status() == status)
                .map(|(_, n)| (*n).max(0) as u64)
                .sum(),
        })
        .collect();
    let total = by_status.iter().map(|c| c.count).sum();
    ReportStats { total, by_status }
}
