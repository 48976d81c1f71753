//! Report lifecycle state and its two public projections.
//!
//! Only [`LifecycleState`] is persisted. `status` and `currentStage` are
//! derived from it so they can never drift apart.

use sea_orm::entity::prelude::*;
use sea_orm::Iterable;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
    ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
#[serde(rename_all = "snake_case")]
pub enum LifecycleState {
    /// Waiting on the referred department.
    #[sea_orm(string_value = "created")]
    Created,
    /// Department has acted; waiting on OE review.
    #[sea_orm(string_value = "department_acted")]
    DepartmentActed,
    /// OE approved; waiting on the Resident Engineer.
    #[sea_orm(string_value = "oe_approved")]
    OeApproved,
    /// OE rejected and returned the report to the department.
    #[sea_orm(string_value = "oe_rejected")]
    OeRejected,
    /// OE referred the report to a (possibly different) department.
    #[sea_orm(string_value = "oe_referred")]
    OeReferred,
    #[sea_orm(string_value = "closed")]
    Closed,
    #[sea_orm(string_value = "final_rejected")]
    FinalRejected,
    /// Resident Engineer sent the report back for rework.
    #[sea_orm(string_value = "needs_revision")]
    NeedsRevision,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum ReportStatus {
    Pending,
    #[serde(rename = "Under Review")]
    UnderReview,
    #[serde(rename = "Needs Revision")]
    NeedsRevision,
    Rejected,
    Closed,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum ReportStage {
    Department,
    #[serde(rename = "OE Department")]
    OeDepartment,
    #[serde(rename = "Resident Engineer")]
    ResidentEngineer,
    Completed,
}

impl ReportStatus {
    pub const ALL: [ReportStatus; 5] = [
        ReportStatus::Pending,
        ReportStatus::UnderReview,
        ReportStatus::NeedsRevision,
        ReportStatus::Rejected,
        ReportStatus::Closed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ReportStatus::Pending => "Pending",
            ReportStatus::UnderReview => "Under Review",
            ReportStatus::NeedsRevision => "Needs Revision",
            ReportStatus::Rejected => "Rejected",
            ReportStatus::Closed => "Closed",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.as_str() == raw.trim())
    }
}

impl ReportStage {
    pub const ALL: [ReportStage; 4] = [
        ReportStage::Department,
        ReportStage::OeDepartment,
        ReportStage::ResidentEngineer,
        ReportStage::Completed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ReportStage::Department => "Department",
            ReportStage::OeDepartment => "OE Department",
            ReportStage::ResidentEngineer => "Resident Engineer",
            ReportStage::Completed => "Completed",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.as_str() == raw.trim())
    }
}

impl std::fmt::Display for ReportStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::fmt::Display for ReportStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl LifecycleState {
    pub fn status(&self) -> ReportStatus {
        match self {
            LifecycleState::Created | LifecycleState::OeReferred => ReportStatus::Pending,
            LifecycleState::DepartmentActed | LifecycleState::OeApproved => {
                ReportStatus::UnderReview
            }
            LifecycleState::OeRejected | LifecycleState::FinalRejected => ReportStatus::Rejected,
            LifecycleState::Closed => ReportStatus::Closed,
            LifecycleState::NeedsRevision => ReportStatus::NeedsRevision,
        }
    }

    pub fn stage(&self) -> ReportStage {
        match self {
            LifecycleState::Created
            | LifecycleState::OeRejected
            | LifecycleState::OeReferred
            | LifecycleState::NeedsRevision => ReportStage::Department,
            LifecycleState::DepartmentActed => ReportStage::OeDepartment,
            LifecycleState::OeApproved => ReportStage::ResidentEngineer,
            LifecycleState::Closed | LifecycleState::FinalRejected => ReportStage::Completed,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.stage() == ReportStage::Completed
    }

    /// Resolve an explicit status/stage pair back to a state.
    ///
    /// `(Pending, Department)` is shared by `Created` and `OeReferred`; the
    /// pair alone cannot tell them apart, so it resolves to `Created`.
    pub fn from_projection(status: ReportStatus, stage: ReportStage) -> Option<Self> {
        if (status, stage) == (ReportStatus::Pending, ReportStage::Department) {
            return Some(LifecycleState::Created);
        }
        Self::iter().find(|s| s.status() == status && s.stage() == stage)
    }

    /// Every state whose projection satisfies `pred`.
    pub fn matching(pred: impl Fn(&LifecycleState) -> bool) -> Vec<LifecycleState> {
        Self::iter().filter(|s| pred(s)).collect()
    }
}
