//! Report lifecycle engine.
//!
//! Pure decision logic: given a report's current state and assignment plus a
//! requested action, compute the next state, the remark that documents it and
//! any field changes. Nothing here touches the database; the report service
//! persists the returned [`Transition`].

use crate::{
    config::departments::DepartmentDirectory,
    error::{AppError, AppResult},
    models::{LifecycleState, ReportStage},
    services::access::Operation,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OeDecision {
    Approve,
    Reject,
    Refer { department: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResidentDecision {
    Close,
    Reject,
    Revision { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportAction {
    DepartmentAction {
        text: String,
    },
    Oe {
        decision: OeDecision,
        note: Option<String>,
    },
    OeRemark {
        text: String,
    },
    Resident {
        decision: ResidentDecision,
        note: Option<String>,
    },
    AddRemark {
        text: String,
    },
}

impl OeDecision {
    /// Parse the `action` field of an OE request.
    pub fn parse(action: &str, department: Option<String>) -> AppResult<Self> {
        match action.trim().to_ascii_lowercase().as_str() {
            "approve" => Ok(OeDecision::Approve),
            "reject" => Ok(OeDecision::Reject),
            "refer" => Ok(OeDecision::Refer {
                department: department.unwrap_or_default(),
            }),
            other => Err(AppError::Validation(format!(
                "Unknown OE action '{}', expected approve, reject or refer",
                other
            ))),
        }
    }
}

impl ResidentDecision {
    /// Parse the `action` field of a Resident Engineer request.
    pub fn parse(action: &str, revision_reason: Option<String>) -> AppResult<Self> {
        match action.trim().to_ascii_lowercase().as_str() {
            "close" => Ok(ResidentDecision::Close),
            "reject" => Ok(ResidentDecision::Reject),
            "revision" => Ok(ResidentDecision::Revision {
                reason: revision_reason.unwrap_or_default(),
            }),
            other => Err(AppError::Validation(format!(
                "Unknown resident action '{}', expected close, reject or revision",
                other
            ))),
        }
    }
}

impl ReportAction {
    pub fn operation(&self) -> Operation {
        match self {
            ReportAction::DepartmentAction { .. } => Operation::DepartmentAction,
            ReportAction::Oe { .. } => Operation::OeAction,
            ReportAction::OeRemark { .. } => Operation::OeRemark,
            ReportAction::Resident { .. } => Operation::ResidentAction,
            ReportAction::AddRemark { .. } => Operation::AddRemark,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ReportAction::DepartmentAction { .. } => "department_action",
            ReportAction::Oe { decision, .. } => match decision {
                OeDecision::Approve => "oe_approve",
                OeDecision::Reject => "oe_reject",
                OeDecision::Refer { .. } => "oe_refer",
            },
            ReportAction::OeRemark { .. } => "oe_remark",
            ReportAction::Resident { decision, .. } => match decision {
                ResidentDecision::Close => "resident_close",
                ResidentDecision::Reject => "resident_reject",
                ResidentDecision::Revision { .. } => "resident_revision",
            },
            ReportAction::AddRemark { .. } => "add_remark",
        }
    }
}

/// Result of a successful action. `refer_to` and `department_action` are
/// `Some` only when the field changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub from: LifecycleState,
    pub to: LifecycleState,
    pub refer_to: Option<String>,
    pub department_action: Option<String>,
    pub remark: String,
}

impl Transition {
    fn remark_only(state: LifecycleState, remark: String) -> Self {
        Self {
            from: state,
            to: state,
            refer_to: None,
            department_action: None,
            remark,
        }
    }

    fn to_state(from: LifecycleState, to: LifecycleState, remark: String) -> Self {
        Self {
            from,
            to,
            refer_to: None,
            department_action: None,
            remark,
        }
    }
}

/// Decide the outcome of `action` on a report in `current`, referred to
/// `refer_to`.
///
/// State preconditions are checked before the payload, so an action on a
/// report that has moved on fails with `InvalidState` whatever it carries.
pub fn apply(
    current: LifecycleState,
    refer_to: &str,
    action: &ReportAction,
    departments: &DepartmentDirectory,
) -> AppResult<Transition> {
    match action {
        ReportAction::DepartmentAction { text } => {
            if !matches!(
                current,
                LifecycleState::Created | LifecycleState::OeReferred | LifecycleState::NeedsRevision
            ) {
                return Err(invalid_state(current, "department action"));
            }
            let text = required(text, "Department action")?;
            Ok(Transition {
                department_action: Some(text.to_string()),
                ..Transition::to_state(
                    current,
                    LifecycleState::DepartmentActed,
                    format!("Department action submitted: {text}"),
                )
            })
        }
        ReportAction::Oe { decision, note } => {
            if current.stage() != ReportStage::OeDepartment {
                return Err(invalid_state(current, "OE action"));
            }
            match decision {
                OeDecision::Approve => Ok(Transition::to_state(
                    current,
                    LifecycleState::OeApproved,
                    with_note(
                        "Approved by OE Department and forwarded to Resident Engineer".to_string(),
                        note,
                    ),
                )),
                OeDecision::Reject => Ok(Transition::to_state(
                    current,
                    LifecycleState::OeRejected,
                    with_note(
                        format!("Rejected by OE Department and returned to {refer_to}"),
                        note,
                    ),
                )),
                OeDecision::Refer { department } => {
                    let department = required(department, "Department to refer to")?;
                    let department = departments.resolve(department).ok_or_else(|| {
                        AppError::Validation(format!("Unknown department '{}'", department))
                    })?;
                    Ok(Transition {
                        refer_to: Some(department.to_string()),
                        ..Transition::to_state(
                            current,
                            LifecycleState::OeReferred,
                            with_note(
                                format!("Report referred to {department} by OE Department"),
                                note,
                            ),
                        )
                    })
                }
            }
        }
        ReportAction::Resident { decision, note } => {
            if current.stage() != ReportStage::ResidentEngineer {
                return Err(invalid_state(current, "Resident Engineer action"));
            }
            match decision {
                ResidentDecision::Close => Ok(Transition::to_state(
                    current,
                    LifecycleState::Closed,
                    with_note("Report closed by Resident Engineer".to_string(), note),
                )),
                ResidentDecision::Reject => Ok(Transition::to_state(
                    current,
                    LifecycleState::FinalRejected,
                    with_note("Report rejected by Resident Engineer".to_string(), note),
                )),
                ResidentDecision::Revision { reason } => {
                    let reason = required(reason, "Revision reason")?;
                    Ok(Transition::to_state(
                        current,
                        LifecycleState::NeedsRevision,
                        format!("Revision requested by Resident Engineer: {reason}"),
                    ))
                }
            }
        }
        ReportAction::OeRemark { text } | ReportAction::AddRemark { text } => {
            let text = required(text, "Remark")?;
            Ok(Transition::remark_only(current, text.to_string()))
        }
    }
}

/// Audit remark appended by an administrative overwrite.
pub fn admin_audit_remark(admin_name: &str, changed_fields: &[&str]) -> String {
    if changed_fields.is_empty() {
        format!("Report updated by administrator {admin_name} (no field changes)")
    } else {
        format!(
            "Report updated by administrator {admin_name}: {}",
            changed_fields.join(", ")
        )
    }
}

fn required<'a>(value: &'a str, field: &str) -> AppResult<&'a str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AppError::Validation(format!("{field} is required")));
    }
    Ok(trimmed)
}

fn with_note(base: String, note: &Option<String>) -> String {
    match note.as_deref().map(str::trim).filter(|n| !n.is_empty()) {
        Some(note) => format!("{base}. Remarks: {note}"),
        None => base,
    }
}

fn invalid_state(current: LifecycleState, what: &str) -> AppError {
    AppError::InvalidState(format!(
        "Cannot perform {what}: report is {} at stage {}",
        current.status(),
        current.stage()
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ReportStatus;

    fn dirs() -> DepartmentDirectory {
        DepartmentDirectory::default()
    }

    fn dept(text: &str) -> ReportAction {
        ReportAction::DepartmentAction {
            text: text.to_string(),
        }
    }

    fn oe(decision: OeDecision) -> ReportAction {
        ReportAction::Oe {
            decision,
            note: None,
        }
    }

    fn resident(decision: ResidentDecision) -> ReportAction {
        ReportAction::Resident {
            decision,
            note: None,
        }
    }

    #[test]
    fn department_action_moves_to_oe_review() {
        let t = apply(LifecycleState::Created, "EME (P)", &dept(" fixed wiring "), &dirs()).unwrap();
        assert_eq!(t.to, LifecycleState::DepartmentActed);
        assert_eq!(t.to.status(), ReportStatus::UnderReview);
        assert_eq!(t.to.stage(), ReportStage::OeDepartment);
        assert_eq!(t.department_action.as_deref(), Some("fixed wiring"));
        assert_eq!(t.remark, "Department action submitted: fixed wiring");
    }

    #[test]
    fn department_action_allowed_after_revision_and_referral() {
        for from in [LifecycleState::NeedsRevision, LifecycleState::OeReferred] {
            let t = apply(from, "EME (P)", &dept("rework"), &dirs()).unwrap();
            assert_eq!(t.from, from);
            assert_eq!(t.to, LifecycleState::DepartmentActed);
        }
    }

    #[test]
    fn department_action_rejected_outside_department_queue() {
        for from in [
            LifecycleState::DepartmentActed,
            LifecycleState::OeApproved,
            LifecycleState::OeRejected,
            LifecycleState::Closed,
            LifecycleState::FinalRejected,
        ] {
            let err = apply(from, "EME (P)", &dept("x"), &dirs()).unwrap_err();
            assert!(matches!(err, AppError::InvalidState(_)), "{from:?}");
        }
    }

    #[test]
    fn empty_department_action_is_validation_error() {
        let err = apply(LifecycleState::Created, "EME (P)", &dept("   "), &dirs()).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn oe_approve_forwards_to_resident_engineer() {
        let action = ReportAction::Oe {
            decision: OeDecision::Approve,
            note: Some("checked on site".to_string()),
        };
        let t = apply(LifecycleState::DepartmentActed, "EME (P)", &action, &dirs()).unwrap();
        assert_eq!(t.to, LifecycleState::OeApproved);
        assert_eq!(t.to.stage(), ReportStage::ResidentEngineer);
        assert_eq!(
            t.remark,
            "Approved by OE Department and forwarded to Resident Engineer. Remarks: checked on site"
        );
    }

    #[test]
    fn oe_reject_returns_to_same_department() {
        let t = apply(
            LifecycleState::DepartmentActed,
            "EME (P)",
            &oe(OeDecision::Reject),
            &dirs(),
        )
        .unwrap();
        assert_eq!(t.to, LifecycleState::OeRejected);
        assert_eq!(t.to.status(), ReportStatus::Rejected);
        assert_eq!(t.refer_to, None);
        assert!(t.remark.contains("returned to EME (P)"));
    }

    #[test]
    fn oe_refer_reassigns_department() {
        let action = oe(OeDecision::Refer {
            department: "MME (P)".to_string(),
        });
        let t = apply(LifecycleState::DepartmentActed, "EME (P)", &action, &dirs()).unwrap();
        assert_eq!(t.to, LifecycleState::OeReferred);
        assert_eq!(t.to.status(), ReportStatus::Pending);
        assert_eq!(t.to.stage(), ReportStage::Department);
        assert_eq!(t.refer_to.as_deref(), Some("MME (P)"));
        assert!(t.remark.contains("referred to MME (P)"));
    }

    #[test]
    fn oe_refer_to_same_department_is_accepted() {
        let action = oe(OeDecision::Refer {
            department: "eme (p)".to_string(),
        });
        let t = apply(LifecycleState::DepartmentActed, "EME (P)", &action, &dirs()).unwrap();
        assert_eq!(t.refer_to.as_deref(), Some("EME (P)"));
    }

    #[test]
    fn oe_refer_requires_known_department() {
        let missing = oe(OeDecision::Refer {
            department: String::new(),
        });
        assert!(matches!(
            apply(LifecycleState::DepartmentActed, "EME (P)", &missing, &dirs()),
            Err(AppError::Validation(_))
        ));

        let unknown = oe(OeDecision::Refer {
            department: "Canteen".to_string(),
        });
        assert!(matches!(
            apply(LifecycleState::DepartmentActed, "EME (P)", &unknown, &dirs()),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn oe_action_outside_oe_stage_is_invalid_state() {
        for from in [
            LifecycleState::Created,
            LifecycleState::OeApproved,
            LifecycleState::Closed,
            LifecycleState::NeedsRevision,
        ] {
            // Even a malformed refer reports the state problem first.
            let action = oe(OeDecision::Refer {
                department: String::new(),
            });
            let err = apply(from, "EME (P)", &action, &dirs()).unwrap_err();
            assert!(matches!(err, AppError::InvalidState(_)), "{from:?}");
        }
    }

    #[test]
    fn resident_decisions() {
        let closed = apply(
            LifecycleState::OeApproved,
            "EME (P)",
            &resident(ResidentDecision::Close),
            &dirs(),
        )
        .unwrap();
        assert_eq!(closed.to, LifecycleState::Closed);
        assert_eq!(closed.to.stage(), ReportStage::Completed);
        assert_eq!(closed.remark, "Report closed by Resident Engineer");

        let rejected = apply(
            LifecycleState::OeApproved,
            "EME (P)",
            &resident(ResidentDecision::Reject),
            &dirs(),
        )
        .unwrap();
        assert_eq!(rejected.to, LifecycleState::FinalRejected);
        assert_eq!(rejected.to.status(), ReportStatus::Rejected);

        let revision = apply(
            LifecycleState::OeApproved,
            "EME (P)",
            &resident(ResidentDecision::Revision {
                reason: "replace the bushing too".to_string(),
            }),
            &dirs(),
        )
        .unwrap();
        assert_eq!(revision.to, LifecycleState::NeedsRevision);
        assert!(revision.remark.ends_with("replace the bushing too"));
    }

    #[test]
    fn revision_without_reason_is_validation_error() {
        let err = apply(
            LifecycleState::OeApproved,
            "EME (P)",
            &resident(ResidentDecision::Revision {
                reason: String::new(),
            }),
            &dirs(),
        )
        .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn resident_action_outside_resident_stage_is_invalid_state() {
        let err = apply(
            LifecycleState::DepartmentActed,
            "EME (P)",
            &resident(ResidentDecision::Close),
            &dirs(),
        )
        .unwrap_err();
        assert!(matches!(err, AppError::InvalidState(_)));
    }

    #[test]
    fn remarks_never_change_state() {
        for from in [LifecycleState::Created, LifecycleState::Closed] {
            let t = apply(
                from,
                "EME (P)",
                &ReportAction::AddRemark {
                    text: "spare part ordered".to_string(),
                },
                &dirs(),
            )
            .unwrap();
            assert_eq!(t.from, t.to);
            assert_eq!(t.remark, "spare part ordered");
        }

        let err = apply(
            LifecycleState::Created,
            "EME (P)",
            &ReportAction::OeRemark {
                text: " ".to_string(),
            },
            &dirs(),
        )
        .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn full_happy_path_produces_three_remarks_in_order() {
        let steps = [
            dept("fixed wiring"),
            oe(OeDecision::Approve),
            resident(ResidentDecision::Close),
        ];

        let mut state = LifecycleState::Created;
        let mut remarks = Vec::new();
        for step in &steps {
            let t = apply(state, "EME (P)", step, &dirs()).unwrap();
            state = t.to;
            remarks.push(t.remark);
        }

        assert_eq!(state.status(), ReportStatus::Closed);
        assert_eq!(state.stage(), ReportStage::Completed);
        assert_eq!(remarks.len(), 3);
        assert!(remarks[0].starts_with("Department action submitted"));
        assert!(remarks[1].starts_with("Approved by OE Department"));
        assert!(remarks[2].starts_with("Report closed"));
    }

    #[test]
    fn decision_parsing() {
        assert_eq!(OeDecision::parse("Approve", None).unwrap(), OeDecision::Approve);
        assert_eq!(
            OeDecision::parse("refer", Some("MME (P)".into())).unwrap(),
            OeDecision::Refer {
                department: "MME (P)".into()
            }
        );
        assert!(OeDecision::parse("escalate", None).is_err());
        assert_eq!(
            ResidentDecision::parse("revision", None).unwrap(),
            ResidentDecision::Revision {
                reason: String::new()
            }
        );
        assert!(ResidentDecision::parse("archive", None).is_err());
    }

    #[test]
    fn audit_remark_lists_changed_fields() {
        assert_eq!(
            admin_audit_remark("Root", &["apparatus", "referTo"]),
            "Report updated by administrator Root: apparatus, referTo"
        );
        assert!(admin_audit_remark("Root", &[]).contains("no field changes"));
    }
}
