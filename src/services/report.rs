use crate::{
    config::departments::departments,
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::{
        report, LifecycleState, Means, RemarkModel, Report, ReportModel, ReportStage,
        ReportStatus,
    },
    services::{
        access::{authorize, Operation},
        ledger,
        lifecycle::{self, ReportAction},
        projection::{self, ReportStats},
    },
};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};

/// A report together with its remark ledger.
#[derive(Debug, Clone)]
pub struct ReportDetail {
    pub report: ReportModel,
    pub remarks: Vec<RemarkModel>,
}

#[derive(Debug, Clone, Default)]
pub struct NewReport {
    pub serial_no: String,
    pub date: Option<NaiveDate>,
    pub time: Option<NaiveTime>,
    pub apparatus: String,
    pub description: String,
    pub recommendation: Option<String>,
    pub operation_action: Option<String>,
    pub refer_to: String,
    pub means: Option<Means>,
}

/// Administrative overwrite. `None` leaves a field alone; for the optional
/// text fields an empty string clears the value.
#[derive(Debug, Clone, Default)]
pub struct ReportUpdate {
    pub date: Option<NaiveDate>,
    pub time: Option<NaiveTime>,
    pub apparatus: Option<String>,
    pub description: Option<String>,
    pub recommendation: Option<String>,
    pub operation_action: Option<String>,
    pub department_action: Option<String>,
    pub refer_to: Option<String>,
    pub means: Option<Means>,
    pub status: Option<ReportStatus>,
    pub current_stage: Option<ReportStage>,
}

pub struct ReportService {
    db: DatabaseConnection,
}

impl ReportService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn create_report(&self, actor: &AuthUser, input: NewReport) -> AppResult<ReportDetail> {
        authorize(Some(actor), Operation::CreateReport, None)?;

        let serial_no = required(&input.serial_no, "Serial number")?;
        let apparatus = required(&input.apparatus, "Apparatus")?;
        let description = required(&input.description, "Description")?;
        let refer_to = known_department(&input.refer_to)?;

        let taken = Report::find()
            .filter(report::Column::SerialNo.eq(serial_no))
            .count(&self.db)
            .await?;
        if taken > 0 {
            return Err(AppError::Conflict(format!(
                "A report with serial number {} already exists",
                serial_no
            )));
        }

        let now = chrono::Utc::now().naive_utc();
        let model = report::ActiveModel {
            serial_no: Set(serial_no.to_string()),
            fault_date: Set(input.date.unwrap_or_else(|| now.date())),
            fault_time: Set(input.time.unwrap_or_else(|| now.time())),
            apparatus: Set(apparatus.to_string()),
            description: Set(description.to_string()),
            recommendation: Set(optional(input.recommendation)),
            operation_action: Set(optional(input.operation_action)),
            department_action: Set(None),
            notified_by: Set(actor.display_name.clone()),
            refer_to: Set(refer_to),
            means: Set(input.means.unwrap_or_default()),
            state: Set(LifecycleState::Created),
            created_by: Set(actor.user_id),
            version: Set(1),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };

        let saved = model.insert(&self.db).await?;
        tracing::info!(
            report_id = saved.id,
            serial_no = %saved.serial_no,
            actor_id = actor.user_id,
            "Report created"
        );

        Ok(ReportDetail {
            report: saved,
            remarks: Vec::new(),
        })
    }

    pub async fn get_report(&self, actor: &AuthUser, report_id: i32) -> AppResult<ReportDetail> {
        authorize(Some(actor), Operation::ViewReports, None)?;
        let report = self.find(&self.db, report_id).await?;
        let remarks = ledger::for_report(&self.db, report_id).await?;
        Ok(ReportDetail { report, remarks })
    }

    /// The actor's role view, newest first, optionally narrowed by status.
    pub async fn list_reports(
        &self,
        actor: &AuthUser,
        status: Option<ReportStatus>,
        page: u64,
        per_page: u64,
    ) -> AppResult<(Vec<ReportDetail>, u64)> {
        authorize(Some(actor), Operation::ViewReports, None)?;

        let scope = projection::scope_for(actor)?;
        let mut query = scope.apply(Report::find());
        if let Some(status) = status {
            query = query.filter(
                report::Column::State.is_in(projection::states_with_status(status)),
            );
        }

        let paginator = query
            .order_by_desc(report::Column::CreatedAt)
            .order_by_desc(report::Column::Id)
            .paginate(&self.db, per_page);

        let total = paginator.num_items().await?;
        let reports = paginator.fetch_page(page.saturating_sub(1)).await?;

        let ids: Vec<i32> = reports.iter().map(|r| r.id).collect();
        let mut remarks = ledger::for_reports(&self.db, &ids).await?;
        let items = reports
            .into_iter()
            .map(|report| ReportDetail {
                remarks: remarks.remove(&report.id).unwrap_or_default(),
                report,
            })
            .collect();

        Ok((items, total))
    }

    pub async fn stats(&self, actor: &AuthUser) -> AppResult<ReportStats> {
        authorize(Some(actor), Operation::ViewReports, None)?;

        let per_state: Vec<(LifecycleState, i64)> = Report::find()
            .select_only()
            .column(report::Column::State)
            .column_as(Expr::col(report::Column::Id).count(), "count")
            .group_by(report::Column::State)
            .into_tuple()
            .all(&self.db)
            .await?;

        Ok(projection::fold_status_counts(&per_state))
    }

    /// Gate `op` against the stored report without touching it. Used when the
    /// request body cannot be read, so access errors still win over payload
    /// errors.
    pub async fn check_access(&self, actor: &AuthUser, report_id: i32, op: Operation) -> AppResult<()> {
        authorize(Some(actor), op, None)?;
        if !op.is_department_scoped() {
            return Ok(());
        }
        let existing = self.find(&self.db, report_id).await?;
        authorize(Some(actor), op, Some(&existing.refer_to))
    }

    /// Run a workflow action and persist the state change together with its
    /// remark.
    pub async fn perform(
        &self,
        actor: &AuthUser,
        report_id: i32,
        action: ReportAction,
    ) -> AppResult<ReportDetail> {
        let op = action.operation();
        authorize(Some(actor), op, None)?;

        let txn = self.db.begin().await?;
        let existing = self.find(&txn, report_id).await?;
        authorize(Some(actor), op, Some(&existing.refer_to))?;

        let transition =
            lifecycle::apply(existing.state, &existing.refer_to, &action, departments())?;

        let now = chrono::Utc::now().naive_utc();
        let expected_version = existing.version;
        let mut active: report::ActiveModel = existing.into();
        if transition.to != transition.from {
            active.state = Set(transition.to);
        }
        if let Some(refer_to) = transition.refer_to.clone() {
            active.refer_to = Set(refer_to);
        }
        if let Some(text) = transition.department_action.clone() {
            active.department_action = Set(Some(text));
        }

        write_versioned(&txn, report_id, active, expected_version, now).await?;
        ledger::append(&txn, report_id, &actor.display_name, &transition.remark, now).await?;
        txn.commit().await?;

        tracing::info!(
            report_id,
            actor_id = actor.user_id,
            action = action.name(),
            from = ?transition.from,
            to = ?transition.to,
            terminal = transition.to.is_terminal(),
            "Report action applied"
        );

        self.get_detail(report_id).await
    }

    /// Overwrite fields without consulting the workflow, leaving one audit
    /// remark behind.
    pub async fn admin_update(
        &self,
        actor: &AuthUser,
        report_id: i32,
        update: ReportUpdate,
    ) -> AppResult<ReportDetail> {
        authorize(Some(actor), Operation::AdminUpdateReport, None)?;

        let txn = self.db.begin().await?;
        let existing = self.find(&txn, report_id).await?;
        let expected_version = existing.version;

        let mut changed: Vec<&'static str> = Vec::new();
        let mut active: report::ActiveModel = existing.clone().into();

        if let Some(date) = update.date.filter(|d| *d != existing.fault_date) {
            active.fault_date = Set(date);
            changed.push("date");
        }
        if let Some(time) = update.time.filter(|t| *t != existing.fault_time) {
            active.fault_time = Set(time);
            changed.push("time");
        }
        if let Some(apparatus) = update.apparatus.as_deref() {
            let apparatus = required(apparatus, "Apparatus")?;
            if apparatus != existing.apparatus {
                active.apparatus = Set(apparatus.to_string());
                changed.push("apparatus");
            }
        }
        if let Some(description) = update.description.as_deref() {
            let description = required(description, "Description")?;
            if description != existing.description {
                active.description = Set(description.to_string());
                changed.push("description");
            }
        }
        if let Some(value) = update.recommendation {
            let value = optional(Some(value));
            if value != existing.recommendation {
                active.recommendation = Set(value);
                changed.push("recommendation");
            }
        }
        if let Some(value) = update.operation_action {
            let value = optional(Some(value));
            if value != existing.operation_action {
                active.operation_action = Set(value);
                changed.push("operationAction");
            }
        }
        if let Some(value) = update.department_action {
            let value = optional(Some(value));
            if value != existing.department_action {
                active.department_action = Set(value);
                changed.push("departmentAction");
            }
        }
        if let Some(refer_to) = update.refer_to.as_deref() {
            let refer_to = known_department(refer_to)?;
            if refer_to != existing.refer_to {
                active.refer_to = Set(refer_to);
                changed.push("referTo");
            }
        }
        if let Some(means) = update.means.filter(|m| *m != existing.means) {
            active.means = Set(means);
            changed.push("means");
        }
        if update.status.is_some() || update.current_stage.is_some() {
            let status = update.status.unwrap_or_else(|| existing.state.status());
            let stage = update.current_stage.unwrap_or_else(|| existing.state.stage());
            if (status, stage) != (existing.state.status(), existing.state.stage()) {
                let state = LifecycleState::from_projection(status, stage).ok_or_else(|| {
                    AppError::Validation(format!(
                        "Status '{}' cannot be combined with stage '{}'",
                        status, stage
                    ))
                })?;
                active.state = Set(state);
                changed.push("status");
                changed.push("currentStage");
            }
        }

        let now = chrono::Utc::now().naive_utc();
        write_versioned(&txn, report_id, active, expected_version, now).await?;
        let remark = lifecycle::admin_audit_remark(&actor.display_name, &changed);
        ledger::append(&txn, report_id, &actor.display_name, &remark, now).await?;
        txn.commit().await?;

        tracing::info!(
            report_id,
            actor_id = actor.user_id,
            fields = ?changed,
            "Report updated by administrator"
        );

        self.get_detail(report_id).await
    }

    pub async fn admin_delete(&self, actor: &AuthUser, report_id: i32) -> AppResult<()> {
        authorize(Some(actor), Operation::AdminDeleteReport, None)?;

        let existing = self.find(&self.db, report_id).await?;
        Report::delete_by_id(existing.id).exec(&self.db).await?;

        tracing::warn!(
            report_id,
            serial_no = %existing.serial_no,
            actor_id = actor.user_id,
            "Report deleted by administrator"
        );
        Ok(())
    }

    async fn find<C: ConnectionTrait>(&self, conn: &C, report_id: i32) -> AppResult<ReportModel> {
        Report::find_by_id(report_id)
            .one(conn)
            .await?
            .ok_or_else(|| AppError::not_found("Report"))
    }

    async fn get_detail(&self, report_id: i32) -> AppResult<ReportDetail> {
        let report = self.find(&self.db, report_id).await?;
        let remarks = ledger::for_report(&self.db, report_id).await?;
        Ok(ReportDetail { report, remarks })
    }
}

/// Write `active` only if the stored version still equals
/// `expected_version`; a concurrent writer turns this into a Conflict.
async fn write_versioned<C: ConnectionTrait>(
    conn: &C,
    report_id: i32,
    mut active: report::ActiveModel,
    expected_version: i32,
    now: NaiveDateTime,
) -> AppResult<()> {
    active.version = Set(expected_version + 1);
    active.updated_at = Set(now);

    let result = Report::update_many()
        .set(active)
        .filter(report::Column::Id.eq(report_id))
        .filter(report::Column::Version.eq(expected_version))
        .exec(conn)
        .await?;

    if result.rows_affected == 0 {
        return Err(AppError::Conflict(
            "Report was modified by another request, reload and try again".to_string(),
        ));
    }
    Ok(())
}

fn required<'a>(value: &'a str, field: &str) -> AppResult<&'a str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AppError::Validation(format!("{field} is required")));
    }
    Ok(trimmed)
}

fn optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn known_department(raw: &str) -> AppResult<String> {
    let raw = required(raw, "Refer to department")?;
    departments()
        .resolve(raw)
        .map(str::to_string)
        .ok_or_else(|| AppError::Validation(format!("Unknown department '{}'", raw)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn optional_text_is_trimmed_and_blank_cleared() {
        assert_eq!(optional(Some("  ok ".to_string())), Some("ok".to_string()));
        assert_eq!(optional(Some("   ".to_string())), None);
        assert_eq!(optional(None), None);
    }

    #[test]
    fn known_department_canonicalizes() {
        assert_eq!(known_department(" eme (p)").unwrap(), "EME (P)");
        assert!(matches!(
            known_department(""),
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            known_department("Payroll"),
            Err(AppError::Validation(_))
        ));
    }
}
