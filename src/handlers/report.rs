use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::models::{LifecycleState, Means, RemarkModel, ReportStage, ReportStatus};
use crate::response::{page_bounds, ApiResponse, PaginatedResponse};
use crate::services::access::{authorize, Operation};
use crate::services::lifecycle::{OeDecision, ReportAction, ResidentDecision};
use crate::services::projection::ReportStats;
use crate::services::report::{NewReport, ReportDetail, ReportService, ReportUpdate};
use axum::{
    extract::{rejection::JsonRejection, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use chrono::{NaiveDate, NaiveTime};
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateReportRequest {
    #[serde(default)]
    #[validate(length(min = 1, max = 50))]
    pub serial_no: String,
    /// Fault date, `YYYY-MM-DD`. Defaults to today.
    pub date: Option<String>,
    /// Fault time, `HH:MM` or `HH:MM:SS`. Defaults to now.
    pub time: Option<String>,
    #[serde(default)]
    #[validate(length(min = 1, max = 200))]
    pub apparatus: String,
    #[serde(default)]
    #[validate(length(min = 1))]
    pub description: String,
    pub recommendation: Option<String>,
    pub operation_action: Option<String>,
    /// Department the report is assigned to
    #[serde(default)]
    #[validate(length(min = 1, max = 100))]
    pub refer_to: String,
    pub means: Option<Means>,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ListReportsQuery {
    /// Filter by projected status, e.g. `Under Review`
    pub status: Option<String>,
    pub page: Option<u64>,
    #[serde(alias = "per_page")]
    pub per_page: Option<u64>,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DepartmentActionRequest {
    #[serde(default)]
    pub department_action: String,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OeActionRequest {
    /// `approve`, `reject` or `refer`
    #[serde(default)]
    pub action: String,
    /// Target department for `refer`
    pub refer_to: Option<String>,
    pub remarks: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ResidentActionRequest {
    /// `close`, `reject` or `revision`
    #[serde(default)]
    pub action: String,
    /// Required for `revision`
    pub revision_reason: Option<String>,
    pub remarks: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct RemarkRequest {
    #[serde(default)]
    pub remark: String,
}

/// Administrative overwrite; omitted fields are left alone.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AdminUpdateReportRequest {
    pub date: Option<String>,
    pub time: Option<String>,
    pub apparatus: Option<String>,
    pub description: Option<String>,
    pub recommendation: Option<String>,
    pub operation_action: Option<String>,
    pub department_action: Option<String>,
    pub refer_to: Option<String>,
    pub means: Option<Means>,
    pub status: Option<String>,
    pub current_stage: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RemarkResponse {
    pub id: i64,
    pub author: String,
    pub text: String,
    pub timestamp: String,
}

impl From<RemarkModel> for RemarkResponse {
    fn from(r: RemarkModel) -> Self {
        Self {
            id: r.id,
            author: r.author,
            text: r.text,
            timestamp: r.created_at.and_utc().to_rfc3339(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReportResponse {
    pub id: i32,
    pub serial_no: String,
    pub date: String,
    pub time: String,
    pub apparatus: String,
    pub description: String,
    pub recommendation: Option<String>,
    pub operation_action: Option<String>,
    pub department_action: Option<String>,
    pub notified_by: String,
    pub refer_to: String,
    pub means: Means,
    pub status: ReportStatus,
    pub current_stage: ReportStage,
    pub state: LifecycleState,
    /// Increases on every write
    pub version: i32,
    pub created_by: i32,
    pub remarks: Vec<RemarkResponse>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<ReportDetail> for ReportResponse {
    fn from(detail: ReportDetail) -> Self {
        let r = detail.report;
        Self {
            id: r.id,
            serial_no: r.serial_no,
            date: r.fault_date.format("%Y-%m-%d").to_string(),
            time: format_time(r.fault_time),
            apparatus: r.apparatus,
            description: r.description,
            recommendation: r.recommendation,
            operation_action: r.operation_action,
            department_action: r.department_action,
            notified_by: r.notified_by,
            refer_to: r.refer_to,
            means: r.means,
            status: r.state.status(),
            current_stage: r.state.stage(),
            state: r.state,
            version: r.version,
            created_by: r.created_by,
            remarks: detail.remarks.into_iter().map(RemarkResponse::from).collect(),
            created_at: r.created_at.and_utc().to_rfc3339(),
            updated_at: r.updated_at.and_utc().to_rfc3339(),
        }
    }
}

fn format_time(time: NaiveTime) -> String {
    time.format("%H:%M:%S").to_string()
}

fn parse_date(raw: Option<&str>) -> AppResult<Option<NaiveDate>> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(None),
        Some(s) => NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .map(Some)
            .map_err(|_| AppError::Validation(format!("Invalid date '{}', expected YYYY-MM-DD", s))),
    }
}

fn parse_time(raw: Option<&str>) -> AppResult<Option<NaiveTime>> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(None),
        Some(s) => NaiveTime::parse_from_str(s, "%H:%M:%S")
            .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M"))
            .map(Some)
            .map_err(|_| AppError::Validation(format!("Invalid time '{}', expected HH:MM or HH:MM:SS", s))),
    }
}

fn parse_status(raw: Option<&str>) -> AppResult<Option<ReportStatus>> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(None),
        Some(s) => ReportStatus::parse(s)
            .map(Some)
            .ok_or_else(|| AppError::Validation(format!("Unknown status '{}'", s))),
    }
}

fn parse_stage(raw: Option<&str>) -> AppResult<Option<ReportStage>> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(None),
        Some(s) => ReportStage::parse(s)
            .map(Some)
            .ok_or_else(|| AppError::Validation(format!("Unknown stage '{}'", s))),
    }
}

#[utoipa::path(
    post,
    path = "/api/v1/reports",
    security(("jwt_token" = [])),
    request_body = CreateReportRequest,
    responses(
        (status = 201, description = "Report created", body = ReportResponse),
        (status = 400, description = "Validation error", body = AppError),
        (status = 403, description = "Shift engineers only", body = AppError),
        (status = 409, description = "Serial number already used", body = AppError),
    ),
    tag = "reports"
)]
pub async fn create_report(
    Extension(db): Extension<DatabaseConnection>,
    auth_user: AuthUser,
    payload: Result<Json<CreateReportRequest>, JsonRejection>,
) -> AppResult<impl IntoResponse> {
    // Role check comes before payload validation.
    authorize(Some(&auth_user), Operation::CreateReport, None)?;
    let Json(payload) = payload.map_err(|e| AppError::Validation(e.body_text()))?;
    payload
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let input = NewReport {
        date: parse_date(payload.date.as_deref())?,
        time: parse_time(payload.time.as_deref())?,
        serial_no: payload.serial_no,
        apparatus: payload.apparatus,
        description: payload.description,
        recommendation: payload.recommendation,
        operation_action: payload.operation_action,
        refer_to: payload.refer_to,
        means: payload.means,
    };

    let service = ReportService::new(db);
    let report = service.create_report(&auth_user, input).await?;

    Ok((
        StatusCode::CREATED,
        ApiResponse::ok(ReportResponse::from(report)),
    ))
}

#[utoipa::path(
    get,
    path = "/api/v1/reports",
    security(("jwt_token" = [])),
    params(
        ("status" = Option<String>, Query, description = "Filter by status"),
        ("page" = Option<u64>, Query, description = "Page number"),
        ("perPage" = Option<u64>, Query, description = "Items per page"),
    ),
    responses(
        (status = 200, description = "Reports visible to the caller's role", body = PaginatedResponse<ReportResponse>),
        (status = 401, description = "Unauthorized", body = AppError),
    ),
    tag = "reports"
)]
pub async fn list_reports(
    Extension(db): Extension<DatabaseConnection>,
    auth_user: AuthUser,
    Query(params): Query<ListReportsQuery>,
) -> AppResult<impl IntoResponse> {
    let status = parse_status(params.status.as_deref())?;
    let (page, per_page) = page_bounds(params.page, params.per_page);

    let service = ReportService::new(db);
    let (reports, total) = service
        .list_reports(&auth_user, status, page, per_page)
        .await?;
    let items = reports.into_iter().map(ReportResponse::from).collect();

    Ok(ApiResponse::ok(PaginatedResponse::new(
        items, total, page, per_page,
    )))
}

#[utoipa::path(
    get,
    path = "/api/v1/reports/stats",
    security(("jwt_token" = [])),
    responses(
        (status = 200, description = "Report counts per status", body = ReportStats),
    ),
    tag = "reports"
)]
pub async fn report_stats(
    Extension(db): Extension<DatabaseConnection>,
    auth_user: AuthUser,
) -> AppResult<impl IntoResponse> {
    let service = ReportService::new(db);
    let stats = service.stats(&auth_user).await?;
    Ok(ApiResponse::ok(stats))
}

#[utoipa::path(
    get,
    path = "/api/v1/reports/{id}",
    security(("jwt_token" = [])),
    params(("id" = i32, Path, description = "Report ID")),
    responses(
        (status = 200, description = "Report with remarks", body = ReportResponse),
        (status = 404, description = "Report not found", body = AppError),
    ),
    tag = "reports"
)]
pub async fn get_report(
    Extension(db): Extension<DatabaseConnection>,
    auth_user: AuthUser,
    Path(id): Path<i32>,
) -> AppResult<impl IntoResponse> {
    let service = ReportService::new(db);
    let report = service.get_report(&auth_user, id).await?;
    Ok(ApiResponse::ok(ReportResponse::from(report)))
}

/// Unwrap a JSON body once the caller has passed the access gate for `op`.
/// Unreadable bodies become `ValidationFailed` instead of axum's plain 422.
async fn accept_body<T>(
    db: &DatabaseConnection,
    auth_user: &AuthUser,
    id: i32,
    op: Operation,
    body: Result<Json<T>, JsonRejection>,
) -> AppResult<T> {
    authorize(Some(auth_user), op, None)?;
    match body {
        Ok(Json(payload)) => Ok(payload),
        Err(rejection) => {
            ReportService::new(db.clone())
                .check_access(auth_user, id, op)
                .await?;
            Err(AppError::Validation(rejection.body_text()))
        }
    }
}

async fn run_action(
    db: DatabaseConnection,
    auth_user: &AuthUser,
    id: i32,
    action: ReportAction,
) -> AppResult<ApiResponse<ReportResponse>> {
    let service = ReportService::new(db);
    let report = service.perform(auth_user, id, action).await?;
    Ok(ApiResponse::ok(ReportResponse::from(report)))
}

#[utoipa::path(
    post,
    path = "/api/v1/reports/{id}/department-action",
    security(("jwt_token" = [])),
    params(("id" = i32, Path, description = "Report ID")),
    request_body = DepartmentActionRequest,
    responses(
        (status = 200, description = "Forwarded to OE Department", body = ReportResponse),
        (status = 400, description = "Invalid state or empty action", body = AppError),
        (status = 403, description = "Not assigned to caller's department", body = AppError),
        (status = 409, description = "Concurrent modification", body = AppError),
    ),
    tag = "reports"
)]
pub async fn department_action(
    Extension(db): Extension<DatabaseConnection>,
    auth_user: AuthUser,
    Path(id): Path<i32>,
    payload: Result<Json<DepartmentActionRequest>, JsonRejection>,
) -> AppResult<impl IntoResponse> {
    let payload = accept_body(&db, &auth_user, id, Operation::DepartmentAction, payload).await?;
    let action = ReportAction::DepartmentAction {
        text: payload.department_action,
    };
    run_action(db, &auth_user, id, action).await
}

#[utoipa::path(
    post,
    path = "/api/v1/reports/{id}/oe-action",
    security(("jwt_token" = [])),
    params(("id" = i32, Path, description = "Report ID")),
    request_body = OeActionRequest,
    responses(
        (status = 200, description = "OE decision recorded", body = ReportResponse),
        (status = 400, description = "Invalid state or action", body = AppError),
        (status = 403, description = "OE only", body = AppError),
    ),
    tag = "reports"
)]
pub async fn oe_action(
    Extension(db): Extension<DatabaseConnection>,
    auth_user: AuthUser,
    Path(id): Path<i32>,
    payload: Result<Json<OeActionRequest>, JsonRejection>,
) -> AppResult<impl IntoResponse> {
    let payload = accept_body(&db, &auth_user, id, Operation::OeAction, payload).await?;
    let action = ReportAction::Oe {
        decision: OeDecision::parse(&payload.action, payload.refer_to)?,
        note: payload.remarks,
    };
    run_action(db, &auth_user, id, action).await
}

#[utoipa::path(
    post,
    path = "/api/v1/reports/{id}/oe-remark",
    security(("jwt_token" = [])),
    params(("id" = i32, Path, description = "Report ID")),
    request_body = RemarkRequest,
    responses(
        (status = 200, description = "Remark added", body = ReportResponse),
        (status = 400, description = "Empty remark", body = AppError),
        (status = 403, description = "OE only", body = AppError),
    ),
    tag = "reports"
)]
pub async fn oe_remark(
    Extension(db): Extension<DatabaseConnection>,
    auth_user: AuthUser,
    Path(id): Path<i32>,
    payload: Result<Json<RemarkRequest>, JsonRejection>,
) -> AppResult<impl IntoResponse> {
    let payload = accept_body(&db, &auth_user, id, Operation::OeRemark, payload).await?;
    let action = ReportAction::OeRemark {
        text: payload.remark,
    };
    run_action(db, &auth_user, id, action).await
}

#[utoipa::path(
    post,
    path = "/api/v1/reports/{id}/resident-action",
    security(("jwt_token" = [])),
    params(("id" = i32, Path, description = "Report ID")),
    request_body = ResidentActionRequest,
    responses(
        (status = 200, description = "Resident Engineer decision recorded", body = ReportResponse),
        (status = 400, description = "Invalid state, action or missing reason", body = AppError),
        (status = 403, description = "Resident Engineer only", body = AppError),
    ),
    tag = "reports"
)]
pub async fn resident_action(
    Extension(db): Extension<DatabaseConnection>,
    auth_user: AuthUser,
    Path(id): Path<i32>,
    payload: Result<Json<ResidentActionRequest>, JsonRejection>,
) -> AppResult<impl IntoResponse> {
    let payload = accept_body(&db, &auth_user, id, Operation::ResidentAction, payload).await?;
    let action = ReportAction::Resident {
        decision: ResidentDecision::parse(&payload.action, payload.revision_reason)?,
        note: payload.remarks,
    };
    run_action(db, &auth_user, id, action).await
}

#[utoipa::path(
    post,
    path = "/api/v1/reports/{id}/remarks",
    security(("jwt_token" = [])),
    params(("id" = i32, Path, description = "Report ID")),
    request_body = RemarkRequest,
    responses(
        (status = 200, description = "Remark added", body = ReportResponse),
        (status = 400, description = "Empty remark", body = AppError),
        (status = 403, description = "Not permitted", body = AppError),
    ),
    tag = "reports"
)]
pub async fn add_remark(
    Extension(db): Extension<DatabaseConnection>,
    auth_user: AuthUser,
    Path(id): Path<i32>,
    payload: Result<Json<RemarkRequest>, JsonRejection>,
) -> AppResult<impl IntoResponse> {
    let payload = accept_body(&db, &auth_user, id, Operation::AddRemark, payload).await?;
    let action = ReportAction::AddRemark {
        text: payload.remark,
    };
    run_action(db, &auth_user, id, action).await
}

#[utoipa::path(
    put,
    path = "/api/v1/admin/reports/{id}",
    security(("jwt_token" = [])),
    params(("id" = i32, Path, description = "Report ID")),
    request_body = AdminUpdateReportRequest,
    responses(
        (status = 200, description = "Report updated", body = ReportResponse),
        (status = 400, description = "Validation error", body = AppError),
        (status = 403, description = "Admin only", body = AppError),
        (status = 404, description = "Report not found", body = AppError),
    ),
    tag = "admin"
)]
pub async fn admin_update_report(
    Extension(db): Extension<DatabaseConnection>,
    auth_user: AuthUser,
    Path(id): Path<i32>,
    payload: Result<Json<AdminUpdateReportRequest>, JsonRejection>,
) -> AppResult<impl IntoResponse> {
    let payload = accept_body(&db, &auth_user, id, Operation::AdminUpdateReport, payload).await?;
    let update = ReportUpdate {
        date: parse_date(payload.date.as_deref())?,
        time: parse_time(payload.time.as_deref())?,
        status: parse_status(payload.status.as_deref())?,
        current_stage: parse_stage(payload.current_stage.as_deref())?,
        apparatus: payload.apparatus,
        description: payload.description,
        recommendation: payload.recommendation,
        operation_action: payload.operation_action,
        department_action: payload.department_action,
        refer_to: payload.refer_to,
        means: payload.means,
    };

    let service = ReportService::new(db);
    let report = service.admin_update(&auth_user, id, update).await?;
    Ok(ApiResponse::ok(ReportResponse::from(report)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/admin/reports/{id}",
    security(("jwt_token" = [])),
    params(("id" = i32, Path, description = "Report ID")),
    responses(
        (status = 200, description = "Report deleted", body = String),
        (status = 403, description = "Admin only", body = AppError),
        (status = 404, description = "Report not found", body = AppError),
    ),
    tag = "admin"
)]
pub async fn admin_delete_report(
    Extension(db): Extension<DatabaseConnection>,
    auth_user: AuthUser,
    Path(id): Path<i32>,
) -> AppResult<impl IntoResponse> {
    let service = ReportService::new(db);
    service.admin_delete(&auth_user, id).await?;
    Ok(ApiResponse::ok("Report deleted"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn time_accepts_minutes_and_seconds() {
        assert_eq!(
            parse_time(Some("07:45")).unwrap(),
            NaiveTime::from_hms_opt(7, 45, 0)
        );
        assert_eq!(
            parse_time(Some("07:45:30")).unwrap(),
            NaiveTime::from_hms_opt(7, 45, 30)
        );
        assert_eq!(parse_time(Some("  ")).unwrap(), None);
        assert!(parse_time(Some("7pm")).is_err());
    }

    #[test]
    fn time_keeps_seconds_on_output() {
        let parsed = parse_time(Some("07:45:30")).unwrap().unwrap();
        assert_eq!(format_time(parsed), "07:45:30");
        let parsed = parse_time(Some("07:45")).unwrap().unwrap();
        assert_eq!(format_time(parsed), "07:45:00");
    }

    #[test]
    fn date_must_be_iso() {
        assert_eq!(
            parse_date(Some("2024-03-01")).unwrap(),
            NaiveDate::from_ymd_opt(2024, 3, 1)
        );
        assert!(parse_date(Some("01/03/2024")).is_err());
    }

    #[test]
    fn status_and_stage_use_display_labels() {
        assert_eq!(
            parse_status(Some("Under Review")).unwrap(),
            Some(ReportStatus::UnderReview)
        );
        assert!(parse_status(Some("under_review")).is_err());
        assert_eq!(
            parse_stage(Some("OE Department")).unwrap(),
            Some(ReportStage::OeDepartment)
        );
    }
}
