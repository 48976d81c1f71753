mod common;

use faultdesk::models::Role;
use reqwest::Method;
use serde_json::json;

#[tokio::test]
async fn admin_update_overrides_state_and_leaves_audit_remark() {
    let app = common::spawn_app().await;
    let admin = common::create_with_role(&app, Role::Admin).await;
    let shift = common::create_with_role(&app, Role::ShiftEngineer).await;

    let report = common::create_report(&app, &shift, "EME (P)").await;
    let id = report["id"].as_i64().unwrap();

    let (status, body) = common::send(
        &app,
        Method::PUT,
        &format!("/admin/reports/{}", id),
        &admin.token,
        Some(json!({
            "apparatus": "Boiler feed pump 2B",
            "recommendation": "",
            "status": "Closed",
            "currentStage": "Completed"
        })),
    )
    .await;
    assert_eq!(status, 200, "{}", body);

    let data = &body["data"];
    assert_eq!(data["apparatus"], "Boiler feed pump 2B");
    assert!(data["recommendation"].is_null());
    assert_eq!(data["status"], "Closed");
    assert_eq!(data["currentStage"], "Completed");
    assert_eq!(data["version"], 2);

    let remarks = data["remarks"].as_array().unwrap();
    assert_eq!(remarks.len(), 1);
    let text = remarks[0]["text"].as_str().unwrap();
    assert!(text.starts_with(&format!(
        "Report updated by administrator {}",
        admin.display_name
    )));
    assert!(text.contains("apparatus"));
}

#[tokio::test]
async fn admin_update_rejects_impossible_status_stage_pair() {
    let app = common::spawn_app().await;
    let admin = common::create_with_role(&app, Role::Admin).await;
    let shift = common::create_with_role(&app, Role::ShiftEngineer).await;

    let report = common::create_report(&app, &shift, "EME (P)").await;
    let id = report["id"].as_i64().unwrap();

    let (status, body) = common::send(
        &app,
        Method::PUT,
        &format!("/admin/reports/{}", id),
        &admin.token,
        Some(json!({ "status": "Closed", "currentStage": "Resident Engineer" })),
    )
    .await;
    assert_eq!(status, 400);
    assert_eq!(body["kind"], "ValidationFailed");
}

#[tokio::test]
async fn only_admins_update_or_delete_reports() {
    let app = common::spawn_app().await;
    let shift = common::create_with_role(&app, Role::ShiftEngineer).await;

    let report = common::create_report(&app, &shift, "EME (P)").await;
    let id = report["id"].as_i64().unwrap();

    let (status, _) = common::send(
        &app,
        Method::PUT,
        &format!("/admin/reports/{}", id),
        &shift.token,
        Some(json!({ "status": "Nonsense" })),
    )
    .await;
    assert_eq!(status, 403);

    let (status, _) = common::send(
        &app,
        Method::DELETE,
        &format!("/admin/reports/{}", id),
        &shift.token,
        None,
    )
    .await;
    assert_eq!(status, 403);
}

#[tokio::test]
async fn admin_delete_removes_report_and_remarks() {
    let app = common::spawn_app().await;
    let admin = common::create_with_role(&app, Role::Admin).await;
    let shift = common::create_with_role(&app, Role::ShiftEngineer).await;

    let report = common::create_report(&app, &shift, "EME (P)").await;
    let id = report["id"].as_i64().unwrap();
    common::send(
        &app,
        Method::POST,
        &format!("/reports/{}/remarks", id),
        &shift.token,
        Some(json!({ "remark": "Spare pump started" })),
    )
    .await;

    let (status, _) = common::send(
        &app,
        Method::DELETE,
        &format!("/admin/reports/{}", id),
        &admin.token,
        None,
    )
    .await;
    assert_eq!(status, 200);

    let (status, _) =
        common::send(&app, Method::GET, &format!("/reports/{}", id), &admin.token, None).await;
    assert_eq!(status, 404);

    let (status, _) = common::send(
        &app,
        Method::DELETE,
        &format!("/admin/reports/{}", id),
        &admin.token,
        None,
    )
    .await;
    assert_eq!(status, 404);
}

#[tokio::test]
async fn admin_creates_department_account() {
    let app = common::spawn_app().await;
    let admin = common::create_with_role(&app, Role::Admin).await;

    let (status, body) = common::send(
        &app,
        Method::POST,
        "/admin/users",
        &admin.token,
        Some(json!({
            "username": "civil_lead",
            "displayName": "Civil Lead",
            "password": "civil_password_1",
            "role": "department",
            "department": "civil (p)",
            "employeeId": "C-77"
        })),
    )
    .await;
    assert_eq!(status, 201, "{}", body);
    assert_eq!(body["data"]["department"], "Civil (P)");

    // Same employee id in the same department is taken.
    let (status, body) = common::send(
        &app,
        Method::POST,
        "/admin/users",
        &admin.token,
        Some(json!({
            "username": "civil_lead_2",
            "displayName": "Civil Lead Two",
            "password": "civil_password_1",
            "role": "department",
            "department": "Civil (P)",
            "employeeId": "C-77"
        })),
    )
    .await;
    assert_eq!(status, 409, "{}", body);

    // Department accounts need a department.
    let (status, _) = common::send(
        &app,
        Method::POST,
        "/admin/users",
        &admin.token,
        Some(json!({
            "username": "floating",
            "displayName": "No Dept",
            "password": "civil_password_1",
            "role": "department"
        })),
    )
    .await;
    assert_eq!(status, 400);

    let token = common::login(
        &app,
        json!({ "employeeId": "C-77", "department": "Civil (P)", "password": "civil_password_1" }),
    )
    .await;
    assert!(!token.is_empty());
}

#[tokio::test]
async fn duplicate_username_conflicts() {
    let app = common::spawn_app().await;
    let admin = common::create_with_role(&app, Role::Admin).await;

    let (status, _) = common::send(
        &app,
        Method::POST,
        "/admin/users",
        &admin.token,
        Some(json!({
            "username": admin.username,
            "displayName": "Clone",
            "password": "clone_password_1",
            "role": "oe"
        })),
    )
    .await;
    assert_eq!(status, 409);
}

#[tokio::test]
async fn list_users_filters_by_role() {
    let app = common::spawn_app().await;
    let admin = common::create_with_role(&app, Role::Admin).await;
    common::create_with_role(&app, Role::Oe).await;
    common::create_with_role(&app, Role::Oe).await;
    common::create_with_role(&app, Role::ShiftEngineer).await;

    let (status, body) =
        common::send(&app, Method::GET, "/admin/users?role=oe", &admin.token, None).await;
    assert_eq!(status, 200);
    assert_eq!(body["data"]["total"], 2);

    let (status, body) =
        common::send(&app, Method::GET, "/admin/users?perPage=2", &admin.token, None).await;
    assert_eq!(status, 200);
    assert_eq!(body["data"]["items"].as_array().unwrap().len(), 2);
    assert_eq!(body["data"]["totalPages"], 2);
}

#[tokio::test]
async fn non_admin_cannot_manage_users() {
    let app = common::spawn_app().await;
    let oe = common::create_with_role(&app, Role::Oe).await;

    let (status, _) = common::send(&app, Method::GET, "/admin/users", &oe.token, None).await;
    assert_eq!(status, 403);
}

#[tokio::test]
async fn admin_cannot_delete_or_disable_self() {
    let app = common::spawn_app().await;
    let admin = common::create_with_role(&app, Role::Admin).await;

    let (status, _) = common::send(
        &app,
        Method::DELETE,
        &format!("/admin/users/{}", admin.id),
        &admin.token,
        None,
    )
    .await;
    assert_eq!(status, 403);

    let (status, _) = common::send(
        &app,
        Method::PUT,
        &format!("/admin/users/{}", admin.id),
        &admin.token,
        Some(json!({ "isActive": false })),
    )
    .await;
    assert_eq!(status, 403);
}

#[tokio::test]
async fn user_with_reports_cannot_be_deleted() {
    let app = common::spawn_app().await;
    let admin = common::create_with_role(&app, Role::Admin).await;
    let shift = common::create_with_role(&app, Role::ShiftEngineer).await;
    let idle = common::create_with_role(&app, Role::Oe).await;
    common::create_report(&app, &shift, "EME (P)").await;

    let (status, _) = common::send(
        &app,
        Method::DELETE,
        &format!("/admin/users/{}", shift.id),
        &admin.token,
        None,
    )
    .await;
    assert_eq!(status, 409);

    let (status, _) = common::send(
        &app,
        Method::DELETE,
        &format!("/admin/users/{}", idle.id),
        &admin.token,
        None,
    )
    .await;
    assert_eq!(status, 200);
}
