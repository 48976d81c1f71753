#![allow(dead_code)]

use faultdesk::models::{user, Role};
use reqwest::Client;
use sea_orm::{ActiveModelTrait, ConnectionTrait, DatabaseConnection, Set, Statement};
use sea_orm_migration::MigratorTrait;
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::{
    atomic::{AtomicBool, AtomicUsize, Ordering},
    Once,
};

static INIT: Once = Once::new();
static MIGRATIONS_RAN: AtomicBool = AtomicBool::new(false);
static USER_COUNTER: AtomicUsize = AtomicUsize::new(0);
static SERIAL_COUNTER: AtomicUsize = AtomicUsize::new(0);

pub const PASSWORD: &str = "test_password_123";

fn init_env() {
    INIT.call_once(|| {
        dotenv::dotenv().ok();
        std::env::set_var(
            "JWT_SECRET",
            "integration_test_secret_that_is_at_least_32_characters_long",
        );
        std::env::set_var("RATE_LIMIT_ENABLED", "false");
        std::env::set_var("BCRYPT_COST", "4");
        let config = faultdesk::config::jwt::JwtConfig::from_env().unwrap();
        let _ = faultdesk::utils::jwt::init_jwt_config(config);
    });
}

pub struct TestApp {
    pub addr: String,
    pub db: DatabaseConnection,
    pub client: Client,
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("{}/api/v1{}", self.addr, path)
    }
}

/// A logged-in account.
pub struct TestUser {
    pub id: i32,
    pub username: String,
    pub display_name: String,
    pub token: String,
}

pub async fn spawn_app() -> TestApp {
    init_env();

    let database_url = std::env::var("TEST_DATABASE_URL")
        .unwrap_or_else(|_| std::env::var("DATABASE_URL").expect("DATABASE_URL must be set"));

    let db = sea_orm::Database::connect(&database_url)
        .await
        .expect("Failed to connect to test database");

    if !MIGRATIONS_RAN.swap(true, Ordering::SeqCst) {
        faultdesk::migration::Migrator::up(&db, None)
            .await
            .expect("Failed to run migrations");
    }

    cleanup_tables(&db).await;

    let app = axum::Router::new()
        .route("/", axum::routing::get(|| async { "ok" }))
        .merge(faultdesk::routes::create_routes())
        .layer(axum::middleware::from_fn(
            faultdesk::middleware::security::security_headers_middleware,
        ))
        .layer(axum::extract::Extension(db.clone()));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .unwrap();
    });

    TestApp {
        addr: format!("http://{}", addr),
        db,
        client: Client::new(),
    }
}

async fn cleanup_tables(db: &DatabaseConnection) {
    for table in ["report_remarks", "reports", "users"] {
        let sql = format!("TRUNCATE TABLE {} RESTART IDENTITY CASCADE", table);
        let _ = db
            .execute(Statement::from_string(
                sea_orm::DatabaseBackend::Postgres,
                sql,
            ))
            .await;
    }
}

/// Insert an account directly and log it in.
pub async fn create_user(
    app: &TestApp,
    role: Role,
    department: Option<&str>,
    employee_id: Option<&str>,
) -> TestUser {
    let n = USER_COUNTER.fetch_add(1, Ordering::SeqCst);
    let username = format!("{}_{}", role.as_str(), n);
    let display_name = format!("{} {}", role.as_str(), n);
    let now = chrono::Utc::now().naive_utc();

    let model = user::ActiveModel {
        username: Set(username.clone()),
        display_name: Set(display_name.clone()),
        password_hash: Set(faultdesk::utils::hash_password(PASSWORD).unwrap()),
        role: Set(role),
        department: Set(department.map(str::to_string)),
        employee_id: Set(employee_id.map(str::to_string)),
        is_active: Set(true),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };
    let created = model.insert(&app.db).await.expect("Failed to insert user");

    let token = login(app, json!({ "username": username, "password": PASSWORD })).await;
    TestUser {
        id: created.id,
        username,
        display_name,
        token,
    }
}

pub async fn create_with_role(app: &TestApp, role: Role) -> TestUser {
    create_user(app, role, None, None).await
}

pub async fn create_department_user(app: &TestApp, department: &str) -> TestUser {
    create_user(app, Role::Department, Some(department), None).await
}

/// Log in and return the access token.
pub async fn login(app: &TestApp, credentials: Value) -> String {
    let resp = app
        .client
        .post(app.url("/auth/login"))
        .json(&credentials)
        .send()
        .await
        .expect("Failed to log in");

    let status = resp.status();
    let body: Value = resp.json().await.expect("Failed to parse login response");
    assert_eq!(status, 200, "login failed: {}", body);

    body["data"]["token"]
        .as_str()
        .expect("Response missing token")
        .to_string()
}

pub fn unique_serial() -> String {
    format!("TR-{:05}", SERIAL_COUNTER.fetch_add(1, Ordering::SeqCst))
}

/// File a report as `shift` and return the response body's `data`.
pub async fn create_report(app: &TestApp, shift: &TestUser, refer_to: &str) -> Value {
    let resp = app
        .client
        .post(app.url("/reports"))
        .bearer_auth(&shift.token)
        .json(&json!({
            "serialNo": unique_serial(),
            "date": "2024-03-01",
            "time": "07:45",
            "apparatus": "Boiler feed pump 2A",
            "description": "High bearing temperature alarm",
            "recommendation": "Check lube oil flow",
            "referTo": refer_to,
            "means": "Telephone"
        }))
        .send()
        .await
        .expect("Failed to create report");

    let status = resp.status();
    let body: Value = resp.json().await.expect("Failed to parse report response");
    assert_eq!(status, 201, "create report failed: {}", body);
    body["data"].clone()
}

/// Send a JSON request and return (status, body).
pub async fn send(
    app: &TestApp,
    method: reqwest::Method,
    path: &str,
    token: &str,
    payload: Option<Value>,
) -> (u16, Value) {
    let mut req = app
        .client
        .request(method, app.url(path))
        .bearer_auth(token);
    if let Some(payload) = payload {
        req = req.json(&payload);
    }
    let resp = req.send().await.expect("Request failed");
    let status = resp.status().as_u16();
    let body = resp.json().await.unwrap_or(Value::Null);
    (status, body)
}
