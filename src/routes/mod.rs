use crate::config::rate_limit::{RateLimitConfig, RateLimitRule};
use crate::handlers;
use crate::middleware::auth::auth_middleware;
use axum::{middleware, routing, Router};
use tower_governor::{governor::GovernorConfigBuilder, GovernorLayer};

pub fn create_routes() -> Router {
    Router::new().nest("/api/v1", api_routes())
}

fn api_routes() -> Router {
    let rate_limit_config = RateLimitConfig::from_env();

    let login = login_routes(&rate_limit_config);
    let protected =
        protected_routes(&rate_limit_config).layer(middleware::from_fn(auth_middleware));

    login.merge(protected)
}

/// Unauthenticated routes.
fn login_routes(config: &RateLimitConfig) -> Router {
    let router = Router::new().route("/auth/login", routing::post(handlers::login));

    with_optional_rate_limit(router, config.enabled, config.login)
}

/// Everything behind a valid token. Role checks happen in the services.
fn protected_routes(config: &RateLimitConfig) -> Router {
    let router = Router::new()
        // Auth
        .route("/auth/me", routing::get(handlers::get_current_user))
        .route("/auth/logout", routing::post(handlers::logout))
        .route("/auth/password", routing::put(handlers::change_password))
        // Departments
        .route(
            "/departments",
            routing::get(handlers::department::list_departments),
        )
        // Reports
        .route(
            "/reports",
            routing::get(handlers::report::list_reports).post(handlers::report::create_report),
        )
        .route(
            "/reports/stats",
            routing::get(handlers::report::report_stats),
        )
        .route("/reports/{id}", routing::get(handlers::report::get_report))
        .route(
            "/reports/{id}/department-action",
            routing::post(handlers::report::department_action),
        )
        .route(
            "/reports/{id}/oe-action",
            routing::post(handlers::report::oe_action),
        )
        .route(
            "/reports/{id}/oe-remark",
            routing::post(handlers::report::oe_remark),
        )
        .route(
            "/reports/{id}/resident-action",
            routing::post(handlers::report::resident_action),
        )
        .route(
            "/reports/{id}/remarks",
            routing::post(handlers::report::add_remark),
        )
        // Admin
        .route(
            "/admin/reports/{id}",
            routing::put(handlers::report::admin_update_report)
                .delete(handlers::report::admin_delete_report),
        )
        .route(
            "/admin/users",
            routing::get(handlers::admin::list_users).post(handlers::admin::create_user),
        )
        .route(
            "/admin/users/{id}",
            routing::put(handlers::admin::update_user).delete(handlers::admin::delete_user),
        );

    with_optional_rate_limit(router, config.enabled, config.api)
}

fn with_optional_rate_limit(router: Router, enabled: bool, rule: RateLimitRule) -> Router {
    if !enabled {
        return router;
    }

    let Some(governor_conf) = GovernorConfigBuilder::default()
        .per_second(rule.per_second)
        .burst_size(rule.burst_size)
        .finish()
    else {
        tracing::warn!(?rule, "Invalid rate limit rule, route group left unthrottled");
        return router;
    };

    router.layer(GovernorLayer::new(governor_conf))
}
