use std::sync::Arc;

use axum::{
    middleware,
    routing::{delete, get, post, put},
    Router,
};

use shared_database::AppState;
use shared_utils::extractor::{auth_middleware, require_admin, require_super_admin};

use crate::handlers;

pub fn admin_routes(state: Arc<AppState>) -> Router {
    // Public routes (no authentication required)
    let public_routes = Router::new().route("/admin/login", post(handlers::login));

    // Any signed-in account, doctors included
    let session_routes = Router::new()
        .route("/admin/me", get(handlers::me))
        .route("/admin/totp/setup", post(handlers::setup_totp))
        .route("/admin/totp/enable", post(handlers::enable_totp))
        .route("/admin/totp/disable", post(handlers::disable_totp))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    let super_admin_routes = Router::new()
        .route("/admin/users", get(handlers::list_users).post(handlers::create_user))
        .route("/admin/users/{user_id}", delete(handlers::delete_user))
        .route("/admin/users/{user_id}/password", put(handlers::reset_password))
        .layer(middleware::from_fn(require_super_admin))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    let admin_routes = Router::new()
        .route("/admin/config", get(handlers::get_config).put(handlers::update_config))
        .layer(middleware::from_fn(require_admin))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .merge(public_routes)
        .merge(session_routes)
        .merge(super_admin_routes)
        .merge(admin_routes)
        .with_state(state)
}
