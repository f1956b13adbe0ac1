use axum::{
    middleware,
    routing::{delete, get, post, put},
    Router,
};

use crate::handlers::{admin, auth, garage, rider};
use crate::middleware::auth::{auth_middleware, require_admin, require_garage, require_rider};
use crate::middleware::rate_limit::{create_public_governor, log_request};
use crate::middleware::role_rate_limit::{create_role_governor, RateLimitedRole};
use crate::AppState;

pub fn create_router(state: AppState) -> Router {
    // Create role-specific governor layers
    let garage_governor = create_role_governor(RateLimitedRole::Garage);
    let rider_governor = create_role_governor(RateLimitedRole::Rider);
    // Create IP-based governor for public routes (with rider-level limits)
    let public_governor = create_public_governor();

    // Public routes (with rider-level rate limiting per IP)
    let auth_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/password-reset", post(auth::password_reset))
        .layer(public_governor.clone());

    // Public garage directory
    let public_routes = Router::new()
        .route("/garages", get(rider::list_garages))
        .route("/garages/{id}", get(rider::get_garage))
        .layer(public_governor);

    // Admin routes (requires auth + admin role)
    let admin_routes = Router::new()
        .route("/users", get(admin::list_all_users))
        .route("/users/{id}", delete(admin::delete_user))
        .route("/garages", get(admin::list_garages))
        .route("/garages/{id}/commission", put(admin::update_commission))
        .route("/bookings", get(admin::list_all_bookings))
        .layer(middleware::from_fn(require_admin))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    // Garage routes (requires auth + garage role)
    // Rate limit: 500 requests per minute (5x base)
    let garage_routes = Router::new()
        .route("/dashboard", get(garage::dashboard))
        .route("/bookings", get(garage::my_bookings))
        .route("/bookings/{id}/status", post(garage::update_status))
        .route("/reviews/{id}/response", post(garage::respond_to_review))
        .route("/payout", post(garage::request_payout))
        .layer(garage_governor)
        .layer(middleware::from_fn(require_garage))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    // Rider routes (requires auth + rider role)
    // Rate limit: 100 requests per minute (base)
    let rider_routes = Router::new()
        .route("/bookings", post(rider::create_booking))
        .route("/bookings", get(rider::my_bookings))
        .route("/bookings/{id}", get(rider::get_booking))
        .route("/bookings/{id}/cancel", post(rider::cancel_booking))
        .route("/bookings/{id}/pay", post(rider::pay_booking))
        .route("/bookings/{id}/review", post(rider::create_review))
        .route("/me/profile", get(rider::get_profile))
        .route("/me/profile", put(rider::update_profile))
        .route("/me/addresses", get(rider::list_addresses))
        .route("/me/addresses", post(rider::create_address))
        .route("/me/addresses/{id}", put(rider::update_address))
        .route("/me/addresses/{id}", delete(rider::delete_address))
        .layer(rider_governor)
        .layer(middleware::from_fn(require_rider))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    // Combine all routes
    Router::new()
        .nest("/api/auth", auth_routes)
        .nest("/api", public_routes)
        .nest("/api/admin", admin_routes)
        .nest("/api/garage", garage_routes)
        .nest("/api", rider_routes)
        .layer(middleware::from_fn(log_request))
        .with_state(state)
}
