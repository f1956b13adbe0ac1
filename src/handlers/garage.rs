use axum::{
    extract::{Path, State},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entities::booking::{self, BookingStatus, PaymentStatus};
use crate::entities::user::{self, UserRole};
use crate::entities::{garage, review};
use crate::error::{AppError, AppResult};
use crate::handlers::rider::apply_status;
use crate::utils::earnings::EarningsSummary;
use crate::utils::jwt::Claims;
use crate::utils::lifecycle::validate_transition;
use crate::utils::ordering::newest_first;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct GarageDashboardResponse {
    pub id: Uuid,
    pub name: String,
    pub location: String,
    pub phone: String,
    pub commission: f64,
    pub stats: EarningsSummary,
}

/// Garage profile with its derived earnings figures
pub async fn dashboard(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> AppResult<Json<GarageDashboardResponse>> {
    let garage = find_own_garage(&state, claims.sub).await?;

    let bookings = booking::Entity::find()
        .filter(booking::Column::GarageId.eq(garage.id))
        .all(&state.db)
        .await?;
    let reviews = review::Entity::find()
        .filter(review::Column::GarageId.eq(garage.id))
        .all(&state.db)
        .await?;

    let stats = EarningsSummary::compute(&bookings, &reviews, garage.commission);

    Ok(Json(GarageDashboardResponse {
        id: garage.id,
        name: garage.name,
        location: garage.location,
        phone: garage.phone,
        commission: garage.commission,
        stats,
    }))
}

#[derive(Debug, Serialize)]
pub struct GarageBookingInfo {
    pub id: Uuid,
    pub rider_name: String,
    pub issue_type: String,
    pub status: BookingStatus,
    pub price: i32,
    pub payment_status: PaymentStatus,
    pub review: Option<review::Model>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct GarageBookingsResponse {
    pub new_requests: Vec<GarageBookingInfo>,
    pub active: Vec<GarageBookingInfo>,
    pub history: Vec<GarageBookingInfo>,
}

/// The garage's work queue: incoming requests, jobs in progress, history.
/// All newest-first, id as the tie-break.
pub async fn my_bookings(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> AppResult<Json<GarageBookingsResponse>> {
    let garage = find_own_garage(&state, claims.sub).await?;

    let mut bookings = booking::Entity::find()
        .filter(booking::Column::GarageId.eq(garage.id))
        .all(&state.db)
        .await?;
    newest_first(&mut bookings);

    let riders = user::Entity::find().all(&state.db).await?;
    let reviews = review::Entity::find()
        .filter(review::Column::GarageId.eq(garage.id))
        .all(&state.db)
        .await?;

    let mut new_requests = Vec::new();
    let mut active = Vec::new();
    let mut history = Vec::new();

    for b in bookings {
        let rider_name = riders
            .iter()
            .find(|u| u.id == b.user_id)
            .map(|u| u.full_name.clone())
            .unwrap_or_default();
        let review = reviews.iter().find(|r| r.booking_id == b.id).cloned();

        let info = GarageBookingInfo {
            id: b.id,
            rider_name,
            issue_type: b.issue_type.clone(),
            status: b.status,
            price: b.price,
            payment_status: b.payment_status,
            review,
            created_at: b.created_at.with_timezone(&Utc),
            updated_at: b.updated_at.with_timezone(&Utc),
        };

        match b.status {
            BookingStatus::Requested => new_requests.push(info),
            BookingStatus::Accepted | BookingStatus::OnWay | BookingStatus::Arrived => {
                active.push(info)
            }
            BookingStatus::Completed | BookingStatus::Cancelled => history.push(info),
        }
    }

    Ok(Json(GarageBookingsResponse {
        new_requests,
        active,
        history,
    }))
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: BookingStatus,
}

/// Move one of the garage's bookings along the service order, or cancel it
pub async fn update_status(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(booking_id): Path<Uuid>,
    Json(payload): Json<UpdateStatusRequest>,
) -> AppResult<Json<serde_json::Value>> {
    let garage = find_own_garage(&state, claims.sub).await?;

    let booking = booking::Entity::find_by_id(booking_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Booking not found".to_string()))?;

    if booking.garage_id != garage.id {
        return Err(AppError::Forbidden(
            "This booking belongs to another garage".to_string(),
        ));
    }

    validate_transition(booking.status, payload.status, &UserRole::Garage)?;

    apply_status(&state, &booking, payload.status).await?;

    Ok(Json(serde_json::json!({ "message": "Booking status updated" })))
}

#[derive(Debug, Deserialize)]
pub struct ReviewResponseRequest {
    pub response: String,
}

/// Respond to a rider review. One response per review; no overwrites.
pub async fn respond_to_review(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(review_id): Path<Uuid>,
    Json(payload): Json<ReviewResponseRequest>,
) -> AppResult<Json<review::Model>> {
    if payload.response.trim().is_empty() {
        return Err(AppError::Validation("Response text is required".to_string()));
    }

    let garage = find_own_garage(&state, claims.sub).await?;

    let review = review::Entity::find_by_id(review_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Review not found".to_string()))?;

    if review.garage_id != garage.id {
        return Err(AppError::Forbidden(
            "This review belongs to another garage".to_string(),
        ));
    }

    if review.garage_response.is_some() {
        return Err(AppError::Conflict(
            "Review already has a response".to_string(),
        ));
    }

    let mut active: review::ActiveModel = review.into();
    active.garage_response = Set(Some(payload.response.trim().to_string()));
    let updated = active.update(&state.db).await?;

    Ok(Json(updated))
}

/// Request a payout of the current balance. There is no payout ledger;
/// the request is validated against the derived balance and logged.
pub async fn request_payout(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> AppResult<Json<serde_json::Value>> {
    let garage = find_own_garage(&state, claims.sub).await?;

    let bookings = booking::Entity::find()
        .filter(booking::Column::GarageId.eq(garage.id))
        .all(&state.db)
        .await?;

    let stats = EarningsSummary::compute(&bookings, &[], garage.commission);

    if stats.balance <= 0 {
        return Err(AppError::Validation(
            "No balance available for payout".to_string(),
        ));
    }

    tracing::info!(
        garage_id = %garage.id,
        amount = stats.balance,
        "Payout requested"
    );

    Ok(Json(serde_json::json!({
        "message": format!("Payout request for {} submitted", stats.balance)
    })))
}

async fn find_own_garage(state: &AppState, user_id: Uuid) -> AppResult<garage::Model> {
    garage::Entity::find()
        .filter(garage::Column::UserId.eq(user_id))
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Garage profile not found for this user".to_string()))
}
