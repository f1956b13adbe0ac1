use axum::{
    extract::{Path, State},
    Json,
};
use chrono::{DateTime, Utc};
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entities::booking::{self, BookingStatus, PaymentStatus};
use crate::entities::user::{self, UserRole};
use crate::entities::{address, garage, review};
use crate::error::{AppError, AppResult};
use crate::utils::earnings::EarningsSummary;
use crate::utils::ordering::newest_first;
use crate::AppState;

// ============ User Management ============

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub email: String,
    #[serde(rename = "fullName")]
    pub full_name: String,
    pub role: UserRole,
    pub created_at: DateTime<Utc>,
}

/// List all users (admin)
pub async fn list_all_users(State(state): State<AppState>) -> AppResult<Json<Vec<UserResponse>>> {
    let users = user::Entity::find().all(&state.db).await?;

    let responses: Vec<UserResponse> = users
        .into_iter()
        .map(|u| UserResponse {
            id: u.id,
            email: u.email,
            full_name: u.full_name,
            role: u.role,
            created_at: u.created_at.with_timezone(&Utc),
        })
        .collect();

    Ok(Json(responses))
}

/// Delete a user account and everything it owns (admin)
pub async fn delete_user(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<serde_json::Value>> {
    let user = user::Entity::find_by_id(id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    if user.role == UserRole::Admin {
        return Err(AppError::Forbidden(
            "Admin accounts cannot be deleted".to_string(),
        ));
    }

    // Garage accounts drag their partner profile and its bookings along
    if user.role == UserRole::Garage {
        if let Some(g) = garage::Entity::find()
            .filter(garage::Column::UserId.eq(id))
            .one(&state.db)
            .await?
        {
            review::Entity::delete_many()
                .filter(review::Column::GarageId.eq(g.id))
                .exec(&state.db)
                .await?;
            booking::Entity::delete_many()
                .filter(booking::Column::GarageId.eq(g.id))
                .exec(&state.db)
                .await?;
            garage::Entity::delete_by_id(g.id).exec(&state.db).await?;
        }
    }

    // Rider-owned rows
    review::Entity::delete_many()
        .filter(review::Column::UserId.eq(id))
        .exec(&state.db)
        .await?;
    booking::Entity::delete_many()
        .filter(booking::Column::UserId.eq(id))
        .exec(&state.db)
        .await?;
    address::Entity::delete_many()
        .filter(address::Column::UserId.eq(id))
        .exec(&state.db)
        .await?;

    user::Entity::delete_by_id(id).exec(&state.db).await?;

    Ok(Json(serde_json::json!({ "message": "User deleted" })))
}

// ============ Garage Management ============

#[derive(Debug, Serialize)]
pub struct GarageResponse {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub location: String,
    pub phone: String,
    pub commission: f64,
    pub stats: EarningsSummary,
    pub created_at: DateTime<Utc>,
}

/// List all garages with their derived figures (admin)
pub async fn list_garages(State(state): State<AppState>) -> AppResult<Json<Vec<GarageResponse>>> {
    let garages = garage::Entity::find().all(&state.db).await?;
    let bookings = booking::Entity::find().all(&state.db).await?;
    let reviews = review::Entity::find().all(&state.db).await?;

    let responses: Vec<GarageResponse> = garages
        .into_iter()
        .map(|g| {
            let garage_bookings: Vec<booking::Model> = bookings
                .iter()
                .filter(|b| b.garage_id == g.id)
                .cloned()
                .collect();
            let garage_reviews: Vec<review::Model> = reviews
                .iter()
                .filter(|r| r.garage_id == g.id)
                .cloned()
                .collect();

            GarageResponse {
                stats: EarningsSummary::compute(&garage_bookings, &garage_reviews, g.commission),
                id: g.id,
                user_id: g.user_id,
                name: g.name,
                location: g.location,
                phone: g.phone,
                commission: g.commission,
                created_at: g.created_at.with_timezone(&Utc),
            }
        })
        .collect();

    Ok(Json(responses))
}

#[derive(Debug, Deserialize)]
pub struct UpdateCommissionRequest {
    pub commission: f64,
}

/// Set a garage's commission rate (admin)
pub async fn update_commission(
    State(state): State<AppState>,
    Path(garage_id): Path<Uuid>,
    Json(payload): Json<UpdateCommissionRequest>,
) -> AppResult<Json<garage::Model>> {
    if !(0.0..1.0).contains(&payload.commission) {
        return Err(AppError::Validation(
            "Commission must be a fraction in [0, 1)".to_string(),
        ));
    }

    let garage = garage::Entity::find_by_id(garage_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Garage not found".to_string()))?;

    let mut active: garage::ActiveModel = garage.into();
    active.commission = Set(payload.commission);
    let updated = active.update(&state.db).await?;

    Ok(Json(updated))
}

// ============ Booking Oversight ============

#[derive(Debug, Serialize)]
pub struct BookingInfo {
    pub id: Uuid,
    pub rider_name: String,
    pub rider_email: String,
    pub garage_name: String,
    pub issue_type: String,
    pub status: BookingStatus,
    pub price: i32,
    pub payment_status: PaymentStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// List all bookings across the platform (admin)
pub async fn list_all_bookings(
    State(state): State<AppState>,
) -> AppResult<Json<Vec<BookingInfo>>> {
    let mut bookings = booking::Entity::find().all(&state.db).await?;
    newest_first(&mut bookings);
    let users = user::Entity::find().all(&state.db).await?;
    let garages = garage::Entity::find().all(&state.db).await?;

    let responses: Vec<BookingInfo> = bookings
        .into_iter()
        .map(|b| {
            let rider = users.iter().find(|u| u.id == b.user_id);
            let garage = garages.iter().find(|g| g.id == b.garage_id);
            BookingInfo {
                id: b.id,
                rider_name: rider.map(|u| u.full_name.clone()).unwrap_or_default(),
                rider_email: rider.map(|u| u.email.clone()).unwrap_or_default(),
                garage_name: garage.map(|g| g.name.clone()).unwrap_or_default(),
                issue_type: b.issue_type,
                status: b.status,
                price: b.price,
                payment_status: b.payment_status,
                created_at: b.created_at.with_timezone(&Utc),
                updated_at: b.updated_at.with_timezone(&Utc),
            }
        })
        .collect();

    Ok(Json(responses))
}
