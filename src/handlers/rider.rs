use axum::{
    extract::{Path, State},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use rand::Rng;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entities::booking::{self, BookingStatus, PaymentStatus};
use crate::entities::user::UserRole;
use crate::entities::{address, garage, review, user};
use crate::error::{AppError, AppResult};
use crate::utils::earnings::average_rating;
use crate::utils::jwt::Claims;
use crate::utils::lifecycle::{validate_payment, validate_review, validate_transition};
use crate::utils::ordering::newest_first;
use crate::AppState;

/// Mechanic arrival estimate shown while a booking is on the way.
/// Simulated; there is no live positioning feed.
const SIMULATED_ETA_MINUTES: u32 = 15;

// ============ Garages (public) ============

#[derive(Debug, Serialize)]
pub struct GarageInfo {
    pub id: Uuid,
    pub name: String,
    pub location: String,
    pub phone: String,
    pub average_rating: Option<f64>,
}

/// List all garages with their derived average rating
pub async fn list_garages(State(state): State<AppState>) -> AppResult<Json<Vec<GarageInfo>>> {
    let garages = garage::Entity::find().all(&state.db).await?;
    let reviews = review::Entity::find().all(&state.db).await?;

    let responses: Vec<GarageInfo> = garages
        .into_iter()
        .map(|g| GarageInfo {
            average_rating: average_rating(reviews.iter().filter(|r| r.garage_id == g.id)),
            id: g.id,
            name: g.name,
            location: g.location,
            phone: g.phone,
        })
        .collect();

    Ok(Json(responses))
}

/// Get a single garage
pub async fn get_garage(
    State(state): State<AppState>,
    Path(garage_id): Path<Uuid>,
) -> AppResult<Json<GarageInfo>> {
    let garage = garage::Entity::find_by_id(garage_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Garage not found".to_string()))?;

    let reviews = review::Entity::find()
        .filter(review::Column::GarageId.eq(garage_id))
        .all(&state.db)
        .await?;

    Ok(Json(GarageInfo {
        average_rating: average_rating(&reviews),
        id: garage.id,
        name: garage.name,
        location: garage.location,
        phone: garage.phone,
    }))
}

// ============ Booking Management ============

#[derive(Debug, Deserialize)]
pub struct CreateBookingRequest {
    pub garage_id: Uuid,
    pub issue_type: String,
    /// Omitted on quick bookings; a mock quote is generated instead.
    pub price: Option<i32>,
}

#[derive(Debug, Serialize)]
pub struct ReviewInfo {
    pub id: Uuid,
    pub rating: i32,
    pub comment: Option<String>,
    pub garage_response: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<review::Model> for ReviewInfo {
    fn from(r: review::Model) -> Self {
        ReviewInfo {
            id: r.id,
            rating: r.rating,
            comment: r.comment,
            garage_response: r.garage_response,
            created_at: r.created_at.with_timezone(&Utc),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct BookingResponse {
    pub id: Uuid,
    pub garage_id: Uuid,
    pub garage_name: String,
    pub issue_type: String,
    pub status: BookingStatus,
    pub price: i32,
    pub payment_status: PaymentStatus,
    pub review: Option<ReviewInfo>,
    pub eta_minutes: Option<u32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn booking_response(
    b: booking::Model,
    garages: &[garage::Model],
    review: Option<review::Model>,
) -> BookingResponse {
    let garage_name = garages
        .iter()
        .find(|g| g.id == b.garage_id)
        .map(|g| g.name.clone())
        .unwrap_or_default();

    let eta_minutes = match b.status {
        BookingStatus::OnWay => Some(SIMULATED_ETA_MINUTES),
        _ => None,
    };

    BookingResponse {
        id: b.id,
        garage_id: b.garage_id,
        garage_name,
        issue_type: b.issue_type,
        status: b.status,
        price: b.price,
        payment_status: b.payment_status,
        review: review.map(ReviewInfo::from),
        eta_minutes,
        created_at: b.created_at.with_timezone(&Utc),
        updated_at: b.updated_at.with_timezone(&Utc),
    }
}

/// Create a booking
pub async fn create_booking(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreateBookingRequest>,
) -> AppResult<Json<BookingResponse>> {
    if payload.issue_type.trim().is_empty() {
        return Err(AppError::Validation("Issue type is required".to_string()));
    }

    // An unresolvable garage is malformed input, not a missing resource
    let garage = garage::Entity::find_by_id(payload.garage_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::Validation("Unknown garage".to_string()))?;

    let price = match payload.price {
        Some(p) if p > 0 => p,
        Some(_) => {
            return Err(AppError::Validation("Price must be positive".to_string()));
        }
        // Mock quote in lieu of a real pricing engine
        None => rand::thread_rng().gen_range(200..=500),
    };

    let now = Utc::now();
    let new_booking = booking::ActiveModel {
        id: Set(Uuid::new_v4()),
        user_id: Set(claims.sub),
        garage_id: Set(garage.id),
        issue_type: Set(payload.issue_type.trim().to_string()),
        status: Set(BookingStatus::Requested),
        price: Set(price),
        payment_status: Set(PaymentStatus::Unpaid),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    };

    let booking = new_booking.insert(&state.db).await?;

    Ok(Json(booking_response(booking, &[garage], None)))
}

#[derive(Debug, Serialize)]
pub struct BookingListResponse {
    pub active: Vec<BookingResponse>,
    pub history: Vec<BookingResponse>,
}

/// List the rider's bookings, split into active work and history.
/// Both lists are newest-first; id breaks timestamp ties.
pub async fn my_bookings(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> AppResult<Json<BookingListResponse>> {
    let mut bookings = booking::Entity::find()
        .filter(booking::Column::UserId.eq(claims.sub))
        .all(&state.db)
        .await?;
    newest_first(&mut bookings);

    let garages = garage::Entity::find().all(&state.db).await?;
    let reviews = review::Entity::find()
        .filter(review::Column::UserId.eq(claims.sub))
        .all(&state.db)
        .await?;

    let mut active = Vec::new();
    let mut history = Vec::new();
    for b in bookings {
        let review = reviews.iter().find(|r| r.booking_id == b.id).cloned();
        let terminal = b.status.is_terminal();
        let response = booking_response(b, &garages, review);
        if terminal {
            history.push(response);
        } else {
            active.push(response);
        }
    }

    Ok(Json(BookingListResponse { active, history }))
}

/// Get one booking with its garage and review, for the tracking view
pub async fn get_booking(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(booking_id): Path<Uuid>,
) -> AppResult<Json<BookingResponse>> {
    let booking = find_own_booking(&state, booking_id, claims.sub).await?;

    let garage = garage::Entity::find_by_id(booking.garage_id)
        .one(&state.db)
        .await?;
    let review = review::Entity::find()
        .filter(review::Column::BookingId.eq(booking.id))
        .one(&state.db)
        .await?;

    let garages: Vec<garage::Model> = garage.into_iter().collect();
    Ok(Json(booking_response(booking, &garages, review)))
}

/// Cancel a booking
pub async fn cancel_booking(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(booking_id): Path<Uuid>,
) -> AppResult<Json<serde_json::Value>> {
    let booking = find_own_booking(&state, booking_id, claims.sub).await?;

    validate_transition(booking.status, BookingStatus::Cancelled, &UserRole::Rider)?;

    apply_status(&state, &booking, BookingStatus::Cancelled).await?;

    Ok(Json(serde_json::json!({ "message": "Booking cancelled" })))
}

/// Pay for a completed booking. The payment itself is mocked; only the
/// payment status flips.
pub async fn pay_booking(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(booking_id): Path<Uuid>,
) -> AppResult<Json<BookingResponse>> {
    let booking = find_own_booking(&state, booking_id, claims.sub).await?;

    validate_payment(booking.status, booking.payment_status)?;

    // Conditional on the state we validated against, so a racing writer
    // shows up as zero affected rows instead of a silent overwrite
    let update = booking::ActiveModel {
        payment_status: Set(PaymentStatus::Paid),
        updated_at: Set(Utc::now().into()),
        ..Default::default()
    };
    let result = booking::Entity::update_many()
        .set(update)
        .filter(booking::Column::Id.eq(booking.id))
        .filter(booking::Column::Status.eq(BookingStatus::Completed))
        .filter(booking::Column::PaymentStatus.eq(PaymentStatus::Unpaid))
        .exec(&state.db)
        .await?;

    if result.rows_affected == 0 {
        return Err(AppError::Conflict(
            "Booking changed while processing payment".to_string(),
        ));
    }

    let paid = booking::Entity::find_by_id(booking.id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Booking not found".to_string()))?;

    let garages: Vec<garage::Model> = garage::Entity::find_by_id(paid.garage_id)
        .one(&state.db)
        .await?
        .into_iter()
        .collect();

    Ok(Json(booking_response(paid, &garages, None)))
}

// ============ Reviews ============

#[derive(Debug, Deserialize)]
pub struct CreateReviewRequest {
    pub rating: i32,
    pub comment: Option<String>,
}

/// Attach a review to a completed, paid booking
pub async fn create_review(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(booking_id): Path<Uuid>,
    Json(payload): Json<CreateReviewRequest>,
) -> AppResult<Json<ReviewInfo>> {
    let booking = find_own_booking(&state, booking_id, claims.sub).await?;

    let existing = review::Entity::find()
        .filter(review::Column::BookingId.eq(booking.id))
        .one(&state.db)
        .await?;

    validate_review(
        booking.status,
        booking.payment_status,
        existing.is_some(),
        payload.rating,
    )?;

    let comment = payload
        .comment
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty());

    let new_review = review::ActiveModel {
        id: Set(Uuid::new_v4()),
        booking_id: Set(booking.id),
        user_id: Set(booking.user_id),
        garage_id: Set(booking.garage_id),
        rating: Set(payload.rating),
        comment: Set(comment),
        garage_response: Set(None),
        created_at: Set(Utc::now().into()),
    };

    // A concurrent request can slip past the existence check above; the
    // unique index on booking_id catches the loser, and that is the same
    // precondition failure, not a server error
    let review = new_review
        .insert(&state.db)
        .await
        .map_err(review_insert_error)?;

    Ok(Json(ReviewInfo::from(review)))
}

fn review_insert_error(err: sea_orm::DbErr) -> AppError {
    if is_unique_violation(&err.sql_err()) {
        AppError::ReviewPrecondition("booking already has a review".to_string())
    } else {
        AppError::Database(err)
    }
}

fn is_unique_violation(sql_err: &Option<sea_orm::SqlErr>) -> bool {
    matches!(sql_err, Some(sea_orm::SqlErr::UniqueConstraintViolation(_)))
}

// ============ Profile ============

#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub id: Uuid,
    pub email: String,
    #[serde(rename = "fullName")]
    pub full_name: String,
    pub phone: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateProfileRequest {
    #[serde(rename = "fullName")]
    pub full_name: String,
    #[serde(default)]
    pub phone: String,
}

/// Get the logged-in rider's profile
pub async fn get_profile(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> AppResult<Json<ProfileResponse>> {
    let user = user::Entity::find_by_id(claims.sub)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Profile not found".to_string()))?;

    Ok(Json(ProfileResponse {
        id: user.id,
        email: user.email,
        full_name: user.full_name,
        phone: user.phone,
    }))
}

/// Update name and phone
pub async fn update_profile(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<UpdateProfileRequest>,
) -> AppResult<Json<ProfileResponse>> {
    if payload.full_name.trim().is_empty() {
        return Err(AppError::Validation("Name is required".to_string()));
    }

    let user = user::Entity::find_by_id(claims.sub)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Profile not found".to_string()))?;

    let mut active: user::ActiveModel = user.into();
    active.full_name = Set(payload.full_name.trim().to_string());
    active.phone = Set(payload.phone.trim().to_string());
    let updated = active.update(&state.db).await?;

    Ok(Json(ProfileResponse {
        id: updated.id,
        email: updated.email,
        full_name: updated.full_name,
        phone: updated.phone,
    }))
}

// ============ Addresses ============

#[derive(Debug, Deserialize)]
pub struct AddressRequest {
    pub building: String,
    pub street: String,
    pub city: String,
    pub state: String,
    #[serde(rename = "zipCode")]
    pub zip_code: String,
}

#[derive(Debug, Serialize)]
pub struct AddressResponse {
    pub id: Uuid,
    pub building: String,
    pub street: String,
    pub city: String,
    pub state: String,
    #[serde(rename = "zipCode")]
    pub zip_code: String,
}

impl From<address::Model> for AddressResponse {
    fn from(a: address::Model) -> Self {
        AddressResponse {
            id: a.id,
            building: a.building,
            street: a.street,
            city: a.city,
            state: a.state,
            zip_code: a.zip_code,
        }
    }
}

impl AddressRequest {
    fn validate(&self) -> AppResult<()> {
        let required = [
            ("building", &self.building),
            ("street", &self.street),
            ("city", &self.city),
            ("state", &self.state),
            ("zipCode", &self.zip_code),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(AppError::Validation(format!("{} is required", field)));
            }
        }
        Ok(())
    }
}

/// List the rider's saved addresses
pub async fn list_addresses(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> AppResult<Json<Vec<AddressResponse>>> {
    let addresses = address::Entity::find()
        .filter(address::Column::UserId.eq(claims.sub))
        .order_by_desc(address::Column::CreatedAt)
        .order_by_desc(address::Column::Id)
        .all(&state.db)
        .await?;

    Ok(Json(addresses.into_iter().map(AddressResponse::from).collect()))
}

/// Save a new address
pub async fn create_address(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<AddressRequest>,
) -> AppResult<Json<AddressResponse>> {
    payload.validate()?;

    let new_address = address::ActiveModel {
        id: Set(Uuid::new_v4()),
        user_id: Set(claims.sub),
        building: Set(payload.building.trim().to_string()),
        street: Set(payload.street.trim().to_string()),
        city: Set(payload.city.trim().to_string()),
        state: Set(payload.state.trim().to_string()),
        zip_code: Set(payload.zip_code.trim().to_string()),
        created_at: Set(Utc::now().into()),
    };

    let address = new_address.insert(&state.db).await?;

    Ok(Json(AddressResponse::from(address)))
}

/// Update an address
pub async fn update_address(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(address_id): Path<Uuid>,
    Json(payload): Json<AddressRequest>,
) -> AppResult<Json<AddressResponse>> {
    payload.validate()?;

    let address = address::Entity::find_by_id(address_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Address not found".to_string()))?;

    if address.user_id != claims.sub {
        return Err(AppError::Forbidden(
            "You can only edit your own addresses".to_string(),
        ));
    }

    let mut active: address::ActiveModel = address.into();
    active.building = Set(payload.building.trim().to_string());
    active.street = Set(payload.street.trim().to_string());
    active.city = Set(payload.city.trim().to_string());
    active.state = Set(payload.state.trim().to_string());
    active.zip_code = Set(payload.zip_code.trim().to_string());
    let updated = active.update(&state.db).await?;

    Ok(Json(AddressResponse::from(updated)))
}

/// Delete an address
pub async fn delete_address(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(address_id): Path<Uuid>,
) -> AppResult<Json<serde_json::Value>> {
    let address = address::Entity::find_by_id(address_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Address not found".to_string()))?;

    if address.user_id != claims.sub {
        return Err(AppError::Forbidden(
            "You can only delete your own addresses".to_string(),
        ));
    }

    address::Entity::delete_by_id(address_id)
        .exec(&state.db)
        .await?;

    Ok(Json(serde_json::json!({ "message": "Address deleted" })))
}

// ============ Helpers ============

async fn find_own_booking(
    state: &AppState,
    booking_id: Uuid,
    user_id: Uuid,
) -> AppResult<booking::Model> {
    let booking = booking::Entity::find_by_id(booking_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Booking not found".to_string()))?;

    if booking.user_id != user_id {
        return Err(AppError::Forbidden(
            "You can only act on your own bookings".to_string(),
        ));
    }

    Ok(booking)
}

/// Conditional status update: filters on the status the caller validated
/// against, so a lost race surfaces as a conflict.
pub(crate) async fn apply_status(
    state: &AppState,
    booking: &booking::Model,
    target: BookingStatus,
) -> AppResult<()> {
    let update = booking::ActiveModel {
        status: Set(target),
        updated_at: Set(Utc::now().into()),
        ..Default::default()
    };

    let result = booking::Entity::update_many()
        .set(update)
        .filter(booking::Column::Id.eq(booking.id))
        .filter(booking::Column::Status.eq(booking.status))
        .exec(&state.db)
        .await?;

    if result.rows_affected == 0 {
        return Err(AppError::Conflict(
            "Booking status changed concurrently".to_string(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn address_zip_code_round_trips_through_external_names() {
        let form = serde_json::json!({
            "building": "A-12",
            "street": "MG Road",
            "city": "Pune",
            "state": "MH",
            "zipCode": "411001"
        });

        let request: AddressRequest = serde_json::from_value(form).unwrap();
        assert_eq!(request.zip_code, "411001");

        // Simulate persistence into the snake_case row and reload
        let row = address::Model {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            building: request.building,
            street: request.street,
            city: request.city,
            state: request.state,
            zip_code: request.zip_code,
            created_at: Utc::now().into(),
        };

        let reloaded = serde_json::to_value(AddressResponse::from(row)).unwrap();
        assert_eq!(reloaded["zipCode"], "411001");
        assert!(reloaded.get("zip_code").is_none());
    }

    #[test]
    fn missing_required_address_field_is_rejected() {
        let request = AddressRequest {
            building: "A-12".to_string(),
            street: " ".to_string(),
            city: "Pune".to_string(),
            state: "MH".to_string(),
            zip_code: "411001".to_string(),
        };
        assert!(request.validate().is_err());
    }

    #[test]
    fn duplicate_review_insert_is_a_precondition_failure() {
        let dup = Some(sea_orm::SqlErr::UniqueConstraintViolation(
            "duplicate key value violates unique constraint".to_string(),
        ));
        assert!(is_unique_violation(&dup));

        let fk = Some(sea_orm::SqlErr::ForeignKeyConstraintViolation(
            "violates foreign key constraint".to_string(),
        ));
        assert!(!is_unique_violation(&fk));
        assert!(!is_unique_violation(&None));

        // Anything that is not a unique violation stays a database error
        let other = review_insert_error(sea_orm::DbErr::Custom("connection reset".to_string()));
        assert!(matches!(other, AppError::Database(_)));
    }

    #[test]
    fn eta_is_simulated_only_while_on_way() {
        let now = Utc::now();
        let base = booking::Model {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            garage_id: Uuid::new_v4(),
            issue_type: "Engine noise".to_string(),
            status: BookingStatus::OnWay,
            price: 300,
            payment_status: PaymentStatus::Unpaid,
            created_at: now.into(),
            updated_at: now.into(),
        };

        let on_way = booking_response(base.clone(), &[], None);
        assert_eq!(on_way.eta_minutes, Some(SIMULATED_ETA_MINUTES));

        let arrived = booking_response(
            booking::Model {
                status: BookingStatus::Arrived,
                ..base
            },
            &[],
            None,
        );
        assert_eq!(arrived.eta_minutes, None);
    }
}
