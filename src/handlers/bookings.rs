//! `/bookings`: public submission and lookup, admin listing, status
//! transitions, deletion and dashboard counters.

use actix_web::{delete, get, post, put, web, HttpResponse};
use chrono::TimeZone;
use serde_json::json;

use super::{auth::AdminUser, is_truthy};
use crate::clock;
use crate::config::AppConfig;
use crate::error::{ApiError, ApiResult, OrUpstream};
use crate::models::booking::{
    generate_booking_id, Booking, BookingFilters, BookingService, BookingStatus, CreateBookingRequest,
    DashboardStats, NewBooking, StatusRequest,
};
use crate::store::{decode_rows, fetch, first_of, to_row, Database, Query, Row, Store, StoreError};
use crate::types::ApiResponse;
use crate::validation::{appointment_date, appointment_time, parse_price, required};

const TABLE: &str = "bookings";
const LINE_ITEMS: &str = "booking_services";

const MSG_NOT_FOUND: &str = "Booking tidak ditemukan";
const MSG_FETCH_FAILED: &str = "Error mengambil data booking";
const MSG_CREATE_FAILED: &str = "Error membuat booking";
const MSG_INVALID_STATUS: &str = "Status tidak valid";

/// Attaches each booking's line items, fetched in one query.
async fn with_line_items(store: &dyn Store, mut bookings: Vec<Booking>) -> Result<Vec<Booking>, StoreError> {
    if bookings.is_empty() {
        return Ok(bookings);
    }
    let ids: Vec<String> = bookings.iter().map(|b| b.id.clone()).collect();
    let items: Vec<BookingService> = fetch(
        store,
        &Query::table(LINE_ITEMS).is_in("booking_id", ids).order_by("id", true),
    )
    .await?;
    for booking in &mut bookings {
        booking.booking_services = items
            .iter()
            .filter(|item| item.booking_id == booking.id)
            .cloned()
            .collect();
    }
    Ok(bookings)
}

async fn load_booking(store: &dyn Store, id: &str) -> Result<Option<Booking>, StoreError> {
    let found: Vec<Booking> = fetch(store, &Query::table(TABLE).eq("id", id).limit(1)).await?;
    Ok(with_line_items(store, found).await?.into_iter().next())
}

#[get("")]
pub async fn list(
    _admin: AdminUser,
    db: web::Data<Database>,
    filters: web::Query<BookingFilters>,
) -> ApiResult<HttpResponse> {
    let mut query = Query::table(TABLE).order_by("created_at", false);
    if let Some(status) = required(&filters.status) {
        let status: BookingStatus = status
            .parse()
            .map_err(|_| ApiError::bad_request(MSG_INVALID_STATUS))?;
        query = query.eq("status", status.as_str());
    }
    if let Some(date) = required(&filters.date) {
        query = query.eq("appointment_date", date);
    }

    let bookings: Vec<Booking> = fetch(db.client(), &query).await.or_upstream(MSG_FETCH_FAILED)?;
    let bookings = with_line_items(db.client(), bookings)
        .await
        .or_upstream(MSG_FETCH_FAILED)?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(bookings)))
}

#[get("/{id}")]
pub async fn get_one(db: web::Data<Database>, path: web::Path<String>) -> ApiResult<HttpResponse> {
    let booking = load_booking(db.client(), &path)
        .await
        .or_upstream(MSG_FETCH_FAILED)?
        .ok_or_else(|| ApiError::not_found(MSG_NOT_FOUND))?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(booking)))
}

/// Validated line item, before it is tied to a booking id.
struct Line {
    service_id: String,
    name: String,
    price: String,
}

#[post("")]
pub async fn create(
    db: web::Data<Database>,
    cfg: web::Data<AppConfig>,
    body: web::Json<CreateBookingRequest>,
) -> ApiResult<HttpResponse> {
    let body = body.into_inner();
    let incomplete = || ApiError::bad_request("Data tidak lengkap");

    let name = required(&body.patient_name).ok_or_else(incomplete)?;
    let phone = required(&body.patient_phone).ok_or_else(incomplete)?;
    let address = required(&body.patient_address).ok_or_else(incomplete)?;
    let date_raw = required(&body.appointment_date).ok_or_else(incomplete)?;
    let time_raw = required(&body.appointment_time).ok_or_else(incomplete)?;
    let selected = body
        .selected_services
        .as_deref()
        .filter(|s| !s.is_empty())
        .ok_or_else(incomplete)?;

    let mut lines = Vec::with_capacity(selected.len());
    for service in selected {
        let (Some(id), Some(service_name), Some(price)) =
            (service.id.as_ref(), required(&service.name), required(&service.price))
        else {
            return Err(incomplete());
        };
        lines.push(Line {
            service_id: id.to_string(),
            name: service_name.to_string(),
            price: price.to_string(),
        });
    }

    let invalid_schedule = || ApiError::bad_request("Format tanggal atau jam tidak valid");
    let date = appointment_date(date_raw).ok_or_else(invalid_schedule)?;
    let time = appointment_time(time_raw).ok_or_else(invalid_schedule)?;
    let appointment_at = clock::clinic_offset(cfg.clinic.utc_offset_minutes)
        .from_local_datetime(&date.and_time(time))
        .single()
        .ok_or_else(invalid_schedule)?;

    let duplicate = db
        .client()
        .rpc(
            "check_duplicate_booking",
            json!({"p_phone": phone, "p_appointment_date": date_raw}),
        )
        .await
        .or_upstream(MSG_CREATE_FAILED)?;
    if is_truthy(&duplicate) {
        tracing::info!(%date_raw, "duplicate booking rejected");
        return Err(ApiError::Conflict(
            "Anda sudah memiliki booking untuk tanggal yang sama".into(),
        ));
    }

    let booking_id = generate_booking_id();
    let booking = NewBooking {
        id: booking_id.clone(),
        patient_name: name.to_string(),
        patient_phone: phone.to_string(),
        patient_address: address.to_string(),
        patient_notes: required(&body.patient_notes).map(str::to_string),
        appointment_date: date_raw.to_string(),
        appointment_time: time_raw.to_string(),
        appointment_datetime: clock::to_utc_rfc3339(appointment_at),
        status: BookingStatus::Pending,
    };
    let row = to_row(&booking).or_upstream(MSG_CREATE_FAILED)?;
    db.client()
        .insert(TABLE, vec![row])
        .await
        .or_upstream(MSG_CREATE_FAILED)?;

    let items: Vec<Row> = lines
        .into_iter()
        .map(|line| {
            to_row(&BookingService {
                id: None,
                booking_id: booking_id.clone(),
                service_id: line.service_id,
                service_name: line.name,
                price_numeric: parse_price(&line.price),
                service_price: line.price,
                quantity: 1,
            })
        })
        .collect::<Result<Vec<Row>, StoreError>>()
        .or_upstream(MSG_CREATE_FAILED)?;

    if let Err(err) = db.client().insert(LINE_ITEMS, items).await {
        // Leave no booking without line items behind.
        if let Err(cleanup) = db.admin_client().delete(&Query::table(TABLE).eq("id", booking_id.as_str())).await {
            tracing::error!(booking_id = %booking_id, error = %cleanup, "could not remove booking after line-item failure");
        }
        return Err(ApiError::Upstream {
            message: MSG_CREATE_FAILED.into(),
            source: err,
        });
    }

    let complete = load_booking(db.client(), &booking_id)
        .await
        .or_upstream(MSG_CREATE_FAILED)?
        .ok_or_else(|| ApiError::Internal(format!("booking {booking_id} missing right after insert")))?;
    tracing::info!(booking_id = %booking_id, services = complete.booking_services.len(), "booking created");

    Ok(HttpResponse::Created().json(ApiResponse::ok(complete).with_message("Booking berhasil dibuat")))
}

#[put("/{id}/status")]
pub async fn update_status(
    _admin: AdminUser,
    db: web::Data<Database>,
    path: web::Path<String>,
    body: web::Json<StatusRequest>,
) -> ApiResult<HttpResponse> {
    let status: BookingStatus = body
        .status
        .as_deref()
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| ApiError::bad_request(MSG_INVALID_STATUS))?;

    let mut patch = Row::new();
    patch.insert("status".into(), json!(status));
    if let Some(column) = status.timestamp_column() {
        patch.insert(column.into(), json!(clock::now()));
    }

    let failed = "Error mengupdate status booking";
    let updated = db
        .admin_client()
        .update(&Query::table(TABLE).eq("id", path.as_str()), patch)
        .await
        .or_upstream(failed)?;
    let updated: Vec<Booking> = decode_rows(updated).or_upstream(failed)?;
    if updated.is_empty() {
        return Err(ApiError::not_found(MSG_NOT_FOUND));
    }
    let booking = with_line_items(db.client(), updated)
        .await
        .or_upstream(failed)?
        .into_iter()
        .next()
        .ok_or_else(|| ApiError::not_found(MSG_NOT_FOUND))?;
    tracing::info!(booking_id = %booking.id, status = %status, "booking status changed");

    Ok(HttpResponse::Ok().json(ApiResponse::ok(booking).with_message("Status booking berhasil diupdate")))
}

#[delete("/{id}")]
pub async fn delete_one(
    _admin: AdminUser,
    db: web::Data<Database>,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let removed = db
        .admin_client()
        .delete(&Query::table(TABLE).eq("id", path.as_str()))
        .await
        .or_upstream("Error menghapus booking")?;
    if removed.is_empty() {
        return Err(ApiError::not_found(MSG_NOT_FOUND));
    }
    Ok(HttpResponse::Ok().json(ApiResponse::message("Booking berhasil dihapus")))
}

#[get("/stats/dashboard")]
pub async fn dashboard_stats(
    _admin: AdminUser,
    db: web::Data<Database>,
    cfg: web::Data<AppConfig>,
) -> ApiResult<HttpResponse> {
    let failed = "Error mengambil statistik booking";
    let today = clock::today_at(clock::clinic_offset(cfg.clinic.utc_offset_minutes));
    let result = db
        .client()
        .rpc(
            "get_daily_booking_stats",
            json!({"p_date": today.format("%Y-%m-%d").to_string()}),
        )
        .await
        .or_upstream(failed)?;
    let stats: DashboardStats = first_of(result).or_upstream(failed)?.unwrap_or_default();
    Ok(HttpResponse::Ok().json(ApiResponse::ok(stats)))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/bookings")
            .service(dashboard_stats)
            .service(list)
            .service(create)
            .service(update_status)
            .service(get_one)
            .service(delete_one),
    );
}
