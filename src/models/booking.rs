// src/models/booking.rs
use nanoid::nanoid;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

use super::{de_i64, RowId};
use crate::clock;

const ID_ALPHABET: [char; 36] = [
    'A', 'B', 'C', 'D', 'E', 'F', 'G', 'H', 'I', 'J', 'K', 'L', 'M', 'N', 'O', 'P', 'Q', 'R', 'S',
    'T', 'U', 'V', 'W', 'X', 'Y', 'Z', '0', '1', '2', '3', '4', '5', '6', '7', '8', '9',
];

/// `BK<unix-millis><6 uppercase alphanumerics>`
pub fn generate_booking_id() -> String {
    format!("BK{}{}", clock::millis(), nanoid!(6, &ID_ALPHABET))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    #[default]
    Pending,
    Confirmed,
    Completed,
    Cancelled,
}

#[derive(Debug, thiserror::Error)]
#[error("unknown booking status '{0}'")]
pub struct UnknownStatus(pub String);

impl BookingStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::Completed => "completed",
            BookingStatus::Cancelled => "cancelled",
        }
    }

    /// Lifecycle column stamped when a booking enters this status.
    pub fn timestamp_column(self) -> Option<&'static str> {
        match self {
            BookingStatus::Pending => None,
            BookingStatus::Confirmed => Some("confirmed_at"),
            BookingStatus::Completed => Some("completed_at"),
            BookingStatus::Cancelled => Some("cancelled_at"),
        }
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BookingStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(BookingStatus::Pending),
            "confirmed" => Ok(BookingStatus::Confirmed),
            "completed" => Ok(BookingStatus::Completed),
            "cancelled" => Ok(BookingStatus::Cancelled),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

/// Line item: one selected service with its price at booking time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BookingService {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<RowId>,
    pub booking_id: String,
    pub service_id: String,
    pub service_name: String,
    pub service_price: String,
    #[serde(deserialize_with = "de_i64", default)]
    pub price_numeric: i64,
    #[serde(deserialize_with = "de_i64", default = "one")]
    pub quantity: i64,
}

fn one() -> i64 {
    1
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Booking {
    pub id: String,
    pub patient_name: String,
    pub patient_phone: String,
    #[serde(default)]
    pub patient_address: String,
    #[serde(default)]
    pub patient_notes: Option<String>,
    pub appointment_date: String,
    pub appointment_time: String,
    #[serde(default)]
    pub appointment_datetime: Option<String>,
    #[serde(default)]
    pub status: BookingStatus,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub confirmed_at: Option<String>,
    #[serde(default)]
    pub completed_at: Option<String>,
    #[serde(default)]
    pub cancelled_at: Option<String>,
    #[serde(default)]
    pub booking_services: Vec<BookingService>,
}

/// Row written to `bookings` on submission.
#[derive(Debug, Clone, Serialize)]
pub struct NewBooking {
    pub id: String,
    pub patient_name: String,
    pub patient_phone: String,
    pub patient_address: String,
    pub patient_notes: Option<String>,
    pub appointment_date: String,
    pub appointment_time: String,
    pub appointment_datetime: String,
    pub status: BookingStatus,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct SelectedService {
    #[serde(default)]
    pub id: Option<RowId>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub price: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct CreateBookingRequest {
    pub patient_name: Option<String>,
    pub patient_phone: Option<String>,
    pub patient_address: Option<String>,
    pub patient_notes: Option<String>,
    pub appointment_date: Option<String>,
    pub appointment_time: Option<String>,
    #[serde(default)]
    pub selected_services: Option<Vec<SelectedService>>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct StatusRequest {
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct BookingFilters {
    pub status: Option<String>,
    pub date: Option<String>,
}

/// Dashboard counters. Reads the procedure's snake_case row, answers in camelCase.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    #[serde(deserialize_with = "de_i64", default)]
    pub total: i64,
    #[serde(deserialize_with = "de_i64", default)]
    pub pending: i64,
    #[serde(alias = "today_count", deserialize_with = "de_i64", default)]
    pub today_count: i64,
    #[serde(alias = "total_revenue", deserialize_with = "de_i64", default)]
    pub total_revenue: i64,
}
