use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DbAvailableSlot {
    pub id: i64,
    pub teacher_id: Uuid,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DbBooking {
    pub id: i64,
    pub student_id: Uuid,
    pub available_slot_id: i64,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

// Booking joined with its slot and both parties' display names.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DbBookingDetail {
    pub id: i64,
    pub student_id: Uuid,
    pub available_slot_id: i64,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub teacher_id: Uuid,
    pub student_name: Option<String>,
    pub teacher_name: Option<String>,
}

// Slot joined with its active booking, if any. The partial unique index on
// bookings guarantees at most one joined row per slot.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DbSlotWithBooking {
    pub id: i64,
    pub teacher_id: Uuid,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub booking_id: Option<i64>,
    pub booking_student_id: Option<Uuid>,
    pub booking_status: Option<String>,
    pub booking_created_at: Option<DateTime<Utc>>,
    pub student_name: Option<String>,
}
