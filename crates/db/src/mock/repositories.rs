use chrono::{DateTime, Utc};
use mockall::mock;
use uuid::Uuid;

use crate::models::{DbAvailableSlot, DbBooking, DbBookingDetail, DbSlotWithBooking};

// Mock repositories for testing

mock! {
    pub AvailableSlotRepo {
        pub async fn create_available_slot(
            &self,
            teacher_id: Uuid,
            start_time: DateTime<Utc>,
            end_time: DateTime<Utc>,
        ) -> eyre::Result<DbAvailableSlot>;

        pub async fn get_available_slot_by_id(
            &self,
            id: i64,
        ) -> eyre::Result<Option<DbAvailableSlot>>;

        pub async fn get_slot_with_booking(
            &self,
            id: i64,
        ) -> eyre::Result<Option<DbSlotWithBooking>>;

        pub async fn update_available_slot(
            &self,
            id: i64,
            start_time: DateTime<Utc>,
            end_time: DateTime<Utc>,
        ) -> eyre::Result<DbAvailableSlot>;

        pub async fn delete_available_slot(&self, id: i64) -> eyre::Result<()>;

        pub async fn has_overlapping_slot(
            &self,
            teacher_id: Uuid,
            start_time: DateTime<Utc>,
            end_time: DateTime<Utc>,
            exclude_slot_id: Option<i64>,
        ) -> eyre::Result<bool>;

        pub async fn has_active_booking(&self, slot_id: i64) -> eyre::Result<bool>;
    }
}

mock! {
    pub BookingRepo {
        pub async fn create_booking(
            &self,
            student_id: Uuid,
            available_slot_id: i64,
        ) -> eyre::Result<DbBooking>;

        pub async fn get_booking_by_id(&self, id: i64) -> eyre::Result<Option<DbBooking>>;

        pub async fn get_booking_detail_by_id(
            &self,
            id: i64,
        ) -> eyre::Result<Option<DbBookingDetail>>;

        pub async fn list_bookings_by_student(
            &self,
            student_id: Uuid,
        ) -> eyre::Result<Vec<DbBookingDetail>>;

        pub async fn list_bookings_by_teacher(
            &self,
            teacher_id: Uuid,
        ) -> eyre::Result<Vec<DbBookingDetail>>;

        pub async fn update_booking_status(
            &self,
            id: i64,
            status: &'static str,
        ) -> eyre::Result<DbBooking>;

        pub async fn delete_booking(&self, id: i64) -> eyre::Result<()>;

        pub async fn has_overlapping_active_booking(
            &self,
            actor_id: Uuid,
            start_time: DateTime<Utc>,
            end_time: DateTime<Utc>,
        ) -> eyre::Result<bool>;
    }
}
