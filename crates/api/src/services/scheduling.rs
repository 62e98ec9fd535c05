//! # Scheduling Service
//!
//! The single choke point for every slot and booking mutation. Handlers never
//! touch the repositories directly for writes; they hand an authenticated
//! [`Actor`] and a request to this service, which enforces the scheduling
//! invariants and returns transport-ready response types.
//!
//! ## Invariants enforced here
//!
//! - A teacher's published slots never overlap (half-open interval semantics,
//!   re-checked on update excluding the slot being edited)
//! - Slots are future-dated at creation and update
//! - A slot carries at most one active (non-cancelled) booking
//! - An actor never holds two active bookings over overlapping time ranges
//! - Booking status follows Pending -> Confirmed | Cancelled, Confirmed ->
//!   Cancelled, with Cancelled terminal
//! - Party-initiated cancellation requires more than 24 hours of notice
//!
//! ## Concurrency
//!
//! Every check-then-act sequence (overlap check before slot insert, bookable
//! check before booking insert) runs on a single database transaction. The
//! booking insert is additionally backstopped by a partial unique index on
//! `bookings(available_slot_id)`: when two requests race past the pre-check,
//! the second insert fails with a unique violation, which is translated into
//! the same "not bookable" validation error the pre-check would have
//! produced. The service performs no retries — losing a booking race is a
//! final answer.

use chrono::{DateTime, Utc};
use tutorlink_core::errors::{TutorError, TutorResult};
use tutorlink_core::models::actor::Actor;
use tutorlink_core::models::booking::{
    BookingResponse, BookingStatus, CreateBookingRequest, DecideBookingRequest,
};
use tutorlink_core::models::pagination::{Page, PageParams};
use tutorlink_core::models::slot::{
    CreateSlotRequest, SlotBookingInfo, SlotDetailsResponse, SlotResponse, UpdateSlotRequest,
};
use tutorlink_core::time_range;
use tutorlink_db::models::{DbAvailableSlot, DbBookingDetail, DbSlotWithBooking};
use tutorlink_db::repositories::{available_slot, booking};
use tutorlink_db::DbPool;
use uuid::Uuid;

pub struct SchedulingService<'a> {
    pool: &'a DbPool,
}

impl<'a> SchedulingService<'a> {
    pub fn new(pool: &'a DbPool) -> Self {
        Self { pool }
    }

    // ------------------------------------------------------------------
    // Slots
    // ------------------------------------------------------------------

    pub async fn create_slot(
        &self,
        actor: &Actor,
        request: CreateSlotRequest,
    ) -> TutorResult<SlotResponse> {
        if !actor.is_teacher() {
            return Err(TutorError::Authorization(
                "Only teachers can publish slots".to_string(),
            ));
        }

        let start_time = time_range::normalize_to_utc(request.start_time);
        let end_time = time_range::normalize_to_utc(request.end_time);
        let now = Utc::now();
        validate_slot_window(start_time, end_time, now)?;

        let mut tx = self.pool.begin().await.map_err(db_err)?;

        let overlapping =
            available_slot::has_overlapping_slot(&mut *tx, actor.id, start_time, end_time, None)
                .await
                .map_err(TutorError::Database)?;
        if overlapping {
            return Err(TutorError::Validation(
                "Slot overlaps an existing slot".to_string(),
            ));
        }

        let slot = available_slot::create_available_slot(&mut *tx, actor.id, start_time, end_time)
            .await
            .map_err(TutorError::Database)?;

        tx.commit().await.map_err(db_err)?;

        tracing::info!("Teacher {} published slot {}", actor.id, slot.id);
        Ok(slot_response(slot))
    }

    pub async fn update_slot(
        &self,
        actor: &Actor,
        slot_id: i64,
        request: UpdateSlotRequest,
    ) -> TutorResult<SlotResponse> {
        let start_time = time_range::normalize_to_utc(request.start_time);
        let end_time = time_range::normalize_to_utc(request.end_time);
        let now = Utc::now();
        validate_slot_window(start_time, end_time, now)?;

        let mut tx = self.pool.begin().await.map_err(db_err)?;

        let slot = available_slot::get_available_slot_by_id(&mut *tx, slot_id)
            .await
            .map_err(TutorError::Database)?
            .ok_or_else(|| slot_not_found(slot_id))?;

        if slot.teacher_id != actor.id {
            return Err(TutorError::Authorization(
                "Not the owner of this slot".to_string(),
            ));
        }

        // A reserved window must not move under the student who booked it;
        // the booking has to be cancelled first.
        let booked = available_slot::has_active_booking(&mut *tx, slot_id)
            .await
            .map_err(TutorError::Database)?;
        if booked {
            return Err(TutorError::Validation(
                "Slot has an active booking".to_string(),
            ));
        }

        let overlapping = available_slot::has_overlapping_slot(
            &mut *tx,
            actor.id,
            start_time,
            end_time,
            Some(slot_id),
        )
        .await
        .map_err(TutorError::Database)?;
        if overlapping {
            return Err(TutorError::Validation(
                "Slot overlaps an existing slot".to_string(),
            ));
        }

        let updated =
            available_slot::update_available_slot(&mut *tx, slot_id, start_time, end_time)
                .await
                .map_err(TutorError::Database)?;

        tx.commit().await.map_err(db_err)?;

        Ok(slot_response(updated))
    }

    pub async fn delete_slot(&self, actor: &Actor, slot_id: i64) -> TutorResult<()> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        let slot = available_slot::get_available_slot_by_id(&mut *tx, slot_id)
            .await
            .map_err(TutorError::Database)?
            .ok_or_else(|| slot_not_found(slot_id))?;

        if slot.teacher_id != actor.id {
            return Err(TutorError::Authorization(
                "Not the owner of this slot".to_string(),
            ));
        }

        let booked = available_slot::has_active_booking(&mut *tx, slot_id)
            .await
            .map_err(TutorError::Database)?;
        if booked {
            return Err(TutorError::Validation(
                "Slot has an active booking".to_string(),
            ));
        }

        available_slot::delete_available_slot(&mut *tx, slot_id)
            .await
            .map_err(TutorError::Database)?;

        tx.commit().await.map_err(db_err)?;

        tracing::info!("Teacher {} deleted slot {}", actor.id, slot_id);
        Ok(())
    }

    pub async fn current_slots(
        &self,
        actor: &Actor,
        params: PageParams,
    ) -> TutorResult<Page<SlotDetailsResponse>> {
        let now = Utc::now();

        let rows = available_slot::list_current_slots_with_bookings_by_teacher(
            self.pool,
            actor.id,
            now,
            params.limit(),
            params.offset(),
        )
        .await
        .map_err(TutorError::Database)?;

        let total = available_slot::count_current_slots_by_teacher(self.pool, actor.id, now)
            .await
            .map_err(TutorError::Database)?;

        let items = rows
            .into_iter()
            .map(slot_details_response)
            .collect::<TutorResult<Vec<_>>>()?;

        Ok(Page::new(items, total, params))
    }

    pub async fn past_slots(
        &self,
        actor: &Actor,
        params: PageParams,
    ) -> TutorResult<Page<SlotResponse>> {
        let now = Utc::now();

        let rows = available_slot::list_past_slots_by_teacher(
            self.pool,
            actor.id,
            now,
            params.limit(),
            params.offset(),
        )
        .await
        .map_err(TutorError::Database)?;

        let total = available_slot::count_past_slots_by_teacher(self.pool, actor.id, now)
            .await
            .map_err(TutorError::Database)?;

        let items = rows.into_iter().map(slot_response).collect();
        Ok(Page::new(items, total, params))
    }

    /// Upcoming unbooked slots for one teacher: the public view students
    /// browse before booking. No actor required.
    pub async fn teacher_free_slots(
        &self,
        teacher_id: Uuid,
        params: PageParams,
    ) -> TutorResult<Page<SlotResponse>> {
        let now = Utc::now();

        let rows = available_slot::list_free_slots_by_teacher(
            self.pool,
            teacher_id,
            now,
            params.limit(),
            params.offset(),
        )
        .await
        .map_err(TutorError::Database)?;

        let total = available_slot::count_free_slots_by_teacher(self.pool, teacher_id, now)
            .await
            .map_err(TutorError::Database)?;

        let items = rows.into_iter().map(slot_response).collect();
        Ok(Page::new(items, total, params))
    }

    pub async fn slot_details(
        &self,
        actor: &Actor,
        slot_id: i64,
    ) -> TutorResult<SlotDetailsResponse> {
        let row = available_slot::get_slot_with_booking(self.pool, slot_id)
            .await
            .map_err(TutorError::Database)?
            .ok_or_else(|| slot_not_found(slot_id))?;

        if row.teacher_id != actor.id {
            return Err(TutorError::Authorization(
                "Not the owner of this slot".to_string(),
            ));
        }

        slot_details_response(row)
    }

    // ------------------------------------------------------------------
    // Bookings
    // ------------------------------------------------------------------

    pub async fn create_booking(
        &self,
        actor: &Actor,
        request: CreateBookingRequest,
    ) -> TutorResult<BookingResponse> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        let slot = available_slot::get_available_slot_by_id(&mut *tx, request.available_slot_id)
            .await
            .map_err(TutorError::Database)?
            .ok_or_else(|| slot_not_found(request.available_slot_id))?;

        if slot.start_time < now {
            return Err(TutorError::Validation(
                "Slot has already started".to_string(),
            ));
        }

        let taken = available_slot::has_active_booking(&mut *tx, slot.id)
            .await
            .map_err(TutorError::Database)?;
        if taken {
            return Err(TutorError::Validation("Slot is not bookable".to_string()));
        }

        let clash = booking::has_overlapping_active_booking(
            &mut *tx,
            actor.id,
            slot.start_time,
            slot.end_time,
        )
        .await
        .map_err(TutorError::Database)?;
        if clash {
            return Err(TutorError::Validation(
                "You already have a booking in this period".to_string(),
            ));
        }

        // The partial unique index on bookings resolves any race the
        // pre-check above let through: the losing insert fails here.
        let created = match booking::create_booking(&mut *tx, actor.id, slot.id).await {
            Ok(created) => created,
            Err(report) if is_unique_violation(&report) => {
                return Err(TutorError::Validation("Slot is not bookable".to_string()));
            }
            Err(report) => return Err(TutorError::Database(report)),
        };

        let detail = booking::get_booking_detail_by_id(&mut *tx, created.id)
            .await
            .map_err(TutorError::Database)?
            .ok_or_else(|| booking_not_found(created.id))?;

        tx.commit().await.map_err(db_err)?;

        tracing::info!(
            "Student {} booked slot {} (booking {})",
            actor.id,
            slot.id,
            created.id
        );
        booking_response(detail)
    }

    pub async fn bookings_as_student(&self, actor: &Actor) -> TutorResult<Vec<BookingResponse>> {
        let rows = booking::list_bookings_by_student(self.pool, actor.id)
            .await
            .map_err(TutorError::Database)?;

        rows.into_iter().map(booking_response).collect()
    }

    pub async fn bookings_as_teacher(&self, actor: &Actor) -> TutorResult<Vec<BookingResponse>> {
        let rows = booking::list_bookings_by_teacher(self.pool, actor.id)
            .await
            .map_err(TutorError::Database)?;

        rows.into_iter().map(booking_response).collect()
    }

    pub async fn decide_booking(
        &self,
        actor: &Actor,
        booking_id: i64,
        request: DecideBookingRequest,
    ) -> TutorResult<BookingResponse> {
        if request.status == BookingStatus::Pending {
            return Err(TutorError::Validation(
                "Decision must be confirmed or cancelled".to_string(),
            ));
        }

        let now = Utc::now();
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        let existing = booking::get_booking_by_id(&mut *tx, booking_id)
            .await
            .map_err(TutorError::Database)?
            .ok_or_else(|| booking_not_found(booking_id))?;

        let slot = available_slot::get_available_slot_by_id(&mut *tx, existing.available_slot_id)
            .await
            .map_err(TutorError::Database)?
            .ok_or_else(|| slot_not_found(existing.available_slot_id))?;

        if slot.teacher_id != actor.id {
            return Err(TutorError::Authorization(
                "Only the slot's teacher can decide this booking".to_string(),
            ));
        }

        if slot.start_time < now {
            return Err(TutorError::Validation(
                "Cannot decide a booking for a past slot".to_string(),
            ));
        }

        let current = parse_status(&existing.status)?;
        if !current.can_transition_to(request.status) {
            return Err(TutorError::Validation(format!(
                "Cannot move booking from {} to {}",
                current.as_str(),
                request.status.as_str()
            )));
        }

        booking::update_booking_status(&mut *tx, booking_id, request.status.as_str())
            .await
            .map_err(TutorError::Database)?;

        let detail = booking::get_booking_detail_by_id(&mut *tx, booking_id)
            .await
            .map_err(TutorError::Database)?
            .ok_or_else(|| booking_not_found(booking_id))?;

        tx.commit().await.map_err(db_err)?;

        tracing::info!(
            "Teacher {} moved booking {} to {}",
            actor.id,
            booking_id,
            request.status.as_str()
        );
        booking_response(detail)
    }

    /// Party-initiated cancellation: removes the booking row entirely,
    /// releasing the slot. Distinct from a teacher rejection through
    /// [`Self::decide_booking`], which keeps an auditable cancelled row.
    pub async fn cancel_booking(&self, actor: &Actor, booking_id: i64) -> TutorResult<()> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        let existing = booking::get_booking_by_id(&mut *tx, booking_id)
            .await
            .map_err(TutorError::Database)?
            .ok_or_else(|| booking_not_found(booking_id))?;

        let slot = available_slot::get_available_slot_by_id(&mut *tx, existing.available_slot_id)
            .await
            .map_err(TutorError::Database)?
            .ok_or_else(|| slot_not_found(existing.available_slot_id))?;

        let is_party = actor.id == existing.student_id || actor.id == slot.teacher_id;
        if !is_party {
            return Err(TutorError::Authorization(
                "Only the booking parties can cancel it".to_string(),
            ));
        }

        // The notice window applies uniformly to students and teachers
        if !time_range::cancellation_window_open(now, slot.start_time) {
            return Err(TutorError::Validation(
                "Bookings must be cancelled at least 24 hours before the slot starts".to_string(),
            ));
        }

        booking::delete_booking(&mut *tx, booking_id)
            .await
            .map_err(TutorError::Database)?;

        tx.commit().await.map_err(db_err)?;

        tracing::info!("Actor {} cancelled booking {}", actor.id, booking_id);
        Ok(())
    }
}

// ----------------------------------------------------------------------
// Helpers
// ----------------------------------------------------------------------

fn validate_slot_window(
    start_time: DateTime<Utc>,
    end_time: DateTime<Utc>,
    now: DateTime<Utc>,
) -> TutorResult<()> {
    if start_time >= end_time {
        return Err(TutorError::Validation(
            "Slot start time must be before its end time".to_string(),
        ));
    }

    if start_time < now {
        return Err(TutorError::Validation(
            "Slot start time cannot be in the past".to_string(),
        ));
    }

    Ok(())
}

fn slot_not_found(id: i64) -> TutorError {
    TutorError::NotFound(format!("Slot with ID {} not found", id))
}

fn booking_not_found(id: i64) -> TutorError {
    TutorError::NotFound(format!("Booking with ID {} not found", id))
}

fn db_err(err: sqlx::Error) -> TutorError {
    TutorError::Database(eyre::Report::new(err))
}

fn is_unique_violation(report: &eyre::Report) -> bool {
    report
        .downcast_ref::<sqlx::Error>()
        .and_then(|err| match err {
            sqlx::Error::Database(inner) => inner.code().map(|code| code.into_owned()),
            _ => None,
        })
        .is_some_and(|code| code == "23505")
}

fn parse_status(raw: &str) -> TutorResult<BookingStatus> {
    raw.parse()
        .map_err(|err: String| TutorError::Internal(err.into()))
}

fn slot_response(slot: DbAvailableSlot) -> SlotResponse {
    SlotResponse {
        id: slot.id,
        teacher_id: slot.teacher_id,
        start_time: slot.start_time,
        end_time: slot.end_time,
        created_at: slot.created_at,
    }
}

fn slot_details_response(row: DbSlotWithBooking) -> TutorResult<SlotDetailsResponse> {
    let booking = match (row.booking_id, row.booking_student_id) {
        (Some(id), Some(student_id)) => {
            let status = row
                .booking_status
                .as_deref()
                .map(parse_status)
                .transpose()?
                .unwrap_or(BookingStatus::Pending);

            Some(SlotBookingInfo {
                id,
                student_id,
                student_name: row.student_name,
                status,
                created_at: row.booking_created_at.unwrap_or(row.created_at),
            })
        }
        _ => None,
    };

    Ok(SlotDetailsResponse {
        id: row.id,
        teacher_id: row.teacher_id,
        start_time: row.start_time,
        end_time: row.end_time,
        created_at: row.created_at,
        booking,
    })
}

fn booking_response(detail: DbBookingDetail) -> TutorResult<BookingResponse> {
    Ok(BookingResponse {
        id: detail.id,
        available_slot_id: detail.available_slot_id,
        student_id: detail.student_id,
        teacher_id: detail.teacher_id,
        status: parse_status(&detail.status)?,
        start_time: detail.start_time,
        end_time: detail.end_time,
        student_name: detail.student_name,
        teacher_name: detail.teacher_name,
        created_at: detail.created_at,
    })
}
