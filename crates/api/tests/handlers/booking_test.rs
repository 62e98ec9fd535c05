use chrono::{DateTime, Duration, Utc};
use mockall::predicate;
use pretty_assertions::assert_eq;
use tutorlink_core::{
    errors::TutorError,
    models::booking::{BookingResponse, BookingStatus},
    time_range,
};
use uuid::Uuid;

use crate::test_utils::{booking_fixture, detail_fixture, slot_fixture, TestContext};
use tutorlink_api::middleware::error_handling::AppError;

// Test wrappers that mirror the booking lifecycle rules against the mock
// stores

async fn test_create_booking_wrapper(
    ctx: &mut TestContext,
    student_id: Uuid,
    slot_id: i64,
    now: DateTime<Utc>,
) -> Result<BookingResponse, AppError> {
    let slot = ctx
        .slot_repo
        .get_available_slot_by_id(slot_id)
        .await?
        .ok_or_else(|| {
            AppError(TutorError::NotFound(format!(
                "Slot with ID {} not found",
                slot_id
            )))
        })?;

    if slot.start_time < now {
        return Err(AppError(TutorError::Validation(
            "Slot has already started".to_string(),
        )));
    }

    if ctx.slot_repo.has_active_booking(slot_id).await? {
        return Err(AppError(TutorError::Validation(
            "Slot is not bookable".to_string(),
        )));
    }

    if ctx
        .booking_repo
        .has_overlapping_active_booking(student_id, slot.start_time, slot.end_time)
        .await?
    {
        return Err(AppError(TutorError::Validation(
            "You already have a booking in this period".to_string(),
        )));
    }

    let booking = ctx.booking_repo.create_booking(student_id, slot_id).await?;

    let detail = ctx
        .booking_repo
        .get_booking_detail_by_id(booking.id)
        .await?
        .ok_or_else(|| {
            AppError(TutorError::NotFound(format!(
                "Booking with ID {} not found",
                booking.id
            )))
        })?;

    Ok(BookingResponse {
        id: detail.id,
        available_slot_id: detail.available_slot_id,
        student_id: detail.student_id,
        teacher_id: detail.teacher_id,
        status: detail.status.parse().unwrap(),
        start_time: detail.start_time,
        end_time: detail.end_time,
        student_name: detail.student_name,
        teacher_name: detail.teacher_name,
        created_at: detail.created_at,
    })
}

async fn test_decide_booking_wrapper(
    ctx: &mut TestContext,
    teacher_id: Uuid,
    booking_id: i64,
    new_status: BookingStatus,
    now: DateTime<Utc>,
) -> Result<BookingStatus, AppError> {
    if new_status == BookingStatus::Pending {
        return Err(AppError(TutorError::Validation(
            "Decision must be confirmed or cancelled".to_string(),
        )));
    }

    let booking = ctx
        .booking_repo
        .get_booking_by_id(booking_id)
        .await?
        .ok_or_else(|| {
            AppError(TutorError::NotFound(format!(
                "Booking with ID {} not found",
                booking_id
            )))
        })?;

    let slot = ctx
        .slot_repo
        .get_available_slot_by_id(booking.available_slot_id)
        .await?
        .ok_or_else(|| {
            AppError(TutorError::NotFound(format!(
                "Slot with ID {} not found",
                booking.available_slot_id
            )))
        })?;

    if slot.teacher_id != teacher_id {
        return Err(AppError(TutorError::Authorization(
            "Only the slot's teacher can decide this booking".to_string(),
        )));
    }

    if slot.start_time < now {
        return Err(AppError(TutorError::Validation(
            "Cannot decide a booking for a past slot".to_string(),
        )));
    }

    let current: BookingStatus = booking.status.parse().unwrap();
    if !current.can_transition_to(new_status) {
        return Err(AppError(TutorError::Validation(format!(
            "Cannot move booking from {} to {}",
            current.as_str(),
            new_status.as_str()
        ))));
    }

    let updated = ctx
        .booking_repo
        .update_booking_status(booking_id, new_status.as_str())
        .await?;

    Ok(updated.status.parse().unwrap())
}

async fn test_cancel_booking_wrapper(
    ctx: &mut TestContext,
    actor_id: Uuid,
    booking_id: i64,
    now: DateTime<Utc>,
) -> Result<(), AppError> {
    let booking = ctx
        .booking_repo
        .get_booking_by_id(booking_id)
        .await?
        .ok_or_else(|| {
            AppError(TutorError::NotFound(format!(
                "Booking with ID {} not found",
                booking_id
            )))
        })?;

    let slot = ctx
        .slot_repo
        .get_available_slot_by_id(booking.available_slot_id)
        .await?
        .ok_or_else(|| {
            AppError(TutorError::NotFound(format!(
                "Slot with ID {} not found",
                booking.available_slot_id
            )))
        })?;

    if actor_id != booking.student_id && actor_id != slot.teacher_id {
        return Err(AppError(TutorError::Authorization(
            "Only the booking parties can cancel it".to_string(),
        )));
    }

    if !time_range::cancellation_window_open(now, slot.start_time) {
        return Err(AppError(TutorError::Validation(
            "Bookings must be cancelled at least 24 hours before the slot starts".to_string(),
        )));
    }

    ctx.booking_repo.delete_booking(booking_id).await?;
    Ok(())
}

#[tokio::test]
async fn test_create_booking_success_starts_pending() {
    let mut ctx = TestContext::new();
    let student_id = Uuid::new_v4();
    let teacher_id = Uuid::new_v4();
    let now = Utc::now();
    let slot = slot_fixture(1, teacher_id, now + Duration::hours(48), now + Duration::hours(49));

    let slot_for_get = slot.clone();
    ctx.slot_repo
        .expect_get_available_slot_by_id()
        .with(predicate::eq(1i64))
        .times(1)
        .returning(move |_| Ok(Some(slot_for_get.clone())));

    ctx.slot_repo
        .expect_has_active_booking()
        .with(predicate::eq(1i64))
        .times(1)
        .returning(|_| Ok(false));

    ctx.booking_repo
        .expect_has_overlapping_active_booking()
        .with(
            predicate::eq(student_id),
            predicate::eq(slot.start_time),
            predicate::eq(slot.end_time),
        )
        .times(1)
        .returning(|_, _, _| Ok(false));

    ctx.booking_repo
        .expect_create_booking()
        .with(predicate::eq(student_id), predicate::eq(1i64))
        .times(1)
        .returning(|student_id, slot_id| Ok(booking_fixture(10, student_id, slot_id, "pending")));

    let slot_for_detail = slot.clone();
    ctx.booking_repo
        .expect_get_booking_detail_by_id()
        .with(predicate::eq(10i64))
        .times(1)
        .returning(move |_| {
            let booking = booking_fixture(10, student_id, 1, "pending");
            Ok(Some(detail_fixture(&booking, &slot_for_detail)))
        });

    let response = test_create_booking_wrapper(&mut ctx, student_id, 1, now)
        .await
        .expect("Booking creation should succeed");

    assert_eq!(response.id, 10);
    assert_eq!(response.status, BookingStatus::Pending);
    assert_eq!(response.student_id, student_id);
    assert_eq!(response.teacher_id, teacher_id);
}

#[tokio::test]
async fn test_create_booking_slot_not_found() {
    let mut ctx = TestContext::new();

    ctx.slot_repo
        .expect_get_available_slot_by_id()
        .times(1)
        .returning(|_| Ok(None));

    let result = test_create_booking_wrapper(&mut ctx, Uuid::new_v4(), 99, Utc::now()).await;

    assert!(matches!(result, Err(AppError(TutorError::NotFound(_)))));
}

#[tokio::test]
async fn test_create_booking_rejects_started_slot() {
    let mut ctx = TestContext::new();
    let now = Utc::now();
    let slot = slot_fixture(1, Uuid::new_v4(), now - Duration::hours(1), now + Duration::hours(1));

    ctx.slot_repo
        .expect_get_available_slot_by_id()
        .times(1)
        .returning(move |_| Ok(Some(slot.clone())));

    let result = test_create_booking_wrapper(&mut ctx, Uuid::new_v4(), 1, now).await;

    assert!(matches!(result, Err(AppError(TutorError::Validation(_)))));
}

#[tokio::test]
async fn test_create_booking_exactly_one_of_two_students_wins() {
    let mut ctx = TestContext::new();
    let first_student = Uuid::new_v4();
    let second_student = Uuid::new_v4();
    let now = Utc::now();
    let slot = slot_fixture(1, Uuid::new_v4(), now + Duration::hours(48), now + Duration::hours(49));

    let slot_for_get = slot.clone();
    ctx.slot_repo
        .expect_get_available_slot_by_id()
        .times(2)
        .returning(move |_| Ok(Some(slot_for_get.clone())));

    // The slot is free for the first writer and taken for the second; with
    // the transactional check plus the unique guard this is the only
    // possible outcome of the race
    ctx.slot_repo
        .expect_has_active_booking()
        .times(1)
        .returning(|_| Ok(false));

    ctx.booking_repo
        .expect_has_overlapping_active_booking()
        .times(1)
        .returning(|_, _, _| Ok(false));

    ctx.booking_repo
        .expect_create_booking()
        .times(1)
        .returning(|student_id, slot_id| Ok(booking_fixture(10, student_id, slot_id, "pending")));

    let slot_for_detail = slot.clone();
    ctx.booking_repo
        .expect_get_booking_detail_by_id()
        .times(1)
        .returning(move |_| {
            let booking = booking_fixture(10, first_student, 1, "pending");
            Ok(Some(detail_fixture(&booking, &slot_for_detail)))
        });

    let winner = test_create_booking_wrapper(&mut ctx, first_student, 1, now).await;
    assert!(winner.is_ok());

    ctx.slot_repo
        .expect_has_active_booking()
        .times(1)
        .returning(|_| Ok(true));

    let loser = test_create_booking_wrapper(&mut ctx, second_student, 1, now).await;
    match loser {
        Err(AppError(TutorError::Validation(message))) => {
            assert_eq!(message, "Slot is not bookable");
        }
        other => panic!("Expected validation error, got {:?}", other.map(|r| r.id)),
    }
}

#[tokio::test]
async fn test_create_booking_rejects_overlapping_booking_elsewhere() {
    let mut ctx = TestContext::new();
    let student_id = Uuid::new_v4();
    let now = Utc::now();
    let slot = slot_fixture(1, Uuid::new_v4(), now + Duration::hours(48), now + Duration::hours(49));

    ctx.slot_repo
        .expect_get_available_slot_by_id()
        .times(1)
        .returning(move |_| Ok(Some(slot.clone())));

    ctx.slot_repo
        .expect_has_active_booking()
        .times(1)
        .returning(|_| Ok(false));

    // Another teacher's slot, same period, already booked by this student
    ctx.booking_repo
        .expect_has_overlapping_active_booking()
        .times(1)
        .returning(|_, _, _| Ok(true));

    let result = test_create_booking_wrapper(&mut ctx, student_id, 1, now).await;

    assert!(matches!(result, Err(AppError(TutorError::Validation(_)))));
}

#[tokio::test]
async fn test_decide_booking_confirm_success() {
    let mut ctx = TestContext::new();
    let teacher_id = Uuid::new_v4();
    let student_id = Uuid::new_v4();
    let now = Utc::now();
    let slot = slot_fixture(1, teacher_id, now + Duration::hours(48), now + Duration::hours(49));
    let booking = booking_fixture(10, student_id, 1, "pending");

    ctx.booking_repo
        .expect_get_booking_by_id()
        .with(predicate::eq(10i64))
        .times(1)
        .returning(move |_| Ok(Some(booking.clone())));

    ctx.slot_repo
        .expect_get_available_slot_by_id()
        .times(1)
        .returning(move |_| Ok(Some(slot.clone())));

    ctx.booking_repo
        .expect_update_booking_status()
        .with(predicate::eq(10i64), predicate::eq("confirmed"))
        .times(1)
        .returning(move |id, status| Ok(booking_fixture(id, student_id, 1, status)));

    let status =
        test_decide_booking_wrapper(&mut ctx, teacher_id, 10, BookingStatus::Confirmed, now)
            .await
            .expect("Decision should succeed");

    assert_eq!(status, BookingStatus::Confirmed);
}

#[tokio::test]
async fn test_decide_booking_rejects_foreign_teacher() {
    let mut ctx = TestContext::new();
    let now = Utc::now();
    let slot = slot_fixture(1, Uuid::new_v4(), now + Duration::hours(48), now + Duration::hours(49));
    let booking = booking_fixture(10, Uuid::new_v4(), 1, "pending");

    ctx.booking_repo
        .expect_get_booking_by_id()
        .times(1)
        .returning(move |_| Ok(Some(booking.clone())));

    ctx.slot_repo
        .expect_get_available_slot_by_id()
        .times(1)
        .returning(move |_| Ok(Some(slot.clone())));

    let result =
        test_decide_booking_wrapper(&mut ctx, Uuid::new_v4(), 10, BookingStatus::Confirmed, now)
            .await;

    assert!(matches!(result, Err(AppError(TutorError::Authorization(_)))));
}

#[tokio::test]
async fn test_decide_booking_rejects_past_slot() {
    let mut ctx = TestContext::new();
    let teacher_id = Uuid::new_v4();
    let now = Utc::now();
    let slot = slot_fixture(1, teacher_id, now - Duration::hours(2), now - Duration::hours(1));
    let booking = booking_fixture(10, Uuid::new_v4(), 1, "pending");

    ctx.booking_repo
        .expect_get_booking_by_id()
        .times(1)
        .returning(move |_| Ok(Some(booking.clone())));

    ctx.slot_repo
        .expect_get_available_slot_by_id()
        .times(1)
        .returning(move |_| Ok(Some(slot.clone())));

    let result =
        test_decide_booking_wrapper(&mut ctx, teacher_id, 10, BookingStatus::Confirmed, now).await;

    assert!(matches!(result, Err(AppError(TutorError::Validation(_)))));
}

#[tokio::test]
async fn test_decide_booking_rejects_resurrecting_cancelled() {
    let mut ctx = TestContext::new();
    let teacher_id = Uuid::new_v4();
    let now = Utc::now();
    let slot = slot_fixture(1, teacher_id, now + Duration::hours(48), now + Duration::hours(49));
    let booking = booking_fixture(10, Uuid::new_v4(), 1, "cancelled");

    ctx.booking_repo
        .expect_get_booking_by_id()
        .times(1)
        .returning(move |_| Ok(Some(booking.clone())));

    ctx.slot_repo
        .expect_get_available_slot_by_id()
        .times(1)
        .returning(move |_| Ok(Some(slot.clone())));

    let result =
        test_decide_booking_wrapper(&mut ctx, teacher_id, 10, BookingStatus::Confirmed, now).await;

    assert!(matches!(result, Err(AppError(TutorError::Validation(_)))));
}

#[tokio::test]
async fn test_decide_booking_rejects_pending_target() {
    let mut ctx = TestContext::new();

    let result = test_decide_booking_wrapper(
        &mut ctx,
        Uuid::new_v4(),
        10,
        BookingStatus::Pending,
        Utc::now(),
    )
    .await;

    assert!(matches!(result, Err(AppError(TutorError::Validation(_)))));
}

#[tokio::test]
async fn test_cancel_booking_inside_notice_window_fails() {
    let mut ctx = TestContext::new();
    let student_id = Uuid::new_v4();
    let now = Utc::now();
    // 23h59m of notice is not enough
    let start = now + Duration::hours(23) + Duration::minutes(59);
    let slot = slot_fixture(1, Uuid::new_v4(), start, start + Duration::hours(1));
    let booking = booking_fixture(10, student_id, 1, "confirmed");

    ctx.booking_repo
        .expect_get_booking_by_id()
        .times(1)
        .returning(move |_| Ok(Some(booking.clone())));

    ctx.slot_repo
        .expect_get_available_slot_by_id()
        .times(1)
        .returning(move |_| Ok(Some(slot.clone())));

    let result = test_cancel_booking_wrapper(&mut ctx, student_id, 10, now).await;

    assert!(matches!(result, Err(AppError(TutorError::Validation(_)))));
}

#[tokio::test]
async fn test_cancel_booking_outside_notice_window_succeeds() {
    let mut ctx = TestContext::new();
    let student_id = Uuid::new_v4();
    let now = Utc::now();
    // 24h01m of notice is enough
    let start = now + Duration::hours(24) + Duration::minutes(1);
    let slot = slot_fixture(1, Uuid::new_v4(), start, start + Duration::hours(1));
    let booking = booking_fixture(10, student_id, 1, "confirmed");

    ctx.booking_repo
        .expect_get_booking_by_id()
        .times(1)
        .returning(move |_| Ok(Some(booking.clone())));

    ctx.slot_repo
        .expect_get_available_slot_by_id()
        .times(1)
        .returning(move |_| Ok(Some(slot.clone())));

    ctx.booking_repo
        .expect_delete_booking()
        .with(predicate::eq(10i64))
        .times(1)
        .returning(|_| Ok(()));

    let result = test_cancel_booking_wrapper(&mut ctx, student_id, 10, now).await;

    assert!(result.is_ok());
}

#[tokio::test]
async fn test_cancel_booking_notice_window_applies_to_teacher_too() {
    let mut ctx = TestContext::new();
    let teacher_id = Uuid::new_v4();
    let now = Utc::now();
    let start = now + Duration::hours(12);
    let slot = slot_fixture(1, teacher_id, start, start + Duration::hours(1));
    let booking = booking_fixture(10, Uuid::new_v4(), 1, "confirmed");

    ctx.booking_repo
        .expect_get_booking_by_id()
        .times(1)
        .returning(move |_| Ok(Some(booking.clone())));

    ctx.slot_repo
        .expect_get_available_slot_by_id()
        .times(1)
        .returning(move |_| Ok(Some(slot.clone())));

    let result = test_cancel_booking_wrapper(&mut ctx, teacher_id, 10, now).await;

    assert!(matches!(result, Err(AppError(TutorError::Validation(_)))));
}

#[tokio::test]
async fn test_cancel_booking_rejects_third_party() {
    let mut ctx = TestContext::new();
    let now = Utc::now();
    let start = now + Duration::hours(48);
    let slot = slot_fixture(1, Uuid::new_v4(), start, start + Duration::hours(1));
    let booking = booking_fixture(10, Uuid::new_v4(), 1, "pending");

    ctx.booking_repo
        .expect_get_booking_by_id()
        .times(1)
        .returning(move |_| Ok(Some(booking.clone())));

    ctx.slot_repo
        .expect_get_available_slot_by_id()
        .times(1)
        .returning(move |_| Ok(Some(slot.clone())));

    let result = test_cancel_booking_wrapper(&mut ctx, Uuid::new_v4(), 10, now).await;

    assert!(matches!(result, Err(AppError(TutorError::Authorization(_)))));
}

// The full lifecycle from the teacher publishing a slot to deleting it after
// the student cancelled in time
#[test_log::test(tokio::test)]
async fn test_booking_lifecycle_end_to_end() {
    let mut ctx = TestContext::new();
    let teacher_id = Uuid::new_v4();
    let student_id = Uuid::new_v4();
    let now = Utc::now();
    let start = now + Duration::hours(48);
    let end = start + Duration::hours(1);
    let slot = slot_fixture(1, teacher_id, start, end);

    // Student books the slot
    let slot_for_get = slot.clone();
    ctx.slot_repo
        .expect_get_available_slot_by_id()
        .times(1)
        .returning(move |_| Ok(Some(slot_for_get.clone())));
    ctx.slot_repo
        .expect_has_active_booking()
        .times(1)
        .returning(|_| Ok(false));
    ctx.booking_repo
        .expect_has_overlapping_active_booking()
        .times(1)
        .returning(|_, _, _| Ok(false));
    ctx.booking_repo
        .expect_create_booking()
        .times(1)
        .returning(|student_id, slot_id| Ok(booking_fixture(10, student_id, slot_id, "pending")));
    let slot_for_detail = slot.clone();
    ctx.booking_repo
        .expect_get_booking_detail_by_id()
        .times(1)
        .returning(move |_| {
            let booking = booking_fixture(10, student_id, 1, "pending");
            Ok(Some(detail_fixture(&booking, &slot_for_detail)))
        });

    let created = test_create_booking_wrapper(&mut ctx, student_id, 1, now)
        .await
        .expect("Booking should be created");
    assert_eq!(created.status, BookingStatus::Pending);

    // Teacher confirms it
    let pending = booking_fixture(10, student_id, 1, "pending");
    ctx.booking_repo
        .expect_get_booking_by_id()
        .times(1)
        .returning(move |_| Ok(Some(pending.clone())));
    let slot_for_decide = slot.clone();
    ctx.slot_repo
        .expect_get_available_slot_by_id()
        .times(1)
        .returning(move |_| Ok(Some(slot_for_decide.clone())));
    ctx.booking_repo
        .expect_update_booking_status()
        .times(1)
        .returning(move |id, status| Ok(booking_fixture(id, student_id, 1, status)));

    let status = test_decide_booking_wrapper(&mut ctx, teacher_id, 10, BookingStatus::Confirmed, now)
        .await
        .expect("Confirmation should succeed");
    assert_eq!(status, BookingStatus::Confirmed);

    // Deleting the slot now fails: the confirmed booking blocks it
    let slot_for_delete = slot.clone();
    ctx.slot_repo
        .expect_get_available_slot_by_id()
        .times(1)
        .returning(move |_| Ok(Some(slot_for_delete.clone())));
    ctx.slot_repo
        .expect_has_active_booking()
        .times(1)
        .returning(|_| Ok(true));

    let blocked = test_delete_slot(&mut ctx, teacher_id, 1).await;
    assert!(matches!(blocked, Err(AppError(TutorError::Validation(_)))));

    // Student cancels 48 hours ahead: the window is open
    let confirmed = booking_fixture(10, student_id, 1, "confirmed");
    ctx.booking_repo
        .expect_get_booking_by_id()
        .times(1)
        .returning(move |_| Ok(Some(confirmed.clone())));
    let slot_for_cancel = slot.clone();
    ctx.slot_repo
        .expect_get_available_slot_by_id()
        .times(1)
        .returning(move |_| Ok(Some(slot_for_cancel.clone())));
    ctx.booking_repo
        .expect_delete_booking()
        .times(1)
        .returning(|_| Ok(()));

    test_cancel_booking_wrapper(&mut ctx, student_id, 10, now)
        .await
        .expect("Cancellation should succeed");

    // With the booking gone, the slot can be deleted
    let slot_for_final = slot.clone();
    ctx.slot_repo
        .expect_get_available_slot_by_id()
        .times(1)
        .returning(move |_| Ok(Some(slot_for_final.clone())));
    ctx.slot_repo
        .expect_has_active_booking()
        .times(1)
        .returning(|_| Ok(false));
    ctx.slot_repo
        .expect_delete_available_slot()
        .times(1)
        .returning(|_| Ok(()));

    let deleted = test_delete_slot(&mut ctx, teacher_id, 1).await;
    assert!(deleted.is_ok());
}

// Minimal delete path used by the lifecycle test
async fn test_delete_slot(
    ctx: &mut TestContext,
    teacher_id: Uuid,
    slot_id: i64,
) -> Result<(), AppError> {
    let slot = ctx
        .slot_repo
        .get_available_slot_by_id(slot_id)
        .await?
        .ok_or_else(|| {
            AppError(TutorError::NotFound(format!(
                "Slot with ID {} not found",
                slot_id
            )))
        })?;

    if slot.teacher_id != teacher_id {
        return Err(AppError(TutorError::Authorization(
            "Not the owner of this slot".to_string(),
        )));
    }

    if ctx.slot_repo.has_active_booking(slot_id).await? {
        return Err(AppError(TutorError::Validation(
            "Slot has an active booking".to_string(),
        )));
    }

    ctx.slot_repo.delete_available_slot(slot_id).await?;
    Ok(())
}
