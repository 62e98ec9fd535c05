use crate::models::{DbAvailableSlot, DbSlotWithBooking};
use chrono::{DateTime, Utc};
use eyre::Result;
use sqlx::PgExecutor;
use uuid::Uuid;

// Functions take any executor so the scheduling service can run the
// check-then-act sequences on one transaction; plain reads pass the pool.

pub async fn create_available_slot(
    executor: impl PgExecutor<'_>,
    teacher_id: Uuid,
    start_time: DateTime<Utc>,
    end_time: DateTime<Utc>,
) -> Result<DbAvailableSlot> {
    tracing::debug!(
        "Creating slot: teacher_id={}, start={}, end={}",
        teacher_id,
        start_time,
        end_time
    );

    let slot = sqlx::query_as::<_, DbAvailableSlot>(
        r#"
        INSERT INTO available_slots (teacher_id, start_time, end_time, created_at)
        VALUES ($1, $2, $3, $4)
        RETURNING id, teacher_id, start_time, end_time, created_at
        "#,
    )
    .bind(teacher_id)
    .bind(start_time)
    .bind(end_time)
    .bind(Utc::now())
    .fetch_one(executor)
    .await?;

    Ok(slot)
}

pub async fn get_available_slot_by_id(
    executor: impl PgExecutor<'_>,
    id: i64,
) -> Result<Option<DbAvailableSlot>> {
    let slot = sqlx::query_as::<_, DbAvailableSlot>(
        r#"
        SELECT id, teacher_id, start_time, end_time, created_at
        FROM available_slots
        WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(executor)
    .await?;

    Ok(slot)
}

pub async fn get_slot_with_booking(
    executor: impl PgExecutor<'_>,
    id: i64,
) -> Result<Option<DbSlotWithBooking>> {
    let slot = sqlx::query_as::<_, DbSlotWithBooking>(
        r#"
        SELECT
            s.id, s.teacher_id, s.start_time, s.end_time, s.created_at,
            b.id AS booking_id,
            b.student_id AS booking_student_id,
            b.status AS booking_status,
            b.created_at AS booking_created_at,
            u.display_name AS student_name
        FROM available_slots s
        LEFT JOIN bookings b
            ON b.available_slot_id = s.id AND b.status <> 'cancelled'
        LEFT JOIN users u ON u.id = b.student_id
        WHERE s.id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(executor)
    .await?;

    Ok(slot)
}

pub async fn list_current_slots_with_bookings_by_teacher(
    executor: impl PgExecutor<'_>,
    teacher_id: Uuid,
    now: DateTime<Utc>,
    limit: i64,
    offset: i64,
) -> Result<Vec<DbSlotWithBooking>> {
    let slots = sqlx::query_as::<_, DbSlotWithBooking>(
        r#"
        SELECT
            s.id, s.teacher_id, s.start_time, s.end_time, s.created_at,
            b.id AS booking_id,
            b.student_id AS booking_student_id,
            b.status AS booking_status,
            b.created_at AS booking_created_at,
            u.display_name AS student_name
        FROM available_slots s
        LEFT JOIN bookings b
            ON b.available_slot_id = s.id AND b.status <> 'cancelled'
        LEFT JOIN users u ON u.id = b.student_id
        WHERE s.teacher_id = $1 AND s.end_time >= $2
        ORDER BY s.start_time ASC
        LIMIT $3 OFFSET $4
        "#,
    )
    .bind(teacher_id)
    .bind(now)
    .bind(limit)
    .bind(offset)
    .fetch_all(executor)
    .await?;

    Ok(slots)
}

pub async fn count_current_slots_by_teacher(
    executor: impl PgExecutor<'_>,
    teacher_id: Uuid,
    now: DateTime<Utc>,
) -> Result<i64> {
    let count = sqlx::query_scalar::<_, i64>(
        r#"
        SELECT COUNT(*)
        FROM available_slots
        WHERE teacher_id = $1 AND end_time >= $2
        "#,
    )
    .bind(teacher_id)
    .bind(now)
    .fetch_one(executor)
    .await?;

    Ok(count)
}

pub async fn list_past_slots_by_teacher(
    executor: impl PgExecutor<'_>,
    teacher_id: Uuid,
    now: DateTime<Utc>,
    limit: i64,
    offset: i64,
) -> Result<Vec<DbAvailableSlot>> {
    let slots = sqlx::query_as::<_, DbAvailableSlot>(
        r#"
        SELECT id, teacher_id, start_time, end_time, created_at
        FROM available_slots
        WHERE teacher_id = $1 AND end_time < $2
        ORDER BY start_time DESC
        LIMIT $3 OFFSET $4
        "#,
    )
    .bind(teacher_id)
    .bind(now)
    .bind(limit)
    .bind(offset)
    .fetch_all(executor)
    .await?;

    Ok(slots)
}

pub async fn count_past_slots_by_teacher(
    executor: impl PgExecutor<'_>,
    teacher_id: Uuid,
    now: DateTime<Utc>,
) -> Result<i64> {
    let count = sqlx::query_scalar::<_, i64>(
        r#"
        SELECT COUNT(*)
        FROM available_slots
        WHERE teacher_id = $1 AND end_time < $2
        "#,
    )
    .bind(teacher_id)
    .bind(now)
    .fetch_one(executor)
    .await?;

    Ok(count)
}

// Upcoming slots with no active booking: the public view students book from.
pub async fn list_free_slots_by_teacher(
    executor: impl PgExecutor<'_>,
    teacher_id: Uuid,
    now: DateTime<Utc>,
    limit: i64,
    offset: i64,
) -> Result<Vec<DbAvailableSlot>> {
    let slots = sqlx::query_as::<_, DbAvailableSlot>(
        r#"
        SELECT s.id, s.teacher_id, s.start_time, s.end_time, s.created_at
        FROM available_slots s
        WHERE s.teacher_id = $1
          AND s.end_time >= $2
          AND NOT EXISTS (
              SELECT 1 FROM bookings b
              WHERE b.available_slot_id = s.id AND b.status <> 'cancelled'
          )
        ORDER BY s.start_time ASC
        LIMIT $3 OFFSET $4
        "#,
    )
    .bind(teacher_id)
    .bind(now)
    .bind(limit)
    .bind(offset)
    .fetch_all(executor)
    .await?;

    Ok(slots)
}

pub async fn count_free_slots_by_teacher(
    executor: impl PgExecutor<'_>,
    teacher_id: Uuid,
    now: DateTime<Utc>,
) -> Result<i64> {
    let count = sqlx::query_scalar::<_, i64>(
        r#"
        SELECT COUNT(*)
        FROM available_slots s
        WHERE s.teacher_id = $1
          AND s.end_time >= $2
          AND NOT EXISTS (
              SELECT 1 FROM bookings b
              WHERE b.available_slot_id = s.id AND b.status <> 'cancelled'
          )
        "#,
    )
    .bind(teacher_id)
    .bind(now)
    .fetch_one(executor)
    .await?;

    Ok(count)
}

pub async fn update_available_slot(
    executor: impl PgExecutor<'_>,
    id: i64,
    start_time: DateTime<Utc>,
    end_time: DateTime<Utc>,
) -> Result<DbAvailableSlot> {
    let slot = sqlx::query_as::<_, DbAvailableSlot>(
        r#"
        UPDATE available_slots
        SET start_time = $2, end_time = $3
        WHERE id = $1
        RETURNING id, teacher_id, start_time, end_time, created_at
        "#,
    )
    .bind(id)
    .bind(start_time)
    .bind(end_time)
    .fetch_one(executor)
    .await?;

    Ok(slot)
}

pub async fn delete_available_slot(executor: impl PgExecutor<'_>, id: i64) -> Result<()> {
    sqlx::query(
        r#"
        DELETE FROM available_slots
        WHERE id = $1
        "#,
    )
    .bind(id)
    .execute(executor)
    .await?;

    Ok(())
}

// Half-open interval test; adjacent slots do not collide. Pass the slot
// being edited so an update does not collide with itself.
pub async fn has_overlapping_slot(
    executor: impl PgExecutor<'_>,
    teacher_id: Uuid,
    start_time: DateTime<Utc>,
    end_time: DateTime<Utc>,
    exclude_slot_id: Option<i64>,
) -> Result<bool> {
    let exists = sqlx::query_scalar::<_, bool>(
        r#"
        SELECT EXISTS (
            SELECT 1 FROM available_slots
            WHERE teacher_id = $1
              AND start_time < $3
              AND $2 < end_time
              AND ($4::BIGINT IS NULL OR id <> $4)
        )
        "#,
    )
    .bind(teacher_id)
    .bind(start_time)
    .bind(end_time)
    .bind(exclude_slot_id)
    .fetch_one(executor)
    .await?;

    Ok(exists)
}

pub async fn has_active_booking(executor: impl PgExecutor<'_>, slot_id: i64) -> Result<bool> {
    let exists = sqlx::query_scalar::<_, bool>(
        r#"
        SELECT EXISTS (
            SELECT 1 FROM bookings
            WHERE available_slot_id = $1 AND status <> 'cancelled'
        )
        "#,
    )
    .bind(slot_id)
    .fetch_one(executor)
    .await?;

    Ok(exists)
}
