use crate::models::{DbBooking, DbBookingDetail};
use chrono::{DateTime, Utc};
use eyre::Result;
use sqlx::PgExecutor;
use uuid::Uuid;

const DETAIL_COLUMNS: &str = r#"
    b.id, b.student_id, b.available_slot_id, b.status, b.created_at,
    s.start_time, s.end_time, s.teacher_id,
    st.display_name AS student_name,
    t.display_name AS teacher_name
"#;

pub async fn create_booking(
    executor: impl PgExecutor<'_>,
    student_id: Uuid,
    available_slot_id: i64,
) -> Result<DbBooking> {
    tracing::debug!(
        "Creating booking: student_id={}, slot_id={}",
        student_id,
        available_slot_id
    );

    let booking = sqlx::query_as::<_, DbBooking>(
        r#"
        INSERT INTO bookings (student_id, available_slot_id, status, created_at)
        VALUES ($1, $2, 'pending', $3)
        RETURNING id, student_id, available_slot_id, status, created_at
        "#,
    )
    .bind(student_id)
    .bind(available_slot_id)
    .bind(Utc::now())
    .fetch_one(executor)
    .await?;

    Ok(booking)
}

pub async fn get_booking_by_id(
    executor: impl PgExecutor<'_>,
    id: i64,
) -> Result<Option<DbBooking>> {
    let booking = sqlx::query_as::<_, DbBooking>(
        r#"
        SELECT id, student_id, available_slot_id, status, created_at
        FROM bookings
        WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(executor)
    .await?;

    Ok(booking)
}

pub async fn get_booking_detail_by_id(
    executor: impl PgExecutor<'_>,
    id: i64,
) -> Result<Option<DbBookingDetail>> {
    let detail = sqlx::query_as::<_, DbBookingDetail>(&format!(
        r#"
        SELECT {DETAIL_COLUMNS}
        FROM bookings b
        JOIN available_slots s ON s.id = b.available_slot_id
        LEFT JOIN users st ON st.id = b.student_id
        LEFT JOIN users t ON t.id = s.teacher_id
        WHERE b.id = $1
        "#
    ))
    .bind(id)
    .fetch_optional(executor)
    .await?;

    Ok(detail)
}

pub async fn list_bookings_by_student(
    executor: impl PgExecutor<'_>,
    student_id: Uuid,
) -> Result<Vec<DbBookingDetail>> {
    let bookings = sqlx::query_as::<_, DbBookingDetail>(&format!(
        r#"
        SELECT {DETAIL_COLUMNS}
        FROM bookings b
        JOIN available_slots s ON s.id = b.available_slot_id
        LEFT JOIN users st ON st.id = b.student_id
        LEFT JOIN users t ON t.id = s.teacher_id
        WHERE b.student_id = $1
        ORDER BY b.created_at DESC
        "#
    ))
    .bind(student_id)
    .fetch_all(executor)
    .await?;

    Ok(bookings)
}

pub async fn list_bookings_by_teacher(
    executor: impl PgExecutor<'_>,
    teacher_id: Uuid,
) -> Result<Vec<DbBookingDetail>> {
    let bookings = sqlx::query_as::<_, DbBookingDetail>(&format!(
        r#"
        SELECT {DETAIL_COLUMNS}
        FROM bookings b
        JOIN available_slots s ON s.id = b.available_slot_id
        LEFT JOIN users st ON st.id = b.student_id
        LEFT JOIN users t ON t.id = s.teacher_id
        WHERE s.teacher_id = $1
        ORDER BY b.created_at DESC
        "#
    ))
    .bind(teacher_id)
    .fetch_all(executor)
    .await?;

    Ok(bookings)
}

pub async fn update_booking_status(
    executor: impl PgExecutor<'_>,
    id: i64,
    status: &str,
) -> Result<DbBooking> {
    let booking = sqlx::query_as::<_, DbBooking>(
        r#"
        UPDATE bookings
        SET status = $2
        WHERE id = $1
        RETURNING id, student_id, available_slot_id, status, created_at
        "#,
    )
    .bind(id)
    .bind(status)
    .fetch_one(executor)
    .await?;

    Ok(booking)
}

pub async fn delete_booking(executor: impl PgExecutor<'_>, id: i64) -> Result<()> {
    sqlx::query(
        r#"
        DELETE FROM bookings
        WHERE id = $1
        "#,
    )
    .bind(id)
    .execute(executor)
    .await?;

    Ok(())
}

// Cross-slot invariant: an actor may not hold two active bookings whose
// slots overlap in time, even on slots from different teachers.
pub async fn has_overlapping_active_booking(
    executor: impl PgExecutor<'_>,
    actor_id: Uuid,
    start_time: DateTime<Utc>,
    end_time: DateTime<Utc>,
) -> Result<bool> {
    let exists = sqlx::query_scalar::<_, bool>(
        r#"
        SELECT EXISTS (
            SELECT 1
            FROM bookings b
            JOIN available_slots s ON s.id = b.available_slot_id
            WHERE b.student_id = $1
              AND b.status <> 'cancelled'
              AND s.start_time < $3
              AND $2 < s.end_time
        )
        "#,
    )
    .bind(actor_id)
    .bind(start_time)
    .bind(end_time)
    .fetch_one(executor)
    .await?;

    Ok(exists)
}
