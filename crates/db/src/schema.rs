use eyre::Result;
use sqlx::{Pool, Postgres};
use tracing::info;

pub async fn initialize_database(pool: &Pool<Postgres>) -> Result<()> {
    info!("Initializing database schema...");

    // Profile projection maintained by the external identity service;
    // only read here, for counterpart display names.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id UUID PRIMARY KEY,
            display_name VARCHAR(255) NOT NULL,
            role VARCHAR(32) NOT NULL,
            created_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW()
        );
        "#,
    )
    .execute(pool)
    .await?;

    // Create available_slots table
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS available_slots (
            id BIGSERIAL PRIMARY KEY,
            teacher_id UUID NOT NULL,
            start_time TIMESTAMP WITH TIME ZONE NOT NULL,
            end_time TIMESTAMP WITH TIME ZONE NOT NULL,
            created_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW(),
            CONSTRAINT valid_time_range CHECK (end_time > start_time)
        );
        "#,
    )
    .execute(pool)
    .await?;

    // Create bookings table. Cancelled history rows are deleted with their
    // slot; deleting a slot with an active booking is rejected upstream.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS bookings (
            id BIGSERIAL PRIMARY KEY,
            student_id UUID NOT NULL,
            available_slot_id BIGINT NOT NULL REFERENCES available_slots(id) ON DELETE CASCADE,
            status VARCHAR(16) NOT NULL DEFAULT 'pending',
            created_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW(),
            CONSTRAINT valid_status CHECK (status IN ('pending', 'confirmed', 'cancelled'))
        );
        "#,
    )
    .execute(pool)
    .await?;

    // At most one non-cancelled booking may reference a slot. This is the
    // structural guard that resolves two racing bookings to one winner.
    sqlx::query(
        r#"
        CREATE UNIQUE INDEX IF NOT EXISTS idx_bookings_one_active_per_slot
            ON bookings (available_slot_id)
            WHERE status <> 'cancelled';
        "#,
    )
    .execute(pool)
    .await?;

    // Create indexes, one statement per query
    let indexes = [
        "CREATE INDEX IF NOT EXISTS idx_available_slots_teacher_id ON available_slots(teacher_id)",
        "CREATE INDEX IF NOT EXISTS idx_available_slots_start_time ON available_slots(start_time)",
        "CREATE INDEX IF NOT EXISTS idx_available_slots_end_time ON available_slots(end_time)",
        "CREATE INDEX IF NOT EXISTS idx_bookings_student_id ON bookings(student_id)",
        "CREATE INDEX IF NOT EXISTS idx_bookings_available_slot_id ON bookings(available_slot_id)",
        "CREATE INDEX IF NOT EXISTS idx_bookings_created_at ON bookings(created_at)",
    ];
    for statement in indexes {
        sqlx::query(statement).execute(pool).await?;
    }

    info!("Database schema initialized successfully.");
    Ok(())
}
