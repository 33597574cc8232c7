use rusqlite::Connection;
use tracing::info;

/// Run SQLite migrations
pub fn run_migrations(conn: &Connection) -> Result<(), String> {
    info!("Running SQLite migrations");

    create_users_table(conn)?;
    create_section_table(conn, "basic_info", BASIC_INFO_COLUMNS)?;
    create_section_table(conn, "health_status", HEALTH_STATUS_COLUMNS)?;
    create_section_table(conn, "medical_history", MEDICAL_HISTORY_COLUMNS)?;
    create_section_table(conn, "treatment_info", TREATMENT_INFO_COLUMNS)?;
    create_section_table(conn, "lab_results", LAB_RESULT_COLUMNS)?;
    create_section_table(conn, "notes", NOTE_COLUMNS)?;

    info!("SQLite migrations completed successfully");
    Ok(())
}

const BASIC_INFO_COLUMNS: &str = "
    full_name TEXT NOT NULL,
    dob TEXT NOT NULL,
    age INTEGER,
    gender TEXT NOT NULL,
    phone_number TEXT,
    email TEXT,
    house_address TEXT,
    emergency_number TEXT,
    next_of_kin_name TEXT,
    next_of_kin_gender TEXT,
    next_of_kin_phone_number TEXT,
    next_of_kin_email_address TEXT,";

const HEALTH_STATUS_COLUMNS: &str = "
    health_condition TEXT NOT NULL,
    blood_pressure REAL NOT NULL,
    heart_rate REAL,
    temperature REAL,
    sugar REAL,
    oxygen REAL,
    cholesterol REAL,
    bmi REAL,
    allergies TEXT NOT NULL DEFAULT '[]',";

const MEDICAL_HISTORY_COLUMNS: &str = "
    past_diagnoses TEXT NOT NULL DEFAULT '[]',
    surgeries TEXT NOT NULL DEFAULT '[]',
    medications TEXT NOT NULL DEFAULT '[]',
    family_history TEXT NOT NULL DEFAULT '[]',";

const TREATMENT_INFO_COLUMNS: &str = "
    assigned_doctor TEXT,
    treatment_plans TEXT NOT NULL DEFAULT '[]',
    upcoming_appointments TEXT NOT NULL DEFAULT '[]',";

const LAB_RESULT_COLUMNS: &str = "
    test_results TEXT NOT NULL DEFAULT '[]',
    medical_reports TEXT NOT NULL DEFAULT '[]',";

const NOTE_COLUMNS: &str = "
    doctor_notes TEXT NOT NULL DEFAULT '[]',
    caregiver_comments TEXT NOT NULL DEFAULT '[]',";

/// Create the users table
fn create_users_table(conn: &Connection) -> Result<(), String> {
    info!("Creating users table if not exists");

    conn.execute(
        "CREATE TABLE IF NOT EXISTS users (
            id TEXT PRIMARY KEY,
            full_name TEXT NOT NULL,
            email TEXT NOT NULL UNIQUE,
            image TEXT,
            password_hash TEXT NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )",
        [],
    )
    .map_err(|e| format!("Failed to create users table: {}", e))?;

    Ok(())
}

/// Create a one-per-user section table owned by `users`
fn create_section_table(conn: &Connection, table: &str, columns: &str) -> Result<(), String> {
    info!("Creating {} table if not exists", table);

    let sql = format!(
        "CREATE TABLE IF NOT EXISTS {table} (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL UNIQUE REFERENCES users(id) ON DELETE CASCADE,
            {columns}
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )"
    );

    conn.execute(&sql, [])
        .map_err(|e| format!("Failed to create {} table: {}", table, e))?;

    Ok(())
}
