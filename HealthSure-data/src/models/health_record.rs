//! Storage rows for the six one-per-user health record sections.
//!
//! List and object valued fields are persisted as JSON text; the domain layer owns their
//! structure. Each row type describes its own table through [`SectionRow`] so the
//! repository can run the same find-then-update-or-create transaction for all of them.

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::types::Value;
use rusqlite::Row;
use serde::{Deserialize, Serialize};

/// A storage row that belongs to exactly one user
pub trait SectionRow: Sized + Send + Sync + 'static {
    /// Table holding this section
    const TABLE: &'static str;

    /// Section columns, excluding `id`, `user_id` and the timestamps
    const COLUMNS: &'static [&'static str];

    /// Parameter values in [`Self::COLUMNS`] order
    fn to_values(&self) -> Vec<Value>;

    /// Decode the section columns starting at `offset`
    fn from_row(row: &Row<'_>, offset: usize) -> rusqlite::Result<Self>;
}

/// A section row together with its ownership and bookkeeping columns
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredSection<T> {
    pub id: String,
    pub user_id: String,
    pub data: T,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Every section stored for one user
#[derive(Debug, Clone, Default)]
pub struct HealthRecordRows {
    pub basic_info: Option<StoredSection<BasicInfoRow>>,
    pub health_status: Option<StoredSection<HealthStatusRow>>,
    pub medical_history: Option<StoredSection<MedicalHistoryRow>>,
    pub treatment_info: Option<StoredSection<TreatmentInfoRow>>,
    pub lab_result: Option<StoredSection<LabResultRow>>,
    pub note: Option<StoredSection<NoteRow>>,
}

fn text(value: &str) -> Value {
    Value::Text(value.to_owned())
}

fn opt_text(value: &Option<String>) -> Value {
    value.clone().map(Value::Text).unwrap_or(Value::Null)
}

fn opt_real(value: Option<f64>) -> Value {
    value.map(Value::Real).unwrap_or(Value::Null)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BasicInfoRow {
    pub full_name: String,
    pub dob: NaiveDate,
    pub age: Option<i64>,
    pub gender: String,
    pub phone_number: Option<String>,
    pub email: Option<String>,
    pub house_address: Option<String>,
    pub emergency_number: Option<String>,
    pub next_of_kin_name: Option<String>,
    pub next_of_kin_gender: Option<String>,
    pub next_of_kin_phone_number: Option<String>,
    pub next_of_kin_email_address: Option<String>,
}

impl SectionRow for BasicInfoRow {
    const TABLE: &'static str = "basic_info";
    const COLUMNS: &'static [&'static str] = &[
        "full_name",
        "dob",
        "age",
        "gender",
        "phone_number",
        "email",
        "house_address",
        "emergency_number",
        "next_of_kin_name",
        "next_of_kin_gender",
        "next_of_kin_phone_number",
        "next_of_kin_email_address",
    ];

    fn to_values(&self) -> Vec<Value> {
        vec![
            text(&self.full_name),
            Value::Text(self.dob.format("%Y-%m-%d").to_string()),
            self.age.map(Value::Integer).unwrap_or(Value::Null),
            text(&self.gender),
            opt_text(&self.phone_number),
            opt_text(&self.email),
            opt_text(&self.house_address),
            opt_text(&self.emergency_number),
            opt_text(&self.next_of_kin_name),
            opt_text(&self.next_of_kin_gender),
            opt_text(&self.next_of_kin_phone_number),
            opt_text(&self.next_of_kin_email_address),
        ]
    }

    fn from_row(row: &Row<'_>, offset: usize) -> rusqlite::Result<Self> {
        Ok(Self {
            full_name: row.get(offset)?,
            dob: row.get(offset + 1)?,
            age: row.get(offset + 2)?,
            gender: row.get(offset + 3)?,
            phone_number: row.get(offset + 4)?,
            email: row.get(offset + 5)?,
            house_address: row.get(offset + 6)?,
            emergency_number: row.get(offset + 7)?,
            next_of_kin_name: row.get(offset + 8)?,
            next_of_kin_gender: row.get(offset + 9)?,
            next_of_kin_phone_number: row.get(offset + 10)?,
            next_of_kin_email_address: row.get(offset + 11)?,
        })
    }
}

/// Vitals snapshot. `allergies` is a JSON array of strings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthStatusRow {
    pub health_condition: String,
    pub blood_pressure: f64,
    pub heart_rate: Option<f64>,
    pub temperature: Option<f64>,
    pub sugar: Option<f64>,
    pub oxygen: Option<f64>,
    pub cholesterol: Option<f64>,
    pub bmi: Option<f64>,
    pub allergies: String,
}

impl SectionRow for HealthStatusRow {
    const TABLE: &'static str = "health_status";
    const COLUMNS: &'static [&'static str] = &[
        "health_condition",
        "blood_pressure",
        "heart_rate",
        "temperature",
        "sugar",
        "oxygen",
        "cholesterol",
        "bmi",
        "allergies",
    ];

    fn to_values(&self) -> Vec<Value> {
        vec![
            text(&self.health_condition),
            Value::Real(self.blood_pressure),
            opt_real(self.heart_rate),
            opt_real(self.temperature),
            opt_real(self.sugar),
            opt_real(self.oxygen),
            opt_real(self.cholesterol),
            opt_real(self.bmi),
            text(&self.allergies),
        ]
    }

    fn from_row(row: &Row<'_>, offset: usize) -> rusqlite::Result<Self> {
        Ok(Self {
            health_condition: row.get(offset)?,
            blood_pressure: row.get(offset + 1)?,
            heart_rate: row.get(offset + 2)?,
            temperature: row.get(offset + 3)?,
            sugar: row.get(offset + 4)?,
            oxygen: row.get(offset + 5)?,
            cholesterol: row.get(offset + 6)?,
            bmi: row.get(offset + 7)?,
            allergies: row.get(offset + 8)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MedicalHistoryRow {
    pub past_diagnoses: String,
    pub surgeries: String,
    pub medications: String,
    pub family_history: String,
}

impl SectionRow for MedicalHistoryRow {
    const TABLE: &'static str = "medical_history";
    const COLUMNS: &'static [&'static str] =
        &["past_diagnoses", "surgeries", "medications", "family_history"];

    fn to_values(&self) -> Vec<Value> {
        vec![
            text(&self.past_diagnoses),
            text(&self.surgeries),
            text(&self.medications),
            text(&self.family_history),
        ]
    }

    fn from_row(row: &Row<'_>, offset: usize) -> rusqlite::Result<Self> {
        Ok(Self {
            past_diagnoses: row.get(offset)?,
            surgeries: row.get(offset + 1)?,
            medications: row.get(offset + 2)?,
            family_history: row.get(offset + 3)?,
        })
    }
}

/// `assigned_doctor` is a JSON object or NULL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreatmentInfoRow {
    pub assigned_doctor: Option<String>,
    pub treatment_plans: String,
    pub upcoming_appointments: String,
}

impl SectionRow for TreatmentInfoRow {
    const TABLE: &'static str = "treatment_info";
    const COLUMNS: &'static [&'static str] =
        &["assigned_doctor", "treatment_plans", "upcoming_appointments"];

    fn to_values(&self) -> Vec<Value> {
        vec![
            opt_text(&self.assigned_doctor),
            text(&self.treatment_plans),
            text(&self.upcoming_appointments),
        ]
    }

    fn from_row(row: &Row<'_>, offset: usize) -> rusqlite::Result<Self> {
        Ok(Self {
            assigned_doctor: row.get(offset)?,
            treatment_plans: row.get(offset + 1)?,
            upcoming_appointments: row.get(offset + 2)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabResultRow {
    pub test_results: String,
    pub medical_reports: String,
}

impl SectionRow for LabResultRow {
    const TABLE: &'static str = "lab_results";
    const COLUMNS: &'static [&'static str] = &["test_results", "medical_reports"];

    fn to_values(&self) -> Vec<Value> {
        vec![text(&self.test_results), text(&self.medical_reports)]
    }

    fn from_row(row: &Row<'_>, offset: usize) -> rusqlite::Result<Self> {
        Ok(Self {
            test_results: row.get(offset)?,
            medical_reports: row.get(offset + 1)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoteRow {
    pub doctor_notes: String,
    pub caregiver_comments: String,
}

impl SectionRow for NoteRow {
    const TABLE: &'static str = "notes";
    const COLUMNS: &'static [&'static str] = &["doctor_notes", "caregiver_comments"];

    fn to_values(&self) -> Vec<Value> {
        vec![text(&self.doctor_notes), text(&self.caregiver_comments)]
    }

    fn from_row(row: &Row<'_>, offset: usize) -> rusqlite::Result<Self> {
        Ok(Self {
            doctor_notes: row.get(offset)?,
            caregiver_comments: row.get(offset + 1)?,
        })
    }
}
