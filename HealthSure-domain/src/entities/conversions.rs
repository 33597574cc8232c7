use chrono::Utc;
use thiserror::Error;

use health_sure_data::models::health_record::{
    BasicInfoRow, HealthRecordRows, HealthStatusRow, LabResultRow, MedicalHistoryRow, NoteRow,
    SectionRow, StoredSection, TreatmentInfoRow,
};
use health_sure_data::models::user::UserRow;

use crate::entities::dates::age_on;
use crate::entities::health_record::{
    BasicInfo, HealthRecord, HealthStatus, LabResult, MedicalHistory, Note, Section, SectionKind,
    SectionRecord, TreatmentInfo,
};
use crate::entities::user::UserProfile;

// Conversion functions between domain entities and data models.
// List and object fields travel to storage as JSON text and are decoded on the way back.

/// Errors converting between storage rows and entities
#[derive(Debug, Error)]
pub enum ConversionError {
    #[error("Invalid JSON column: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Invalid stored value for {field}: {value}")]
    InvalidValue { field: &'static str, value: String },
}

/// Convert from data model to domain entity for a user
pub fn convert_to_domain_profile(row: UserRow) -> UserProfile {
    UserProfile {
        id: row.id,
        full_name: row.full_name,
        email: row.email,
        image: row.image,
        created_at: row.created_at,
        updated_at: row.updated_at,
    }
}

/// Links a section entity to its storage row
pub trait SectionEntity: Sized {
    type Row: SectionRow;

    const KIND: SectionKind;

    /// Convert to the storage row. Expects section rules to have passed.
    fn into_row(self) -> Result<Self::Row, ConversionError>;

    fn from_row(row: Self::Row) -> Result<Self, ConversionError>;

    fn into_record(section: Section<Self>) -> SectionRecord;
}

/// Convert a stored section row into a domain section
pub fn convert_to_domain_section<T: SectionEntity>(
    stored: StoredSection<T::Row>,
) -> Result<Section<T>, ConversionError> {
    Ok(Section {
        id: stored.id,
        user_id: stored.user_id,
        data: T::from_row(stored.data)?,
        created_at: stored.created_at,
        updated_at: stored.updated_at,
    })
}

fn optional_section<T: SectionEntity>(
    stored: Option<StoredSection<T::Row>>,
) -> Result<Option<Section<T>>, ConversionError> {
    stored.map(convert_to_domain_section::<T>).transpose()
}

/// Convert every stored section of a user into a health record
pub fn convert_to_domain_record(
    user_id: &str,
    rows: HealthRecordRows,
) -> Result<HealthRecord, ConversionError> {
    Ok(HealthRecord {
        user_id: user_id.to_string(),
        basic_info: optional_section::<BasicInfo>(rows.basic_info)?,
        health_status: optional_section::<HealthStatus>(rows.health_status)?,
        medical_history: optional_section::<MedicalHistory>(rows.medical_history)?,
        treatment_info: optional_section::<TreatmentInfo>(rows.treatment_info)?,
        lab_result: optional_section::<LabResult>(rows.lab_result)?,
        note: optional_section::<Note>(rows.note)?,
    })
}

fn parse_gender(
    field: &'static str,
    value: String,
) -> Result<crate::entities::health_record::Gender, ConversionError> {
    value
        .parse()
        .map_err(|_| ConversionError::InvalidValue { field, value })
}

impl SectionEntity for BasicInfo {
    type Row = BasicInfoRow;
    const KIND: SectionKind = SectionKind::BasicInfo;

    fn into_row(self) -> Result<BasicInfoRow, ConversionError> {
        let dob = self.dob.ok_or(ConversionError::MissingField("DOB"))?;
        let age = self.age.unwrap_or_else(|| age_on(dob, Utc::now().date_naive()));

        Ok(BasicInfoRow {
            full_name: self
                .full_name
                .map(|name| name.trim().to_string())
                .ok_or(ConversionError::MissingField("fullName"))?,
            dob,
            age: Some(age),
            gender: self
                .gender
                .ok_or(ConversionError::MissingField("Gender"))?
                .to_string(),
            phone_number: self.phone_number,
            email: self.email,
            house_address: self.house_address,
            emergency_number: self.emergency_number,
            next_of_kin_name: self.next_of_kin_name,
            next_of_kin_gender: self.next_of_kin_gender.map(|g| g.to_string()),
            next_of_kin_phone_number: self.next_of_kin_phone_number,
            next_of_kin_email_address: self.next_of_kin_email_address,
        })
    }

    fn from_row(row: BasicInfoRow) -> Result<Self, ConversionError> {
        Ok(BasicInfo {
            full_name: Some(row.full_name),
            dob: Some(row.dob),
            age: row.age,
            gender: Some(parse_gender("Gender", row.gender)?),
            phone_number: row.phone_number,
            email: row.email,
            house_address: row.house_address,
            emergency_number: row.emergency_number,
            next_of_kin_name: row.next_of_kin_name,
            next_of_kin_gender: row
                .next_of_kin_gender
                .map(|g| parse_gender("NextOfKinGender", g))
                .transpose()?,
            next_of_kin_phone_number: row.next_of_kin_phone_number,
            next_of_kin_email_address: row.next_of_kin_email_address,
        })
    }

    fn into_record(section: Section<Self>) -> SectionRecord {
        SectionRecord::BasicInfo(section)
    }
}

impl SectionEntity for HealthStatus {
    type Row = HealthStatusRow;
    const KIND: SectionKind = SectionKind::HealthStatus;

    fn into_row(self) -> Result<HealthStatusRow, ConversionError> {
        Ok(HealthStatusRow {
            health_condition: self
                .health_condition
                .ok_or(ConversionError::MissingField("healthCondition"))?,
            blood_pressure: self
                .blood_pressure
                .ok_or(ConversionError::MissingField("bloodPressure"))?,
            heart_rate: self.heart_rate,
            temperature: self.temperature,
            sugar: self.sugar,
            oxygen: self.oxygen,
            cholesterol: self.cholesterol,
            bmi: self.bmi,
            allergies: serde_json::to_string(&self.allergies)?,
        })
    }

    fn from_row(row: HealthStatusRow) -> Result<Self, ConversionError> {
        Ok(HealthStatus {
            health_condition: Some(row.health_condition),
            blood_pressure: Some(row.blood_pressure),
            heart_rate: row.heart_rate,
            temperature: row.temperature,
            sugar: row.sugar,
            oxygen: row.oxygen,
            cholesterol: row.cholesterol,
            bmi: row.bmi,
            allergies: serde_json::from_str(&row.allergies)?,
        })
    }

    fn into_record(section: Section<Self>) -> SectionRecord {
        SectionRecord::HealthStatus(section)
    }
}

impl SectionEntity for MedicalHistory {
    type Row = MedicalHistoryRow;
    const KIND: SectionKind = SectionKind::MedicalHistory;

    fn into_row(self) -> Result<MedicalHistoryRow, ConversionError> {
        Ok(MedicalHistoryRow {
            past_diagnoses: serde_json::to_string(&self.past_diagnoses)?,
            surgeries: serde_json::to_string(&self.surgeries)?,
            medications: serde_json::to_string(&self.medications)?,
            family_history: serde_json::to_string(&self.family_history)?,
        })
    }

    fn from_row(row: MedicalHistoryRow) -> Result<Self, ConversionError> {
        Ok(MedicalHistory {
            past_diagnoses: serde_json::from_str(&row.past_diagnoses)?,
            surgeries: serde_json::from_str(&row.surgeries)?,
            medications: serde_json::from_str(&row.medications)?,
            family_history: serde_json::from_str(&row.family_history)?,
        })
    }

    fn into_record(section: Section<Self>) -> SectionRecord {
        SectionRecord::MedicalHistory(section)
    }
}

impl SectionEntity for TreatmentInfo {
    type Row = TreatmentInfoRow;
    const KIND: SectionKind = SectionKind::TreatmentInfo;

    fn into_row(self) -> Result<TreatmentInfoRow, ConversionError> {
        Ok(TreatmentInfoRow {
            assigned_doctor: self
                .assigned_doctor
                .as_ref()
                .map(serde_json::to_string)
                .transpose()?,
            treatment_plans: serde_json::to_string(&self.treatment_plans)?,
            upcoming_appointments: serde_json::to_string(&self.upcoming_appointments)?,
        })
    }

    fn from_row(row: TreatmentInfoRow) -> Result<Self, ConversionError> {
        Ok(TreatmentInfo {
            assigned_doctor: row
                .assigned_doctor
                .as_deref()
                .map(serde_json::from_str)
                .transpose()?,
            treatment_plans: serde_json::from_str(&row.treatment_plans)?,
            upcoming_appointments: serde_json::from_str(&row.upcoming_appointments)?,
        })
    }

    fn into_record(section: Section<Self>) -> SectionRecord {
        SectionRecord::TreatmentInfo(section)
    }
}

impl SectionEntity for LabResult {
    type Row = LabResultRow;
    const KIND: SectionKind = SectionKind::LabResult;

    fn into_row(self) -> Result<LabResultRow, ConversionError> {
        Ok(LabResultRow {
            test_results: serde_json::to_string(&self.test_results)?,
            medical_reports: serde_json::to_string(&self.medical_reports)?,
        })
    }

    fn from_row(row: LabResultRow) -> Result<Self, ConversionError> {
        Ok(LabResult {
            test_results: serde_json::from_str(&row.test_results)?,
            medical_reports: serde_json::from_str(&row.medical_reports)?,
        })
    }

    fn into_record(section: Section<Self>) -> SectionRecord {
        SectionRecord::LabResult(section)
    }
}

impl SectionEntity for Note {
    type Row = NoteRow;
    const KIND: SectionKind = SectionKind::Note;

    fn into_row(self) -> Result<NoteRow, ConversionError> {
        Ok(NoteRow {
            doctor_notes: serde_json::to_string(&self.doctor_notes)?,
            caregiver_comments: serde_json::to_string(&self.caregiver_comments)?,
        })
    }

    fn from_row(row: NoteRow) -> Result<Self, ConversionError> {
        Ok(Note {
            doctor_notes: serde_json::from_str(&row.doctor_notes)?,
            caregiver_comments: serde_json::from_str(&row.caregiver_comments)?,
        })
    }

    fn into_record(section: Section<Self>) -> SectionRecord {
        SectionRecord::Note(section)
    }
}
