//! Health record sections as exchanged with clients.
//!
//! Each user owns at most one of every section. Writes replace the whole section, so
//! every type here is both the request body and the stored representation.

use chrono::{DateTime, NaiveDate, Utc};
use serde::de::{self, DeserializeOwned, Deserializer};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use validator::Validate;

#[cfg(feature = "with-api")]
use utoipa::ToSchema;

use super::dates;

/// Upper bound for a submitted or derived age
pub const MAX_AGE: i64 = 150;

/// Gender options shared by the patient and next of kin
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
pub enum Gender {
    Male,
    Female,
    Other,
}

impl Gender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Male => "Male",
            Gender::Female => "Female",
            Gender::Other => "Other",
        }
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Gender {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Male" => Ok(Gender::Male),
            "Female" => Ok(Gender::Female),
            "Other" => Ok(Gender::Other),
            other => Err(format!("Unknown gender: {}", other)),
        }
    }
}

/// Demographics and emergency contacts
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct BasicInfo {
    #[validate(length(max = 100, message = "fullName must be at most 100 characters"))]
    pub full_name: Option<String>,

    /// Date of birth, `YYYY-MM-DD`
    #[serde(rename = "DOB", default, deserialize_with = "dates::optional_date")]
    pub dob: Option<NaiveDate>,

    /// Derived from `DOB` when omitted
    #[serde(rename = "Age", default, deserialize_with = "dates::optional_i64")]
    #[validate(range(min = 0, max = 150, message = "Age must be between 0 and 150"))]
    pub age: Option<i64>,

    #[serde(rename = "Gender")]
    pub gender: Option<Gender>,

    pub phone_number: Option<String>,

    #[validate(email(message = "email must be a valid email address"))]
    pub email: Option<String>,

    #[serde(rename = "HouseAddress")]
    pub house_address: Option<String>,

    #[serde(rename = "EmergencyNumber")]
    pub emergency_number: Option<String>,

    #[serde(rename = "NextOfKinName")]
    pub next_of_kin_name: Option<String>,

    #[serde(rename = "NextOfKinGender")]
    pub next_of_kin_gender: Option<Gender>,

    #[serde(rename = "NextOfKinPhoneNumber")]
    pub next_of_kin_phone_number: Option<String>,

    #[serde(rename = "NextOfKinEmailAddress")]
    #[validate(email(message = "NextOfKinEmailAddress must be a valid email address"))]
    pub next_of_kin_email_address: Option<String>,
}

/// Current vitals
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct HealthStatus {
    pub health_condition: Option<String>,

    #[serde(default, deserialize_with = "dates::optional_f64")]
    pub blood_pressure: Option<f64>,

    /// Beats per minute
    #[validate(range(min = 20.0, max = 250.0, message = "heartRate must be between 20 and 250"))]
    #[serde(default, deserialize_with = "dates::optional_f64")]
    pub heart_rate: Option<f64>,

    /// Degrees Celsius
    #[validate(range(min = 25.0, max = 45.0, message = "temperature must be between 25 and 45"))]
    #[serde(default, deserialize_with = "dates::optional_f64")]
    pub temperature: Option<f64>,

    #[validate(range(min = 0.0, message = "sugar cannot be negative"))]
    #[serde(default, deserialize_with = "dates::optional_f64")]
    pub sugar: Option<f64>,

    /// Saturation percentage
    #[validate(range(min = 0.0, max = 100.0, message = "oxygen must be between 0 and 100"))]
    #[serde(default, deserialize_with = "dates::optional_f64")]
    pub oxygen: Option<f64>,

    #[validate(range(min = 0.0, message = "cholesterol cannot be negative"))]
    #[serde(default, deserialize_with = "dates::optional_f64")]
    pub cholesterol: Option<f64>,

    #[serde(rename = "BMI", default, deserialize_with = "dates::optional_f64")]
    #[validate(range(min = 5.0, max = 100.0, message = "BMI must be between 5 and 100"))]
    pub bmi: Option<f64>,

    #[serde(default)]
    pub allergies: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct Surgery {
    #[validate(length(min = 1, message = "Surgery procedure is required"))]
    pub procedure: String,
    #[serde(default, deserialize_with = "dates::optional_flexible_datetime")]
    pub date: Option<DateTime<Utc>>,
    pub hospital: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct Medication {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub dosage: String,
    pub frequency: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct MedicalHistory {
    #[serde(default)]
    pub past_diagnoses: Vec<String>,
    #[serde(default)]
    #[validate]
    pub surgeries: Vec<Surgery>,
    #[serde(default)]
    pub medications: Vec<Medication>,
    #[serde(default)]
    pub family_history: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct Doctor {
    pub name: Option<String>,
    pub specialization: Option<String>,
    pub contact: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct Appointment {
    #[serde(deserialize_with = "dates::flexible_datetime")]
    pub date: DateTime<Utc>,
    pub title: Option<String>,
    pub location: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct TreatmentInfo {
    pub assigned_doctor: Option<Doctor>,
    #[serde(default)]
    pub treatment_plans: Vec<String>,
    #[serde(default)]
    pub upcoming_appointments: Vec<Appointment>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct TestResult {
    #[validate(length(min = 1, message = "testName is required"))]
    pub test_name: String,
    pub result: String,
    pub unit: Option<String>,
    pub reference_range: Option<String>,
    #[serde(deserialize_with = "dates::flexible_datetime")]
    pub date: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct MedicalReport {
    #[validate(length(min = 1, message = "Report title is required"))]
    pub title: String,
    #[validate(url(message = "Report url must be a valid URL"))]
    pub url: Option<String>,
    #[serde(default, deserialize_with = "dates::optional_flexible_datetime")]
    pub date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct LabResult {
    #[serde(default, deserialize_with = "test_results_list")]
    #[validate]
    pub test_results: Vec<TestResult>,
    #[serde(default)]
    #[validate]
    pub medical_reports: Vec<MedicalReport>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct Note {
    #[serde(default, deserialize_with = "doctor_notes_list")]
    pub doctor_notes: Vec<String>,
    #[serde(default)]
    pub caregiver_comments: Vec<String>,
}

fn list_field<'de, D, T>(deserializer: D, field: &str) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::Null => Ok(Vec::new()),
        value @ serde_json::Value::Array(_) => serde_json::from_value(value).map_err(de::Error::custom),
        _ => Err(de::Error::custom(format!("{} must be an array", field))),
    }
}

fn test_results_list<'de, D>(deserializer: D) -> Result<Vec<TestResult>, D::Error>
where
    D: Deserializer<'de>,
{
    list_field(deserializer, "testResults")
}

fn doctor_notes_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    list_field(deserializer, "doctorNotes")
}

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().map_or(true, |s| s.trim().is_empty())
}

/// Section-level rules checked before field validation.
///
/// These carry a single client-facing message rather than per-field details.
pub trait SectionRules {
    fn check_rules(&self) -> Result<(), String>;
}

impl SectionRules for BasicInfo {
    fn check_rules(&self) -> Result<(), String> {
        if is_blank(&self.full_name) || self.dob.is_none() || self.gender.is_none() {
            return Err("Missing required fields: fullName, DOB, and Gender are mandatory".to_string());
        }
        if let Some(dob) = self.dob {
            let today = Utc::now().date_naive();
            if dob > today {
                return Err("DOB cannot be in the future".to_string());
            }
            // A derived age must satisfy the same range as a submitted one
            if self.age.is_none() && dates::age_on(dob, today) > MAX_AGE {
                return Err("Age must be between 0 and 150".to_string());
            }
        }
        Ok(())
    }
}

impl SectionRules for HealthStatus {
    fn check_rules(&self) -> Result<(), String> {
        if is_blank(&self.health_condition) || self.blood_pressure.is_none() {
            return Err("healthCondition and bloodPressure are required".to_string());
        }
        Ok(())
    }
}

impl SectionRules for MedicalHistory {
    fn check_rules(&self) -> Result<(), String> {
        let incomplete = self
            .medications
            .iter()
            .any(|m| m.name.trim().is_empty() || m.dosage.trim().is_empty());
        if incomplete {
            return Err("Medications require name and dosage".to_string());
        }
        Ok(())
    }
}

impl SectionRules for TreatmentInfo {
    fn check_rules(&self) -> Result<(), String> {
        match &self.assigned_doctor {
            Some(doctor) if is_blank(&doctor.name) => Err("Doctor name is required".to_string()),
            _ => Ok(()),
        }
    }
}

impl SectionRules for LabResult {
    fn check_rules(&self) -> Result<(), String> {
        Ok(())
    }
}

impl SectionRules for Note {
    fn check_rules(&self) -> Result<(), String> {
        Ok(())
    }
}

/// The six section types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SectionKind {
    BasicInfo,
    HealthStatus,
    MedicalHistory,
    TreatmentInfo,
    LabResult,
    Note,
}

impl SectionKind {
    pub const ALL: [SectionKind; 6] = [
        SectionKind::BasicInfo,
        SectionKind::HealthStatus,
        SectionKind::MedicalHistory,
        SectionKind::TreatmentInfo,
        SectionKind::LabResult,
        SectionKind::Note,
    ];

    /// URL segment under `/dashboard/:userId/manage-health/`
    pub fn path_segment(&self) -> &'static str {
        match self {
            SectionKind::BasicInfo => "basic-info",
            SectionKind::HealthStatus => "health-status",
            SectionKind::MedicalHistory => "medical-history",
            SectionKind::TreatmentInfo => "treatment-info",
            SectionKind::LabResult => "lab-results",
            SectionKind::Note => "notes",
        }
    }

    pub fn from_path_segment(segment: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.path_segment() == segment)
    }

    /// Human readable name used in responses
    pub fn label(&self) -> &'static str {
        match self {
            SectionKind::BasicInfo => "Basic info",
            SectionKind::HealthStatus => "Health status",
            SectionKind::MedicalHistory => "Medical history",
            SectionKind::TreatmentInfo => "Treatment info",
            SectionKind::LabResult => "Lab results",
            SectionKind::Note => "Notes",
        }
    }

    pub fn created_message(&self) -> String {
        match self {
            SectionKind::BasicInfo => "Basic info created successfully".to_string(),
            _ => format!("{} created", self.label()),
        }
    }

    pub fn updated_message(&self) -> String {
        match self {
            SectionKind::BasicInfo => "Basic info updated successfully".to_string(),
            _ => format!("{} updated", self.label()),
        }
    }

    pub fn write_message(&self, created: bool) -> String {
        if created {
            self.created_message()
        } else {
            self.updated_message()
        }
    }
}

impl fmt::Display for SectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A section body submitted for one of the six kinds
#[derive(Debug, Clone, PartialEq)]
pub enum SectionPayload {
    BasicInfo(BasicInfo),
    HealthStatus(HealthStatus),
    MedicalHistory(MedicalHistory),
    TreatmentInfo(TreatmentInfo),
    LabResult(LabResult),
    Note(Note),
}

impl SectionPayload {
    pub fn kind(&self) -> SectionKind {
        match self {
            SectionPayload::BasicInfo(_) => SectionKind::BasicInfo,
            SectionPayload::HealthStatus(_) => SectionKind::HealthStatus,
            SectionPayload::MedicalHistory(_) => SectionKind::MedicalHistory,
            SectionPayload::TreatmentInfo(_) => SectionKind::TreatmentInfo,
            SectionPayload::LabResult(_) => SectionKind::LabResult,
            SectionPayload::Note(_) => SectionKind::Note,
        }
    }

    /// Decode a JSON body as the section type for `kind`
    pub fn from_value(kind: SectionKind, value: serde_json::Value) -> Result<Self, serde_json::Error> {
        Ok(match kind {
            SectionKind::BasicInfo => SectionPayload::BasicInfo(serde_json::from_value(value)?),
            SectionKind::HealthStatus => SectionPayload::HealthStatus(serde_json::from_value(value)?),
            SectionKind::MedicalHistory => SectionPayload::MedicalHistory(serde_json::from_value(value)?),
            SectionKind::TreatmentInfo => SectionPayload::TreatmentInfo(serde_json::from_value(value)?),
            SectionKind::LabResult => SectionPayload::LabResult(serde_json::from_value(value)?),
            SectionKind::Note => SectionPayload::Note(serde_json::from_value(value)?),
        })
    }
}

/// A stored section with its ownership and timestamps
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Section<T> {
    pub id: String,
    pub user_id: String,
    #[serde(flatten)]
    pub data: T,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Any one stored section, serialized as the section itself
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SectionRecord {
    BasicInfo(Section<BasicInfo>),
    HealthStatus(Section<HealthStatus>),
    MedicalHistory(Section<MedicalHistory>),
    TreatmentInfo(Section<TreatmentInfo>),
    LabResult(Section<LabResult>),
    Note(Section<Note>),
}

impl SectionRecord {
    pub fn kind(&self) -> SectionKind {
        match self {
            SectionRecord::BasicInfo(_) => SectionKind::BasicInfo,
            SectionRecord::HealthStatus(_) => SectionKind::HealthStatus,
            SectionRecord::MedicalHistory(_) => SectionKind::MedicalHistory,
            SectionRecord::TreatmentInfo(_) => SectionKind::TreatmentInfo,
            SectionRecord::LabResult(_) => SectionKind::LabResult,
            SectionRecord::Note(_) => SectionKind::Note,
        }
    }
}

/// Every section a user has written
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthRecord {
    pub user_id: String,
    pub basic_info: Option<Section<BasicInfo>>,
    pub health_status: Option<Section<HealthStatus>>,
    pub medical_history: Option<Section<MedicalHistory>>,
    pub treatment_info: Option<Section<TreatmentInfo>>,
    pub lab_result: Option<Section<LabResult>>,
    pub note: Option<Section<Note>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_basic_info_uses_original_keys() {
        let info: BasicInfo = serde_json::from_value(json!({
            "fullName": "Ada Lovelace",
            "DOB": "1990-05-17",
            "Gender": "Female",
            "NextOfKinEmailAddress": "kin@example.com"
        }))
        .unwrap();

        assert_eq!(info.dob, NaiveDate::from_ymd_opt(1990, 5, 17));
        assert_eq!(info.gender, Some(Gender::Female));
        assert!(info.check_rules().is_ok());

        let value = serde_json::to_value(&info).unwrap();
        assert_eq!(value["DOB"], "1990-05-17");
        assert_eq!(value["NextOfKinEmailAddress"], "kin@example.com");
    }

    #[test]
    fn test_derived_age_is_range_checked() {
        let info = BasicInfo {
            full_name: Some("Ada Lovelace".into()),
            dob: NaiveDate::from_ymd_opt(1700, 1, 1),
            gender: Some(Gender::Female),
            ..Default::default()
        };
        assert_eq!(info.check_rules().unwrap_err(), "Age must be between 0 and 150");

        let recent = BasicInfo {
            dob: NaiveDate::from_ymd_opt(1990, 5, 17),
            ..info
        };
        assert!(recent.check_rules().is_ok());
    }

    #[test]
    fn test_numeric_fields_accept_strings() {
        let status: HealthStatus = serde_json::from_value(json!({
            "healthCondition": "Stable",
            "bloodPressure": "120",
            "heartRate": "72",
            "BMI": 22.5
        }))
        .unwrap();
        assert_eq!(status.blood_pressure, Some(120.0));
        assert_eq!(status.heart_rate, Some(72.0));
        assert_eq!(status.bmi, Some(22.5));
        assert!(status.check_rules().is_ok());

        let info: BasicInfo = serde_json::from_value(json!({"Age": "34"})).unwrap();
        assert_eq!(info.age, Some(34));

        let bad = serde_json::from_value::<HealthStatus>(json!({"bloodPressure": "high"}));
        assert!(bad.is_err());
    }

    #[test]
    fn test_basic_info_requires_core_fields() {
        let info = BasicInfo {
            full_name: Some("Ada".into()),
            ..Default::default()
        };
        assert_eq!(
            info.check_rules().unwrap_err(),
            "Missing required fields: fullName, DOB, and Gender are mandatory"
        );
    }

    #[test]
    fn test_unknown_gender_is_rejected() {
        let result: Result<BasicInfo, _> = serde_json::from_value(json!({ "Gender": "Robot" }));
        assert!(result.is_err());
    }

    #[test]
    fn test_health_status_rules_and_ranges() {
        let missing = HealthStatus {
            health_condition: Some("Stable".into()),
            ..Default::default()
        };
        assert_eq!(
            missing.check_rules().unwrap_err(),
            "healthCondition and bloodPressure are required"
        );

        let out_of_range = HealthStatus {
            health_condition: Some("Stable".into()),
            blood_pressure: Some(120.0),
            heart_rate: Some(400.0),
            bmi: Some(22.0),
            ..Default::default()
        };
        assert!(out_of_range.check_rules().is_ok());
        assert!(out_of_range.validate().is_err());
    }

    #[test]
    fn test_medications_need_name_and_dosage() {
        let history: MedicalHistory = serde_json::from_value(json!({
            "medications": [{ "name": "Metformin" }]
        }))
        .unwrap();
        assert_eq!(history.check_rules().unwrap_err(), "Medications require name and dosage");
    }

    #[test]
    fn test_doctor_name_required_when_present() {
        let info: TreatmentInfo = serde_json::from_value(json!({
            "assignedDoctor": { "specialization": "Cardiology" },
            "upcomingAppointments": [{ "date": "2030-01-15" }]
        }))
        .unwrap();
        assert_eq!(info.check_rules().unwrap_err(), "Doctor name is required");
        assert_eq!(info.upcoming_appointments.len(), 1);
    }

    #[test]
    fn test_list_fields_must_be_arrays() {
        let err = serde_json::from_value::<LabResult>(json!({ "testResults": "high" })).unwrap_err();
        assert!(err.to_string().contains("testResults must be an array"));

        let err = serde_json::from_value::<Note>(json!({ "doctorNotes": { "a": 1 } })).unwrap_err();
        assert!(err.to_string().contains("doctorNotes must be an array"));

        let note: Note = serde_json::from_value(json!({ "doctorNotes": null })).unwrap();
        assert!(note.doctor_notes.is_empty());
    }

    #[test]
    fn test_section_messages() {
        assert_eq!(SectionKind::BasicInfo.write_message(true), "Basic info created successfully");
        assert_eq!(SectionKind::HealthStatus.write_message(false), "Health status updated");
        assert_eq!(SectionKind::LabResult.write_message(true), "Lab results created");
        assert_eq!(SectionKind::Note.write_message(false), "Notes updated");
        assert_eq!(SectionKind::from_path_segment("treatment-info"), Some(SectionKind::TreatmentInfo));
        assert_eq!(SectionKind::from_path_segment("weight"), None);
    }

    #[test]
    fn test_payload_from_value_dispatches_on_kind() {
        let payload = SectionPayload::from_value(
            SectionKind::HealthStatus,
            json!({ "healthCondition": "Stable", "bloodPressure": 118, "BMI": 21.5 }),
        )
        .unwrap();
        assert_eq!(payload.kind(), SectionKind::HealthStatus);

        let err = SectionPayload::from_value(SectionKind::LabResult, json!({ "testResults": 3 }))
            .unwrap_err();
        assert_eq!(err.to_string(), "testResults must be an array");
    }

    #[test]
    fn test_section_flattens_fields() {
        let now = Utc::now();
        let section = Section {
            id: "s1".to_string(),
            user_id: "u1".to_string(),
            data: Note {
                doctor_notes: vec!["Rest".into()],
                caregiver_comments: vec![],
            },
            created_at: now,
            updated_at: now,
        };

        let value = serde_json::to_value(&section).unwrap();
        assert_eq!(value["userId"], "u1");
        assert_eq!(value["doctorNotes"][0], "Rest");

        let back: Section<Note> = serde_json::from_value(value).unwrap();
        assert_eq!(back, section);
    }
}
