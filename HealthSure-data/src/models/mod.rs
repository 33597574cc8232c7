// Storage models mirroring the SQLite schema

pub mod user;
pub mod health_record;

pub use health_record::{
    BasicInfoRow, HealthRecordRows, HealthStatusRow, LabResultRow, MedicalHistoryRow, NoteRow,
    SectionRow, StoredSection, TreatmentInfoRow,
};
pub use user::{NewUser, ProfileChanges, UserRow};
