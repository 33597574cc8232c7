use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, error, info, instrument, warn};
use validator::Validate;

use health_sure_data::cache::Cache;
use health_sure_data::repository::{HealthRecordRepository, RepositoryError, UserRepository};

use crate::cache_keys;
use crate::entities::conversions::{
    convert_to_domain_record, convert_to_domain_section, ConversionError, SectionEntity,
};
use crate::entities::validation::validate_input;
use crate::entities::{
    BasicInfo, HealthRecord, HealthStatus, LabResult, MedicalHistory, Note, SectionKind,
    SectionPayload, SectionRecord, SectionRules, TreatmentInfo, ValidationFailure,
};

/// Health record service errors
#[derive(Debug, Error)]
pub enum HealthRecordServiceError {
    #[error("{0}")]
    Validation(ValidationFailure),

    #[error("{0}")]
    NotFound(String),

    #[error("Repository error: {0}")]
    RepositoryError(String),

    /// Stored data could not be turned back into a section
    #[error("Corrupt stored section: {0}")]
    Conversion(String),
}

impl From<ValidationFailure> for HealthRecordServiceError {
    fn from(failure: ValidationFailure) -> Self {
        HealthRecordServiceError::Validation(failure)
    }
}

impl From<ConversionError> for HealthRecordServiceError {
    fn from(err: ConversionError) -> Self {
        error!("Section conversion failed: {}", err);
        HealthRecordServiceError::Conversion(err.to_string())
    }
}

/// Result of writing a section
#[derive(Debug, Clone, PartialEq)]
pub struct SectionUpsert {
    pub record: SectionRecord,
    /// True when the section did not exist before this write
    pub created: bool,
}

impl SectionUpsert {
    /// "X created" or "X updated"
    pub fn message(&self) -> String {
        self.record.kind().write_message(self.created)
    }
}

/// Trait for health record operations
#[async_trait]
pub trait HealthRecordServiceTrait: Send + Sync {
    /// Create the user's section of this kind, or replace it if it exists
    async fn upsert_section(
        &self,
        user_id: &str,
        payload: SectionPayload,
    ) -> Result<SectionUpsert, HealthRecordServiceError>;

    async fn get_section(
        &self,
        user_id: &str,
        kind: SectionKind,
    ) -> Result<Option<SectionRecord>, HealthRecordServiceError>;

    /// All sections of a user, cached under `healthRecord:{userId}`
    async fn get_health_record(&self, user_id: &str) -> Result<HealthRecord, HealthRecordServiceError>;
}

/// Health record service backed by SQLite and the shared cache
#[derive(Debug, Clone)]
pub struct HealthRecordService {
    records: HealthRecordRepository,
    users: UserRepository,
    cache: Cache,
}

impl HealthRecordService {
    pub fn new(records: HealthRecordRepository, users: UserRepository, cache: Cache) -> Self {
        Self { records, users, cache }
    }

    /// Map repository errors to service errors
    fn map_repo_error(&self, err: RepositoryError) -> HealthRecordServiceError {
        match err {
            RepositoryError::NotFound(what) if what == "User" => {
                HealthRecordServiceError::NotFound("User not found".to_string())
            }
            RepositoryError::NotFound(msg) => HealthRecordServiceError::NotFound(msg),
            _ => {
                error!("Health record repository failure: {}", err);
                HealthRecordServiceError::RepositoryError(err.to_string())
            }
        }
    }

    async fn write<T>(&self, user_id: &str, data: T) -> Result<SectionUpsert, HealthRecordServiceError>
    where
        T: SectionEntity + SectionRules + Validate,
    {
        validate_input(&data)?;
        data.check_rules().map_err(ValidationFailure::message)?;

        let row = data.into_row()?;
        let (stored, created) = self
            .records
            .upsert(user_id, row)
            .await
            .map_err(|e| self.map_repo_error(e))?;
        let section = convert_to_domain_section::<T>(stored)?;

        self.invalidate(user_id).await;
        info!(
            "{} {} for user {}",
            T::KIND,
            if created { "created" } else { "updated" },
            user_id
        );

        Ok(SectionUpsert {
            record: T::into_record(section),
            created,
        })
    }

    async fn read<T: SectionEntity>(
        &self,
        user_id: &str,
    ) -> Result<Option<SectionRecord>, HealthRecordServiceError> {
        let stored = self
            .records
            .find::<T::Row>(user_id)
            .await
            .map_err(|e| self.map_repo_error(e))?;
        Ok(stored
            .map(convert_to_domain_section::<T>)
            .transpose()?
            .map(T::into_record))
    }

    async fn invalidate(&self, user_id: &str) {
        if let Err(e) = self.cache.delete(&cache_keys::health_record(user_id)).await {
            warn!("Failed to invalidate cached health record for {}: {}", user_id, e);
        }
    }
}

#[async_trait]
impl HealthRecordServiceTrait for HealthRecordService {
    #[instrument(skip(self, payload), fields(section = %payload.kind()))]
    async fn upsert_section(
        &self,
        user_id: &str,
        payload: SectionPayload,
    ) -> Result<SectionUpsert, HealthRecordServiceError> {
        match payload {
            SectionPayload::BasicInfo(data) => self.write::<BasicInfo>(user_id, data).await,
            SectionPayload::HealthStatus(data) => self.write::<HealthStatus>(user_id, data).await,
            SectionPayload::MedicalHistory(data) => self.write::<MedicalHistory>(user_id, data).await,
            SectionPayload::TreatmentInfo(data) => self.write::<TreatmentInfo>(user_id, data).await,
            SectionPayload::LabResult(data) => self.write::<LabResult>(user_id, data).await,
            SectionPayload::Note(data) => self.write::<Note>(user_id, data).await,
        }
    }

    #[instrument(skip(self))]
    async fn get_section(
        &self,
        user_id: &str,
        kind: SectionKind,
    ) -> Result<Option<SectionRecord>, HealthRecordServiceError> {
        match kind {
            SectionKind::BasicInfo => self.read::<BasicInfo>(user_id).await,
            SectionKind::HealthStatus => self.read::<HealthStatus>(user_id).await,
            SectionKind::MedicalHistory => self.read::<MedicalHistory>(user_id).await,
            SectionKind::TreatmentInfo => self.read::<TreatmentInfo>(user_id).await,
            SectionKind::LabResult => self.read::<LabResult>(user_id).await,
            SectionKind::Note => self.read::<Note>(user_id).await,
        }
    }

    #[instrument(skip(self))]
    async fn get_health_record(&self, user_id: &str) -> Result<HealthRecord, HealthRecordServiceError> {
        let key = cache_keys::health_record(user_id);
        match self.cache.get::<HealthRecord>(&key).await {
            Ok(Some(record)) => {
                debug!("Health record cache hit for user {}", user_id);
                return Ok(record);
            }
            Ok(None) => debug!("Health record cache miss for user {}", user_id),
            Err(e) => warn!("Health record cache unavailable, reading from database: {}", e),
        }

        if self
            .users
            .find_by_id(user_id)
            .await
            .map_err(|e| self.map_repo_error(e))?
            .is_none()
        {
            return Err(HealthRecordServiceError::NotFound("User not found".to_string()));
        }

        let rows = self
            .records
            .find_all(user_id)
            .await
            .map_err(|e| self.map_repo_error(e))?;
        let record = convert_to_domain_record(user_id, rows)?;

        if let Err(e) = self.cache.set_default(&key, &record).await {
            warn!("Failed to cache health record for {}: {}", user_id, e);
        }
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    use health_sure_data::database::DatabasePool;
    use health_sure_data::models::user::NewUser;

    use crate::entities::{Gender, Medication};

    async fn setup() -> (HealthRecordService, Cache, String) {
        let pool = DatabasePool::in_memory().unwrap();
        let users = UserRepository::new(pool.clone());
        let cache = Cache::in_memory();
        let user = users
            .create(NewUser {
                full_name: "Ada Lovelace".into(),
                email: "ada@example.com".into(),
                image: None,
                password_hash: "hash".into(),
            })
            .await
            .unwrap();
        let service = HealthRecordService::new(HealthRecordRepository::new(pool), users, cache.clone());
        (service, cache, user.id)
    }

    fn basic_info() -> BasicInfo {
        BasicInfo {
            full_name: Some("Ada Lovelace".into()),
            dob: NaiveDate::from_ymd_opt(1990, 12, 10),
            gender: Some(Gender::Female),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_upsert_creates_then_updates() {
        let (service, _, user_id) = setup().await;

        let first = service
            .upsert_section(&user_id, SectionPayload::BasicInfo(basic_info()))
            .await
            .unwrap();
        assert!(first.created);
        assert_eq!(first.message(), "Basic info created successfully");

        let mut changed = basic_info();
        changed.phone_number = Some("+44 20 7946 0000".into());
        let second = service
            .upsert_section(&user_id, SectionPayload::BasicInfo(changed))
            .await
            .unwrap();
        assert!(!second.created);
        assert_eq!(second.message(), "Basic info updated successfully");

        let (SectionRecord::BasicInfo(a), SectionRecord::BasicInfo(b)) = (first.record, second.record) else {
            panic!("expected basic info records");
        };
        assert_eq!(a.id, b.id);
        assert_eq!(b.data.phone_number.as_deref(), Some("+44 20 7946 0000"));
        assert!(b.data.age.is_some());
    }

    #[tokio::test]
    async fn test_upsert_unknown_user() {
        let (service, _, _) = setup().await;
        let err = service
            .upsert_section("missing", SectionPayload::Note(Note::default()))
            .await
            .unwrap_err();
        assert!(matches!(err, HealthRecordServiceError::NotFound(msg) if msg == "User not found"));
    }

    #[tokio::test]
    async fn test_section_rules_are_enforced() {
        let (service, _, user_id) = setup().await;

        let err = service
            .upsert_section(&user_id, SectionPayload::BasicInfo(BasicInfo::default()))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            HealthRecordServiceError::Validation(f)
                if f.message == "Missing required fields: fullName, DOB, and Gender are mandatory"
        ));

        let history = MedicalHistory {
            medications: vec![Medication {
                name: "Ibuprofen".into(),
                dosage: String::new(),
                frequency: None,
            }],
            ..Default::default()
        };
        let err = service
            .upsert_section(&user_id, SectionPayload::MedicalHistory(history))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            HealthRecordServiceError::Validation(f) if f.message == "Medications require name and dosage"
        ));
    }

    #[tokio::test]
    async fn test_field_validation_errors() {
        let (service, _, user_id) = setup().await;
        let status = HealthStatus {
            health_condition: Some("Stable".into()),
            blood_pressure: Some(120.0),
            oxygen: Some(140.0),
            ..Default::default()
        };
        let err = service
            .upsert_section(&user_id, SectionPayload::HealthStatus(status))
            .await
            .unwrap_err();
        let HealthRecordServiceError::Validation(failure) = err else {
            panic!("expected validation failure");
        };
        assert_eq!(failure.errors[0].field, "oxygen");
    }

    #[tokio::test]
    async fn test_get_section() {
        let (service, _, user_id) = setup().await;
        assert!(service.get_section(&user_id, SectionKind::Note).await.unwrap().is_none());

        let note = Note {
            doctor_notes: vec!["Follow up in two weeks".into()],
            caregiver_comments: vec![],
        };
        service.upsert_section(&user_id, SectionPayload::Note(note)).await.unwrap();

        let record = service.get_section(&user_id, SectionKind::Note).await.unwrap().unwrap();
        assert_eq!(record.kind(), SectionKind::Note);
    }

    #[tokio::test]
    async fn test_health_record_cache_invalidated_on_write() {
        let (service, cache, user_id) = setup().await;

        let empty = service.get_health_record(&user_id).await.unwrap();
        assert!(empty.basic_info.is_none());
        assert!(cache
            .get::<HealthRecord>(&cache_keys::health_record(&user_id))
            .await
            .unwrap()
            .is_some());

        service
            .upsert_section(&user_id, SectionPayload::BasicInfo(basic_info()))
            .await
            .unwrap();
        assert!(cache
            .get::<HealthRecord>(&cache_keys::health_record(&user_id))
            .await
            .unwrap()
            .is_none());

        let record = service.get_health_record(&user_id).await.unwrap();
        assert!(record.basic_info.is_some());
        assert!(record.note.is_none());
    }

    #[tokio::test]
    async fn test_health_record_unknown_user() {
        let (service, _, _) = setup().await;
        let err = service.get_health_record("missing").await.unwrap_err();
        assert!(matches!(err, HealthRecordServiceError::NotFound(_)));
    }
}
