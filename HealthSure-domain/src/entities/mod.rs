// Domain entities and value objects
pub mod conversions;
pub mod dates;
pub mod health_record;
pub mod user;
pub mod validation;

// Re-export common types for easier imports
pub use health_record::{
    Appointment, BasicInfo, Doctor, Gender, HealthRecord, HealthStatus, LabResult, MedicalHistory,
    MedicalReport, Medication, Note, Section, SectionKind, SectionPayload, SectionRecord,
    SectionRules, Surgery, TestResult, TreatmentInfo,
};
pub use user::{
    ChangePasswordRequest, ForgotPasswordRequest, LoginRequest, LoginResponse, OtpIssued,
    OtpRequest, RefreshRequest, RegisterRequest, ResetPasswordRequest, TokenPair,
    UpdateProfileRequest, UserProfile, VerifyOtpRequest,
};
pub use validation::{FieldViolation, ValidationFailure};
