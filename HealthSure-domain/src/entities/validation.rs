use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationErrors, ValidationErrorsKind};

#[cfg(feature = "with-api")]
use utoipa::ToSchema;

/// A single invalid field, named by its JSON key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
pub struct FieldViolation {
    /// JSON path of the field, e.g. `medications[0].name`
    pub field: String,
    pub message: String,
}

/// Rejected input: a summary message plus per-field details
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationFailure {
    pub message: String,
    pub errors: Vec<FieldViolation>,
}

impl ValidationFailure {
    /// A failure with no per-field details
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            errors: Vec::new(),
        }
    }
}

impl std::fmt::Display for ValidationFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

/// Run validator rules, flattening failures into sorted field violations
pub fn validate_input<T: Validate>(input: &T) -> Result<(), ValidationFailure> {
    input.validate().map_err(|errors| ValidationFailure {
        message: "Validation errors".to_string(),
        errors: field_violations(&errors),
    })
}

/// Flatten (possibly nested) validator errors, sorted by field
pub fn field_violations(errors: &ValidationErrors) -> Vec<FieldViolation> {
    let mut violations = Vec::new();
    collect("", errors, &mut violations);
    violations.sort_by(|a, b| a.field.cmp(&b.field).then_with(|| a.message.cmp(&b.message)));
    violations
}

fn collect(prefix: &str, errors: &ValidationErrors, out: &mut Vec<FieldViolation>) {
    for (field, kind) in errors.errors() {
        let name = if prefix.is_empty() {
            wire_name(field)
        } else {
            format!("{}.{}", prefix, wire_name(field))
        };

        match kind {
            ValidationErrorsKind::Field(field_errors) => {
                for err in field_errors {
                    let message = err
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| format!("Invalid {}", name));
                    out.push(FieldViolation {
                        field: name.clone(),
                        message,
                    });
                }
            }
            ValidationErrorsKind::Struct(inner) => collect(&name, inner, out),
            ValidationErrorsKind::List(items) => {
                for (index, inner) in items {
                    collect(&format!("{}[{}]", name, index), inner, out);
                }
            }
        }
    }
}

/// Map a Rust field name to the JSON key clients send
fn wire_name(field: &str) -> String {
    match field {
        "dob" => "DOB".to_string(),
        "age" => "Age".to_string(),
        "gender" => "Gender".to_string(),
        "bmi" => "BMI".to_string(),
        "house_address" => "HouseAddress".to_string(),
        "emergency_number" => "EmergencyNumber".to_string(),
        "next_of_kin_name" => "NextOfKinName".to_string(),
        "next_of_kin_gender" => "NextOfKinGender".to_string(),
        "next_of_kin_phone_number" => "NextOfKinPhoneNumber".to_string(),
        "next_of_kin_email_address" => "NextOfKinEmailAddress".to_string(),
        other => camel_case(other),
    }
}

fn camel_case(snake: &str) -> String {
    let mut out = String::with_capacity(snake.len());
    let mut upper = false;
    for c in snake.chars() {
        if c == '_' {
            upper = true;
        } else if upper {
            out.extend(c.to_uppercase());
            upper = false;
        } else {
            out.push(c);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Validate)]
    struct Dosage {
        #[validate(length(min = 1, message = "name is required"))]
        name: String,
    }

    #[derive(Validate)]
    struct Input {
        #[validate(length(min = 3, message = "fullName must be at least 3 characters long"))]
        full_name: String,
        #[validate(range(min = 5.0, max = 100.0))]
        bmi: f64,
        #[validate]
        medications: Vec<Dosage>,
    }

    #[test]
    fn test_camel_case() {
        assert_eq!(camel_case("next_appointment_date"), "nextAppointmentDate");
        assert_eq!(camel_case("email"), "email");
    }

    #[test]
    fn test_violations_use_wire_names_and_are_sorted() {
        let input = Input {
            full_name: "Al".to_string(),
            bmi: 2.0,
            medications: vec![
                Dosage { name: "Ibuprofen".to_string() },
                Dosage { name: String::new() },
            ],
        };

        let failure = validate_input(&input).unwrap_err();
        assert_eq!(failure.message, "Validation errors");

        let fields: Vec<&str> = failure.errors.iter().map(|v| v.field.as_str()).collect();
        assert_eq!(fields, vec!["BMI", "fullName", "medications[1].name"]);
        assert_eq!(failure.errors[0].message, "Invalid BMI");
        assert_eq!(failure.errors[1].message, "fullName must be at least 3 characters long");
    }

    #[test]
    fn test_valid_input_passes() {
        let input = Input {
            full_name: "Alice".to_string(),
            bmi: 22.5,
            medications: vec![],
        };
        assert!(validate_input(&input).is_ok());
    }
}
