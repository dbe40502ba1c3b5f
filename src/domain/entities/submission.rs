use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use derive_more::Display;
use serde_json::{Map, Value};
use uuid::Uuid;
use validator::{Validate, ValidationError, ValidationErrors};

use crate::{constants::EMAIL_SHAPE, errors::{AppError, FieldError}};

const NAME_KEYS: &[&str] = &["nome", "name"];
const EMAIL_KEYS: &[&str] = &["email"];
const PHONE_KEYS: &[&str] = &["telefono", "phone"];
const INTERVENTION_KEYS: &[&str] = &["tipo", "interventionType"];
const MESSAGE_KEYS: &[&str] = &["messaggio", "message"];

/// Fields a real visitor never fills in.
pub const HONEYPOT_KEYS: &[&str] = &["website", "url", "honeypot"];

/// Order in which field problems are reported.
pub const FIELD_ORDER: [&str; 5] = ["name", "email", "phone", "interventionType", "message"];

/// Contact form values as received, before any validation.
///
/// Each field takes the first alias present in the body with a usable value
/// (`nome` before `name`, `telefono` before `phone`, ...). Blank values are
/// treated as missing. Strings are trimmed, except the email which is kept as
/// sent so that surrounding whitespace fails the shape check.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawSubmission {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub intervention_type: Option<String>,
    pub message: Option<String>,
    /// First honeypot key that carried a value.
    pub honeypot: Option<String>,
}

impl RawSubmission {
    pub fn from_slice(body: &[u8]) -> Result<Self, AppError> {
        let value: Value = serde_json::from_slice(body)
            .map_err(|e| AppError::MalformedBody(e.to_string()))?;

        Self::from_value(value)
    }

    pub fn from_value(value: Value) -> Result<Self, AppError> {
        match value {
            Value::Object(map) => Ok(Self::from_map(&map)),
            other => Err(AppError::MalformedBody(format!(
                "expected a JSON object, got {}",
                json_type(&other)
            ))),
        }
    }

    fn from_map(map: &Map<String, Value>) -> Self {
        let honeypot = HONEYPOT_KEYS
            .iter()
            .find(|key| map.get(**key).is_some_and(is_truthy))
            .map(|key| key.to_string());

        RawSubmission {
            name: text_field(map, NAME_KEYS),
            email: untrimmed_text_field(map, EMAIL_KEYS),
            phone: text_field(map, PHONE_KEYS),
            intervention_type: text_field(map, INTERVENTION_KEYS),
            message: text_field(map, MESSAGE_KEYS),
            honeypot,
        }
    }

    pub fn is_spam(&self) -> bool {
        self.honeypot.is_some()
    }
}

fn text_field(map: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|key| map.get(*key))
        .find_map(text_field_value)
}

fn text_field_value(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.trim().to_string()).filter(|s| !s.is_empty()),
        Value::Number(_) | Value::Bool(_) if is_truthy(value) => Some(value.to_string()),
        _ => None,
    }
}

fn untrimmed_text_field(map: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|key| map.get(*key))
        .find_map(|value| match value {
            Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
            Value::String(_) => None,
            _ => text_field_value(value),
        })
}

/// Truthiness as the browser form sees it.
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[derive(Debug, Validate)]
pub struct ContactForm {
    #[validate(length(min = 1, message = "Il nome è obbligatorio"))]
    pub name: String,

    #[validate(
        length(min = 1, message = "L'email è obbligatoria"),
        custom(function = "validate_email_shape")
    )]
    pub email: String,

    #[validate(length(min = 1, message = "Il telefono è obbligatorio"))]
    pub phone: String,

    #[validate(
        length(min = 1, message = "Seleziona il tipo di intervento"),
        custom(function = "validate_intervention_type")
    )]
    pub intervention_type: String,

    #[validate(length(min = 1, message = "Il messaggio è obbligatorio"))]
    pub message: String,
}

impl From<&RawSubmission> for ContactForm {
    fn from(raw: &RawSubmission) -> Self {
        ContactForm {
            name: raw.name.clone().unwrap_or_default(),
            email: raw.email.clone().unwrap_or_default(),
            phone: raw.phone.clone().unwrap_or_default(),
            intervention_type: raw.intervention_type.clone().unwrap_or_default(),
            message: raw.message.clone().unwrap_or_default(),
        }
    }
}

pub fn validate_email_shape(email: &str) -> Result<(), ValidationError> {
    if EMAIL_SHAPE.is_match(email) {
        return Ok(());
    }
    let mut error = ValidationError::new("email_shape");
    error.message = Some("Inserisci un'email valida".into());
    Err(error)
}

pub fn validate_intervention_type(value: &str) -> Result<(), ValidationError> {
    if value.parse::<InterventionType>().is_ok() {
        return Ok(());
    }
    let mut error = ValidationError::new("intervention_type");
    error.message = Some("Tipo di intervento non valido".into());
    Err(error)
}

/// Flattens validator output into one error per field: missing fields first,
/// then malformed ones, each group in [`FIELD_ORDER`].
pub fn field_errors_in_order(errors: ValidationErrors) -> Vec<FieldError> {
    let mut ranked: Vec<(u8, usize, FieldError)> = errors
        .field_errors()
        .iter()
        .flat_map(|(field, errors)| {
            let wire = wire_name(field.as_ref());
            let position = FIELD_ORDER
                .iter()
                .position(|f| *f == wire)
                .unwrap_or(FIELD_ORDER.len());

            errors.iter().map(move |e| {
                let stage = if e.code == "length" { 0 } else { 1 };
                let error = FieldError {
                    field: wire.to_string(),
                    message: e
                        .message
                        .as_ref()
                        .map(|s| s.to_string())
                        .unwrap_or_else(|| "Valore non valido".to_string()),
                };
                (stage, position, error)
            })
        })
        .collect();

    ranked.sort_by_key(|(stage, position, _)| (*stage, *position));

    let mut ordered: Vec<FieldError> = Vec::with_capacity(ranked.len());
    for (_, _, error) in ranked {
        if !ordered.iter().any(|e| e.field == error.field) {
            ordered.push(error);
        }
    }
    ordered
}

fn wire_name(field: &str) -> &str {
    match field {
        "intervention_type" => "interventionType",
        other => other,
    }
}

#[derive(Debug, Display, PartialEq)]
#[display("Unknown intervention type: {_0}")]
pub struct UnknownInterventionType(pub String);

/// The services a visitor can ask a quote for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InterventionType {
    Painting,
    Drywall,
    Shutters,
    Flooring,
    Decoration,
    BathroomRenovation,
    SkimCoating,
    BuildingMaintenance,
    Other,
}

impl InterventionType {
    pub const ALL: [InterventionType; 9] = [
        InterventionType::Painting,
        InterventionType::Drywall,
        InterventionType::Shutters,
        InterventionType::Flooring,
        InterventionType::Decoration,
        InterventionType::BathroomRenovation,
        InterventionType::SkimCoating,
        InterventionType::BuildingMaintenance,
        InterventionType::Other,
    ];

    /// Label shown in the site's select box.
    pub fn label(self) -> &'static str {
        match self {
            InterventionType::Painting => "Imbiancatura",
            InterventionType::Drywall => "Cartongesso",
            InterventionType::Shutters => "Tapparelle",
            InterventionType::Flooring => "Pavimenti e Rivestimenti",
            InterventionType::Decoration => "Decorazioni",
            InterventionType::BathroomRenovation => "Ristrutturazione Bagno",
            InterventionType::SkimCoating => "Spatolati",
            InterventionType::BuildingMaintenance => "Manutenzione Stabili",
            InterventionType::Other => "Altro",
        }
    }

    pub fn english_name(self) -> &'static str {
        match self {
            InterventionType::Painting => "Painting",
            InterventionType::Drywall => "Drywall",
            InterventionType::Shutters => "Shutters",
            InterventionType::Flooring => "Flooring",
            InterventionType::Decoration => "Decoration",
            InterventionType::BathroomRenovation => "Bathroom Renovation",
            InterventionType::SkimCoating => "Skim Coating",
            InterventionType::BuildingMaintenance => "Building Maintenance",
            InterventionType::Other => "Other",
        }
    }
}

impl FromStr for InterventionType {
    type Err = UnknownInterventionType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        InterventionType::ALL
            .into_iter()
            .find(|t| t.label().eq_ignore_ascii_case(s) || t.english_name().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnknownInterventionType(s.to_string()))
    }
}

impl fmt::Display for InterventionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// A contact request that passed every check and may be delivered.
#[derive(Debug, Clone, PartialEq)]
pub struct Submission {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub intervention_type: InterventionType,
    pub message: String,
    pub received_at: DateTime<Utc>,
}

impl Submission {
    /// Parses raw values into a typed submission, or the ordered list of
    /// field problems.
    pub fn parse(raw: &RawSubmission, received_at: DateTime<Utc>) -> Result<Self, Vec<FieldError>> {
        let form = ContactForm::from(raw);
        form.validate().map_err(field_errors_in_order)?;

        let intervention_type = form.intervention_type.parse().map_err(|_| {
            vec![FieldError {
                field: "interventionType".to_string(),
                message: "Tipo di intervento non valido".to_string(),
            }]
        })?;

        Ok(Submission {
            id: Uuid::new_v4(),
            name: form.name,
            email: form.email,
            phone: form.phone,
            intervention_type,
            message: form.message,
            received_at,
        })
    }
}
