//! Medical Record Projections

use std::{collections::BTreeMap, fmt, str::FromStr};

use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::uuids::TypedUuid;

/// Medical Record UUID
pub type MedicalRecordUuid = TypedUuid<SharedRecord>;

/// Client-side encryption envelope for the stored document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptionBundle {
    pub ciphertext: String,
    pub iv: String,
    pub salt: String,
}

/// Provenance badge attached to an uploaded document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntegrityBadge {
    Verified,
    PatientUploaded,
    LowQuality,
    Unknown,
}

impl IntegrityBadge {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Verified => "verified",
            Self::PatientUploaded => "patient-uploaded",
            Self::LowQuality => "low-quality",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for IntegrityBadge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
#[error("unknown integrity badge: {0}")]
pub struct UnknownIntegrityBadge(String);

impl FromStr for IntegrityBadge {
    type Err = UnknownIntegrityBadge;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "verified" => Ok(Self::Verified),
            "patient-uploaded" => Ok(Self::PatientUploaded),
            "low-quality" => Ok(Self::LowQuality),
            "unknown" => Ok(Self::Unknown),
            other => Err(UnknownIntegrityBadge(other.to_string())),
        }
    }
}

/// AI-extracted clinical data.
///
/// The column is written by an upstream extraction step with no schema, so
/// every field decodes leniently: scalars are accepted where text is
/// expected, `null` reads as empty, and map values keep whatever JSON the
/// extractor produced.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StructuredMedicalData {
    #[serde(deserialize_with = "lenient::text")]
    pub diagnosis: Option<String>,
    #[serde(deserialize_with = "lenient::list")]
    pub medications: Vec<String>,
    #[serde(deserialize_with = "lenient::map")]
    pub lab_values: BTreeMap<String, Value>,
    #[serde(deserialize_with = "lenient::map")]
    pub vitals: BTreeMap<String, Value>,
    #[serde(deserialize_with = "lenient::text")]
    pub doctor_notes: Option<String>,
    #[serde(deserialize_with = "lenient::list")]
    pub allergies: Vec<String>,
    #[serde(deserialize_with = "lenient::text")]
    pub doctor_name: Option<String>,
    #[serde(deserialize_with = "lenient::text")]
    pub record_type: Option<String>,
}

impl StructuredMedicalData {
    /// `None` when the stored value is null or not an object.
    #[must_use]
    pub fn from_json(value: Value) -> Option<Self> {
        match value {
            Value::Object(_) => serde_json::from_value(value).ok(),
            _ => None,
        }
    }
}

/// Upload keys that duplicate a dedicated column or feed internal
/// processing. They are stripped before metadata is disclosed.
const INTERNAL_METADATA_KEYS: [&str; 6] = [
    "embedding",
    "integrity",
    "ocrText",
    "structuredData",
    "summary",
    "tags",
];

/// Free-form upload metadata (report date, lab name, priority, ...).
///
/// Kept as a JSON object because uploaders choose the keys. Only objects are
/// accepted, and the keys in `INTERNAL_METADATA_KEYS` never survive.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct RecordMetadata(Map<String, Value>);

impl RecordMetadata {
    /// `None` when the stored value is null, not an object, or empty once
    /// internal keys are removed.
    #[must_use]
    pub fn from_json(value: Value) -> Option<Self> {
        let Value::Object(mut entries) = value else {
            return None;
        };

        for key in INTERNAL_METADATA_KEYS {
            entries.remove(key);
        }

        (!entries.is_empty()).then_some(Self(entries))
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    #[must_use]
    pub fn into_json(self) -> Value {
        Value::Object(self.0)
    }
}

/// The subset of a medical record that may be disclosed to a doctor.
///
/// OCR text, tags and embeddings stay behind.
#[derive(Debug, Clone, PartialEq)]
pub struct SharedRecord {
    pub uuid: MedicalRecordUuid,
    pub file_url: String,
    pub file_type: String,
    pub file_size: u64,
    pub encryption: EncryptionBundle,
    pub summary: String,
    pub metadata: Option<RecordMetadata>,
    pub integrity: IntegrityBadge,
    pub structured_data: Option<StructuredMedicalData>,
    pub created_at: Timestamp,
}

mod lenient {
    use std::collections::BTreeMap;

    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    pub(super) fn text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(scalar_text(Value::deserialize(deserializer)?))
    }

    /// A lone scalar reads as a one-item list.
    pub(super) fn list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match Value::deserialize(deserializer)? {
            Value::Array(items) => items.into_iter().filter_map(scalar_text).collect(),
            other => scalar_text(other).into_iter().collect(),
        })
    }

    pub(super) fn map<'de, D>(deserializer: D) -> Result<BTreeMap<String, Value>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match Value::deserialize(deserializer)? {
            Value::Object(entries) => entries
                .into_iter()
                .filter(|(_, value)| !value.is_null())
                .collect(),
            _ => BTreeMap::new(),
        })
    }

    fn scalar_text(value: Value) -> Option<String> {
        match value {
            Value::String(text) => Some(text),
            Value::Number(number) => Some(number.to_string()),
            Value::Bool(flag) => Some(flag.to_string()),
            Value::Null | Value::Array(_) | Value::Object(_) => None,
        }
    }
}
