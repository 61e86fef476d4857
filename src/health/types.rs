use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::validation::ValidationError;

/// Patient gender
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
    Other,
}

impl Gender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Male => "male",
            Gender::Female => "female",
            Gender::Other => "other",
        }
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Gender {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "male" => Ok(Gender::Male),
            "female" => Ok(Gender::Female),
            "other" => Ok(Gender::Other),
            other => Err(ValidationError::InvalidGender(other.to_string())),
        }
    }
}

/// Row of the diagnosis lookup table
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, sqlx::FromRow)]
pub struct Diagnosis {
    pub code: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latin: Option<String>,
}

/// Outcome of a routine health check, 0 (healthy) to 3 (critical)
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(into = "u8", try_from = "u8")]
pub enum HealthCheckRating {
    Healthy = 0,
    LowRisk = 1,
    HighRisk = 2,
    CriticalRisk = 3,
}

impl From<HealthCheckRating> for u8 {
    fn from(rating: HealthCheckRating) -> Self {
        rating as u8
    }
}

impl TryFrom<u8> for HealthCheckRating {
    type Error = ValidationError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::try_from(i64::from(value))
    }
}

impl TryFrom<i64> for HealthCheckRating {
    type Error = ValidationError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(HealthCheckRating::Healthy),
            1 => Ok(HealthCheckRating::LowRisk),
            2 => Ok(HealthCheckRating::HighRisk),
            3 => Ok(HealthCheckRating::CriticalRisk),
            _ => Err(ValidationError::HealthCheckRatingOutOfRange),
        }
    }
}

/// Fields shared by every entry variant
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BaseEntry {
    pub description: String,
    pub date: String,
    pub specialist: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub diagnosis_codes: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct HealthCheckEntry {
    #[serde(flatten)]
    pub base: BaseEntry,
    pub health_check_rating: HealthCheckRating,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SickLeave {
    pub start_date: String,
    pub end_date: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct OccupationalHealthcareEntry {
    #[serde(flatten)]
    pub base: BaseEntry,
    pub employer_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sick_leave: Option<SickLeave>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Discharge {
    pub date: String,
    pub criteria: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HospitalEntry {
    #[serde(flatten)]
    pub base: BaseEntry,
    pub discharge: Discharge,
}

/// Entry body before an id is assigned, tagged by `type`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum NewEntry {
    HealthCheck(HealthCheckEntry),
    OccupationalHealthcare(OccupationalHealthcareEntry),
    Hospital(HospitalEntry),
}

impl NewEntry {
    pub fn base(&self) -> &BaseEntry {
        match self {
            NewEntry::HealthCheck(entry) => &entry.base,
            NewEntry::OccupationalHealthcare(entry) => &entry.base,
            NewEntry::Hospital(entry) => &entry.base,
        }
    }

    pub fn date(&self) -> &str {
        &self.base().date
    }

    pub fn diagnosis_codes(&self) -> &[String] {
        &self.base().diagnosis_codes
    }

    /// Wire name of the variant
    pub fn kind(&self) -> &'static str {
        match self {
            NewEntry::HealthCheck(_) => "HealthCheck",
            NewEntry::OccupationalHealthcare(_) => "OccupationalHealthcare",
            NewEntry::Hospital(_) => "Hospital",
        }
    }

    pub fn with_id(self, id: impl Into<String>) -> Entry {
        Entry {
            id: id.into(),
            body: self,
        }
    }
}

/// Entry attached to a patient
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Entry {
    pub id: String,
    #[serde(flatten)]
    pub body: NewEntry,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Patient {
    pub id: String,
    pub name: String,
    pub date_of_birth: String,
    pub ssn: String,
    pub gender: Gender,
    pub occupation: String,
    #[serde(default)]
    pub entries: Vec<Entry>,
}

/// Patient without `ssn` and `entries`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct NonSensitivePatient {
    pub id: String,
    pub name: String,
    pub date_of_birth: String,
    #[sqlx(try_from = "String")]
    pub gender: Gender,
    pub occupation: String,
}

/// Patient as submitted, before an id is assigned
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct NewPatient {
    pub name: String,
    pub date_of_birth: String,
    pub ssn: String,
    pub gender: Gender,
    pub occupation: String,
}

impl NewPatient {
    pub fn with_id(self, id: impl Into<String>) -> Patient {
        Patient {
            id: id.into(),
            name: self.name,
            date_of_birth: self.date_of_birth,
            ssn: self.ssn,
            gender: self.gender,
            occupation: self.occupation,
            entries: Vec::new(),
        }
    }
}

impl TryFrom<String> for Gender {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl Patient {
    pub fn non_sensitive(&self) -> NonSensitivePatient {
        NonSensitivePatient {
            id: self.id.clone(),
            name: self.name.clone(),
            date_of_birth: self.date_of_birth.clone(),
            gender: self.gender,
            occupation: self.occupation.clone(),
        }
    }
}
