//! Patient registry domain: patients, diagnoses and the three entry shapes.

pub mod parse;
pub mod types;

pub use parse::{parse_gender, parse_new_entry, parse_new_patient};
pub use types::{
    BaseEntry, Diagnosis, Discharge, Entry, Gender, HealthCheckEntry, HealthCheckRating,
    HospitalEntry, NewEntry, NewPatient, NonSensitivePatient, OccupationalHealthcareEntry,
    Patient, SickLeave,
};
