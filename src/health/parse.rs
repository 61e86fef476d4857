//! Parsing of untyped request bodies into patients and entries.
//!
//! Each parser walks its fields in a fixed order and stops at the first
//! missing or malformed one.

use serde_json::{Map, Value};

use super::types::{
    BaseEntry, Discharge, Gender, HealthCheckEntry, HealthCheckRating, HospitalEntry,
    NewEntry, NewPatient, OccupationalHealthcareEntry, SickLeave,
};
use crate::validation::{
    calendar_date, describe, parse_date, parse_string, require_object, ValidationError,
    ValidationResult,
};

/// Parse a new entry, dispatching on its `type` tag
pub fn parse_new_entry(value: &Value) -> ValidationResult<NewEntry> {
    let object = require_object(value)?;
    let kind = object.get("type").ok_or(ValidationError::MissingEntryType)?;

    match kind.as_str() {
        Some("HealthCheck") => {
            let base = parse_base_entry(object)?;
            let health_check_rating = parse_health_check_rating(object.get("healthCheckRating"))?;
            Ok(NewEntry::HealthCheck(HealthCheckEntry {
                base,
                health_check_rating,
            }))
        }
        Some("OccupationalHealthcare") => {
            let base = parse_base_entry(object)?;
            let employer_name = parse_string(object, "employerName")?;
            let sick_leave = parse_sick_leave(object)?;
            Ok(NewEntry::OccupationalHealthcare(OccupationalHealthcareEntry {
                base,
                employer_name,
                sick_leave,
            }))
        }
        Some("Hospital") => {
            let base = parse_base_entry(object)?;
            let discharge = parse_discharge(object.get("discharge"))?;
            Ok(NewEntry::Hospital(HospitalEntry { base, discharge }))
        }
        _ => Err(ValidationError::UnknownEntryType(describe(Some(kind)))),
    }
}

/// Parse a new patient; `id` and `entries` are ignored if present
pub fn parse_new_patient(value: &Value) -> ValidationResult<NewPatient> {
    let object = require_object(value)?;

    Ok(NewPatient {
        name: parse_string(object, "name")?,
        date_of_birth: parse_date(object.get("dateOfBirth"))?,
        ssn: parse_string(object, "ssn")?,
        gender: parse_gender(object.get("gender"))?,
        occupation: parse_string(object, "occupation")?,
    })
}

pub fn parse_gender(value: Option<&Value>) -> ValidationResult<Gender> {
    match value {
        Some(Value::String(s)) => s.parse(),
        other => Err(ValidationError::InvalidGender(describe(other))),
    }
}

fn parse_base_entry(object: &Map<String, Value>) -> ValidationResult<BaseEntry> {
    Ok(BaseEntry {
        description: parse_string(object, "description")?,
        date: parse_date(object.get("date"))?,
        specialist: parse_string(object, "specialist")?,
        diagnosis_codes: parse_diagnosis_codes(object.get("diagnosisCodes"))?,
    })
}

fn parse_diagnosis_codes(value: Option<&Value>) -> ValidationResult<Vec<String>> {
    match value {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| {
                item.as_str()
                    .map(str::to_string)
                    .ok_or(ValidationError::InvalidDiagnosisCodes)
            })
            .collect(),
        Some(_) => Err(ValidationError::InvalidDiagnosisCodes),
    }
}

/// Numbers and numeric strings are accepted; the value must be a whole number in 0..=3
fn parse_health_check_rating(value: Option<&Value>) -> ValidationResult<HealthCheckRating> {
    let number = match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) if !s.trim().is_empty() => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|n| n.is_finite() && n.fract() == 0.0)
    .ok_or(ValidationError::MissingHealthCheckRating)?;

    if !(0.0..=3.0).contains(&number) {
        return Err(ValidationError::HealthCheckRatingOutOfRange);
    }

    HealthCheckRating::try_from(number as i64)
}

/// Sick leave may arrive nested (`sickLeave`) or flat (`sickLeaveStartDate`/`sickLeaveEndDate`)
fn parse_sick_leave(object: &Map<String, Value>) -> ValidationResult<Option<SickLeave>> {
    let present = |v: Option<&Value>| !matches!(v, None | Some(Value::Null));

    let (start, end) = match object.get("sickLeave") {
        Some(Value::Object(nested)) => (nested.get("startDate"), nested.get("endDate")),
        Some(Value::Null) | None => (
            object.get("sickLeaveStartDate"),
            object.get("sickLeaveEndDate"),
        ),
        Some(_) => return Err(ValidationError::MissingField("sickLeave")),
    };

    if !present(start) && !present(end) {
        return Ok(None);
    }

    let start_date = parse_date(start)?;
    let end_date = parse_date(end)?;

    if let (Some(s), Some(e)) = (calendar_date(&start_date), calendar_date(&end_date)) {
        if e < s {
            return Err(ValidationError::SickLeaveOrder);
        }
    }

    Ok(Some(SickLeave {
        start_date,
        end_date,
    }))
}

fn parse_discharge(value: Option<&Value>) -> ValidationResult<Discharge> {
    let object = match value {
        Some(Value::Object(object)) => object,
        _ => return Err(ValidationError::MissingField("discharge")),
    };

    Ok(Discharge {
        date: parse_date(object.get("date"))?,
        criteria: parse_string(object, "criteria")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn health_check() -> Value {
        json!({
            "type": "HealthCheck",
            "description": "Yearly control visit. Cholesterol levels back to normal.",
            "date": "2019-10-20",
            "specialist": "MD House",
            "healthCheckRating": 0
        })
    }

    #[test]
    fn test_health_check_entry() {
        let entry = parse_new_entry(&health_check()).unwrap();
        match entry {
            NewEntry::HealthCheck(e) => {
                assert_eq!(e.health_check_rating, HealthCheckRating::Healthy);
                assert_eq!(e.base.specialist, "MD House");
                assert!(e.base.diagnosis_codes.is_empty());
            }
            other => panic!("unexpected variant: {other:?}"),
        }
    }

    #[test]
    fn test_rating_accepts_numeric_string() {
        let mut value = health_check();
        value["healthCheckRating"] = json!("2");
        let entry = parse_new_entry(&value).unwrap();
        assert!(matches!(
            entry,
            NewEntry::HealthCheck(HealthCheckEntry {
                health_check_rating: HealthCheckRating::HighRisk,
                ..
            })
        ));
    }

    #[test]
    fn test_rating_errors() {
        let mut value = health_check();
        value["healthCheckRating"] = json!(4);
        assert_eq!(
            parse_new_entry(&value),
            Err(ValidationError::HealthCheckRatingOutOfRange)
        );

        value["healthCheckRating"] = json!(-1);
        assert_eq!(
            parse_new_entry(&value),
            Err(ValidationError::HealthCheckRatingOutOfRange)
        );

        value["healthCheckRating"] = json!("high");
        assert_eq!(
            parse_new_entry(&value),
            Err(ValidationError::MissingHealthCheckRating)
        );

        value["healthCheckRating"] = json!(1.5);
        assert_eq!(
            parse_new_entry(&value),
            Err(ValidationError::MissingHealthCheckRating)
        );

        value.as_object_mut().unwrap().remove("healthCheckRating");
        assert_eq!(
            parse_new_entry(&value),
            Err(ValidationError::MissingHealthCheckRating)
        );
    }

    #[test]
    fn test_missing_or_unknown_type() {
        assert_eq!(
            parse_new_entry(&json!("HealthCheck")),
            Err(ValidationError::NotAnObject)
        );
        assert_eq!(
            parse_new_entry(&json!({"description": "x"})),
            Err(ValidationError::MissingEntryType)
        );

        let err = parse_new_entry(&json!({"type": "Dental"})).unwrap_err();
        assert_eq!(err.to_string(), "Incorrect entry type: Dental");

        let err = parse_new_entry(&json!({"type": null})).unwrap_err();
        assert_eq!(err.to_string(), "Incorrect entry type: null");
    }

    #[test]
    fn test_first_error_wins() {
        let value = json!({
            "type": "Hospital",
            "date": "not a date",
            "specialist": ""
        });
        assert_eq!(
            parse_new_entry(&value),
            Err(ValidationError::MissingField("description"))
        );

        let value = json!({
            "type": "Hospital",
            "description": "Broken thumb",
            "date": "not a date",
            "specialist": ""
        });
        assert_eq!(
            parse_new_entry(&value).unwrap_err().to_string(),
            "Incorrect or missing date: not a date"
        );
    }

    #[test]
    fn test_hospital_entry_requires_discharge() {
        let mut value = json!({
            "type": "Hospital",
            "description": "Healing time appr. 2 weeks.",
            "date": "2015-01-02",
            "specialist": "MD House",
            "diagnosisCodes": ["S62.5"]
        });
        assert_eq!(
            parse_new_entry(&value),
            Err(ValidationError::MissingField("discharge"))
        );

        value["discharge"] = json!({"date": "2015-01-16", "criteria": ""});
        assert_eq!(
            parse_new_entry(&value),
            Err(ValidationError::MissingField("criteria"))
        );

        value["discharge"] = json!({"date": "2015-01-16", "criteria": "Thumb has healed."});
        let entry = parse_new_entry(&value).unwrap();
        assert_eq!(entry.diagnosis_codes(), ["S62.5".to_string()]);
        match entry {
            NewEntry::Hospital(e) => assert_eq!(e.discharge.date, "2015-01-16"),
            other => panic!("unexpected variant: {other:?}"),
        }
    }

    #[test]
    fn test_occupational_sick_leave_shapes() {
        let flat = json!({
            "type": "OccupationalHealthcare",
            "description": "Prescriptions renewed.",
            "date": "2019-08-05",
            "specialist": "MD House",
            "employerName": "HyPD",
            "sickLeaveStartDate": "2019-08-05",
            "sickLeaveEndDate": "2019-08-28"
        });
        let nested = json!({
            "type": "OccupationalHealthcare",
            "description": "Prescriptions renewed.",
            "date": "2019-08-05",
            "specialist": "MD House",
            "employerName": "HyPD",
            "sickLeave": {"startDate": "2019-08-05", "endDate": "2019-08-28"}
        });

        let a = parse_new_entry(&flat).unwrap();
        let b = parse_new_entry(&nested).unwrap();
        assert_eq!(a, b);

        let mut half = flat.clone();
        half.as_object_mut().unwrap().remove("sickLeaveEndDate");
        assert_eq!(
            parse_new_entry(&half).unwrap_err().to_string(),
            "Incorrect or missing date: undefined"
        );

        let mut backwards = nested.clone();
        backwards["sickLeave"]["endDate"] = json!("2019-08-01");
        assert_eq!(
            parse_new_entry(&backwards),
            Err(ValidationError::SickLeaveOrder)
        );

        let mut none = nested;
        none.as_object_mut().unwrap().remove("sickLeave");
        match parse_new_entry(&none).unwrap() {
            NewEntry::OccupationalHealthcare(e) => assert!(e.sick_leave.is_none()),
            other => panic!("unexpected variant: {other:?}"),
        }
    }

    #[test]
    fn test_occupational_requires_employer() {
        let value = json!({
            "type": "OccupationalHealthcare",
            "description": "Checkup",
            "date": "2019-08-05",
            "specialist": "MD House"
        });
        assert_eq!(
            parse_new_entry(&value),
            Err(ValidationError::MissingField("employerName"))
        );
    }

    #[test]
    fn test_diagnosis_codes_must_be_strings() {
        let mut value = health_check();
        value["diagnosisCodes"] = json!(["M24.2", 3]);
        assert_eq!(
            parse_new_entry(&value),
            Err(ValidationError::InvalidDiagnosisCodes)
        );

        value["diagnosisCodes"] = json!("M24.2");
        assert_eq!(
            parse_new_entry(&value),
            Err(ValidationError::InvalidDiagnosisCodes)
        );

        value["diagnosisCodes"] = Value::Null;
        assert!(parse_new_entry(&value).is_ok());
    }

    #[test]
    fn test_variant_fields_do_not_leak() {
        let mut value = health_check();
        value["employerName"] = json!("HyPD");
        value["discharge"] = json!({"date": "2019-10-21", "criteria": "ok"});

        let serialized = serde_json::to_value(parse_new_entry(&value).unwrap()).unwrap();
        assert!(serialized.get("employerName").is_none());
        assert!(serialized.get("discharge").is_none());
    }

    #[test]
    fn test_new_patient() {
        let value = json!({
            "name": "Hans Gruber",
            "dateOfBirth": "1970-04-25",
            "ssn": "250470-555L",
            "gender": "male",
            "occupation": "Technician"
        });
        let patient = parse_new_patient(&value).unwrap();
        assert_eq!(patient.gender, Gender::Male);

        let mut bad = value.clone();
        bad["gender"] = json!("robot");
        assert_eq!(
            parse_new_patient(&bad).unwrap_err().to_string(),
            "Invalid gender: robot"
        );

        let mut bad = value;
        bad["dateOfBirth"] = json!(1970);
        assert_eq!(
            parse_new_patient(&bad),
            Err(ValidationError::InvalidDate("1970".to_string()))
        );
    }

    #[test]
    fn test_new_patient_reports_fields_in_order() {
        let full = json!({
            "name": "Hans Gruber",
            "dateOfBirth": "1970-04-25",
            "ssn": "250470-555L",
            "gender": "male",
            "occupation": "Technician"
        });

        let mut value = full.clone();
        let object = value.as_object_mut().unwrap();
        object.remove("name");
        object.remove("ssn");
        assert_eq!(
            parse_new_patient(&value),
            Err(ValidationError::MissingField("name"))
        );

        let mut value = full.clone();
        value["dateOfBirth"] = json!("soon");
        value["gender"] = json!("robot");
        value["occupation"] = json!("");
        assert_eq!(
            parse_new_patient(&value),
            Err(ValidationError::InvalidDate("soon".to_string()))
        );

        let mut value = full.clone();
        value["gender"] = json!(null);
        value["occupation"] = json!("");
        assert_eq!(
            parse_new_patient(&value),
            Err(ValidationError::InvalidGender("null".to_string()))
        );

        let mut value = full;
        value.as_object_mut().unwrap().remove("occupation");
        assert_eq!(
            parse_new_patient(&value),
            Err(ValidationError::MissingField("occupation"))
        );
    }

    #[test]
    fn test_never_panics_on_odd_input() {
        let inputs = [
            json!(null),
            json!([]),
            json!({"type": null}),
            json!({"type": "Hospital", "discharge": []}),
            json!({"type": "OccupationalHealthcare", "sickLeave": 5}),
            json!({"type": "HealthCheck", "healthCheckRating": {"a": 1}}),
        ];
        for input in &inputs {
            assert!(parse_new_entry(input).is_err());
        }
    }
}
