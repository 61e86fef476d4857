//! Flight diary: weather and visibility notes per flight.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

use crate::validation::{
    parse_date, parse_enum, parse_optional_string, require_object, ValidationError,
    ValidationResult,
};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Weather {
    Sunny,
    Rainy,
    Cloudy,
    Stormy,
    Windy,
}

impl Weather {
    pub const ALL: [Weather; 5] = [
        Weather::Sunny,
        Weather::Rainy,
        Weather::Cloudy,
        Weather::Stormy,
        Weather::Windy,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Weather::Sunny => "sunny",
            Weather::Rainy => "rainy",
            Weather::Cloudy => "cloudy",
            Weather::Stormy => "stormy",
            Weather::Windy => "windy",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Great,
    Good,
    Ok,
    Poor,
}

impl Visibility {
    pub const ALL: [Visibility; 4] = [
        Visibility::Great,
        Visibility::Good,
        Visibility::Ok,
        Visibility::Poor,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Visibility::Great => "great",
            Visibility::Good => "good",
            Visibility::Ok => "ok",
            Visibility::Poor => "poor",
        }
    }
}

impl fmt::Display for Weather {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Weather {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Weather::ALL
            .into_iter()
            .find(|w| w.as_str() == s)
            .ok_or_else(|| ValidationError::InvalidValue {
                field: "weather",
                value: s.to_string(),
            })
    }
}

impl FromStr for Visibility {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Visibility::ALL
            .into_iter()
            .find(|v| v.as_str() == s)
            .ok_or_else(|| ValidationError::InvalidValue {
                field: "visibility",
                value: s.to_string(),
            })
    }
}

impl TryFrom<String> for Weather {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl TryFrom<String> for Visibility {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, sqlx::FromRow)]
pub struct DiaryEntry {
    #[sqlx(try_from = "i64")]
    pub id: u32,
    pub date: String,
    #[sqlx(try_from = "String")]
    pub weather: Weather,
    #[sqlx(try_from = "String")]
    pub visibility: Visibility,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

/// Diary entry without the free-text comment
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, sqlx::FromRow)]
pub struct NonSensitiveDiaryEntry {
    #[sqlx(try_from = "i64")]
    pub id: u32,
    pub date: String,
    #[sqlx(try_from = "String")]
    pub weather: Weather,
    #[sqlx(try_from = "String")]
    pub visibility: Visibility,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewDiaryEntry {
    pub date: String,
    pub weather: Weather,
    pub visibility: Visibility,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

impl NewDiaryEntry {
    pub fn with_id(self, id: u32) -> DiaryEntry {
        DiaryEntry {
            id,
            date: self.date,
            weather: self.weather,
            visibility: self.visibility,
            comment: self.comment,
        }
    }
}

impl DiaryEntry {
    pub fn non_sensitive(&self) -> NonSensitiveDiaryEntry {
        NonSensitiveDiaryEntry {
            id: self.id,
            date: self.date.clone(),
            weather: self.weather,
            visibility: self.visibility,
        }
    }
}

/// Checks `date`, `weather` and `visibility` in that order; `comment` is optional
pub fn parse_new_diary_entry(value: &Value) -> ValidationResult<NewDiaryEntry> {
    let object = require_object(value)?;

    Ok(NewDiaryEntry {
        date: parse_date(object.get("date"))?,
        weather: parse_enum(object, "weather", |s| s.parse().ok())?,
        visibility: parse_enum(object, "visibility", |s| s.parse().ok())?,
        comment: parse_optional_string(object, "comment")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_diary_entry() {
        let entry = parse_new_diary_entry(&json!({
            "date": "2017-04-01",
            "weather": "sunny",
            "visibility": "good",
            "comment": "Everything went better than expected, I'm learning much"
        }))
        .unwrap();

        assert_eq!(entry.weather, Weather::Sunny);
        assert_eq!(entry.visibility, Visibility::Good);
        assert!(entry.comment.is_some());
    }

    #[test]
    fn test_parse_diary_entry_errors_in_order() {
        let err = parse_new_diary_entry(&json!({
            "date": "someday",
            "weather": "foggy"
        }))
        .unwrap_err();
        assert_eq!(err.to_string(), "Incorrect or missing date: someday");

        let err = parse_new_diary_entry(&json!({
            "date": "2017-01-01",
            "weather": "foggy"
        }))
        .unwrap_err();
        assert_eq!(err.to_string(), "Incorrect or missing weather: foggy");

        let err = parse_new_diary_entry(&json!({
            "date": "2017-01-01",
            "weather": "rainy"
        }))
        .unwrap_err();
        assert_eq!(err.to_string(), "Incorrect or missing visibility: undefined");
    }

    #[test]
    fn test_non_sensitive_hides_comment() {
        let entry = NewDiaryEntry {
            date: "2017-01-01".to_string(),
            weather: Weather::Rainy,
            visibility: Visibility::Poor,
            comment: Some("Pretty scary flight, I'm glad I'm alive".to_string()),
        }
        .with_id(1);

        let value = serde_json::to_value(entry.non_sensitive()).unwrap();
        assert_eq!(
            value,
            json!({"id": 1, "date": "2017-01-01", "weather": "rainy", "visibility": "poor"})
        );
    }
}
