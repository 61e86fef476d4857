//! 请求体校验
//!
//! 所有入口（HTTP 请求体、种子数据）都先以 `serde_json::Value` 形式进入，
//! 再由这里的字段校验器逐个检查，遇到第一个错误立即返回。

use chrono::{DateTime, NaiveDate};
use serde_json::{Map, Value};
use thiserror::Error;

/// 校验错误，只描述第一个出错的字段
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// 请求体不是 JSON 对象
    #[error("Incorrect or missing data")]
    NotAnObject,

    /// 缺少 `type` 字段
    #[error("Missing entry type")]
    MissingEntryType,

    /// 未知的条目类型
    #[error("Incorrect entry type: {0}")]
    UnknownEntryType(String),

    /// 必填字符串缺失、为空或类型错误
    #[error("Incorrect or missing {0}")]
    MissingField(&'static str),

    /// 日期缺失或无法解析
    #[error("Incorrect or missing date: {0}")]
    InvalidDate(String),

    /// 性别取值非法
    #[error("Invalid gender: {0}")]
    InvalidGender(String),

    /// 健康检查评级缺失或不是整数
    #[error("Incorrect or missing healthCheckRating")]
    MissingHealthCheckRating,

    /// 健康检查评级越界
    #[error("healthCheckRating must be between 0 and 3")]
    HealthCheckRatingOutOfRange,

    /// 诊断代码不是字符串数组
    #[error("Incorrect diagnosisCodes: expected an array of strings")]
    InvalidDiagnosisCodes,

    /// 枚举字段取值非法
    #[error("Incorrect or missing {field}: {value}")]
    InvalidValue { field: &'static str, value: String },

    /// 病假结束日期早于开始日期
    #[error("Sick leave cannot end before it starts")]
    SickLeaveOrder,
}

pub type ValidationResult<T> = Result<T, ValidationError>;

/// 要求输入是 JSON 对象
pub fn require_object(value: &Value) -> ValidationResult<&Map<String, Value>> {
    value.as_object().ok_or(ValidationError::NotAnObject)
}

/// 把任意字段值描述成错误信息里可读的文本
pub fn describe(value: Option<&Value>) -> String {
    match value {
        None => "undefined".to_string(),
        Some(Value::Null) => "null".to_string(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

/// 必填且非空的字符串字段
pub fn parse_string(
    object: &Map<String, Value>,
    field: &'static str,
) -> ValidationResult<String> {
    match object.get(field) {
        Some(Value::String(s)) if !s.trim().is_empty() => Ok(s.clone()),
        _ => Err(ValidationError::MissingField(field)),
    }
}

/// 可选字符串字段；出现时必须是字符串
pub fn parse_optional_string(
    object: &Map<String, Value>,
    field: &'static str,
) -> ValidationResult<Option<String>> {
    match object.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(_) => Err(ValidationError::MissingField(field)),
    }
}

/// 日期字段：`YYYY-MM-DD` 或 RFC 3339 时间戳，原样保留
pub fn parse_date(value: Option<&Value>) -> ValidationResult<String> {
    match value {
        Some(Value::String(s)) if is_date(s) => Ok(s.clone()),
        other => Err(ValidationError::InvalidDate(describe(other))),
    }
}

fn is_date(text: &str) -> bool {
    let text = text.trim();
    NaiveDate::parse_from_str(text, "%Y-%m-%d").is_ok()
        || DateTime::parse_from_rfc3339(text).is_ok()
}

/// 日期字符串转换成日历日期，用于比较先后
pub fn calendar_date(text: &str) -> Option<NaiveDate> {
    let text = text.trim();
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(text).ok().map(|dt| dt.date_naive()))
}

/// 枚举字段：取值必须能被 `parse` 接受
pub fn parse_enum<T>(
    object: &Map<String, Value>,
    field: &'static str,
    parse: impl Fn(&str) -> Option<T>,
) -> ValidationResult<T> {
    let value = object.get(field);
    value
        .and_then(Value::as_str)
        .and_then(parse)
        .ok_or_else(|| ValidationError::InvalidValue {
            field,
            value: describe(value),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_string_rejects_blank_and_non_strings() {
        let object = json!({"a": "x", "b": "  ", "c": 3});
        let object = object.as_object().unwrap();

        assert_eq!(parse_string(object, "a"), Ok("x".to_string()));
        assert_eq!(
            parse_string(object, "b"),
            Err(ValidationError::MissingField("b"))
        );
        assert_eq!(
            parse_string(object, "c"),
            Err(ValidationError::MissingField("c"))
        );
        assert_eq!(
            parse_string(object, "d"),
            Err(ValidationError::MissingField("d"))
        );
    }

    #[test]
    fn test_parse_date_formats() {
        assert!(parse_date(Some(&json!("2019-10-20"))).is_ok());
        assert!(parse_date(Some(&json!("2019-10-20T08:00:00Z"))).is_ok());

        let err = parse_date(Some(&json!("yesterday"))).unwrap_err();
        assert_eq!(err.to_string(), "Incorrect or missing date: yesterday");

        let err = parse_date(None).unwrap_err();
        assert_eq!(err.to_string(), "Incorrect or missing date: undefined");

        let err = parse_date(Some(&Value::Null)).unwrap_err();
        assert_eq!(err.to_string(), "Incorrect or missing date: null");

        assert!(parse_date(Some(&json!("2019-02-30"))).is_err());
    }

    #[test]
    fn test_calendar_date_ignores_time_of_day() {
        assert_eq!(
            calendar_date("2020-01-02T23:59:00+00:00"),
            NaiveDate::from_ymd_opt(2020, 1, 2)
        );
        assert_eq!(calendar_date("nope"), None);
    }

    #[test]
    fn test_optional_string() {
        let object = json!({"comment": null, "other": 1});
        let object = object.as_object().unwrap();
        assert_eq!(parse_optional_string(object, "comment"), Ok(None));
        assert_eq!(parse_optional_string(object, "missing"), Ok(None));
        assert!(parse_optional_string(object, "other").is_err());
    }
}
