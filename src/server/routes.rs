use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

use super::AppState;
use crate::calculators::{
    calculate_bmi, calculate_exercises, parse_number, BmiCategory, ExerciseResult,
};
use crate::diary::{parse_new_diary_entry, DiaryEntry, NonSensitiveDiaryEntry};
use crate::error::{ApiError, ApiResult};
use crate::health::{
    parse_new_entry, parse_new_patient, Diagnosis, Entry, NonSensitivePatient, Patient,
};

type SharedState = State<Arc<AppState>>;

/// 提取 JSON 请求体，解析失败统一转成 400
fn json_body(payload: Result<Json<Value>, JsonRejection>) -> ApiResult<Value> {
    payload
        .map(|Json(body)| body)
        .map_err(|e| ApiError::MalformedPayload(e.body_text()))
}

pub async fn ping() -> &'static str {
    "pong"
}

pub async fn hello() -> &'static str {
    "Hello Full Stack!"
}

#[derive(Debug, Deserialize)]
pub struct BmiQuery {
    height: Option<String>,
    weight: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct BmiResponse {
    weight: f64,
    height: f64,
    bmi: BmiCategory,
}

/// 空白参数视为缺失
fn non_blank(param: Option<String>) -> Option<String> {
    param.filter(|p| !p.trim().is_empty())
}

pub async fn bmi(
    query: Result<Query<BmiQuery>, QueryRejection>,
) -> ApiResult<Json<BmiResponse>> {
    let Query(query) = query.map_err(|e| {
        tracing::debug!("BMI 查询参数解析失败: {}", e.body_text());
        ApiError::BadRequest("malformatted parameters".to_string())
    })?;
    tracing::debug!(?query, "BMI 请求");

    let (Some(height), Some(weight)) = (non_blank(query.height), non_blank(query.weight)) else {
        return Err(ApiError::BadRequest(
            "height and weight are required".to_string(),
        ));
    };

    let height = parse_number(&height)?;
    let weight = parse_number(&weight)?;
    let bmi = calculate_bmi(height, weight)?;

    Ok(Json(BmiResponse {
        weight,
        height,
        bmi,
    }))
}

fn json_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => parse_number(s).ok(),
        _ => None,
    }
}

pub async fn exercises(
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Json<ExerciseResult>> {
    let body = json_body(payload)?;
    let malformatted = || ApiError::BadRequest("malformatted parameters".to_string());

    let (Some(daily), Some(target)) = (body.get("daily_exercises"), body.get("target")) else {
        return Err(ApiError::BadRequest("parameters missing".to_string()));
    };

    let target = json_number(target).ok_or_else(malformatted)?;
    let daily = daily
        .as_array()
        .ok_or_else(malformatted)?
        .iter()
        .map(json_number)
        .collect::<Option<Vec<f64>>>()
        .ok_or_else(malformatted)?;

    Ok(Json(calculate_exercises(&daily, target)?))
}

// 诊断

pub async fn list_diagnoses(State(state): SharedState) -> ApiResult<Json<Vec<Diagnosis>>> {
    Ok(Json(state.storage.list_diagnoses().await?))
}

pub async fn get_diagnosis(
    State(state): SharedState,
    Path(code): Path<String>,
) -> ApiResult<Json<Diagnosis>> {
    state
        .storage
        .get_diagnosis(&code)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Diagnosis", &code))
}

// 患者

pub async fn list_patients(
    State(state): SharedState,
) -> ApiResult<Json<Vec<NonSensitivePatient>>> {
    Ok(Json(state.storage.list_patients().await?))
}

pub async fn get_patient(
    State(state): SharedState,
    Path(id): Path<String>,
) -> ApiResult<Json<Patient>> {
    state
        .storage
        .get_patient(&id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Patient", &id))
}

pub async fn add_patient(
    State(state): SharedState,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Patient>)> {
    let body = json_body(payload)?;
    let new_patient = parse_new_patient(&body)?;
    let patient = state.storage.insert_patient(new_patient).await?;

    Ok((StatusCode::CREATED, Json(patient)))
}

pub async fn add_entry(
    State(state): SharedState,
    Path(id): Path<String>,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Entry>)> {
    if !state.storage.patient_exists(&id).await? {
        return Err(ApiError::not_found("Patient", &id));
    }

    let body = json_body(payload)?;
    let new_entry = parse_new_entry(&body)?;

    let unknown = state
        .storage
        .unknown_diagnosis_codes(new_entry.diagnosis_codes())
        .await?;
    if !unknown.is_empty() {
        return Err(ApiError::BadRequest(format!(
            "Unknown diagnosis codes: {}",
            unknown.join(", ")
        )));
    }

    let entry = state.storage.add_entry(&id, new_entry).await?;
    Ok((StatusCode::CREATED, Json(entry)))
}

// 飞行日记

pub async fn list_diaries(
    State(state): SharedState,
) -> ApiResult<Json<Vec<NonSensitiveDiaryEntry>>> {
    Ok(Json(state.storage.list_diaries().await?))
}

pub async fn get_diary(
    State(state): SharedState,
    id: Result<Path<u32>, PathRejection>,
) -> ApiResult<Json<DiaryEntry>> {
    let Path(id) = id.map_err(|_| ApiError::BadRequest("malformatted id".to_string()))?;

    state
        .storage
        .get_diary(id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Diary entry", &id.to_string()))
}

pub async fn add_diary(
    State(state): SharedState,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<DiaryEntry>)> {
    let body = json_body(payload)?;
    let new_entry = parse_new_diary_entry(&body)?;
    let entry = state.storage.add_diary(new_entry).await?;

    Ok((StatusCode::CREATED, Json(entry)))
}
