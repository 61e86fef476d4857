//! 内置示例数据
//!
//! 患者与条目走和请求体相同的校验器，保证种子数据与 API 写入的数据形状一致

use anyhow::{anyhow, Context, Result};
use serde_json::Value;

use crate::diary::{parse_new_diary_entry, DiaryEntry};
use crate::health::{parse_new_entry, parse_new_patient, Diagnosis, Entry, Patient};

const DIAGNOSES_JSON: &str = include_str!("../data/diagnoses.json");
const PATIENTS_JSON: &str = include_str!("../data/patients.json");
const DIARIES_JSON: &str = include_str!("../data/diaries.json");

/// 已校验的种子数据
#[derive(Debug, Clone, Default)]
pub struct SeedData {
    pub diagnoses: Vec<Diagnosis>,
    pub patients: Vec<Patient>,
    pub diaries: Vec<DiaryEntry>,
}

impl SeedData {
    /// 编译进二进制的示例数据
    pub fn embedded() -> Result<Self> {
        Self::from_json(DIAGNOSES_JSON, PATIENTS_JSON, DIARIES_JSON)
    }

    /// 从三段 JSON 文本解析种子数据
    pub fn from_json(diagnoses: &str, patients: &str, diaries: &str) -> Result<Self> {
        let diagnoses: Vec<Diagnosis> =
            serde_json::from_str(diagnoses).context("诊断种子数据格式错误")?;

        let patients = parse_array(patients, "患者")?
            .iter()
            .map(parse_seed_patient)
            .collect::<Result<Vec<_>>>()?;

        let diaries = parse_array(diaries, "日记")?
            .iter()
            .map(parse_seed_diary)
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            diagnoses,
            patients,
            diaries,
        })
    }
}

fn parse_array(text: &str, what: &str) -> Result<Vec<Value>> {
    match serde_json::from_str(text).with_context(|| format!("{what}种子数据不是合法 JSON"))? {
        Value::Array(items) => Ok(items),
        _ => Err(anyhow!("{what}种子数据必须是数组")),
    }
}

fn seed_id(value: &Value) -> Result<String> {
    value
        .get("id")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| anyhow!("种子记录缺少字符串 id: {}", value))
}

fn parse_seed_patient(value: &Value) -> Result<Patient> {
    let id = seed_id(value)?;
    let mut patient = parse_new_patient(value)
        .with_context(|| format!("种子患者 {id} 校验失败"))?
        .with_id(id.as_str());

    if let Some(entries) = value.get("entries").and_then(Value::as_array) {
        patient.entries = entries
            .iter()
            .map(|entry| parse_seed_entry(&id, entry))
            .collect::<Result<Vec<_>>>()?;
    }

    Ok(patient)
}

fn parse_seed_entry(patient_id: &str, value: &Value) -> Result<Entry> {
    let id = seed_id(value)?;
    let entry = parse_new_entry(value)
        .with_context(|| format!("患者 {patient_id} 的种子条目 {id} 校验失败"))?;
    Ok(entry.with_id(id))
}

fn parse_seed_diary(value: &Value) -> Result<DiaryEntry> {
    let id = value
        .get("id")
        .and_then(Value::as_u64)
        .and_then(|id| u32::try_from(id).ok())
        .ok_or_else(|| anyhow!("种子日记缺少数字 id: {}", value))?;

    let entry = parse_new_diary_entry(value).with_context(|| format!("种子日记 {id} 校验失败"))?;
    Ok(entry.with_id(id))
}
