//! 存储模块
//!
//! 基于 SQLite 的存储；默认使用内存数据库，配置文件 URL 时持久化到磁盘

use anyhow::{anyhow, Result};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    types::Json,
    SqliteConnection, SqlitePool,
};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use uuid::Uuid;

use crate::config::DatabaseConfig;
use crate::diary::{DiaryEntry, NewDiaryEntry, NonSensitiveDiaryEntry};
use crate::health::{Diagnosis, Entry, Gender, NewEntry, NewPatient, NonSensitivePatient, Patient};
use crate::seed::SeedData;

/// 患者行（不含条目）
#[derive(Debug, sqlx::FromRow)]
struct PatientRow {
    id: String,
    name: String,
    date_of_birth: String,
    ssn: String,
    #[sqlx(try_from = "String")]
    gender: Gender,
    occupation: String,
}

/// 条目行，内容为 JSON
#[derive(Debug, sqlx::FromRow)]
struct EntryRow {
    id: String,
    body: Json<NewEntry>,
}

/// 种子写入结果
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SeedReport {
    pub diagnoses: usize,
    pub patients: usize,
    pub entries: usize,
    pub diaries: usize,
}

/// 存储管理器
pub struct Storage {
    pool: SqlitePool,
}

/// URL 是否指向内存数据库
fn is_memory_url(url: &str) -> bool {
    url.contains(":memory:") || url.contains("mode=memory")
}

impl Storage {
    /// 使用默认连接参数创建存储实例
    pub async fn new(database_url: &str) -> Result<Self> {
        Self::connect(&DatabaseConfig {
            url: database_url.to_string(),
            ..DatabaseConfig::default()
        })
        .await
    }

    /// 内存数据库，主要用于测试
    pub async fn in_memory() -> Result<Self> {
        Self::new("sqlite::memory:").await
    }

    /// 根据数据库配置创建存储实例
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        tracing::info!("正在初始化存储层...");

        let in_memory = is_memory_url(&config.url);

        // 确保数据库目录存在
        if !in_memory {
            let file = config
                .url
                .trim_start_matches("sqlite://")
                .trim_start_matches("sqlite:");
            let file = file.split('?').next().unwrap_or(file);
            if let Some(parent) = Path::new(file).parent() {
                if !parent.exists() && !parent.as_os_str().is_empty() {
                    tracing::debug!("创建数据库目录: {:?}", parent);
                    std::fs::create_dir_all(parent)?;
                }
            }
        }

        tracing::info!("正在连接数据库: {}", config.url);

        let options = SqliteConnectOptions::from_str(&config.url)
            .map_err(|e| anyhow!("无效的数据库 URL {}: {}", config.url, e))?
            .create_if_missing(true)
            .foreign_keys(true);

        let pool_options =
            SqlitePoolOptions::new().acquire_timeout(Duration::from_secs(config.connect_timeout));

        // 内存数据库只存在于单个连接内，连接池必须固定为一个且永不回收
        let pool_options = if in_memory {
            pool_options
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            pool_options
                .max_connections(config.max_connections.max(1))
                .min_connections(1)
                .idle_timeout(Duration::from_secs(60))
                .max_lifetime(Duration::from_secs(1800))
        };

        let pool = pool_options
            .connect_with(options)
            .await
            .map_err(|e| anyhow!("无法连接到数据库: {}", e))?;

        if !in_memory {
            tracing::debug!("设置 SQLite 优化参数");
            sqlx::query("PRAGMA journal_mode = WAL")
                .execute(&pool)
                .await?;
            sqlx::query("PRAGMA synchronous = NORMAL")
                .execute(&pool)
                .await?;
            sqlx::query("PRAGMA busy_timeout = 5000")
                .execute(&pool)
                .await?;
        }

        tracing::info!("正在运行数据库迁移...");

        let migrate_result = tokio::time::timeout(
            Duration::from_secs(10),
            sqlx::migrate!("./migrations").run(&pool),
        )
        .await;

        match migrate_result {
            Ok(Ok(_)) => {
                tracing::info!("数据库迁移完成");
            }
            Ok(Err(e)) => {
                return Err(anyhow!("数据库迁移失败: {}", e));
            }
            Err(_) => {
                return Err(anyhow!("数据库迁移超时（10秒）"));
            }
        }

        tracing::info!("存储层初始化完成");
        Ok(Self { pool })
    }

    // 诊断代码

    /// 列出所有诊断
    pub async fn list_diagnoses(&self) -> Result<Vec<Diagnosis>> {
        let query = "SELECT code, name, latin FROM diagnoses ORDER BY code";

        let result = sqlx::query_as::<_, Diagnosis>(query)
            .fetch_all(&self.pool)
            .await?;

        Ok(result)
    }

    /// 按代码查询诊断
    pub async fn get_diagnosis(&self, code: &str) -> Result<Option<Diagnosis>> {
        let query = "SELECT code, name, latin FROM diagnoses WHERE code = ?1";

        let result = sqlx::query_as::<_, Diagnosis>(query)
            .bind(code)
            .fetch_optional(&self.pool)
            .await?;

        Ok(result)
    }

    /// 新增或覆盖诊断
    pub async fn insert_diagnosis(&self, diagnosis: &Diagnosis) -> Result<()> {
        let mut conn = self.pool.acquire().await?;
        insert_diagnosis_row(&mut *conn, diagnosis).await
    }

    /// 返回表中不存在的诊断代码（保持输入顺序，去重）
    pub async fn unknown_diagnosis_codes(&self, codes: &[String]) -> Result<Vec<String>> {
        let mut unknown: Vec<String> = Vec::new();

        for code in codes {
            if unknown.contains(code) {
                continue;
            }
            let found = sqlx::query_scalar::<_, i64>("SELECT 1 FROM diagnoses WHERE code = ?1")
                .bind(code)
                .fetch_optional(&self.pool)
                .await?;
            if found.is_none() {
                unknown.push(code.clone());
            }
        }

        Ok(unknown)
    }

    // 患者

    /// 列出所有患者（不含 ssn 与条目）
    pub async fn list_patients(&self) -> Result<Vec<NonSensitivePatient>> {
        let query = r#"
            SELECT id, name, date_of_birth, gender, occupation
            FROM patients
            ORDER BY seq
        "#;

        let result = sqlx::query_as::<_, NonSensitivePatient>(query)
            .fetch_all(&self.pool)
            .await?;

        Ok(result)
    }

    /// 获取完整的患者记录，条目按写入顺序排列
    pub async fn get_patient(&self, id: &str) -> Result<Option<Patient>> {
        let query = r#"
            SELECT id, name, date_of_birth, ssn, gender, occupation
            FROM patients
            WHERE id = ?1
        "#;

        let row = sqlx::query_as::<_, PatientRow>(query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let entries = sqlx::query_as::<_, EntryRow>(
            "SELECT id, body FROM entries WHERE patient_id = ?1 ORDER BY seq",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(|entry| entry.body.0.with_id(entry.id))
        .collect();

        Ok(Some(Patient {
            id: row.id,
            name: row.name,
            date_of_birth: row.date_of_birth,
            ssn: row.ssn,
            gender: row.gender,
            occupation: row.occupation,
            entries,
        }))
    }

    /// 患者是否存在
    pub async fn patient_exists(&self, id: &str) -> Result<bool> {
        let found = sqlx::query_scalar::<_, i64>("SELECT 1 FROM patients WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(found.is_some())
    }

    /// 新增患者，分配 UUID
    pub async fn insert_patient(&self, new_patient: NewPatient) -> Result<Patient> {
        let patient = new_patient.with_id(Uuid::new_v4().to_string());

        let mut conn = self.pool.acquire().await?;
        insert_patient_row(&mut *conn, &patient).await?;

        tracing::info!("新增患者: {} ({})", patient.name, patient.id);
        Ok(patient)
    }

    /// 为患者追加条目，分配 UUID
    pub async fn add_entry(&self, patient_id: &str, new_entry: NewEntry) -> Result<Entry> {
        let entry = new_entry.with_id(Uuid::new_v4().to_string());

        let mut conn = self.pool.acquire().await?;
        insert_entry_row(&mut *conn, patient_id, &entry).await?;

        tracing::info!(
            "患者 {} 新增条目 {} ({}, {})",
            patient_id,
            entry.id,
            entry.body.kind(),
            entry.body.date()
        );
        Ok(entry)
    }

    // 飞行日记

    /// 列出所有日记（不含备注）
    pub async fn list_diaries(&self) -> Result<Vec<NonSensitiveDiaryEntry>> {
        let query = "SELECT id, date, weather, visibility FROM diaries ORDER BY id";

        let result = sqlx::query_as::<_, NonSensitiveDiaryEntry>(query)
            .fetch_all(&self.pool)
            .await?;

        Ok(result)
    }

    /// 按编号获取日记
    pub async fn get_diary(&self, id: u32) -> Result<Option<DiaryEntry>> {
        let query = "SELECT id, date, weather, visibility, comment FROM diaries WHERE id = ?1";

        let result = sqlx::query_as::<_, DiaryEntry>(query)
            .bind(i64::from(id))
            .fetch_optional(&self.pool)
            .await?;

        Ok(result)
    }

    /// 新增日记，编号为当前最大编号加一
    pub async fn add_diary(&self, new_entry: NewDiaryEntry) -> Result<DiaryEntry> {
        let mut tx = self.pool.begin().await?;

        let next: i64 = sqlx::query_scalar("SELECT COALESCE(MAX(id), 0) + 1 FROM diaries")
            .fetch_one(&mut *tx)
            .await?;
        let id = u32::try_from(next).map_err(|_| anyhow!("日记编号溢出: {}", next))?;

        let entry = new_entry.with_id(id);
        insert_diary_row(&mut *tx, &entry).await?;
        tx.commit().await?;

        tracing::info!("新增飞行日记 {} ({})", entry.id, entry.date);
        Ok(entry)
    }

    /// 写入种子数据；每张表只在为空时写入
    pub async fn seed(&self, data: &SeedData) -> Result<SeedReport> {
        let mut tx = self.pool.begin().await?;
        let mut report = SeedReport::default();

        if table_is_empty(&mut *tx, "diagnoses").await? {
            for diagnosis in &data.diagnoses {
                insert_diagnosis_row(&mut *tx, diagnosis).await?;
            }
            report.diagnoses = data.diagnoses.len();
        }

        if table_is_empty(&mut *tx, "patients").await? {
            for patient in &data.patients {
                insert_patient_row(&mut *tx, patient).await?;
                for entry in &patient.entries {
                    insert_entry_row(&mut *tx, &patient.id, entry).await?;
                }
                report.entries += patient.entries.len();
            }
            report.patients = data.patients.len();
        }

        if table_is_empty(&mut *tx, "diaries").await? {
            for diary in &data.diaries {
                insert_diary_row(&mut *tx, diary).await?;
            }
            report.diaries = data.diaries.len();
        }

        tx.commit().await?;

        tracing::info!(
            "种子数据写入完成: {} 个诊断, {} 个患者, {} 个条目, {} 篇日记",
            report.diagnoses,
            report.patients,
            report.entries,
            report.diaries
        );
        Ok(report)
    }

    /// 关闭连接池，等待已借出的连接归还
    pub async fn close(&self) {
        self.pool.close().await;
        tracing::info!("数据库连接已关闭");
    }
}

async fn table_is_empty(conn: &mut SqliteConnection, table: &'static str) -> Result<bool> {
    let count: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {table}"))
        .fetch_one(&mut *conn)
        .await?;
    Ok(count == 0)
}

async fn insert_diagnosis_row(conn: &mut SqliteConnection, diagnosis: &Diagnosis) -> Result<()> {
    let query = r#"
        INSERT INTO diagnoses (code, name, latin)
        VALUES (?1, ?2, ?3)
        ON CONFLICT(code) DO UPDATE SET
            name = excluded.name,
            latin = excluded.latin
    "#;

    sqlx::query(query)
        .bind(&diagnosis.code)
        .bind(&diagnosis.name)
        .bind(&diagnosis.latin)
        .execute(&mut *conn)
        .await?;

    Ok(())
}

async fn insert_patient_row(conn: &mut SqliteConnection, patient: &Patient) -> Result<()> {
    let query = r#"
        INSERT INTO patients (id, name, date_of_birth, ssn, gender, occupation)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6)
    "#;

    sqlx::query(query)
        .bind(&patient.id)
        .bind(&patient.name)
        .bind(&patient.date_of_birth)
        .bind(&patient.ssn)
        .bind(patient.gender.as_str())
        .bind(&patient.occupation)
        .execute(&mut *conn)
        .await?;

    Ok(())
}

async fn insert_entry_row(conn: &mut SqliteConnection, patient_id: &str, entry: &Entry) -> Result<()> {
    let query = r#"
        INSERT INTO entries (id, patient_id, entry_type, body)
        VALUES (?1, ?2, ?3, ?4)
    "#;

    sqlx::query(query)
        .bind(&entry.id)
        .bind(patient_id)
        .bind(entry.body.kind())
        .bind(Json(&entry.body))
        .execute(&mut *conn)
        .await?;

    Ok(())
}

async fn insert_diary_row(conn: &mut SqliteConnection, entry: &DiaryEntry) -> Result<()> {
    let query = r#"
        INSERT INTO diaries (id, date, weather, visibility, comment)
        VALUES (?1, ?2, ?3, ?4, ?5)
    "#;

    sqlx::query(query)
        .bind(i64::from(entry.id))
        .bind(&entry.date)
        .bind(entry.weather.as_str())
        .bind(entry.visibility.as_str())
        .bind(&entry.comment)
        .execute(&mut *conn)
        .await?;

    Ok(())
}
