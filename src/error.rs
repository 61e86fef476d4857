//! HTTP 错误处理
//!
//! 所有错误都以 `{ "error": "<message>" }` 的形式返回

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::calculators::CalculatorError;
use crate::validation::ValidationError;

#[derive(Error, Debug)]
pub enum ApiError {
    /// 请求体无法解析为 JSON
    #[error("Malformed payload: {0}")]
    MalformedPayload(String),

    /// 字段校验失败
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// 其他请求错误
    #[error("{0}")]
    BadRequest(String),

    /// 资源不存在
    #[error("{0}")]
    NotFound(String),

    /// 内部错误（不向客户端暴露细节）
    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    pub fn not_found(what: &str, id: &str) -> Self {
        ApiError::NotFound(format!("{what} not found: {id}"))
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::MalformedPayload(_) | ApiError::Validation(_) | ApiError::BadRequest(_) => {
                StatusCode::BAD_REQUEST
            }
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<CalculatorError> for ApiError {
    fn from(_: CalculatorError) -> Self {
        ApiError::BadRequest("malformatted parameters".to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            ApiError::Internal(e) => {
                tracing::error!("请求处理失败: {:#}", e);
                "internal server error".to_string()
            }
            ApiError::Validation(e) => {
                tracing::warn!("请求校验失败: {}", e);
                e.to_string()
            }
            other => other.to_string(),
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
