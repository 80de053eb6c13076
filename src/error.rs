//! 统一的错误类型与 HTTP 响应转换。

use axum::Json;
use axum::http::{HeaderMap, HeaderValue, StatusCode, header};
use axum::response::{Html, IntoResponse, Response};
use serde_json::json;
use std::io::ErrorKind;
use tracing::error;

use crate::pages;
use crate::storage::StorageError;

#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Forbidden(String),
    NotFound(String),
    Internal(String),
    RangeNotSatisfiable(u64),
    Unauthorized {
        redirect: String,
        message: Option<String>,
    },
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::RangeNotSatisfiable(_) => StatusCode::RANGE_NOT_SATISFIABLE,
            ApiError::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
        }
    }

    /// 返回给客户端的消息；内部错误只记录日志，不暴露细节。
    fn public_message(&self) -> String {
        match self {
            ApiError::BadRequest(msg) | ApiError::Forbidden(msg) | ApiError::NotFound(msg) => {
                msg.clone()
            }
            ApiError::Internal(detail) => {
                error!(error = %detail, "internal error");
                "internal server error".to_string()
            }
            ApiError::RangeNotSatisfiable(_) => "range not satisfiable".to_string(),
            ApiError::Unauthorized { .. } => "unauthorized".to_string(),
        }
    }

    fn range_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        if let ApiError::RangeNotSatisfiable(size) = self
            && let Ok(value) = HeaderValue::from_str(&format!("bytes */{size}"))
        {
            headers.insert(header::CONTENT_RANGE, value);
        }
        headers
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if let ApiError::Unauthorized { redirect, message } = self {
            let page = pages::login_page(&redirect, message.as_deref());
            return (status, Html(page.into_string())).into_response();
        }
        let headers = self.range_headers();
        let message = self.public_message();
        let page = pages::error_page(status, &message);
        (status, headers, Html(page.into_string())).into_response()
    }
}

/// JSON API 使用的错误包装，响应体为 `{"error": "..."}`。
#[derive(Debug)]
pub struct JsonError(pub ApiError);

impl From<ApiError> for JsonError {
    fn from(error: ApiError) -> Self {
        JsonError(error)
    }
}

impl From<StorageError> for JsonError {
    fn from(error: StorageError) -> Self {
        JsonError(error.into())
    }
}

impl IntoResponse for JsonError {
    fn into_response(self) -> Response {
        let JsonError(inner) = self;
        if matches!(inner, ApiError::Unauthorized { .. }) {
            return inner.into_response();
        }
        let status = inner.status();
        let headers = inner.range_headers();
        let message = inner.public_message();
        (status, headers, Json(json!({ "error": message }))).into_response()
    }
}

impl From<StorageError> for ApiError {
    fn from(error: StorageError) -> Self {
        match error {
            StorageError::InvalidPath => ApiError::Forbidden("access denied".into()),
            StorageError::Io(err) => match err.kind() {
                ErrorKind::NotFound => ApiError::NotFound("not found".into()),
                _ => ApiError::Internal(err.to_string()),
            },
        }
    }
}
