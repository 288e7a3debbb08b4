use super::AppState;
use crate::export::DOWNLOAD_FILE_NAME;
use axum::{
    body::Body,
    extract::{Multipart, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use beauty_recycle_common::ClassificationResult;
use serde::Serialize;
use tracing::{error, warn};

/// 分類失敗時に返す汎用メッセージ（詳細はログのみ）
pub const CLASSIFY_FAILURE_MESSAGE: &str = "Failed to classify product. Please try again.";

#[derive(Debug, Serialize)]
pub struct ApiResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<ClassificationResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ApiResponse {
    fn ok(result: ClassificationResult) -> Self {
        Self {
            success: true,
            result: Some(result),
            error: None,
        }
    }

    fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            result: None,
            error: Some(message.into()),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub classifier: String,
    pub store: String,
}

/// フォーム入力（説明文 + 任意の画像）
#[derive(Default)]
struct ClassifyForm {
    description: String,
    image: Option<Vec<u8>>,
}

async fn read_form(multipart: &mut Multipart) -> Result<ClassifyForm, String> {
    let mut form = ClassifyForm::default();

    while let Some(field) = multipart.next_field().await.map_err(|e| e.to_string())? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "description" => {
                form.description = field.text().await.map_err(|e| e.to_string())?;
            }
            "image" => {
                // ファイル名なし・空ファイルは未選択扱い
                let has_file_name = field.file_name().is_some_and(|n| !n.is_empty());
                let bytes = field.bytes().await.map_err(|e| e.to_string())?;
                if has_file_name && !bytes.is_empty() {
                    form.image = Some(bytes.to_vec());
                }
            }
            _ => {}
        }
    }

    Ok(form)
}

/// POST /api/classify
pub async fn classify_handler(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> (StatusCode, Json<ApiResponse>) {
    let form = match read_form(&mut multipart).await {
        Ok(form) => form,
        Err(e) => {
            error!(error = %e, "failed to read upload");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::failure(CLASSIFY_FAILURE_MESSAGE)),
            );
        }
    };

    let result = match state
        .classifier
        .classify(&form.description, form.image.as_deref())
        .await
    {
        Ok(result) => result,
        Err(e) => {
            error!(error = %e, "classification error");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::failure(CLASSIFY_FAILURE_MESSAGE)),
            );
        }
    };

    // 保存は任意（失敗してもレスポンスには影響しない）
    if !result.is_empty() && state.store.save(&form.description, &result).await.is_none() {
        warn!("classification result was not persisted");
    }

    (StatusCode::OK, Json(ApiResponse::ok(result)))
}

/// GET /api/export-csv
pub async fn export_csv_handler(State(state): State<AppState>) -> Response {
    let path = match state.exporter.generate().await {
        Ok(path) => path,
        Err(e) => {
            error!(error = %e, "CSV export failed");
            return (StatusCode::INTERNAL_SERVER_ERROR, Json(ApiResponse::failure(e.to_string())))
                .into_response();
        }
    };

    let read = tokio::fs::read(&path).await;
    if let Err(e) = tokio::fs::remove_file(&path).await {
        warn!(path = %path.display(), error = %e, "failed to remove exported file");
    }

    match read {
        Ok(bytes) => (
            StatusCode::OK,
            [
                (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
                (
                    header::CONTENT_DISPOSITION,
                    format!("attachment; filename=\"{}\"", DOWNLOAD_FILE_NAME),
                ),
            ],
            Body::from(bytes),
        )
            .into_response(),
        Err(e) => {
            error!(error = %e, "failed to read exported file");
            (StatusCode::INTERNAL_SERVER_ERROR, Json(ApiResponse::failure(e.to_string())))
                .into_response()
        }
    }
}

/// GET /health
pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        classifier: if state.classifier.is_configured() { "configured" } else { "unconfigured" }.to_string(),
        store: if state.store.is_available() { "available" } else { "disabled" }.to_string(),
    })
}
