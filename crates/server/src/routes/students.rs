use std::io::Write;

use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde_json::json;
use tempfile::NamedTempFile;
use tracing::debug;

use service::import;
use service::records::{StudentInput, StudentRecord};

use crate::errors::JsonApiError;
use crate::routes::AppState;

/// 保存学生记录
pub async fn create_student(
    State(state): State<AppState>,
    Json(input): Json<StudentInput>,
) -> Result<(StatusCode, Json<serde_json::Value>), JsonApiError> {
    state.records.create(&input).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Student saved successfully" })),
    ))
}

/// 列出全部学生记录
pub async fn list_students(
    State(state): State<AppState>,
) -> Result<Json<Vec<StudentRecord>>, JsonApiError> {
    Ok(Json(state.records.list().await?))
}

/// 更新指定学生记录（仅覆盖请求中出现的字段）
pub async fn update_student(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(input): Json<StudentInput>,
) -> Result<Json<serde_json::Value>, JsonApiError> {
    state.records.update(&id, &input).await?;
    Ok(Json(json!({ "message": "Student updated successfully" })))
}

/// 删除指定学生记录（幂等）
pub async fn delete_student(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, JsonApiError> {
    state.records.delete(&id).await?;
    Ok(Json(json!({ "message": "Student deleted successfully" })))
}

/// 上传 CSV 批量导入学生记录
///
/// The upload is spooled to a named temp file; the file is removed when the
/// handle drops, whether the import succeeds or fails.
pub async fn upload_csv(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<serde_json::Value>, JsonApiError> {
    let mut spool: Option<NamedTempFile> = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| JsonApiError::new(StatusCode::BAD_REQUEST, "Invalid Upload", Some(e.to_string())))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let bytes = field.bytes().await.map_err(|e| {
            JsonApiError::new(StatusCode::BAD_REQUEST, "Invalid Upload", Some(e.to_string()))
        })?;
        let mut file = NamedTempFile::new().map_err(|e| {
            JsonApiError::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal Server Error",
                Some(e.to_string()),
            )
        })?;
        file.write_all(&bytes).map_err(|e| {
            JsonApiError::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal Server Error",
                Some(e.to_string()),
            )
        })?;
        debug!(size = bytes.len(), "upload spooled to temp file");
        spool = Some(file);
        break;
    }

    let file = spool.ok_or_else(|| {
        JsonApiError::new(
            StatusCode::BAD_REQUEST,
            "Validation Error",
            Some("No file uploaded".to_string()),
        )
    })?;

    let report = import::import_csv(&state.records, file.path()).await?;
    Ok(Json(json!({
        "message": "CSV data uploaded and processed successfully",
        "accepted": report.accepted,
        "skipped": report.skipped,
    })))
}
