use axum::{
    Json,
    body::Bytes,
    extract::{Multipart, Path, State, multipart::MultipartError},
    http::StatusCode,
};
use std::path::Path as FsPath;
use tracing::info;

use crate::db::{Bill, NewBill};
use crate::google::storage::object_name;
use crate::handlers::require_user;
use crate::service::bill_text;
use crate::types::expense::{UploadBillResponse, anonymous};
use crate::{BudgetError, router::BudgetState};

struct UploadedImage {
    filename: String,
    content_type: &'static str,
    bytes: Bytes,
}

/// Accepted image extensions and their content types.
fn image_content_type(filename: &str) -> Option<&'static str> {
    let ext = FsPath::new(filename).extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "jpg" | "jpeg" => Some("image/jpeg"),
        "png" => Some("image/png"),
        _ => None,
    }
}

fn multipart_error(e: MultipartError) -> BudgetError {
    BudgetError::Validation(e.body_text())
}

/// POST /upload_bill (multipart: `file`, optional `user_id`)
pub async fn upload_bill(
    State(state): State<BudgetState>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<UploadBillResponse>), BudgetError> {
    let mut image: Option<UploadedImage> = None;
    let mut user_id = anonymous();

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().map(str::to_owned);
        match name.as_deref() {
            Some("file") => {
                // keep only the final path component of client-supplied names
                let filename = field
                    .file_name()
                    .and_then(|n| FsPath::new(n).file_name())
                    .and_then(|n| n.to_str())
                    .map(str::to_owned)
                    .ok_or_else(|| BudgetError::Validation("file has no name".to_string()))?;
                let content_type = image_content_type(&filename).ok_or_else(|| {
                    BudgetError::Validation("bill image must be JPG or PNG".to_string())
                })?;
                let bytes = field.bytes().await.map_err(multipart_error)?;
                image = Some(UploadedImage {
                    filename,
                    content_type,
                    bytes,
                });
            }
            Some("user_id") => {
                let value = field.text().await.map_err(multipart_error)?;
                if !value.trim().is_empty() {
                    user_id = value.trim().to_string();
                }
            }
            _ => {}
        }
    }

    let image = image.ok_or_else(|| BudgetError::Validation("missing `file` field".to_string()))?;
    if image.bytes.is_empty() {
        return Err(BudgetError::Validation("uploaded file is empty".to_string()));
    }
    require_user(&user_id)?;

    let object = object_name(&user_id, &image.filename);
    let img_url = state
        .blobs
        .upload(&object, image.bytes.to_vec(), image.content_type)
        .await?;
    let ocr_text = state.ocr.detect_text(&image.bytes).await?;

    let (category, items) = {
        let categorizer = state.categorizer.read().await;
        let category = (!ocr_text.trim().is_empty()).then(|| categorizer.best(&ocr_text));
        (category, bill_text::itemize(&ocr_text, &categorizer))
    };

    let id = state
        .storage
        .insert_bill(NewBill {
            user_id: user_id.clone(),
            img_url: img_url.clone(),
            ocr_text: ocr_text.clone(),
            category: category.clone(),
            created_at: state.clock.now(),
        })
        .await?;
    info!(id, user = %user_id, items = items.len(), "bill stored");

    Ok((
        StatusCode::CREATED,
        Json(UploadBillResponse {
            ocr_text,
            img_url,
            category,
            items,
        }),
    ))
}

/// GET /bills/{user_id}
pub async fn get_bills(
    State(state): State<BudgetState>,
    Path(user_id): Path<String>,
) -> Result<Json<Vec<Bill>>, BudgetError> {
    Ok(Json(state.storage.list_bills(&user_id).await?))
}
