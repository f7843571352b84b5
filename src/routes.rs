use actix_multipart::Multipart;
use actix_web::{web, HttpResponse};
use futures_util::TryStreamExt as _;
use std::str::FromStr;
use std::sync::Arc;
use uuid::Uuid;

use crate::auth::{verify_staff_password, StaffAuth};
use crate::error::ApiError;
use crate::models::*;
use crate::repo::ComplaintRepo;
use crate::storage::BlobStore;

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .service(web::resource("/login").route(web::post().to(login)))
            .service(
                web::resource("/complaints")
                    .route(web::get().to(list_complaints))
                    .route(web::post().to(submit_complaint)),
            )
            .service(web::resource("/complaints/{id}").route(web::put().to(update_status))),
    );
}

#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<dyn ComplaintRepo>,
    pub blob_store: Arc<dyn BlobStore>,
}

#[derive(Debug, serde::Deserialize, utoipa::ToSchema)]
pub struct LoginRequest {
    pub password: String,
}

#[derive(Debug, serde::Deserialize, utoipa::ToSchema)]
pub struct UpdateStatusRequest {
    pub status: ComplaintStatus,
}

#[utoipa::path(
    post,
    path = "/api/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Secret matches"),
        (status = 401, description = "Invalid password")
    )
)]
pub async fn login(payload: web::Json<LoginRequest>) -> Result<HttpResponse, ApiError> {
    if verify_staff_password(&payload.password) {
        Ok(HttpResponse::Ok().json(serde_json::json!({"message": "Login successful"})))
    } else {
        Err(ApiError::Unauthorized)
    }
}

#[utoipa::path(
    get,
    path = "/api/complaints",
    responses(
        (status = 200, description = "All complaints, newest first", body = [Complaint]),
        (status = 401, description = "Missing or wrong staff password"),
        (status = 500, description = "Store unavailable")
    )
)]
pub async fn list_complaints(
    _auth: StaffAuth,
    data: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    let complaints = data.repo.list_all().await?;
    Ok(HttpResponse::Ok().json(complaints))
}

const PHOTO_SIZE_LIMIT: usize = 5 * 1024 * 1024; // 5 MiB

const ALLOWED_PHOTO_MIME: &[&str] = &["image/png", "image/jpeg"];

struct PhotoUpload {
    bytes: Vec<u8>,
    filename: String,
    mime: String,
}

/// Accumulates the multipart form: text fields by name plus the optional
/// `photo` part, with the size/MIME guard applied while streaming.
#[derive(Default)]
struct SubmitForm {
    customer_name: Option<String>,
    customer_email: Option<String>,
    state: Option<String>,
    product_id: Option<String>,
    complaint_details: Option<String>,
    complaint_type: Option<String>,
    submitter_role: Option<String>,
    photo: Option<PhotoUpload>,
}

async fn read_submit_form(mut payload: Multipart) -> Result<SubmitForm, ApiError> {
    let mut form = SubmitForm::default();
    while let Some(mut field) = payload.try_next().await.map_err(|e| {
        log::error!("multipart error: {e}");
        ApiError::BadRequest("Malformed multipart payload".into())
    })? {
        let cd = field.content_disposition();
        let name = cd.get_name().unwrap_or_default().to_string();
        if name == "photo" {
            let filename = cd.get_filename().unwrap_or("photo").to_string();
            let declared = field.content_type().map(|m| m.to_string());
            let mut bytes: Vec<u8> = Vec::new();
            while let Some(chunk) = field.try_next().await.map_err(|e| {
                log::error!("photo stream read error: {e}");
                ApiError::BadRequest("Malformed multipart payload".into())
            })? {
                if bytes.len() + chunk.len() > PHOTO_SIZE_LIMIT {
                    return Err(ApiError::BadRequest(
                        "Photo exceeds the 5 MB size limit".into(),
                    ));
                }
                bytes.extend_from_slice(&chunk);
            }
            // An empty part is "no file" and is a valid submission.
            if bytes.is_empty() {
                continue;
            }
            let mime = declared
                .filter(|m| m != "application/octet-stream")
                .or_else(|| infer::get(&bytes).map(|t| t.mime_type().to_string()))
                .unwrap_or_else(|| "application/octet-stream".into());
            if !ALLOWED_PHOTO_MIME.contains(&mime.as_str()) {
                return Err(ApiError::BadRequest(
                    "Only PNG and JPEG files are allowed".into(),
                ));
            }
            form.photo = Some(PhotoUpload {
                bytes,
                filename,
                mime,
            });
        } else {
            let mut buf: Vec<u8> = Vec::new();
            while let Some(chunk) = field.try_next().await.map_err(|e| {
                log::error!("field stream read error: {e}");
                ApiError::BadRequest("Malformed multipart payload".into())
            })? {
                buf.extend_from_slice(&chunk);
            }
            let value = String::from_utf8(buf)
                .map_err(|_| ApiError::BadRequest(format!("Field '{name}' is not valid UTF-8")))?;
            match name.as_str() {
                "customerName" => form.customer_name = Some(value),
                "customerEmail" => form.customer_email = Some(value),
                "state" => form.state = Some(value),
                "productId" => form.product_id = Some(value),
                "complaintDetails" => form.complaint_details = Some(value),
                "complaintType" => form.complaint_type = Some(value),
                "submitterRole" => form.submitter_role = Some(value),
                _ => {} // unknown fields are ignored
            }
        }
    }
    Ok(form)
}

fn parse_enum_field<T: FromStr>(value: Option<String>, field: &str) -> Result<Option<T>, ApiError> {
    match value {
        Some(s) if !s.is_empty() => s
            .parse::<T>()
            .map(Some)
            .map_err(|_| ApiError::BadRequest(format!("Invalid value for {field}"))),
        _ => Ok(None),
    }
}

#[utoipa::path(
    post,
    path = "/api/complaints",
    responses(
        (status = 201, description = "Complaint created", body = Complaint),
        (status = 400, description = "Missing required field, disallowed enum value or disallowed photo type"),
        (status = 500, description = "Store unavailable")
    )
)]
pub async fn submit_complaint(
    data: web::Data<AppState>,
    payload: Multipart,
) -> Result<HttpResponse, ApiError> {
    let form = read_submit_form(payload).await?;

    let (state, product_id, complaint_details) = match (
        form.state.filter(|s| !s.is_empty()),
        form.product_id.filter(|s| !s.is_empty()),
        form.complaint_details.filter(|s| !s.is_empty()),
    ) {
        (Some(s), Some(p), Some(d)) => (s, p, d),
        _ => {
            return Err(ApiError::BadRequest(
                "State, product ID, and complaint details are required".into(),
            ))
        }
    };
    let state: UsState = state
        .parse()
        .map_err(|_| ApiError::BadRequest("Invalid value for state".into()))?;
    let complaint_type = parse_enum_field::<ComplaintType>(form.complaint_type, "complaintType")?;
    let submitter_role = parse_enum_field::<SubmitterRole>(form.submitter_role, "submitterRole")?;

    // Blob first, record second. The two writes are not transactional: a
    // record-insert failure after this point leaves an orphaned photo blob.
    let mut photo_id: Option<Uuid> = None;
    if let Some(photo) = form.photo {
        let id = data
            .blob_store
            .store(&photo.bytes, &photo.filename, &photo.mime)
            .await?;
        photo_id = Some(id);
    }

    let complaint = data
        .repo
        .insert(NewComplaint {
            customer_name: form.customer_name,
            customer_email: form.customer_email,
            state,
            product_id,
            complaint_details,
            complaint_type,
            submitter_role,
            photo_id,
        })
        .await?;
    Ok(HttpResponse::Created().json(complaint))
}

#[utoipa::path(
    put,
    path = "/api/complaints/{id}",
    request_body = UpdateStatusRequest,
    params(("id" = Uuid, Path, description = "Complaint id")),
    responses(
        (status = 200, description = "Status updated", body = Complaint),
        (status = 401, description = "Missing or wrong staff password"),
        (status = 404, description = "Unknown complaint id"),
        (status = 500, description = "Store unavailable")
    )
)]
pub async fn update_status(
    _auth: StaffAuth,
    data: web::Data<AppState>,
    path: web::Path<Uuid>,
    payload: web::Json<UpdateStatusRequest>,
) -> Result<HttpResponse, ApiError> {
    let complaint = data
        .repo
        .update_status(path.into_inner(), payload.status)
        .await?;
    Ok(HttpResponse::Ok().json(complaint))
}
