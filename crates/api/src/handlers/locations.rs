//! Handlers for the location reference-data importer.
//!
//! The admin UI drives an import through one multiplexed endpoint whose
//! `action` form field selects the operation:
//!
//! ```text
//! start_upload    upload_type, csv_file  -> { success, upload_id }
//! process_upload  upload_id              -> { success }
//! get_progress    upload_id              -> { success, status, progress, ... }
//! get_errors      upload_id              -> { success, failed_rows, errors }
//! cleanup         upload_id              -> { success }
//! ```
//!
//! Protocol failures answer 200 with `success: false`; malformed requests
//! answer 400.

use axum::body::Bytes;
use axum::extract::{FromRequest, Multipart, Request, State};
use axum::http::header::CONTENT_TYPE;
use axum::response::{IntoResponse, Response};
use axum::{Form, Json};
use psgc_core::entity::EntityType;
use psgc_pipeline::ServiceError;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use crate::middleware::rbac::RequireAdmin;
use crate::response::{Ack, DataResponse, ErrorReport, Failure, ProgressReport, UploadStarted};
use crate::state::AppState;

/// Multipart field carrying the CSV file.
const FILE_FIELD: &str = "csv_file";

// ---------------------------------------------------------------------------
// Request decoding
// ---------------------------------------------------------------------------

/// A file part of a multipart request.
#[derive(Debug)]
struct UploadedFile {
    file_name: Option<String>,
    data: Bytes,
}

/// Decoded form fields, from either body encoding.
#[derive(Debug, Default, Deserialize)]
struct ActionForm {
    action: Option<String>,
    upload_type: Option<String>,
    upload_id: Option<String>,
    #[serde(skip)]
    file: Option<UploadedFile>,
    #[serde(skip)]
    multipart: bool,
}

impl ActionForm {
    async fn from_request(request: Request, state: &AppState) -> AppResult<Self> {
        let is_multipart = request
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.starts_with("multipart/form-data"));

        if !is_multipart {
            let Form(form) = Form::<ActionForm>::from_request(request, state)
                .await
                .map_err(|e| AppError::BadRequest(e.body_text()))?;
            return Ok(form);
        }

        let mut multipart = Multipart::from_request(request, state)
            .await
            .map_err(|e| AppError::BadRequest(e.body_text()))?;
        let mut form = ActionForm {
            multipart: true,
            ..ActionForm::default()
        };

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| AppError::BadRequest(e.to_string()))?
        {
            let name = field.name().unwrap_or_default().to_string();
            match name.as_str() {
                FILE_FIELD => {
                    let file_name = field.file_name().map(str::to_string);
                    let data = field
                        .bytes()
                        .await
                        .map_err(|e| AppError::BadRequest(e.to_string()))?;
                    form.file = Some(UploadedFile { file_name, data });
                }
                "action" | "upload_type" | "upload_id" => {
                    let value = field
                        .text()
                        .await
                        .map_err(|e| AppError::BadRequest(e.to_string()))?;
                    let slot = match name.as_str() {
                        "action" => &mut form.action,
                        "upload_type" => &mut form.upload_type,
                        _ => &mut form.upload_id,
                    };
                    *slot = Some(value);
                }
                // Unknown parts are ignored.
                _ => {}
            }
        }
        Ok(form)
    }

    fn required<'a>(value: &'a Option<String>, field: &str) -> AppResult<&'a str> {
        value
            .as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| AppError::BadRequest(format!("Missing required field '{field}'")))
    }
}

fn reply<T: Serialize>(body: T) -> AppResult<Response> {
    Ok(Json(body).into_response())
}

/// Answer a service failure: protocol failures become `success: false`,
/// storage failures become 500.
fn protocol_failure(err: ServiceError) -> AppResult<Response> {
    match err {
        ServiceError::Storage(e) => Err(AppError::InternalError(format!(
            "Failed to store upload: {e}"
        ))),
        other => reply(Failure::new(other.to_string())),
    }
}

// ---------------------------------------------------------------------------
// Upload endpoint
// ---------------------------------------------------------------------------

/// POST /api/v1/admin/locations/upload
///
/// Dispatch on the `action` field. `start_upload` requires
/// `multipart/form-data`; other actions also accept urlencoded forms.
pub async fn upload(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    request: Request,
) -> AppResult<Response> {
    let form = ActionForm::from_request(request, &state).await?;
    let action = ActionForm::required(&form.action, "action")?.to_string();
    let imports = &state.imports;

    tracing::debug!(action = %action, admin = %admin.subject, "Location upload action");

    match action.as_str() {
        "start_upload" => {
            if !form.multipart {
                return Err(AppError::BadRequest(
                    "start_upload requires multipart/form-data".into(),
                ));
            }
            let upload_type = ActionForm::required(&form.upload_type, "upload_type")?;
            let (file_name, data) = match &form.file {
                Some(file) => (file.file_name.as_deref(), file.data.as_ref()),
                None => (None, &[][..]),
            };

            match imports.start_upload(upload_type, file_name, data).await {
                Ok(upload_id) => {
                    tracing::info!(upload_id = %upload_id, admin = %admin.subject, "Upload accepted");
                    reply(UploadStarted {
                        success: true,
                        upload_id,
                    })
                }
                Err(e) => {
                    tracing::info!(error = %e, admin = %admin.subject, "Upload rejected");
                    protocol_failure(e)
                }
            }
        }
        "process_upload" => {
            let upload_id = ActionForm::required(&form.upload_id, "upload_id")?;
            match imports.process(upload_id).await {
                Ok(_) => reply(Ack::ok()),
                Err(e) => protocol_failure(e),
            }
        }
        "get_progress" => {
            let upload_id = ActionForm::required(&form.upload_id, "upload_id")?;
            match imports.progress(upload_id).await {
                Ok(job) => reply(ProgressReport::from(job)),
                Err(e) => protocol_failure(e),
            }
        }
        "get_errors" => {
            let upload_id = ActionForm::required(&form.upload_id, "upload_id")?;
            match imports.errors(upload_id).await {
                Ok((failed_rows, errors)) => reply(ErrorReport {
                    success: true,
                    failed_rows,
                    errors,
                }),
                Err(e) => protocol_failure(e),
            }
        }
        "cleanup" => {
            let upload_id = ActionForm::required(&form.upload_id, "upload_id")?;
            match imports.cleanup(upload_id).await {
                Ok(()) => reply(Ack::ok()),
                Err(e) => protocol_failure(e),
            }
        }
        other => Err(AppError::BadRequest(format!("Unknown action '{other}'"))),
    }
}

// ---------------------------------------------------------------------------
// Summary
// ---------------------------------------------------------------------------

/// Row counts of the reference tables plus the number of tracked import jobs.
#[derive(Debug, Serialize)]
pub struct LocationSummary {
    pub regions: u64,
    pub provinces: u64,
    pub citymun: u64,
    pub barangays: u64,
    pub import_jobs: usize,
}

/// GET /api/v1/admin/locations/summary
pub async fn summary(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
) -> AppResult<Json<DataResponse<LocationSummary>>> {
    let store = &state.store;
    let data = LocationSummary {
        regions: store.count(EntityType::Region).await?,
        provinces: store.count(EntityType::Province).await?,
        citymun: store.count(EntityType::CityMun).await?,
        barangays: store.count(EntityType::Barangay).await?,
        import_jobs: state.imports.jobs().len().await,
    };
    Ok(Json(DataResponse { data }))
}
