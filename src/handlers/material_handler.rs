use std::sync::Arc;

use actix_files::NamedFile;
use actix_multipart::{Field, Multipart};
use actix_web::{
    delete, get,
    http::header::{Charset, ContentDisposition, DispositionParam, DispositionType, ExtendedValue},
    post, put, web, HttpRequest, HttpResponse,
};
use futures::{StreamExt, TryStreamExt};

use crate::{
    app_state::AppState,
    auth::{require_staff, AuthenticatedUser, OptionalUser},
    errors::{AppError, AppResult},
    handlers::request_metadata,
    models::dto::{
        request::{
            CheckDuplicateRequest, CreateMaterialRequest, MaterialListQuery,
            UpdateMaterialRequest, UploadFields,
        },
        response::ApiResponse,
    },
    services::storage::{FileStorage, StoredFile},
};

/// Text parts of an upload form are small; anything larger is rejected.
const MAX_TEXT_FIELD_BYTES: usize = 64 * 1024;

#[get("/api/materials")]
async fn list_materials(
    state: web::Data<Arc<AppState>>,
    query: web::Query<MaterialListQuery>,
) -> Result<HttpResponse, AppError> {
    let page = state.material_service.list(query.into_inner()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::paginated(page)))
}

#[get("/api/materials/{id}")]
async fn get_material(
    state: web::Data<Arc<AppState>>,
    req: HttpRequest,
    material_id: web::Path<String>,
    viewer: OptionalUser,
) -> Result<HttpResponse, AppError> {
    let material = state
        .material_service
        .get(&material_id, viewer.0.as_ref(), request_metadata(&req))
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(material)))
}

#[post("/api/materials")]
async fn create_material(
    state: web::Data<Arc<AppState>>,
    req: HttpRequest,
    request: web::Json<CreateMaterialRequest>,
    auth: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    require_staff(&auth.0)?;

    let material = state
        .material_service
        .create(&auth.0, request.into_inner(), request_metadata(&req))
        .await?;
    Ok(HttpResponse::Created().json(ApiResponse::with_message(
        material,
        "Material created successfully",
    )))
}

#[post("/api/materials/upload")]
async fn upload_material(
    state: web::Data<Arc<AppState>>,
    req: HttpRequest,
    payload: Multipart,
    auth: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    require_staff(&auth.0)?;

    let (fields, file) = read_upload(&state.storage, payload).await?;
    let material = state
        .material_service
        .upload(&auth.0, fields, file, request_metadata(&req))
        .await?;
    Ok(HttpResponse::Created().json(ApiResponse::with_message(material, "Upload successful")))
}

#[post("/api/materials/check-duplicate")]
async fn check_duplicate(
    state: web::Data<Arc<AppState>>,
    request: web::Json<CheckDuplicateRequest>,
    _auth: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    let result = state
        .material_service
        .check_duplicate(request.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(result)))
}

#[put("/api/materials/{id}")]
async fn update_material(
    state: web::Data<Arc<AppState>>,
    material_id: web::Path<String>,
    request: web::Json<UpdateMaterialRequest>,
    auth: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    require_staff(&auth.0)?;

    let material = state
        .material_service
        .update(&auth.0, &material_id, request.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::with_message(
        material,
        "Material updated successfully",
    )))
}

#[delete("/api/materials/{id}")]
async fn delete_material(
    state: web::Data<Arc<AppState>>,
    material_id: web::Path<String>,
    auth: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    require_staff(&auth.0)?;

    state
        .material_service
        .delete(&auth.0, &material_id)
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::message("Material deleted successfully")))
}

#[post("/api/materials/{id}/download")]
async fn download_material(
    state: web::Data<Arc<AppState>>,
    req: HttpRequest,
    material_id: web::Path<String>,
    auth: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    let ticket = state
        .material_service
        .download(&auth.0, &material_id, request_metadata(&req))
        .await?;

    let content_type = ticket
        .mime_type
        .parse::<mime::Mime>()
        .unwrap_or(mime::APPLICATION_OCTET_STREAM);

    let file = NamedFile::open_async(&ticket.path)
        .await?
        .set_content_type(content_type)
        .set_content_disposition(attachment(&ticket.original_name));

    Ok(file.into_response(&req))
}

/// `filename` carries an ASCII fallback; non-ASCII names also get a UTF-8 `filename*`.
fn attachment(original_name: &str) -> ContentDisposition {
    let fallback: String = original_name
        .chars()
        .map(|c| if c.is_ascii() { c } else { '?' })
        .collect();
    let mut parameters = vec![DispositionParam::Filename(fallback)];
    if !original_name.is_ascii() {
        parameters.push(DispositionParam::FilenameExt(ExtendedValue {
            charset: Charset::Ext("UTF-8".to_string()),
            language_tag: None,
            value: original_name.as_bytes().to_vec(),
        }));
    }

    ContentDisposition {
        disposition: DispositionType::Attachment,
        parameters,
    }
}

/// Drains the multipart stream. The `file` part goes straight to storage;
/// every other part is read as text. A stored file is removed again if a
/// later part fails.
async fn read_upload(
    storage: &FileStorage,
    mut payload: Multipart,
) -> AppResult<(UploadFields, Option<StoredFile>)> {
    let mut fields = UploadFields::default();
    let mut file: Option<StoredFile> = None;

    let result = drain_parts(storage, &mut payload, &mut fields, &mut file).await;
    if let Err(err) = result {
        if let Some(stored) = file {
            storage.remove(&stored.path).await;
        }
        return Err(err);
    }

    Ok((fields, file))
}

async fn drain_parts(
    storage: &FileStorage,
    payload: &mut Multipart,
    fields: &mut UploadFields,
    file: &mut Option<StoredFile>,
) -> AppResult<()> {
    while let Some(field) = payload.try_next().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or_default().to_string();

        if name == "file" {
            let original_name = field
                .content_disposition()
                .and_then(|cd| cd.get_filename())
                .unwrap_or("upload")
                .to_string();
            let mime_type = field
                .content_type()
                .map(|m| m.essence_str().to_string())
                .unwrap_or_else(|| mime::APPLICATION_OCTET_STREAM.to_string());

            if file.is_some() {
                return Err(AppError::BadRequest(
                    "Only one file may be uploaded at a time".to_string(),
                ));
            }
            *file = Some(storage.store(&original_name, &mime_type, field).await?);
        } else {
            let value = read_text(field).await?;
            fields.set(&name, value);
        }
    }
    Ok(())
}

async fn read_text(mut field: Field) -> AppResult<String> {
    let mut bytes = Vec::new();
    while let Some(chunk) = field.next().await {
        let chunk = chunk.map_err(multipart_error)?;
        if bytes.len() + chunk.len() > MAX_TEXT_FIELD_BYTES {
            return Err(AppError::PayloadTooLarge("Form field too large".to_string()));
        }
        bytes.extend_from_slice(&chunk);
    }
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

fn multipart_error(err: actix_multipart::MultipartError) -> AppError {
    AppError::BadRequest(format!("Invalid multipart payload: {}", err))
}
