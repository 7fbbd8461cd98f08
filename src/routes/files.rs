use std::collections::BTreeMap;
use std::path::Path;

use actix_multipart::Multipart;
use actix_web::http::Method;
use actix_web::{web, HttpRequest, HttpResponse};
use chrono::{DateTime, SecondsFormat, Utc};
use futures_util::future::join_all;
use futures_util::TryStreamExt;
use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::ToSchema;

use super::AppState;
use crate::error::ApiError;
use crate::models::ANONYMOUS;
use crate::storage::{HttpMetadata, ObjectHead, StoreError, DEFAULT_CACHE_CONTROL};

pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;
// text form fields (category, name) never need more than this
const MAX_TEXT_FIELD_BYTES: usize = 1024;
pub const DEFAULT_LIST_LIMIT: usize = 50;
pub const MAX_LIST_LIMIT: usize = 1000;
pub const DEFAULT_CATEGORY: &str = "general";

pub const ALLOWED_CONTENT_TYPES: &[&str] = &[
    "image/jpeg",
    "image/jpg",
    "image/png",
    "image/gif",
    "image/webp",
    "image/svg+xml",
    "audio/mpeg",
    "audio/mp3",
    "audio/wav",
    "audio/m4a",
    "audio/ogg",
    "application/json",
    "text/plain",
];

const META_ORIGINAL_NAME: &str = "original-name";
const META_UPLOAD_TIME: &str = "upload-time";
const META_CATEGORY: &str = "category";
const META_USER_ID: &str = "user-id";

const BASE36: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

fn failure(error: impl Into<String>) -> HttpResponse {
    HttpResponse::Ok().json(json!({ "success": false, "error": error.into() }))
}

fn is_allowed(content_type: &str) -> bool {
    let ct = content_type.to_ascii_lowercase();
    ALLOWED_CONTENT_TYPES.contains(&ct.as_str())
}

// Key segments are user supplied; keep them from introducing extra path levels.
fn sanitize_segment(raw: &str) -> String {
    raw.trim().replace(['/', '\\'], "_")
}

fn random_stem() -> String {
    let mut rng = rand::thread_rng();
    let suffix: String = (0..6).map(|_| BASE36[rng.gen_range(0..BASE36.len())] as char).collect();
    format!("{}_{suffix}", Utc::now().timestamp_millis())
}

/// `{category}/{stem}[.ext]`, where the extension comes from the original file name.
pub fn object_key(category: &str, name: Option<&str>, original_file_name: &str) -> String {
    let stem = match name.map(sanitize_segment).filter(|n| !n.is_empty()) {
        Some(n) => n,
        None => random_stem(),
    };
    let ext = Path::new(original_file_name)
        .extension()
        .and_then(|e| e.to_str())
        .filter(|e| !e.is_empty());
    match ext {
        Some(ext) => format!("{category}/{stem}.{ext}"),
        None => format!("{category}/{stem}"),
    }
}

fn category_of(key: &str) -> &str {
    match key.split_once('/') {
        Some((first, _)) if !first.is_empty() => first,
        _ => DEFAULT_CATEGORY,
    }
}

fn file_name_of(key: &str) -> &str {
    key.rsplit('/').next().unwrap_or(key)
}

struct UploadedFile {
    bytes: Vec<u8>,
    file_name: String,
    content_type: String,
}

enum UploadRejection {
    TooLarge,
    UnsupportedType(String),
    Malformed(String),
}

impl UploadRejection {
    fn message(&self) -> String {
        match self {
            UploadRejection::TooLarge => format!("file too large (max {} MiB)", MAX_UPLOAD_BYTES / 1024 / 1024),
            UploadRejection::UnsupportedType(ct) => format!("unsupported file type: {ct}"),
            UploadRejection::Malformed(e) => format!("malformed upload: {e}"),
        }
    }
}

async fn read_field(field: &mut actix_multipart::Field, limit: usize) -> Result<Vec<u8>, UploadRejection> {
    let mut buf = Vec::new();
    while let Some(chunk) = field
        .try_next()
        .await
        .map_err(|e| UploadRejection::Malformed(e.to_string()))?
    {
        if buf.len() + chunk.len() > limit {
            return Err(UploadRejection::TooLarge);
        }
        buf.extend_from_slice(&chunk);
    }
    Ok(buf)
}

struct UploadForm {
    file: Option<UploadedFile>,
    category: Option<String>,
    name: Option<String>,
}

async fn read_form(mut payload: Multipart) -> Result<UploadForm, UploadRejection> {
    let mut form = UploadForm { file: None, category: None, name: None };
    while let Some(mut field) = payload
        .try_next()
        .await
        .map_err(|e| UploadRejection::Malformed(e.to_string()))?
    {
        let field_name = field.content_disposition().get_name().unwrap_or_default().to_string();
        match field_name.as_str() {
            "file" => {
                let content_type = field
                    .content_type()
                    .map(|m| m.essence_str().to_string())
                    .unwrap_or_else(|| "application/octet-stream".into());
                if !is_allowed(&content_type) {
                    return Err(UploadRejection::UnsupportedType(content_type));
                }
                let file_name = field.content_disposition().get_filename().unwrap_or_default().to_string();
                let bytes = read_field(&mut field, MAX_UPLOAD_BYTES).await?;
                form.file = Some(UploadedFile { bytes, file_name, content_type });
            }
            "category" | "name" => {
                let raw = read_field(&mut field, MAX_TEXT_FIELD_BYTES).await?;
                let text = String::from_utf8_lossy(&raw).into_owned();
                if field_name == "category" {
                    form.category = Some(text);
                } else {
                    form.name = Some(text);
                }
            }
            // unknown parts still have to be consumed before the next field
            _ => {
                while field.try_next().await.map_err(|e| UploadRejection::Malformed(e.to_string()))?.is_some() {}
            }
        }
    }
    Ok(form)
}

#[utoipa::path(
    post,
    path = "/api/files/upload",
    responses(
        (status = 200, description = "Multipart upload (`file`, optional `category`, `name`); `success` reports the outcome")
    )
)]
pub async fn upload(data: web::Data<AppState>, payload: Multipart) -> HttpResponse {
    let form = match read_form(payload).await {
        Ok(form) => form,
        Err(rejection) => return failure(rejection.message()),
    };
    let Some(file) = form.file else {
        return failure("no file uploaded");
    };
    let category = form
        .category
        .as_deref()
        .map(sanitize_segment)
        .filter(|c| !c.is_empty())
        .unwrap_or_else(|| DEFAULT_CATEGORY.to_string());
    let key = object_key(&category, form.name.as_deref(), &file.file_name);
    let upload_time = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
    let file_name = if file.file_name.is_empty() { file_name_of(&key).to_string() } else { file.file_name };
    let size = file.bytes.len();

    let http = HttpMetadata {
        content_type: Some(file.content_type.clone()),
        cache_control: Some(DEFAULT_CACHE_CONTROL.to_string()),
    };
    let custom = BTreeMap::from([
        (META_ORIGINAL_NAME.to_string(), file_name.clone()),
        (META_UPLOAD_TIME.to_string(), upload_time.clone()),
        (META_CATEGORY.to_string(), category.clone()),
        (META_USER_ID.to_string(), ANONYMOUS.to_string()),
    ]);
    if let Err(e) = data.object_store.put(&key, file.bytes, http, custom).await {
        log::error!("upload failed key={key}: {e}");
        return failure(format!("upload failed: {e}"));
    }
    log::info!("stored {key} ({size} bytes, {})", file.content_type);
    HttpResponse::Ok().json(json!({
        "success": true,
        "message": "file uploaded",
        "data": {
            "url": format!("/api/files/{key}"),
            "key": key,
            "fileName": file_name,
            "fileSize": size,
            "fileType": file.content_type,
            "category": category,
            "uploadTime": upload_time,
        }
    }))
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub prefix: Option<String>,
    // kept as text so a malformed value falls back to the default instead of failing
    #[serde(default)]
    pub limit: Option<String>,
    #[serde(default)]
    pub cursor: Option<String>,
}

fn effective_limit(raw: Option<&str>) -> usize {
    raw.and_then(|l| l.trim().parse::<usize>().ok())
        .filter(|n| *n > 0)
        .unwrap_or(DEFAULT_LIST_LIMIT)
        .min(MAX_LIST_LIMIT)
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FileHttpMetadata {
    pub content_type: Option<String>,
    pub cache_control: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FileEntry {
    pub key: String,
    pub size: u64,
    pub etag: Option<String>,
    pub uploaded: Option<DateTime<Utc>>,
    pub storage_class: Option<String>,
    pub metadata: BTreeMap<String, String>,
    pub http_metadata: FileHttpMetadata,
    pub url: String,
    pub category: String,
    pub file_name: String,
}

#[utoipa::path(
    get,
    path = "/api/files/list",
    params(
        ("prefix" = Option<String>, Query, description = "Key prefix filter"),
        ("limit" = Option<usize>, Query, description = "Page size, default 50, max 1000"),
        ("cursor" = Option<String>, Query, description = "Continuation token from a previous page")
    ),
    responses((status = 200, description = "One page of stored files; `success` reports the outcome", body = [FileEntry]))
)]
pub async fn list(data: web::Data<AppState>, query: web::Query<ListQuery>) -> HttpResponse {
    let prefix = query.prefix.as_deref().unwrap_or_default();
    let limit = effective_limit(query.limit.as_deref());
    let listing = match data.object_store.list(prefix, limit, query.cursor.as_deref()).await {
        Ok(listing) => listing,
        Err(e) => {
            log::error!("listing failed prefix={prefix}: {e}");
            return failure(format!("failed to list files: {e}"));
        }
    };

    let store = &data.object_store;
    let heads = join_all(listing.objects.iter().map(|o| store.head(&o.key))).await;

    let mut categories: BTreeMap<String, usize> = BTreeMap::new();
    let mut total_size: u64 = 0;
    let files: Vec<FileEntry> = listing
        .objects
        .into_iter()
        .zip(heads)
        .map(|(obj, head)| {
            let head = head.unwrap_or_else(|e| {
                log::warn!("metadata lookup failed for {}: {e}", obj.key);
                ObjectHead::default()
            });
            let category = category_of(&obj.key).to_string();
            *categories.entry(category.clone()).or_default() += 1;
            total_size += obj.size;
            FileEntry {
                url: format!("/api/files/{}", obj.key),
                file_name: file_name_of(&obj.key).to_string(),
                category,
                size: obj.size,
                etag: obj.etag,
                uploaded: obj.uploaded,
                storage_class: obj.storage_class,
                metadata: head.custom,
                http_metadata: FileHttpMetadata {
                    content_type: head.http.content_type,
                    cache_control: head.http.cache_control,
                },
                key: obj.key,
            }
        })
        .collect();

    HttpResponse::Ok().json(json!({
        "success": true,
        "data": {
            "count": files.len(),
            "files": files,
            "truncated": listing.truncated,
            "cursor": listing.cursor,
            "delimitedPrefixes": listing.delimited_prefixes,
            "totalSize": total_size,
            "categories": categories,
        }
    }))
}

fn object_response(head: &ObjectHead) -> actix_web::HttpResponseBuilder {
    let mut resp = HttpResponse::Ok();
    resp.insert_header((
        "Content-Type",
        head.http.content_type.clone().unwrap_or_else(|| "application/octet-stream".into()),
    ));
    resp.insert_header((
        "Cache-Control",
        head.http.cache_control.clone().unwrap_or_else(|| DEFAULT_CACHE_CONTROL.into()),
    ));
    if let Some(etag) = &head.etag {
        resp.insert_header(("ETag", etag.clone()));
    }
    if let Some(name) = head.custom.get(META_ORIGINAL_NAME) {
        resp.insert_header(("X-Original-Name", urlencoding::encode(name).into_owned()));
    }
    resp
}

#[utoipa::path(
    get,
    path = "/api/files/{key}",
    params(("key" = String, Path, description = "Object key, may contain '/'")),
    responses(
        (status = 200, description = "Object bytes with stored content type"),
        (status = 404, description = "No such object"),
        (status = 500, description = "Object store failure")
    )
)]
pub async fn get_file(
    req: HttpRequest,
    data: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let key = path.into_inner();
    let store_err = |e: StoreError| match e {
        StoreError::NotFound => ApiError::not_found("file not found"),
        StoreError::Other(e) => {
            log::error!("object store read failed key={key}: {e}");
            ApiError::Internal
        }
    };
    if *req.method() == Method::HEAD {
        let head = data.object_store.head(&key).await.map_err(store_err)?;
        return Ok(object_response(&head).no_chunking(head.size).finish());
    }
    let (head, bytes) = data.object_store.get(&key).await.map_err(store_err)?;
    Ok(object_response(&head).body(bytes))
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DeleteFileRequest {
    #[serde(default)]
    pub file_key: Option<String>,
    #[serde(default)]
    pub admin_key: Option<String>,
}

#[utoipa::path(
    post,
    path = "/api/files/delete",
    request_body = DeleteFileRequest,
    responses((status = 200, description = "`success` reports whether the object was removed"))
)]
pub async fn delete(data: web::Data<AppState>, payload: Option<web::Json<DeleteFileRequest>>) -> HttpResponse {
    let Some(payload) = payload else {
        return failure("invalid request body");
    };
    let authorized = matches!(
        (data.admin_secret.as_deref(), payload.admin_key.as_deref()),
        (Some(secret), Some(given)) if secret == given
    );
    if !authorized {
        log::warn!("file delete refused: bad or missing admin key");
        return failure("permission denied");
    }
    let Some(key) = super::trimmed(&payload.file_key) else {
        return failure("fileKey is required");
    };
    // the store's delete is silent for absent keys
    match data.object_store.head(key).await {
        Ok(_) => {}
        Err(StoreError::NotFound) => return failure("file does not exist"),
        Err(e) => return failure(format!("delete failed: {e}")),
    }
    if let Err(e) = data.object_store.delete(key).await {
        log::error!("delete failed key={key}: {e}");
        return failure(format!("delete failed: {e}"));
    }
    log::info!("deleted {key}");
    HttpResponse::Ok().json(json!({
        "success": true,
        "message": "file deleted",
        "data": {
            "deletedKey": key,
            "deleteTime": Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    }))
}
