use std::{
    fmt::Display,
    path::{Path, PathBuf},
};

use actix_web::web::Bytes;
use chrono::{Datelike, Utc};
use futures::{Stream, StreamExt};
use md5::{Digest, Md5};
use rand::Rng;
use tokio::{fs, io::AsyncWriteExt};

use crate::{
    errors::{AppError, AppResult},
    models::domain::{FileInfo, MaterialType},
};

const MIB: u64 = 1024 * 1024;

/// Absolute ceiling for any single upload.
pub const MAX_UPLOAD_BYTES: u64 = 500 * MIB;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileCategory {
    Document,
    Slide,
    Video,
    Archive,
}

impl FileCategory {
    pub fn from_mime(mime: &str) -> Option<Self> {
        let category = match mime {
            "application/pdf"
            | "application/msword"
            | "application/vnd.openxmlformats-officedocument.wordprocessingml.document" => {
                FileCategory::Document
            }
            "application/vnd.ms-powerpoint"
            | "application/vnd.openxmlformats-officedocument.presentationml.presentation" => {
                FileCategory::Slide
            }
            "video/mp4" | "video/webm" | "video/quicktime" => FileCategory::Video,
            "application/zip"
            | "application/x-rar-compressed"
            | "application/vnd.rar"
            | "application/x-7z-compressed" => FileCategory::Archive,
            _ => return None,
        };
        Some(category)
    }

    pub fn max_bytes(&self) -> u64 {
        match self {
            FileCategory::Document => 50 * MIB,
            FileCategory::Slide => 100 * MIB,
            FileCategory::Video => 500 * MIB,
            FileCategory::Archive => 200 * MIB,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            FileCategory::Document => "document",
            FileCategory::Slide => "slide",
            FileCategory::Video => "video",
            FileCategory::Archive => "archive",
        }
    }

    pub fn material_type(&self) -> MaterialType {
        match self {
            FileCategory::Video => MaterialType::Video,
            FileCategory::Slide => MaterialType::Slide,
            FileCategory::Document | FileCategory::Archive => MaterialType::Document,
        }
    }
}

/// A file that has been fully written to disk.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredFile {
    pub filename: String,
    pub original_name: String,
    pub mime_type: String,
    pub category: FileCategory,
    pub size_bytes: u64,
    pub path: PathBuf,
    pub checksum_md5: String,
}

impl StoredFile {
    pub fn file_info(&self) -> FileInfo {
        FileInfo {
            filename: self.filename.clone(),
            original_name: self.original_name.clone(),
            mime_type: self.mime_type.clone(),
            size_bytes: self.size_bytes as i64,
            storage_path: self.path.to_string_lossy().into_owned(),
            checksum_md5: self.checksum_md5.clone(),
        }
    }
}

/// Disk storage rooted at the configured upload directory. Material files
/// land in `materials/<YYYY>/<MM>/`.
#[derive(Debug, Clone)]
pub struct FileStorage {
    root: PathBuf,
}

impl FileStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Streams `content` to a fresh file while hashing it. Nothing is left on
    /// disk when this returns an error.
    pub async fn store<S, E>(
        &self,
        original_name: &str,
        mime_type: &str,
        content: S,
    ) -> AppResult<StoredFile>
    where
        S: Stream<Item = Result<Bytes, E>>,
        E: Display,
    {
        let category = FileCategory::from_mime(mime_type)
            .ok_or_else(|| AppError::BadRequest(format!("Unsupported file type: {}", mime_type)))?;
        let limit = category.max_bytes().min(MAX_UPLOAD_BYTES);

        let now = Utc::now();
        let dir = self
            .root
            .join("materials")
            .join(format!("{:04}", now.year()))
            .join(format!("{:02}", now.month()));
        fs::create_dir_all(&dir).await?;

        let filename = format!(
            "{}-{}{}",
            now.timestamp_millis(),
            rand::thread_rng().gen_range(0..1_000_000_000u32),
            extension_of(original_name)
        );
        let path = dir.join(&filename);

        match write_hashed(&path, content, limit, category).await {
            Ok((size_bytes, checksum_md5)) => Ok(StoredFile {
                filename,
                original_name: original_name.to_string(),
                mime_type: mime_type.to_string(),
                category,
                size_bytes,
                path,
                checksum_md5,
            }),
            Err(err) => {
                self.remove(&path).await;
                Err(err)
            }
        }
    }

    /// Best-effort delete; failures are logged.
    pub async fn remove(&self, path: &Path) {
        if let Err(e) = fs::remove_file(path).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                log::warn!("Failed to remove stored file {}: {}", path.display(), e);
            }
        }
    }

    pub async fn exists(&self, path: &Path) -> bool {
        fs::metadata(path).await.map(|m| m.is_file()).unwrap_or(false)
    }
}

async fn write_hashed<S, E>(
    path: &Path,
    content: S,
    limit: u64,
    category: FileCategory,
) -> AppResult<(u64, String)>
where
    S: Stream<Item = Result<Bytes, E>>,
    E: Display,
{
    let mut file = fs::File::create(path).await?;
    let mut hasher = Md5::new();
    let mut written: u64 = 0;

    futures::pin_mut!(content);
    while let Some(chunk) = content.next().await {
        let chunk = chunk.map_err(|e| AppError::BadRequest(format!("Upload interrupted: {}", e)))?;
        written += chunk.len() as u64;
        if written > limit {
            return Err(AppError::PayloadTooLarge(format!(
                "File too large. Maximum size for {} files is {} MB",
                category.name(),
                limit / MIB
            )));
        }
        hasher.update(&chunk);
        file.write_all(&chunk).await?;
    }
    file.flush().await?;

    Ok((written, format!("{:x}", hasher.finalize())))
}

/// `.ext` in lowercase, or empty when the name has none.
fn extension_of(name: &str) -> String {
    Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{}", e.to_lowercase()))
        .unwrap_or_default()
}
