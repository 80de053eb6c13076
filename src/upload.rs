//! 多文件上传：按表单顺序处理，单个文件失败不影响其余文件。

use axum::extract::multipart::Field;
use axum::extract::{Extension, Multipart};
use axum::response::Redirect;
use futures_util::stream::StreamExt;
use std::io;
use std::sync::Arc;
use tokio::fs;
use tracing::{info, warn};

use crate::atomic::AtomicFile;
use crate::config::ShareSettings;
use crate::error::ApiError;
use crate::pages::href_for;
use crate::storage::{ResolvedPath, Storage, StorageError};

const DIRECTORY_FIELD: &str = "directory";
const FILES_FIELD: &str = "files";

/// 当前上传目标目录；解析失败时后续文件全部拒绝。
enum UploadTarget {
    Valid(ResolvedPath),
    Rejected,
}

/// 上传文件到 `directory` 字段指定的目录，完成后重定向回该目录。
pub async fn upload_files(
    Extension(storage): Extension<Arc<Storage>>,
    Extension(settings): Extension<Arc<ShareSettings>>,
    mut multipart: Multipart,
) -> Result<Redirect, ApiError> {
    let mut target = UploadTarget::Valid(storage.resolve("/")?);
    let mut uploaded: u64 = 0;
    let mut rejected: u64 = 0;
    let mut seen_field = false;

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(err) if !seen_field => {
                return Err(ApiError::BadRequest(format!("unable to parse form: {err}")));
            }
            Err(err) => {
                // 请求体中途损坏，已经保存的文件保留
                warn!(error = %err, "multipart stream aborted");
                break;
            }
        };
        seen_field = true;

        match field.name() {
            Some(DIRECTORY_FIELD) => {
                let value = match field.text().await {
                    Ok(value) => value,
                    Err(err) => {
                        warn!(error = %err, "multipart stream aborted");
                        break;
                    }
                };
                target = match prepare_directory(&storage, &value).await {
                    Ok(dir) => UploadTarget::Valid(dir),
                    Err(err) => {
                        warn!(directory = value, error = ?err, "upload directory rejected");
                        UploadTarget::Rejected
                    }
                };
            }
            Some(FILES_FIELD) => {
                let UploadTarget::Valid(dir) = &target else {
                    rejected += 1;
                    continue;
                };
                match save_field(&storage, dir, field).await {
                    Ok(saved) => {
                        info!(path = saved.url_path(), "file uploaded");
                        uploaded += 1;
                    }
                    Err(err) => {
                        warn!(directory = dir.url_path(), error = ?err, "upload skipped");
                        rejected += 1;
                    }
                }
            }
            _ => continue,
        }
    }

    let directory = match &target {
        UploadTarget::Valid(dir) => dir.url_path().to_string(),
        UploadTarget::Rejected => "/".to_string(),
    };
    info!(directory, uploaded, rejected, "upload finished");

    let mut location = href_for(settings.browse_prefix, &directory);
    if uploaded > 0 {
        location.push_str(&format!("?uploaded={uploaded}"));
    }
    Ok(Redirect::to(&location))
}

/// 解析并创建目标目录。
async fn prepare_directory(storage: &Storage, value: &str) -> Result<ResolvedPath, StorageError> {
    let dir = storage.resolve_checked(value, true).await?;
    fs::create_dir_all(dir.fs_path()).await?;
    // 创建之后再确认一次，防止中间组件是指向外部的符号链接
    storage.resolve_checked(dir.url_path(), false).await
}

#[derive(Debug)]
enum SaveError {
    MissingFilename,
    Path(StorageError),
    Io(io::Error),
}

impl From<StorageError> for SaveError {
    fn from(err: StorageError) -> Self {
        SaveError::Path(err)
    }
}

impl From<io::Error> for SaveError {
    fn from(err: io::Error) -> Self {
        SaveError::Io(err)
    }
}

async fn save_field(
    storage: &Storage,
    dir: &ResolvedPath,
    mut field: Field<'_>,
) -> Result<ResolvedPath, SaveError> {
    let filename = field
        .file_name()
        .map(str::to_string)
        .filter(|name| !name.is_empty())
        .ok_or(SaveError::MissingFilename)?;
    let destination = storage.resolve_child(dir, &filename)?;
    if fs::metadata(destination.fs_path())
        .await
        .is_ok_and(|metadata| metadata.is_dir())
    {
        return Err(SaveError::Io(io::Error::new(
            io::ErrorKind::AlreadyExists,
            "destination is a directory",
        )));
    }

    let mut atomic = AtomicFile::new(destination.fs_path()).await?;
    while let Some(chunk) = field.next().await {
        let chunk = match chunk {
            Ok(chunk) => chunk,
            Err(err) => {
                atomic.cleanup().await;
                return Err(SaveError::Io(io::Error::other(err.to_string())));
            }
        };
        if let Err(err) = atomic.write_all(&chunk).await {
            atomic.cleanup().await;
            return Err(err.into());
        }
    }
    atomic.finalize().await?;
    Ok(destination)
}
