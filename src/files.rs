//! 目录浏览、文件下载与 JSON 列表处理器。

use axum::body::Body as AxumBody;
use axum::extract::{Extension, Query};
use axum::http::{HeaderMap, HeaderValue, Method, StatusCode, Uri, header};
use axum::response::{Html, IntoResponse, Json as JsonResponse, Response};
use httpdate::fmt_http_date;
use serde::{Deserialize, Serialize};
use std::fs::Metadata;
use std::io::SeekFrom;
use std::sync::Arc;
use tokio::fs::{self, File};
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tokio_util::io::ReaderStream;
use tracing::{debug, info};

use crate::archive;
use crate::classify;
use crate::config::ShareSettings;
use crate::error::{ApiError, JsonError};
use crate::etag::{etag_from_metadata, if_range_matches, is_not_modified};
use crate::listing::{ListingPage, list_directory};
use crate::pages;
use crate::stats::DownloadStats;
use crate::storage::{ResolvedPath, Storage, StorageError};

#[derive(Deserialize)]
pub(crate) struct BrowseQuery {
    download: Option<String>,
    uploaded: Option<String>,
}

#[derive(Deserialize)]
pub(crate) struct ApiFilesQuery {
    path: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiFileItem {
    name: String,
    path: String,
    size: u64,
    is_dir: bool,
    mod_time: Option<String>,
    download_count: u64,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiListing {
    title: String,
    current_path: String,
    parent_path: Option<String>,
    files: Vec<ApiFileItem>,
    has_parent: bool,
    #[serde(rename = "serverURL")]
    server_url: String,
}

/// 浏览目录或下载文件；`?download=1` 强制附件下载，`?download=zip` 打包目录。
pub async fn browse(
    method: Method,
    uri: Uri,
    Query(query): Query<BrowseQuery>,
    request_headers: HeaderMap,
    Extension(storage): Extension<Arc<Storage>>,
    Extension(settings): Extension<Arc<ShareSettings>>,
    Extension(stats): Extension<Arc<DownloadStats>>,
) -> Result<Response, ApiError> {
    let raw_path = uri
        .path()
        .strip_prefix(settings.browse_prefix)
        .unwrap_or(uri.path());
    let decoded = urlencoding::decode(raw_path)
        .map_err(|_| ApiError::BadRequest("invalid path encoding".into()))?;
    let resolved = storage.resolve_checked(&decoded, false).await?;
    let metadata = fs::metadata(resolved.fs_path())
        .await
        .map_err(StorageError::Io)?;

    if metadata.is_dir() {
        if query.download.as_deref() == Some("zip") {
            let name = resolved
                .fs_path()
                .file_name()
                .map(|name| name.to_string_lossy().to_string())
                .unwrap_or_default();
            info!(path = resolved.url_path(), "zip download");
            return archive::zip_response(resolved.fs_path().to_path_buf(), &name);
        }
        let page = list_directory(&storage, &resolved, &settings.server_url, true).await?;
        let uploaded = query.uploaded.as_deref().and_then(|v| v.parse().ok());
        return Ok(render_listing(&page, &settings, uploaded));
    }

    let force_download = query.download.as_deref() == Some("1");
    send_file(
        &method,
        &resolved,
        &metadata,
        force_download,
        &request_headers,
        &stats,
    )
    .await
}

fn render_listing(page: &ListingPage, settings: &ShareSettings, uploaded: Option<u64>) -> Response {
    let markup = pages::browser_page(
        page,
        settings.browse_prefix,
        settings.qr_svg.as_deref(),
        uploaded,
    );
    debug!(path = page.current_path, count = page.entries.len(), "render listing");
    Html(markup.into_string()).into_response()
}

/// JSON 目录列表。
pub async fn api_list_files(
    Query(query): Query<ApiFilesQuery>,
    Extension(storage): Extension<Arc<Storage>>,
    Extension(settings): Extension<Arc<ShareSettings>>,
    Extension(stats): Extension<Arc<DownloadStats>>,
) -> Result<JsonResponse<ApiListing>, JsonError> {
    let requested = query
        .path
        .as_deref()
        .filter(|path| !path.is_empty())
        .unwrap_or("/");
    let resolved = storage.resolve_checked(requested, false).await?;
    let metadata = fs::metadata(resolved.fs_path())
        .await
        .map_err(StorageError::Io)?;
    if !metadata.is_dir() {
        return Err(ApiError::BadRequest("path is not a directory".into()).into());
    }

    let page = list_directory(
        &storage,
        &resolved,
        &settings.server_url,
        settings.api_show_hidden,
    ).await?;
    let has_parent = page.has_parent();
    let mut files = Vec::with_capacity(page.entries.len());
    for entry in page.entries {
        let download_count = if entry.is_dir {
            0
        } else {
            stats.download_count(&entry.path).await
        };
        files.push(ApiFileItem {
            mod_time: entry.modified.map(|time| time.to_rfc3339()),
            name: entry.name,
            path: entry.path,
            size: entry.size,
            is_dir: entry.is_dir,
            download_count,
        });
    }
    info!(path = page.current_path, count = files.len(), "list files");

    Ok(JsonResponse(ApiListing {
        title: page.title,
        has_parent,
        current_path: page.current_path,
        parent_path: page.parent_path,
        files,
        server_url: page.server_url,
    }))
}

/// 未知的 `/api/*` 路径。
pub async fn api_not_found() -> JsonError {
    JsonError(ApiError::NotFound("not found".into()))
}

/// 发送文件，支持 Range、条件请求与附件下载。
async fn send_file(
    method: &Method,
    resolved: &ResolvedPath,
    metadata: &Metadata,
    force_download: bool,
    request_headers: &HeaderMap,
    stats: &DownloadStats,
) -> Result<Response, ApiError> {
    let file_size = metadata.len();
    let modified = metadata.modified().ok();
    let etag = etag_from_metadata(metadata);
    let name = resolved.file_name().unwrap_or("download");

    let mut response_headers = HeaderMap::new();
    response_headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_str(&classify::content_type(name))
            .map_err(|_| ApiError::Internal("无效的 MIME 类型".into()))?,
    );
    response_headers.insert(header::ACCEPT_RANGES, HeaderValue::from_static("bytes"));
    response_headers.insert(
        header::ETAG,
        HeaderValue::from_str(&etag).map_err(|_| ApiError::Internal("响应头构建失败".into()))?,
    );
    if let Some(modified) = modified {
        response_headers.insert(
            header::LAST_MODIFIED,
            HeaderValue::from_str(&fmt_http_date(modified))
                .map_err(|_| ApiError::Internal("响应头构建失败".into()))?,
        );
    }
    if force_download {
        response_headers.insert(
            header::CONTENT_DISPOSITION,
            HeaderValue::from_str(&attachment_disposition(name))
                .map_err(|_| ApiError::Internal("响应头构建失败".into()))?,
        );
    }

    if is_not_modified(request_headers, &etag, modified) {
        return Ok((StatusCode::NOT_MODIFIED, response_headers).into_response());
    }

    let range = if if_range_matches(request_headers, &etag, modified) {
        parse_range(request_headers.get(header::RANGE), file_size)?
    } else {
        None
    };

    let mut file = File::open(resolved.fs_path())
        .await
        .map_err(|err| ApiError::Internal(err.to_string()))?;
    let counts_as_download = *method != Method::HEAD && range.is_none_or(|(start, _)| start == 0);
    if counts_as_download {
        let entry = stats.record(resolved.url_path()).await;
        debug!(
            path = resolved.url_path(),
            count = entry.download_count,
            last_accessed = %entry.last_accessed,
            "download recorded"
        );
    }

    if let Some((start, end)) = range {
        let length = end - start + 1;
        debug!(path = resolved.url_path(), start, end, length, "range request accepted");
        file.seek(SeekFrom::Start(start))
            .await
            .map_err(|err| ApiError::Internal(err.to_string()))?;
        response_headers.insert(
            header::CONTENT_RANGE,
            HeaderValue::from_str(&format!("bytes {start}-{end}/{file_size}"))
                .map_err(|_| ApiError::Internal("响应头构建失败".into()))?,
        );
        response_headers.insert(header::CONTENT_LENGTH, HeaderValue::from(length));
        let stream = ReaderStream::new(file.take(length));
        return Ok((
            StatusCode::PARTIAL_CONTENT,
            response_headers,
            AxumBody::from_stream(stream),
        )
            .into_response());
    }

    response_headers.insert(header::CONTENT_LENGTH, HeaderValue::from(file_size));
    info!(path = resolved.url_path(), size = file_size, "send file");
    Ok((
        StatusCode::OK,
        response_headers,
        AxumBody::from_stream(ReaderStream::new(file)),
    )
        .into_response())
}

fn attachment_disposition(name: &str) -> String {
    let fallback: String = name
        .chars()
        .map(|c| {
            if (c.is_ascii_graphic() && c != '"' && c != '\\') || c == ' ' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if fallback == name {
        format!("attachment; filename=\"{name}\"")
    } else {
        format!(
            "attachment; filename=\"{fallback}\"; filename*=UTF-8''{}",
            urlencoding::encode(name)
        )
    }
}

/// 解析 Range 头，返回可读取的范围。
fn parse_range(
    value: Option<&HeaderValue>,
    file_size: u64,
) -> Result<Option<(u64, u64)>, ApiError> {
    let Some(value) = value else {
        return Ok(None);
    };
    if file_size == 0 {
        return Err(ApiError::RangeNotSatisfiable(file_size));
    }
    let value = value
        .to_str()
        .map_err(|_| ApiError::BadRequest("invalid Range header".into()))?;
    let Some(range) = value.strip_prefix("bytes=") else {
        return Err(ApiError::BadRequest("invalid Range header".into()));
    };
    if range.contains(',') {
        return Err(ApiError::BadRequest("multiple ranges not supported".into()));
    }

    let mut parts = range.splitn(2, '-');
    let start_part = parts.next().unwrap_or_default().trim();
    let end_part = parts.next().unwrap_or_default().trim();

    let (start, end) = if start_part.is_empty() {
        let suffix: u64 = end_part
            .parse()
            .map_err(|_| ApiError::BadRequest("invalid Range header".into()))?;
        if suffix == 0 {
            return Err(ApiError::RangeNotSatisfiable(file_size));
        }
        (file_size.saturating_sub(suffix), file_size - 1)
    } else {
        let start: u64 = start_part
            .parse()
            .map_err(|_| ApiError::BadRequest("invalid Range header".into()))?;
        let end: u64 = if end_part.is_empty() {
            file_size - 1
        } else {
            end_part
                .parse::<u64>()
                .map_err(|_| ApiError::BadRequest("invalid Range header".into()))?
                .min(file_size - 1)
        };
        (start, end)
    };

    if start > end || start >= file_size {
        return Err(ApiError::RangeNotSatisfiable(file_size));
    }

    Ok(Some((start, end)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn range(value: &'static str, size: u64) -> Result<Option<(u64, u64)>, ApiError> {
        parse_range(Some(&HeaderValue::from_static(value)), size)
    }

    #[test]
    fn parse_range_forms() {
        assert_eq!(parse_range(None, 10).ok().flatten(), None);
        assert_eq!(range("bytes=0-4", 10).ok().flatten(), Some((0, 4)));
        assert_eq!(range("bytes=5-", 10).ok().flatten(), Some((5, 9)));
        assert_eq!(range("bytes=-3", 10).ok().flatten(), Some((7, 9)));
        assert_eq!(range("bytes=8-100", 10).ok().flatten(), Some((8, 9)));
    }

    #[test]
    fn parse_range_rejects_unsatisfiable() {
        assert!(matches!(
            range("bytes=10-12", 10),
            Err(ApiError::RangeNotSatisfiable(10))
        ));
        assert!(matches!(
            range("bytes=0-1", 0),
            Err(ApiError::RangeNotSatisfiable(0))
        ));
        assert!(matches!(range("items=0-1", 10), Err(ApiError::BadRequest(_))));
        assert!(matches!(range("bytes=0-1,3-4", 10), Err(ApiError::BadRequest(_))));
    }

    #[test]
    fn attachment_disposition_handles_non_ascii() {
        assert_eq!(
            attachment_disposition("a.txt"),
            "attachment; filename=\"a.txt\""
        );
        let header = attachment_disposition("résumé.pdf");
        assert!(header.starts_with("attachment; filename=\"r_sum_.pdf\""));
        assert!(header.contains("filename*=UTF-8''r%C3%A9sum%C3%A9.pdf"));
    }
}
