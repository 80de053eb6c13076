//! 目录打包为 zip 并边遍历边写入响应体。
//!
//! 响应头在遍历开始前就已发送，遍历途中出错（文件被删除、权限不足等）只能
//! 中断输出流，客户端会收到一个被截断、无法解压的压缩包。

use async_zip::base::write::ZipFileWriter;
use async_zip::{Compression, ZipEntryBuilder};
use axum::body::Body as AxumBody;
use axum::http::{HeaderMap, HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use futures_util::io::AsyncWriteExt as _;
use std::io;
use std::path::{Path, PathBuf};
use tokio::fs::{self, File};
use tokio::io::{AsyncWrite, DuplexStream};
use tokio_util::compat::TokioAsyncReadCompatExt;
use tokio_util::io::ReaderStream;
use tracing::{info, warn};

use crate::error::ApiError;

const PIPE_BUFFER_SIZE: usize = 64 * 1024;

/// 返回流式 zip 响应；打包在后台任务中进行。
pub fn zip_response(dir: PathBuf, display_name: &str) -> Result<Response, ApiError> {
    let (writer, reader) = tokio::io::duplex(PIPE_BUFFER_SIZE);
    let filename = format!("{}.zip", sanitize_filename(display_name));

    let mut headers = HeaderMap::new();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/zip"));
    headers.insert(
        header::CONTENT_DISPOSITION,
        HeaderValue::from_str(&format!("attachment; filename=\"{filename}\""))
            .map_err(|_| ApiError::Internal("响应头构建失败".into()))?,
    );

    tokio::spawn(stream_zip(dir, writer));

    Ok((
        StatusCode::OK,
        headers,
        AxumBody::from_stream(ReaderStream::new(reader)),
    )
        .into_response())
}

async fn stream_zip(dir: PathBuf, writer: DuplexStream) {
    match write_zip(&dir, writer).await {
        Ok(entries) => info!(path = ?dir, entries, "zip stream complete"),
        // 客户端断开或文件系统错误：响应已开始，只能截断
        Err(err) => warn!(path = ?dir, error = %err, "zip stream aborted"),
    }
}

/// 把 `dir` 下的全部文件与子目录写成 zip，返回条目数量。
pub async fn write_zip<W>(dir: &Path, writer: W) -> io::Result<u64>
where
    W: AsyncWrite + Unpin,
{
    let mut zip = ZipFileWriter::with_tokio(writer);
    let mut entries = 0;
    let mut pending = vec![(dir.to_path_buf(), String::new())];

    while let Some((current, prefix)) = pending.pop() {
        let mut children = read_sorted(&current).await?;
        // 倒序入栈，保持按名称的深度优先顺序
        children.reverse();
        for (path, name, is_dir) in children {
            let relative = format!("{prefix}{name}");
            if is_dir {
                let builder = ZipEntryBuilder::new(format!("{relative}/").into(), Compression::Stored);
                zip.write_entry_whole(builder, &[])
                    .await
                    .map_err(zip_error)?;
                pending.push((path, format!("{relative}/")));
            } else {
                let builder = ZipEntryBuilder::new(relative.into(), Compression::Deflate);
                let file = File::open(&path).await?;
                let mut entry = zip.write_entry_stream(builder).await.map_err(zip_error)?;
                futures_util::io::copy(&mut file.compat(), &mut entry).await?;
                entry.close().await.map_err(zip_error)?;
            }
            entries += 1;
        }
    }

    let mut inner = zip.close().await.map_err(zip_error)?;
    inner.close().await?;
    Ok(entries)
}

/// 读取目录的直接子项（名称排序），跳过既不是文件也不是目录的条目。
async fn read_sorted(dir: &Path) -> io::Result<Vec<(PathBuf, String, bool)>> {
    let mut reader = fs::read_dir(dir).await?;
    let mut children = Vec::new();
    while let Some(entry) = reader.next_entry().await? {
        let file_type = entry.file_type().await?;
        if !file_type.is_dir() && !file_type.is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().to_string();
        children.push((entry.path(), name, file_type.is_dir()));
    }
    children.sort_by(|a, b| a.1.cmp(&b.1));
    Ok(children)
}

fn zip_error(err: async_zip::error::ZipError) -> io::Error {
    io::Error::other(err.to_string())
}

fn sanitize_filename(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .filter(|c| !c.is_control() && *c != '"' && *c != '\\')
        .collect();
    if cleaned.is_empty() {
        "archive".to_string()
    } else {
        cleaned
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Read};
    use tempfile::tempdir;
    use zip::ZipArchive;

    async fn zip_bytes(dir: &Path) -> Vec<u8> {
        let mut buffer = Vec::new();
        write_zip(dir, &mut buffer).await.expect("zip");
        buffer
    }

    #[tokio::test]
    async fn empty_directory_and_file_survive_round_trip() {
        let temp = tempdir().expect("tempdir");
        std::fs::create_dir(temp.path().join("empty")).expect("mkdir");
        std::fs::write(temp.path().join("a.txt"), b"hello").expect("write");

        let bytes = zip_bytes(temp.path()).await;
        let mut archive = ZipArchive::new(Cursor::new(bytes)).expect("archive");
        assert_eq!(archive.len(), 2);

        let mut names = Vec::new();
        for index in 0..archive.len() {
            let mut file = archive.by_index(index).expect("entry");
            names.push(file.name().to_string());
            if file.is_dir() {
                assert_eq!(file.name(), "empty/");
            } else {
                let mut contents = Vec::new();
                file.read_to_end(&mut contents).expect("read");
                assert_eq!(contents, b"hello");
            }
        }
        names.sort();
        assert_eq!(names, ["a.txt", "empty/"]);
    }

    #[tokio::test]
    async fn nested_entries_use_relative_paths() {
        let temp = tempdir().expect("tempdir");
        std::fs::create_dir_all(temp.path().join("docs/inner")).expect("mkdir");
        std::fs::write(temp.path().join("docs/inner/deep.txt"), b"deep").expect("write");

        let bytes = zip_bytes(temp.path()).await;
        let archive = ZipArchive::new(Cursor::new(bytes)).expect("archive");
        let mut names: Vec<_> = archive.file_names().map(str::to_string).collect();
        names.sort();
        assert_eq!(names, ["docs/", "docs/inner/", "docs/inner/deep.txt"]);
    }

    #[tokio::test]
    async fn empty_root_yields_valid_empty_archive() {
        let temp = tempdir().expect("tempdir");
        let bytes = zip_bytes(temp.path()).await;
        let archive = ZipArchive::new(Cursor::new(bytes)).expect("archive");
        assert_eq!(archive.len(), 0);
    }

    #[test]
    fn filename_is_sanitized() {
        assert_eq!(sanitize_filename("my\"dir"), "mydir");
        assert_eq!(sanitize_filename(""), "archive");
    }
}
