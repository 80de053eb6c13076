//! 文件扩展名到 MIME 类型与列表图标的映射表。

use std::path::Path;

fn extension_of(name: &str) -> String {
    Path::new(name)
        .extension()
        .map(|ext| ext.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default()
}

/// 返回文件的 Content-Type；表中没有的扩展名交给 `mime_guess`。
pub fn content_type(name: &str) -> String {
    let mime = match extension_of(name).as_str() {
        "html" | "htm" => "text/html",
        "css" => "text/css",
        "js" => "application/javascript",
        "json" => "application/json",
        "pdf" => "application/pdf",
        "txt" => "text/plain",
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "svg" => "image/svg+xml",
        "mp3" => "audio/mpeg",
        "mp4" => "video/mp4",
        "zip" => "application/zip",
        _ => {
            return mime_guess::from_path(name)
                .first_or_octet_stream()
                .essence_str()
                .to_string();
        }
    };
    mime.to_string()
}

/// 列表中显示的图标（Font Awesome class）。
pub fn icon(name: &str, is_dir: bool) -> &'static str {
    if is_dir {
        return "fas fa-folder text-blue-500";
    }

    match extension_of(name).as_str() {
        "txt" | "md" | "readme" => "fas fa-file-alt text-gray-600",
        "pdf" => "fas fa-file-pdf text-red-600",
        "doc" | "docx" => "fas fa-file-word text-blue-600",
        "xls" | "xlsx" => "fas fa-file-excel text-green-600",
        "ppt" | "pptx" => "fas fa-file-powerpoint text-orange-600",
        "zip" | "rar" | "7z" | "tar" | "gz" => "fas fa-file-archive text-purple-600",
        "jpg" | "jpeg" | "png" | "gif" | "bmp" | "svg" | "webp" => {
            "fas fa-file-image text-pink-600"
        }
        "mp3" | "wav" | "flac" | "aac" | "ogg" => "fas fa-file-audio text-green-600",
        "mp4" | "avi" | "mkv" | "mov" | "wmv" | "flv" => "fas fa-file-video text-red-600",
        "html" | "htm" | "css" | "js" | "json" | "xml" => "fas fa-file-code text-blue-600",
        "go" | "py" | "java" | "cpp" | "c" | "h" | "php" | "rb" | "rs" => {
            "fas fa-file-code text-green-600"
        }
        _ => "fas fa-file text-gray-600",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_type_uses_table_case_insensitively() {
        assert_eq!(content_type("index.HTML"), "text/html");
        assert_eq!(content_type("song.mp3"), "audio/mpeg");
        assert_eq!(content_type("archive.zip"), "application/zip");
    }

    #[test]
    fn content_type_falls_back_to_octet_stream() {
        assert_eq!(content_type("blob"), "application/octet-stream");
        assert_eq!(
            content_type("data.unknownext"),
            "application/octet-stream"
        );
    }

    #[test]
    fn icon_for_directories_and_files() {
        assert_eq!(icon("src", true), "fas fa-folder text-blue-500");
        assert_eq!(icon("main.rs", false), "fas fa-file-code text-green-600");
        assert_eq!(icon("photo.JPG", false), "fas fa-file-image text-pink-600");
        assert_eq!(icon("noext", false), "fas fa-file text-gray-600");
    }
}
