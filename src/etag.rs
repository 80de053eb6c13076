//! ETag 计算与条件 GET 校验。

use axum::http::{HeaderMap, header};
use httpdate::parse_http_date;
use std::fs::Metadata;
use std::time::{SystemTime, UNIX_EPOCH};

/// 根据文件元数据生成弱 ETag。
pub fn etag_from_metadata(metadata: &Metadata) -> String {
    let size = metadata.len();
    let modified = metadata.modified().ok();
    if let Some(modified) = modified
        && let Ok(duration) = modified.duration_since(UNIX_EPOCH)
    {
        return format!(
            "W/\"{}-{}-{}\"",
            size,
            duration.as_secs(),
            duration.subsec_nanos()
        );
    }
    format!("W/\"{}\"", size)
}

/// 判断请求能否以 304 响应：If-None-Match 优先，其次 If-Modified-Since。
pub fn is_not_modified(headers: &HeaderMap, etag: &str, modified: Option<SystemTime>) -> bool {
    if let Some(value) = headers
        .get(header::IF_NONE_MATCH)
        .and_then(|v| v.to_str().ok())
    {
        return value.trim() == "*" || etag_matches(value, etag);
    }

    let since = headers
        .get(header::IF_MODIFIED_SINCE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| parse_http_date(v).ok());
    match (since, modified) {
        (Some(since), Some(modified)) => truncate_to_secs(modified) <= since,
        _ => false,
    }
}

/// If-Range 是否仍然有效（支持日期与 ETag 两种形式）。
pub fn if_range_matches(headers: &HeaderMap, etag: &str, modified: Option<SystemTime>) -> bool {
    let Some(value) = headers
        .get(header::IF_RANGE)
        .and_then(|value| value.to_str().ok())
    else {
        return true;
    };
    let value = value.trim();
    if value.starts_with("W/") || value.starts_with('"') {
        return strong_etag_matches(value, etag);
    }
    match parse_http_date(value) {
        Ok(date) => modified
            .map(|ts| truncate_to_secs(ts) <= date)
            .unwrap_or(false),
        Err(_) => false,
    }
}

// HTTP 日期只有秒级精度
fn truncate_to_secs(time: SystemTime) -> SystemTime {
    match time.duration_since(UNIX_EPOCH) {
        Ok(duration) => UNIX_EPOCH + std::time::Duration::from_secs(duration.as_secs()),
        Err(_) => time,
    }
}

// If-Range 只接受强比较，弱 ETag 永远不匹配
fn strong_etag_matches(header_value: &str, current: &str) -> bool {
    !header_value.starts_with("W/") && !current.starts_with("W/") && header_value == current
}

fn etag_matches(header_value: &str, current: &str) -> bool {
    header_value
        .split(',')
        .map(|item| item.trim())
        .any(|item| item == current)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use httpdate::fmt_http_date;
    use std::time::Duration;

    #[test]
    fn if_none_match_matches_listed_etag() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::IF_NONE_MATCH,
            HeaderValue::from_static("\"other\", W/\"5-10-0\""),
        );
        assert!(is_not_modified(&headers, "W/\"5-10-0\"", None));
        assert!(!is_not_modified(&headers, "W/\"6-10-0\"", None));
    }

    #[test]
    fn if_modified_since_ignores_subsecond_precision() {
        let modified = UNIX_EPOCH + Duration::from_millis(1_700_000_000_500);
        let mut headers = HeaderMap::new();
        let value = fmt_http_date(UNIX_EPOCH + Duration::from_secs(1_700_000_000));
        headers.insert(
            header::IF_MODIFIED_SINCE,
            HeaderValue::from_str(&value).expect("header"),
        );
        assert!(is_not_modified(&headers, "W/\"1\"", Some(modified)));

        let newer = modified + Duration::from_secs(5);
        assert!(!is_not_modified(&headers, "W/\"1\"", Some(newer)));
    }

    #[test]
    fn if_range_defaults_to_true_without_header() {
        assert!(if_range_matches(&HeaderMap::new(), "W/\"1\"", None));

        let mut headers = HeaderMap::new();
        headers.insert(header::IF_RANGE, HeaderValue::from_static("\"2\""));
        assert!(!if_range_matches(&headers, "\"1\"", None));
        assert!(if_range_matches(&headers, "\"2\"", None));
    }

    #[test]
    fn if_range_never_matches_weak_etags() {
        let mut headers = HeaderMap::new();
        headers.insert(header::IF_RANGE, HeaderValue::from_static("W/\"5-10-0\""));
        assert!(!if_range_matches(&headers, "W/\"5-10-0\"", None));

        headers.insert(header::IF_RANGE, HeaderValue::from_static("\"5-10-0\""));
        assert!(!if_range_matches(&headers, "W/\"5-10-0\"", None));
    }
}
