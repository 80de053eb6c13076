//! HTTP 辅助工具：CORS、预检请求、安全头与客户端 IP。

use axum::body::Body as AxumBody;
use axum::http::{HeaderMap, HeaderValue, Method, Request, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::middleware;
use std::net::IpAddr;
use tower_http::cors::{AllowOrigin, CorsLayer};

/// 构建 CORS Layer：回显请求来源并允许携带凭据。
pub fn build_cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(AllowOrigin::mirror_request())
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .allow_credentials(true)
}

/// 任何 OPTIONS 请求直接返回 200，不经过认证与路由。
pub async fn answer_preflight(
    request: Request<AxumBody>,
    next: middleware::Next,
) -> Response {
    if request.method() == Method::OPTIONS {
        return StatusCode::OK.into_response();
    }
    next.run(request).await
}

/// 从 `x-forwarded-for` 解析客户端 IP。
pub fn extract_forwarded_ip(headers: &HeaderMap) -> Option<IpAddr> {
    headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .and_then(|value| value.parse::<IpAddr>().ok())
}

/// 综合转发头与连接信息计算客户端 IP。
pub fn resolve_client_ip(headers: &HeaderMap, connect_ip: Option<IpAddr>) -> Option<IpAddr> {
    extract_forwarded_ip(headers).or(connect_ip)
}

/// 添加基础安全响应头。
pub async fn add_security_headers(request: Request<AxumBody>, next: middleware::Next) -> Response {
    let mut response = next.run(request).await;
    response.headers_mut().insert(
        header::X_CONTENT_TYPE_OPTIONS,
        HeaderValue::from_static("nosniff"),
    );
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forwarded_ip_takes_first_hop() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("192.168.1.20, 10.0.0.1"),
        );
        assert_eq!(
            resolve_client_ip(&headers, None),
            Some("192.168.1.20".parse().unwrap())
        );
    }

    #[test]
    fn falls_back_to_connection_ip() {
        let headers = HeaderMap::new();
        let connect: IpAddr = "10.1.2.3".parse().unwrap();
        assert_eq!(resolve_client_ip(&headers, Some(connect)), Some(connect));
        assert_eq!(resolve_client_ip(&headers, None), None);
    }
}
