//! 路由表：页面浏览、下载、上传、登录与 JSON API。

use axum::extract::{DefaultBodyLimit, Extension};
use axum::routing::{MethodRouter, get, post};
use axum::{Router, middleware};
use std::sync::Arc;

use crate::auth::{self, AuthConfig};
use crate::config::ShareSettings;
use crate::files;
use crate::frontend::FrontendBundle;
use crate::http;
use crate::stats::DownloadStats;
use crate::storage::Storage;
use crate::upload;

/// 组装完整的路由。提供前端构建目录时，目录浏览挂在 `/files` 下，其余路径交给前端。
pub fn build_router(
    storage: Arc<Storage>,
    auth_config: Arc<AuthConfig>,
    settings: Arc<ShareSettings>,
    stats: Arc<DownloadStats>,
    frontend: Option<FrontendBundle>,
) -> Router {
    let body_limit = match usize::try_from(settings.upload_max_size) {
        Ok(0) => DefaultBodyLimit::disable(),
        Ok(limit) => DefaultBodyLimit::max(limit),
        Err(_) => DefaultBodyLimit::disable(),
    };

    let api = Router::new()
        .route("/auth/check", get(auth::auth_check))
        .route(
            "/files",
            get(files::api_list_files).layer(middleware::from_fn(auth::require_auth)),
        )
        .fallback(files::api_not_found);

    let mut app = Router::new()
        .nest("/api", api)
        .route("/login", get(auth::login_page).post(auth::login))
        .route(
            "/upload",
            post(upload::upload_files)
                .layer(body_limit)
                .layer(middleware::from_fn(auth::require_auth)),
        );

    let browse: MethodRouter = get(files::browse).layer(middleware::from_fn(auth::require_auth));
    app = match frontend {
        Some(bundle) => app
            .route("/files", browse.clone())
            .route("/files/{*path}", browse)
            .fallback_service(bundle.service()),
        None => app.fallback_service(browse),
    };

    app.layer(middleware::from_fn(http::answer_preflight))
        .layer(middleware::from_fn(http::add_security_headers))
        .layer(Extension(storage))
        .layer(Extension(auth_config))
        .layer(Extension(settings))
        .layer(Extension(stats))
        .layer(http::build_cors_layer())
}
