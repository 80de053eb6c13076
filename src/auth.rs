//! 访问控制：无密码时放行，有密码时校验会话 Cookie 或 Basic 认证。

use axum::Form;
use axum::extract::{Extension, Json};
use axum::http::{HeaderMap, Request, Uri};
use axum::response::{IntoResponse, Redirect, Response};
use axum::{body::Body as AxumBody, middleware};
use axum_extra::extract::{CookieJar, cookie::Cookie};
use axum_extra::headers::{Authorization, HeaderMapExt, authorization::Basic};
use cookie::time::Duration as CookieDuration;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::{AUTH_COOKIE_NAME, AUTH_COOKIE_VALUE, SESSION_MAX_AGE_SECS};
use crate::error::ApiError;

/// 启动后只读的认证配置。`password` 为 `None` 表示开放模式。
#[derive(Debug)]
pub struct AuthConfig {
    pub password: Option<String>,
}

impl AuthConfig {
    pub fn new(password: Option<String>) -> Self {
        Self { password }
    }

    pub fn is_open(&self) -> bool {
        self.password.is_none()
    }

    /// 按 Cookie、Basic 认证的顺序判断请求是否已认证。
    fn is_authenticated(&self, jar: &CookieJar, basic_password: Option<&str>) -> bool {
        let Some(password) = &self.password else {
            return true;
        };
        if jar
            .get(AUTH_COOKIE_NAME)
            .is_some_and(|cookie| cookie.value() == AUTH_COOKIE_VALUE)
        {
            return true;
        }
        // 用户名被忽略
        basic_password.is_some_and(|value| value == password)
    }
}

#[derive(Deserialize)]
pub(crate) struct LoginForm {
    password: String,
    redirect: Option<String>,
}

#[derive(Serialize)]
pub struct AuthStatus {
    authenticated: bool,
}

/// 解析 Basic 凭据；缺失或其他认证方案都视为没有凭据。
fn basic_credentials(headers: &HeaderMap) -> Option<Authorization<Basic>> {
    headers.typed_get::<Authorization<Basic>>()
}

/// 受保护路由的中间件。未认证时返回 401 登录页。
pub async fn require_auth(
    Extension(auth): Extension<Arc<AuthConfig>>,
    jar: CookieJar,
    req: Request<AxumBody>,
    next: middleware::Next,
) -> Result<Response, ApiError> {
    if auth.is_open() {
        return Ok(next.run(req).await);
    }
    let basic = basic_credentials(req.headers());
    if auth.is_authenticated(&jar, basic.as_ref().map(|header| header.password())) {
        return Ok(next.run(req).await);
    }
    Err(ApiError::Unauthorized {
        redirect: original_target(req.uri()),
        message: None,
    })
}

/// 登录表单提交：密码正确则写入会话 Cookie 并跳转。
pub async fn login(
    Extension(auth): Extension<Arc<AuthConfig>>,
    jar: CookieJar,
    Form(form): Form<LoginForm>,
) -> Result<(CookieJar, Redirect), ApiError> {
    let target = safe_redirect(form.redirect.as_deref());
    let Some(password) = &auth.password else {
        return Ok((jar, Redirect::to(&target)));
    };

    if form.password != *password {
        warn!("login failed");
        return Err(ApiError::Unauthorized {
            redirect: target,
            message: Some("Invalid password. Please try again.".into()),
        });
    }

    let cookie = Cookie::build((AUTH_COOKIE_NAME, AUTH_COOKIE_VALUE))
        .path("/")
        .http_only(true)
        .max_age(CookieDuration::seconds(SESSION_MAX_AGE_SECS))
        .build();
    info!(redirect = target, "login succeeded");
    Ok((jar.add(cookie), Redirect::to(&target)))
}

/// 直接访问登录页。
pub async fn login_page(Extension(auth): Extension<Arc<AuthConfig>>) -> Response {
    if auth.is_open() {
        return Redirect::to("/").into_response();
    }
    ApiError::Unauthorized {
        redirect: "/".into(),
        message: None,
    }
    .into_response()
}

/// 报告当前认证状态，不做拦截。
pub async fn auth_check(
    Extension(auth): Extension<Arc<AuthConfig>>,
    jar: CookieJar,
    headers: HeaderMap,
) -> Json<AuthStatus> {
    let basic = basic_credentials(&headers);
    Json(AuthStatus {
        authenticated: auth.is_authenticated(&jar, basic.as_ref().map(|header| header.password())),
    })
}

fn original_target(uri: &Uri) -> String {
    uri.path_and_query()
        .map(|value| value.as_str().to_string())
        .unwrap_or_else(|| "/".to_string())
}

/// 只接受站内绝对路径，防止开放重定向。
fn safe_redirect(value: Option<&str>) -> String {
    match value {
        Some(target)
            if target.starts_with('/')
                && !target.starts_with("//")
                && !target.starts_with("/\\") =>
        {
            target.to_string()
        }
        _ => "/".to_string(),
    }
}
