//! CLI arguments and server configuration defaults.

use clap::Parser;
use shadow_rs::formatcp;
use std::path::{Path, PathBuf};

use crate::build;
use crate::qr;

const VERSION_INFO: &str = formatcp!(
    r#"{}\ncommit_hash: {}\nbuild_time: {}\nbuild_env: {},{}"#,
    build::PKG_VERSION,
    build::SHORT_COMMIT,
    build::BUILD_TIME,
    build::RUST_VERSION,
    build::RUST_CHANNEL
);

pub const AUTH_COOKIE_NAME: &str = "auth_session";
pub const AUTH_COOKIE_VALUE: &str = "authenticated";
pub const SESSION_MAX_AGE_SECS: i64 = 24 * 60 * 60;
pub const FRONTEND_BUILD_DIR: &str = "frontend/build";
pub const FILES_PREFIX: &str = "/files";
pub const DEFAULT_UPLOAD_MAX_SIZE: u64 = 10 * 1024 * 1024 * 1024;
pub const QR_SVG_SIZE_PX: u32 = 128;

/// CLI arguments and environment configuration for the server.
#[derive(Parser, Debug)]
#[command(
    name = "lanshare",
    version = VERSION_INFO,
    about = "Share a local directory over Wi-Fi"
)]
pub struct Args {
    #[arg(
        short = 'd',
        long,
        env = "LANSHARE_DIR",
        default_value = ".",
        help = "Directory to share"
    )]
    pub dir: String,
    #[arg(
        short = 'p',
        long,
        env = "LANSHARE_PORT",
        default_value_t = 8080,
        help = "Port to run the server on"
    )]
    pub port: u16,
    #[arg(
        short = 'b',
        long,
        env = "LANSHARE_BIND",
        default_value = "0.0.0.0",
        help = "Bind address"
    )]
    pub host: String,
    #[arg(
        long,
        env = "LANSHARE_PASSWORD",
        help = "Optional password to protect access"
    )]
    pub password: Option<String>,
    #[arg(
        long,
        env = "LANSHARE_FRONTEND_DIR",
        help = "Frontend build directory (defaults to <dir>/frontend/build)"
    )]
    pub frontend_dir: Option<String>,
    #[arg(
        long,
        env = "LANSHARE_SHOW_HIDDEN",
        help = "Include dotfiles in the JSON file API"
    )]
    pub show_hidden: bool,
    #[arg(
        long,
        env = "LANSHARE_UPLOAD_MAX_SIZE",
        default_value_t = DEFAULT_UPLOAD_MAX_SIZE,
        help = "Max upload request size in bytes (0 to disable)"
    )]
    pub upload_max_size: u64,
    #[arg(long, env = "LANSHARE_NO_QR", help = "Do not print the QR code")]
    pub no_qr: bool,
}

impl Args {
    /// 空字符串视为未设置密码。
    pub fn password(&self) -> Option<String> {
        self.password.clone().filter(|value| !value.is_empty())
    }

    pub fn frontend_dir(&self, root: &Path) -> PathBuf {
        match &self.frontend_dir {
            Some(dir) => PathBuf::from(dir),
            None => root.join(FRONTEND_BUILD_DIR),
        }
    }
}

/// 启动时确定、请求处理期间只读的服务信息。
#[derive(Clone, Debug)]
pub struct ShareSettings {
    pub server_url: String,
    pub qr_svg: Option<String>,
    pub api_show_hidden: bool,
    /// 浏览页的挂载前缀：无前端时为空，有前端时为 `/files`。
    pub browse_prefix: &'static str,
    pub upload_max_size: u64,
}

impl ShareSettings {
    /// 页面内的二维码总是生成；`--no-qr` 只影响终端输出。
    pub fn new(server_url: String, args: &Args, has_frontend: bool) -> Self {
        Self {
            qr_svg: qr::render_svg(&server_url, QR_SVG_SIZE_PX),
            server_url,
            api_show_hidden: args.show_hidden,
            browse_prefix: if has_frontend { FILES_PREFIX } else { "" },
            upload_max_size: args.upload_max_size,
        }
    }
}
