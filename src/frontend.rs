//! 磁盘上的前端构建产物与 SPA 回退。

use std::path::{Path, PathBuf};
use tower_http::services::{ServeDir, ServeFile};
use tracing::debug;

const INDEX_FILE: &str = "index.html";

/// 已检测到的前端构建目录（必须包含 `index.html`）。
#[derive(Clone, Debug)]
pub struct FrontendBundle {
    dir: PathBuf,
}

impl FrontendBundle {
    /// 目录存在且包含 `index.html` 时启用前端模式。
    pub async fn detect(dir: &Path) -> Option<Self> {
        let index = dir.join(INDEX_FILE);
        match tokio::fs::metadata(&index).await {
            Ok(metadata) if metadata.is_file() => Some(Self {
                dir: dir.to_path_buf(),
            }),
            _ => {
                debug!(path = ?dir, "no frontend bundle");
                None
            }
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// 静态资源服务；找不到的路径回退到 `index.html`，交给客户端路由。
    pub fn service(&self) -> ServeDir<ServeFile> {
        ServeDir::new(&self.dir).fallback(ServeFile::new(self.dir.join(INDEX_FILE)))
    }
}
