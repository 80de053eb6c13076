//! 进程内下载计数（不持久化）。

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;

#[derive(Clone, Debug)]
pub struct FileStats {
    pub download_count: u64,
    pub last_accessed: DateTime<Utc>,
}

/// 以 URL 路径为键的下载统计。
#[derive(Debug, Default)]
pub struct DownloadStats {
    entries: RwLock<HashMap<String, FileStats>>,
}

impl DownloadStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// 记录一次完整下载，返回更新后的统计。
    pub async fn record(&self, url_path: &str) -> FileStats {
        let mut entries = self.entries.write().await;
        let now = Utc::now();
        let entry = entries.entry(url_path.to_string()).or_insert(FileStats {
            download_count: 0,
            last_accessed: now,
        });
        entry.download_count = entry.download_count.saturating_add(1);
        entry.last_accessed = now;
        entry.clone()
    }

    pub async fn download_count(&self, url_path: &str) -> u64 {
        let entries = self.entries.read().await;
        entries
            .get(url_path)
            .map(|entry| entry.download_count)
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::DownloadStats;

    #[tokio::test]
    async fn record_increments_per_path() {
        let stats = DownloadStats::new();
        stats.record("/a.txt").await;
        let second = stats.record("/a.txt").await;
        stats.record("/b.txt").await;

        assert_eq!(second.download_count, 2);
        assert_eq!(stats.download_count("/a.txt").await, 2);
        assert_eq!(stats.download_count("/b.txt").await, 1);
        assert_eq!(stats.download_count("/missing").await, 0);
    }
}
