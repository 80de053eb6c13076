//! 目录列表模型：HTML 浏览页与 JSON API 共用。

use chrono::{DateTime, Utc};
use std::cmp::Ordering;
use tokio::fs;

use crate::classify;
use crate::storage::{ResolvedPath, Storage, StorageError};

pub const LISTING_TITLE: &str = "LanShare - File Browser";

const SIZE_UNITS: [char; 6] = ['K', 'M', 'G', 'T', 'P', 'E'];

#[derive(Clone, Debug)]
pub struct ListingEntry {
    pub name: String,
    pub path: String,
    pub size: u64,
    pub modified: Option<DateTime<Utc>>,
    pub is_dir: bool,
    pub icon: &'static str,
    pub size_label: String,
}

#[derive(Debug)]
pub struct ListingPage {
    pub title: String,
    pub current_path: String,
    pub parent_path: Option<String>,
    pub entries: Vec<ListingEntry>,
    pub server_url: String,
}

impl ListingPage {
    pub fn has_parent(&self) -> bool {
        self.parent_path.is_some()
    }
}

/// 读取目录并构建排序后的列表；`include_hidden` 为 false 时跳过以 `.` 开头的条目。
/// 指向共享根目录之外（或已失效）的符号链接不会出现在列表中。
pub async fn list_directory(
    storage: &Storage,
    dir: &ResolvedPath,
    server_url: &str,
    include_hidden: bool,
) -> Result<ListingPage, StorageError> {
    let mut reader = fs::read_dir(dir.fs_path()).await?;
    let mut entries = Vec::new();

    while let Some(entry) = reader.next_entry().await? {
        let name = entry.file_name().to_string_lossy().to_string();
        if !include_hidden && name.starts_with('.') {
            continue;
        }
        let path = child_url_path(dir.url_path(), &name);
        let Ok(file_type) = entry.file_type().await else {
            continue;
        };
        if file_type.is_symlink() && storage.resolve_checked(&path, false).await.is_err() {
            continue;
        }
        // 条目可能在读取期间被删除
        let Ok(metadata) = fs::metadata(entry.path()).await else {
            continue;
        };
        let is_dir = metadata.is_dir();
        let size = metadata.len();
        entries.push(ListingEntry {
            path,
            size,
            modified: metadata.modified().ok().map(DateTime::<Utc>::from),
            is_dir,
            icon: classify::icon(&name, is_dir),
            size_label: format_size(size, is_dir),
            name,
        });
    }

    sort_entries(&mut entries);

    Ok(ListingPage {
        title: LISTING_TITLE.to_string(),
        current_path: dir.url_path().to_string(),
        parent_path: parent_url_path(dir.url_path()),
        entries,
        server_url: server_url.to_string(),
    })
}

/// 目录优先，同类按名称不区分大小写排序；稳定排序保证同名条目保持读取顺序。
pub fn sort_entries(entries: &mut [ListingEntry]) {
    entries.sort_by(|a, b| match (a.is_dir, b.is_dir) {
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        _ => a.name.to_lowercase().cmp(&b.name.to_lowercase()),
    });
}

/// 人类可读的文件大小，目录显示 `-`。
pub fn format_size(size: u64, is_dir: bool) -> String {
    if is_dir {
        return "-".to_string();
    }

    const UNIT: u64 = 1024;
    if size < UNIT {
        return format!("{size} B");
    }

    let mut div = UNIT;
    let mut exp = 0;
    let mut n = size / UNIT;
    while n >= UNIT && exp < SIZE_UNITS.len() - 1 {
        div *= UNIT;
        exp += 1;
        n /= UNIT;
    }

    format!("{:.1} {}B", size as f64 / div as f64, SIZE_UNITS[exp])
}

fn child_url_path(parent: &str, name: &str) -> String {
    if parent == "/" {
        format!("/{name}")
    } else {
        format!("{parent}/{name}")
    }
}

fn parent_url_path(current: &str) -> Option<String> {
    if current == "/" {
        return None;
    }
    match current.rfind('/') {
        Some(0) | None => Some("/".to_string()),
        Some(index) => Some(current[..index].to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::Storage;
    use tempfile::tempdir;

    fn entry(name: &str, is_dir: bool) -> ListingEntry {
        ListingEntry {
            name: name.to_string(),
            path: format!("/{name}"),
            size: 0,
            modified: None,
            is_dir,
            icon: classify::icon(name, is_dir),
            size_label: format_size(0, is_dir),
        }
    }

    #[test]
    fn format_size_boundaries() {
        assert_eq!(format_size(0, false), "0 B");
        assert_eq!(format_size(1023, false), "1023 B");
        assert_eq!(format_size(1024, false), "1.0 KB");
        assert_eq!(format_size(1536, false), "1.5 KB");
        assert_eq!(format_size(1_048_576, false), "1.0 MB");
        assert_eq!(format_size(u64::MAX, false), "16.0 EB");
        assert_eq!(format_size(4096, true), "-");
    }

    #[test]
    fn sort_puts_directories_first_case_insensitive() {
        let mut entries = vec![
            entry("b.txt", false),
            entry("Zeta", true),
            entry("A.txt", false),
            entry("alpha", true),
        ];
        sort_entries(&mut entries);
        let names: Vec<_> = entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, ["alpha", "Zeta", "A.txt", "b.txt"]);
    }

    #[test]
    fn sort_is_stable_for_equal_names() {
        let mut entries = vec![entry("Readme", false), entry("README", false)];
        sort_entries(&mut entries);
        assert_eq!(entries[0].name, "Readme");
        assert_eq!(entries[1].name, "README");
    }

    #[test]
    fn parent_paths() {
        assert_eq!(parent_url_path("/"), None);
        assert_eq!(parent_url_path("/sub").as_deref(), Some("/"));
        assert_eq!(parent_url_path("/a/b").as_deref(), Some("/a"));
    }

    #[tokio::test]
    async fn list_directory_orders_and_filters_hidden() {
        let temp = tempdir().expect("tempdir");
        std::fs::write(temp.path().join("a.txt"), b"hello").expect("write");
        std::fs::write(temp.path().join(".hidden"), b"x").expect("write");
        std::fs::create_dir(temp.path().join("sub")).expect("mkdir");

        let storage = Storage::open(temp.path()).await.expect("open");
        let root = storage.resolve("/").expect("resolve");

        let page = list_directory(&storage, &root, "http://host:8080", true)
            .await
            .expect("list");
        let names: Vec<_> = page.entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, ["sub", ".hidden", "a.txt"]);
        assert!(!page.has_parent());
        assert_eq!(page.server_url, "http://host:8080");

        let page = list_directory(&storage, &root, "", false).await.expect("list");
        let names: Vec<_> = page.entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, ["sub", "a.txt"]);
        let file = &page.entries[1];
        assert_eq!(file.path, "/a.txt");
        assert_eq!(file.size, 5);
        assert_eq!(file.size_label, "5 B");
        assert_eq!(page.entries[0].size_label, "-");
    }

    #[tokio::test]
    async fn list_directory_is_idempotent() {
        let temp = tempdir().expect("tempdir");
        for name in ["b", "C", "a"] {
            std::fs::write(temp.path().join(name), name).expect("write");
        }
        let storage = Storage::open(temp.path()).await.expect("open");
        let root = storage.resolve("/").expect("resolve");

        let first = list_directory(&storage, &root, "", true).await.expect("list");
        let second = list_directory(&storage, &root, "", true).await.expect("list");
        let names = |page: &ListingPage| {
            page.entries
                .iter()
                .map(|e| e.name.clone())
                .collect::<Vec<_>>()
        };
        assert_eq!(names(&first), names(&second));
        assert_eq!(names(&first), ["a", "b", "C"]);
    }

    #[tokio::test]
    async fn nested_listing_has_parent() {
        let temp = tempdir().expect("tempdir");
        std::fs::create_dir_all(temp.path().join("sub/inner")).expect("mkdir");
        let storage = Storage::open(temp.path()).await.expect("open");
        let sub = storage.resolve("/sub").expect("resolve");

        let page = list_directory(&storage, &sub, "", true).await.expect("list");
        assert_eq!(page.current_path, "/sub");
        assert_eq!(page.parent_path.as_deref(), Some("/"));
        assert_eq!(page.entries[0].path, "/sub/inner");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn symlinks_leaving_the_root_are_not_listed() {
        use std::os::unix::fs::symlink;

        let temp = tempdir().expect("tempdir");
        let root = temp.path().join("root");
        std::fs::create_dir_all(&root).expect("mkdir");
        let outside = temp.path().join("outside.txt");
        std::fs::write(&outside, b"secret contents").expect("write");
        std::fs::write(root.join("inside.txt"), b"ok").expect("write");
        symlink(&outside, root.join("escape")).expect("symlink");
        symlink(root.join("inside.txt"), root.join("alias")).expect("symlink");
        symlink(root.join("gone"), root.join("dangling")).expect("symlink");

        let storage = Storage::open(&root).await.expect("open");
        let dir = storage.resolve("/").expect("resolve");
        let page = list_directory(&storage, &dir, "", true).await.expect("list");
        let names: Vec<_> = page.entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, ["alias", "inside.txt"]);
        assert_eq!(page.entries[0].size, 2);
    }
}
