//! 共享根目录与请求路径解析：所有文件系统访问都必须经过这里。

use std::io;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::ErrorKind;

/// 对外共享的目录树（SharedRoot）。
#[derive(Clone, Debug)]
pub struct Storage {
    root: PathBuf,
}

/// 已确认位于共享根目录内的路径。只能由 [`Storage`] 构造。
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedPath {
    url_path: String,
    fs_path: PathBuf,
}

impl ResolvedPath {
    /// 规范化后的 URL 路径，始终以 `/` 开头。
    pub fn url_path(&self) -> &str {
        &self.url_path
    }

    pub fn fs_path(&self) -> &Path {
        &self.fs_path
    }

    pub fn is_root(&self) -> bool {
        self.url_path == "/"
    }

    /// 最后一个路径段；根目录返回 `None`。
    pub fn file_name(&self) -> Option<&str> {
        self.url_path.rsplit('/').next().filter(|name| !name.is_empty())
    }
}

impl Storage {
    /// 以已规范化的绝对路径作为根目录。
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    /// 规范化根目录并确认它是一个目录。
    pub async fn open(root: impl AsRef<Path>) -> io::Result<Self> {
        let root = fs::canonicalize(root.as_ref()).await?;
        let metadata = fs::metadata(&root).await?;
        if !metadata.is_dir() {
            return Err(io::Error::new(
                ErrorKind::InvalidInput,
                format!("{} is not a directory", root.display()),
            ));
        }
        Ok(Self::new(root))
    }

    pub fn root_path(&self) -> &Path {
        &self.root
    }

    /// 纯词法解析，不访问文件系统。
    pub fn resolve(&self, url_path: &str) -> Result<ResolvedPath, StorageError> {
        let segments = normalize_segments(url_path)?;
        let mut fs_path = self.root.clone();
        for segment in &segments {
            fs_path.push(segment);
        }
        if !is_descendant(&fs_path, &self.root) {
            return Err(StorageError::InvalidPath);
        }
        Ok(ResolvedPath {
            url_path: format!("/{}", segments.join("/")),
            fs_path,
        })
    }

    /// 词法解析后再做规范路径包含检查，拒绝指向根目录之外的符号链接。
    pub async fn resolve_checked(
        &self,
        url_path: &str,
        allow_missing_leaf: bool,
    ) -> Result<ResolvedPath, StorageError> {
        let resolved = self.resolve(url_path)?;
        self.ensure_contained(&resolved.fs_path, allow_missing_leaf)
            .await?;
        Ok(resolved)
    }

    /// 在 `dir` 下解析单个文件名，文件名不能包含分隔符或 `.`/`..`。
    pub fn resolve_child(
        &self,
        dir: &ResolvedPath,
        name: &str,
    ) -> Result<ResolvedPath, StorageError> {
        if name.is_empty()
            || name == "."
            || name == ".."
            || name.contains(['/', '\\', '\0'])
        {
            return Err(StorageError::InvalidPath);
        }
        let joined = if dir.is_root() {
            format!("/{name}")
        } else {
            format!("{}/{name}", dir.url_path)
        };
        self.resolve(&joined)
    }

    async fn ensure_contained(
        &self,
        target: &Path,
        allow_missing_leaf: bool,
    ) -> Result<(), StorageError> {
        let mut probe = target.to_path_buf();
        loop {
            match fs::canonicalize(&probe).await {
                Ok(canonical) => {
                    if is_descendant(&canonical, &self.root) {
                        return Ok(());
                    }
                    return Err(StorageError::InvalidPath);
                }
                Err(err) if err.kind() == ErrorKind::NotFound && allow_missing_leaf => {
                    if !probe.pop() || !is_descendant(&probe, &self.root) {
                        return Err(StorageError::InvalidPath);
                    }
                }
                Err(err) => return Err(StorageError::Io(err)),
            }
        }
    }
}

/// 拆分并折叠 `.`/`..`；`..` 越过根目录即视为逃逸。
fn normalize_segments(url_path: &str) -> Result<Vec<&str>, StorageError> {
    let mut segments = Vec::new();
    for segment in url_path.split(['/', '\\']) {
        match segment {
            "" | "." => continue,
            ".." => {
                if segments.pop().is_none() {
                    return Err(StorageError::InvalidPath);
                }
            }
            value if value.contains('\0') => return Err(StorageError::InvalidPath),
            value => segments.push(value),
        }
    }
    Ok(segments)
}

/// 按路径组件比较，`/share-evil` 不会被当作 `/share` 的后代。
fn is_descendant(path: &Path, root: &Path) -> bool {
    path.starts_with(root)
}

#[derive(Debug)]
pub enum StorageError {
    InvalidPath,
    Io(io::Error),
}

impl From<io::Error> for StorageError {
    fn from(err: io::Error) -> Self {
        StorageError::Io(err)
    }
}
