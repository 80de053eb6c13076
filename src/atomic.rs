//! 上传写入：先写同目录临时文件，完成后再重命名到目标位置。

use std::io;
use std::path::{Path, PathBuf};
use tokio::fs::{self, File};
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

/// 写入中的上传文件，失败时调用 [`AtomicFile::cleanup`] 删除残留。
pub struct AtomicFile {
    target: PathBuf,
    temp_path: PathBuf,
    file: File,
}

impl AtomicFile {
    /// 在目标路径同目录创建隐藏临时文件。
    pub async fn new(target: &Path) -> io::Result<Self> {
        let parent = target
            .parent()
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "target has no parent"))?;
        let base = target
            .file_name()
            .map(|name| name.to_string_lossy())
            .unwrap_or_else(|| "upload".into());
        let temp_path = parent.join(format!(".{base}.part.{}", Uuid::new_v4()));
        let file = File::create(&temp_path).await?;
        Ok(Self {
            target: target.to_path_buf(),
            temp_path,
            file,
        })
    }

    pub async fn write_all(&mut self, chunk: &[u8]) -> io::Result<()> {
        self.file.write_all(chunk).await
    }

    /// 放弃写入并删除临时文件。
    pub async fn cleanup(self) {
        drop(self.file);
        let _ = fs::remove_file(&self.temp_path).await;
    }

    /// 刷盘后替换目标文件。
    pub async fn finalize(mut self) -> io::Result<()> {
        let result = async {
            self.file.flush().await?;
            self.file.sync_all().await
        }
        .await;
        if let Err(err) = result {
            self.cleanup().await;
            return Err(err);
        }
        drop(self.file);

        if let Err(err) = fs::rename(&self.temp_path, &self.target).await {
            #[cfg(windows)]
            {
                if fs::remove_file(&self.target).await.is_ok()
                    && fs::rename(&self.temp_path, &self.target).await.is_ok()
                {
                    return Ok(());
                }
            }
            let _ = fs::remove_file(&self.temp_path).await;
            return Err(err);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::AtomicFile;
    use tempfile::tempdir;

    #[tokio::test]
    async fn finalize_replaces_target() {
        let temp = tempdir().expect("tempdir");
        let target = temp.path().join("out.txt");
        std::fs::write(&target, b"old").expect("write");

        let mut file = AtomicFile::new(&target).await.expect("create");
        file.write_all(b"new contents").await.expect("write");
        file.finalize().await.expect("finalize");

        assert_eq!(std::fs::read(&target).expect("read"), b"new contents");
        assert_eq!(std::fs::read_dir(temp.path()).expect("read dir").count(), 1);
    }

    #[tokio::test]
    async fn cleanup_leaves_no_trace() {
        let temp = tempdir().expect("tempdir");
        let target = temp.path().join("out.txt");

        let mut file = AtomicFile::new(&target).await.expect("create");
        file.write_all(b"partial").await.expect("write");
        file.cleanup().await;

        assert!(!target.exists());
        assert_eq!(std::fs::read_dir(temp.path()).expect("read dir").count(), 0);
    }
}
