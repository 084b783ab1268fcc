use crate::error::{AppError, AppResult, DocumentError, FileError};
use std::path::{Path, PathBuf};
use tokio::fs;

/// 检查待解析文件：必须存在、扩展名为 `.docx`、大小不超过上限
///
/// 返回文件大小（字节）
pub async fn validate_docx_file(path: &Path, max_file_size: u64) -> AppResult<u64> {
    let display = path.display().to_string();

    let is_docx = path
        .extension()
        .and_then(|s| s.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("docx"));
    if !is_docx {
        return Err(DocumentError::UnsupportedFormat { path: display }.into());
    }

    let metadata = match fs::metadata(path).await {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(FileError::NotFound { path: display }.into());
        }
        Err(e) => return Err(AppError::file_read_failed(display, e)),
    };

    let size = metadata.len();
    if size > max_file_size {
        return Err(DocumentError::TooLarge {
            size,
            limit: max_file_size,
        }
        .into());
    }
    Ok(size)
}

/// 扫描文件夹中的全部 `.docx` 文件（跳过 Word 临时文件 `~$*`），按文件名排序
pub async fn load_all_docx_files(folder_path: &str) -> AppResult<Vec<PathBuf>> {
    let folder = PathBuf::from(folder_path);

    if !folder.exists() {
        return Err(FileError::DirectoryNotFound {
            path: folder_path.to_string(),
        }
        .into());
    }

    let mut files = Vec::new();
    let mut entries = fs::read_dir(&folder)
        .await
        .map_err(|e| AppError::file_read_failed(folder_path, e))?;

    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| AppError::file_read_failed(folder_path, e))?
    {
        let path = entry.path();
        let is_docx = path.extension().and_then(|s| s.to_str()) == Some("docx");
        let is_lock_file = path
            .file_name()
            .and_then(|s| s.to_str())
            .is_some_and(|name| name.starts_with("~$"));
        if is_docx && !is_lock_file {
            tracing::info!(
                "发现文档: {}",
                path.file_name().unwrap_or_default().to_string_lossy()
            );
            files.push(path);
        }
    }

    if files.is_empty() {
        tracing::warn!("在文件夹 {} 中没有找到 docx 文件", folder_path);
    }
    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_and_validate() {
        tokio_test::block_on(async {
            let dir = tempfile::tempdir().unwrap();
            std::fs::write(dir.path().join("b.docx"), b"x").unwrap();
            std::fs::write(dir.path().join("a.docx"), b"xyz").unwrap();
            std::fs::write(dir.path().join("~$a.docx"), b"lock").unwrap();
            std::fs::write(dir.path().join("notes.txt"), b"x").unwrap();

            let files = load_all_docx_files(dir.path().to_str().unwrap()).await.unwrap();
            let names: Vec<_> = files
                .iter()
                .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
                .collect();
            assert_eq!(names, vec!["a.docx", "b.docx"]);

            assert_eq!(validate_docx_file(&files[0], 10).await.unwrap(), 3);
            let err = validate_docx_file(&files[0], 2).await.unwrap_err();
            assert!(matches!(err, AppError::Document(DocumentError::TooLarge { size: 3, limit: 2 })));

            let err = validate_docx_file(&dir.path().join("notes.txt"), 10).await.unwrap_err();
            assert!(matches!(err, AppError::Document(DocumentError::UnsupportedFormat { .. })));

            let err = validate_docx_file(&dir.path().join("gone.docx"), 10).await.unwrap_err();
            assert!(matches!(err, AppError::File(FileError::NotFound { .. })));
        });
    }

    #[test]
    fn test_missing_folder() {
        let err = tokio_test::block_on(load_all_docx_files("/no/such/folder")).unwrap_err();
        assert!(matches!(err, AppError::File(FileError::DirectoryNotFound { .. })));
    }
}
