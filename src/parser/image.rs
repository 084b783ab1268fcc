//! 图片登记
//!
//! 按关系顺序为每张可识别的图片分配从 1 开始的连续 ID，写入
//! `{id}_{8位内容哈希}{扩展名}`，并维护 关系ID → 图片ID 的映射。

use crate::error::{AppError, AppResult, ImageError};
use crate::models::MediaRelationship;
use image::ImageFormat;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use tracing::{debug, info, warn};

/// 已登记图片
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageInfo {
    pub image_id: u32,
    pub rel_id: String,
    pub filename: String,
    pub file_path: PathBuf,
    pub content_type: String,
    pub size: usize,
}

/// 识别出的图片格式
#[derive(Debug, Clone, PartialEq, Eq)]
struct SniffedFormat {
    content_type: String,
    extension: String,
}

impl SniffedFormat {
    fn new(content_type: &str, extension: &str) -> Self {
        Self {
            content_type: content_type.to_string(),
            extension: extension.to_string(),
        }
    }
}

/// 根据内容识别图片格式：先做格式嗅探，失败后再比对常见魔数
fn sniff_format(data: &[u8]) -> Option<SniffedFormat> {
    if let Ok(format) = image::guess_format(data) {
        let extension = match format {
            ImageFormat::Jpeg => "jpg",
            other => other.extensions_str().first().copied().unwrap_or("jpg"),
        };
        return Some(SniffedFormat::new(format.to_mime_type(), extension));
    }

    const MAGIC: [(&[u8], &str, &str); 4] = [
        (b"\xff\xd8\xff", "image/jpeg", "jpg"),
        (b"\x89PNG", "image/png", "png"),
        (b"GIF8", "image/gif", "gif"),
        (b"BM", "image/bmp", "bmp"),
    ];
    MAGIC
        .iter()
        .find(|(magic, _, _)| data.starts_with(magic))
        .map(|(_, mime, ext)| SniffedFormat::new(mime, ext))
}

/// 内容哈希的前 8 位十六进制
fn short_hash(data: &[u8]) -> String {
    Sha256::digest(data)
        .iter()
        .take(4)
        .map(|b| format!("{b:02x}"))
        .collect()
}

/// 图片登记表，每次解析独立持有
#[derive(Debug)]
pub struct ImageRegister {
    output_dir: PathBuf,
    images: Vec<ImageInfo>,
    by_rel_id: HashMap<String, u32>,
}

impl ImageRegister {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            images: Vec::new(),
            by_rel_id: HashMap::new(),
        }
    }

    /// 登记全部媒体关系，返回已登记的图片
    pub fn register_all(&mut self, media: &[MediaRelationship]) -> AppResult<&[ImageInfo]> {
        if !media.is_empty() {
            fs::create_dir_all(&self.output_dir).map_err(|source| {
                AppError::Image(ImageError::DirectoryCreateFailed {
                    path: self.output_dir.display().to_string(),
                    source,
                })
            })?;
        }

        for relationship in media {
            self.register(relationship)?;
        }

        info!(
            "🖼️ 图片登记完成: {}/{} 张可识别",
            self.images.len(),
            media.len()
        );
        Ok(&self.images)
    }

    /// 登记单张图片；无法识别的内容跳过，不占用 ID
    pub fn register(&mut self, relationship: &MediaRelationship) -> AppResult<Option<&ImageInfo>> {
        let Some(format) = sniff_format(&relationship.data) else {
            warn!(
                "⚠️ 无法识别的图片内容，已跳过: {} ({})",
                relationship.rel_id, relationship.target
            );
            return Ok(None);
        };

        if let Some(&existing) = self.by_rel_id.get(&relationship.rel_id) {
            debug!("关系 {} 已登记为图片 {}", relationship.rel_id, existing);
            return Ok(self.get_image(existing));
        }

        let image_id = self.images.len() as u32 + 1;
        let filename = format!(
            "{}_{}.{}",
            image_id,
            short_hash(&relationship.data),
            format.extension
        );
        let file_path = self.output_dir.join(&filename);

        fs::write(&file_path, &relationship.data).map_err(|source| {
            AppError::Image(ImageError::WriteFailed {
                path: file_path.display().to_string(),
                source,
            })
        })?;

        debug!("图片 {} → {}", relationship.rel_id, filename);
        self.by_rel_id.insert(relationship.rel_id.clone(), image_id);
        self.images.push(ImageInfo {
            image_id,
            rel_id: relationship.rel_id.clone(),
            filename,
            file_path,
            content_type: format.content_type,
            size: relationship.data.len(),
        });
        Ok(self.images.last())
    }

    /// 关系ID → 图片ID
    pub fn image_id_for(&self, rel_id: &str) -> Option<u32> {
        self.by_rel_id.get(rel_id).copied()
    }

    pub fn get_image(&self, image_id: u32) -> Option<&ImageInfo> {
        self.images.iter().find(|img| img.image_id == image_id)
    }

    pub fn images(&self) -> &[ImageInfo] {
        &self.images
    }

    pub fn image_count(&self) -> usize {
        self.images.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR";
    const JPEG: &[u8] = b"\xff\xd8\xff\xe0\0\x10JFIF\0";

    fn media(rel_id: &str, data: &[u8]) -> MediaRelationship {
        MediaRelationship {
            rel_id: rel_id.to_string(),
            target: format!("media/{rel_id}"),
            data: data.to_vec(),
        }
    }

    #[test]
    fn test_sequential_ids_and_filenames() {
        let dir = tempfile::tempdir().unwrap();
        let mut register = ImageRegister::new(dir.path());
        register
            .register_all(&[media("rId5", PNG), media("rId9", JPEG)])
            .unwrap();

        let first = register.get_image(1).unwrap();
        assert_eq!(first.rel_id, "rId5");
        assert_eq!(first.content_type, "image/png");
        assert!(first.filename.starts_with("1_"));
        assert!(first.filename.ends_with(".png"));
        assert_eq!(first.filename.len(), "1_".len() + 8 + ".png".len());
        assert!(first.file_path.exists());

        assert_eq!(register.image_id_for("rId9"), Some(2));
        assert!(register.get_image(2).unwrap().filename.ends_with(".jpg"));
    }

    #[test]
    fn test_unrecognized_blob_does_not_consume_id() {
        let dir = tempfile::tempdir().unwrap();
        let mut register = ImageRegister::new(dir.path());
        register
            .register_all(&[media("rId1", b"not an image at all"), media("rId2", PNG)])
            .unwrap();

        assert_eq!(register.image_count(), 1);
        assert_eq!(register.image_id_for("rId1"), None);
        assert_eq!(register.image_id_for("rId2"), Some(1));
    }

    #[test]
    fn test_magic_fallback_for_bmp() {
        let format = sniff_format(b"BM\0\0\0\0").unwrap();
        assert_eq!(format.content_type, "image/bmp");
    }

    #[test]
    fn test_short_hash_is_stable() {
        assert_eq!(short_hash(b"abc"), "ba7816bf");
    }
}
