use thiserror::Error;

/// 应用程序错误类型
#[derive(Debug, Error)]
pub enum AppError {
    /// 文档容器读取错误
    #[error("文档错误: {0}")]
    Document(#[from] DocumentError),
    /// 图片提取错误
    #[error("图片错误: {0}")]
    Image(#[from] ImageError),
    /// 文件操作错误
    #[error("文件错误: {0}")]
    File(#[from] FileError),
    /// 配置错误
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),
    /// 任务记录错误
    #[error("任务错误: {0}")]
    Task(#[from] TaskError),
    /// 其他错误（用于包装第三方库错误）
    #[error("错误: {0}")]
    Other(String),
}

/// 文档容器读取错误
#[derive(Debug, Error)]
pub enum DocumentError {
    /// 不是合法的 zip 容器
    #[error("无法打开文档容器: {source}")]
    InvalidContainer {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 容器中缺少必要的部件
    #[error("文档缺少部件: {part}")]
    MissingPart { part: String },
    /// XML 解析失败
    #[error("XML解析失败 ({part}): {source}")]
    MalformedXml {
        part: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 不支持的文件类型
    #[error("只支持 .docx 文件: {path}")]
    UnsupportedFormat { path: String },
    /// 文件过大
    #[error("文件大小 {size} 字节超过上限 {limit} 字节")]
    TooLarge { size: u64, limit: u64 },
}

/// 图片提取错误
#[derive(Debug, Error)]
pub enum ImageError {
    /// 创建图片目录失败
    #[error("无法创建图片目录 ({path}): {source}")]
    DirectoryCreateFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// 写入图片失败
    #[error("写入图片失败 ({path}): {source}")]
    WriteFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// 文件操作错误
#[derive(Debug, Error)]
pub enum FileError {
    /// 文件不存在
    #[error("文件不存在: {path}")]
    NotFound { path: String },
    /// 读取文件失败
    #[error("读取文件失败 ({path}): {source}")]
    ReadFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// 写入文件失败
    #[error("写入文件失败 ({path}): {source}")]
    WriteFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// TOML 解析失败
    #[error("TOML解析失败 ({path}): {source}")]
    TomlParseFailed {
        path: String,
        #[source]
        source: toml::de::Error,
    },
    /// 目录不存在
    #[error("目录不存在: {path}")]
    DirectoryNotFound { path: String },
}

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 环境变量解析失败
    #[error("环境变量 {var_name} 解析失败: 值 '{value}' 无法转换为 {expected_type}")]
    EnvVarParseFailed {
        var_name: String,
        value: String,
        expected_type: String,
    },
}

/// 任务记录错误
#[derive(Debug, Error)]
pub enum TaskError {
    /// 任务不存在或已过期
    #[error("任务不存在或已过期: {task_id}")]
    NotFound { task_id: String },
}

// ========== 从常见错误类型转换 ==========

impl From<zip::result::ZipError> for AppError {
    fn from(err: zip::result::ZipError) -> Self {
        AppError::Document(DocumentError::InvalidContainer {
            source: Box::new(err),
        })
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Other(format!("JSON序列化失败: {}", err))
    }
}

// ========== 便捷构造函数 ==========

impl AppError {
    /// 创建文件读取错误
    pub fn file_read_failed(path: impl Into<String>, source: std::io::Error) -> Self {
        AppError::File(FileError::ReadFailed {
            path: path.into(),
            source,
        })
    }

    /// 创建文件写入错误
    pub fn file_write_failed(path: impl Into<String>, source: std::io::Error) -> Self {
        AppError::File(FileError::WriteFailed {
            path: path.into(),
            source,
        })
    }

    /// 创建文档缺少部件错误
    pub fn missing_part(part: impl Into<String>) -> Self {
        AppError::Document(DocumentError::MissingPart { part: part.into() })
    }

    /// 创建 XML 解析错误
    pub fn malformed_xml(
        part: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        AppError::Document(DocumentError::MalformedXml {
            part: part.into(),
            source: Box::new(source),
        })
    }
}

// ========== Result 类型别名 ==========

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;
