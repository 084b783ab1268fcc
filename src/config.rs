use crate::error::{AppError, AppResult, ConfigError, FileError};
use serde::Deserialize;
use std::path::Path;
use std::str::FromStr;

/// 程序配置文件
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// 待解析的 docx 所在目录
    pub input_dir: String,
    /// 解析结果 JSON 输出目录
    pub output_dir: String,
    /// 图片存放根目录（每个任务一个子目录）
    pub image_dir: String,
    /// 图片访问路径前缀
    pub image_url_prefix: String,
    /// 上传文件大小上限（字节）
    pub max_file_size: u64,
    /// 任务记录保留时长（秒）
    pub task_ttl_secs: i64,
    /// 是否显示详细日志
    pub verbose_logging: bool,
    /// 输出日志文件
    pub output_log_file: String,
    /// 填空题中的 (1)(2) 是否拆分为独立小题
    pub preserve_fill_in_sub_questions: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            input_dir: "input_docx".to_string(),
            output_dir: "output_json".to_string(),
            image_dir: "./storage/images".to_string(),
            image_url_prefix: "/api/paper/images".to_string(),
            max_file_size: 10 * 1024 * 1024,
            task_ttl_secs: 3600,
            verbose_logging: false,
            output_log_file: "output.txt".to_string(),
            preserve_fill_in_sub_questions: false,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let default = Self::default();
        Self {
            input_dir: std::env::var("INPUT_DIR").unwrap_or(default.input_dir),
            output_dir: std::env::var("OUTPUT_DIR").unwrap_or(default.output_dir),
            image_dir: std::env::var("IMAGE_DIR").unwrap_or(default.image_dir),
            image_url_prefix: std::env::var("IMAGE_URL_PREFIX").unwrap_or(default.image_url_prefix),
            max_file_size: env_or("MAX_FILE_SIZE", default.max_file_size),
            task_ttl_secs: env_or("TASK_TTL_SECS", default.task_ttl_secs),
            verbose_logging: env_or("VERBOSE_LOGGING", default.verbose_logging),
            output_log_file: std::env::var("OUTPUT_LOG_FILE").unwrap_or(default.output_log_file),
            preserve_fill_in_sub_questions: env_or("PRESERVE_FILL_IN_SUB_QUESTIONS", default.preserve_fill_in_sub_questions),
        }
    }

    /// 从 TOML 文件加载配置，缺省字段使用默认值
    pub fn from_file(path: &Path) -> AppResult<Self> {
        let display = path.display().to_string();
        if !path.exists() {
            return Err(AppError::File(FileError::NotFound { path: display }));
        }
        let content = std::fs::read_to_string(path)
            .map_err(|e| AppError::file_read_failed(display.clone(), e))?;
        toml::from_str(&content).map_err(|source| {
            AppError::File(FileError::TomlParseFailed {
                path: display,
                source,
            })
        })
    }

    /// 优先读取 `PAPER_PARSER_CONFIG` 指定的 TOML 文件，否则读取环境变量
    pub fn load() -> AppResult<Self> {
        match std::env::var("PAPER_PARSER_CONFIG") {
            Ok(path) => Self::from_file(Path::new(&path)),
            Err(_) => Ok(Self::from_env()),
        }
    }
}

/// 读取并解析环境变量；未设置时用默认值，解析失败时告警后用默认值
fn env_or<T: FromStr>(var_name: &str, default: T) -> T {
    let Ok(value) = std::env::var(var_name) else {
        return default;
    };
    match value.trim().parse() {
        Ok(parsed) => parsed,
        Err(_) => {
            let err = ConfigError::EnvVarParseFailed {
                var_name: var_name.to_string(),
                value,
                expected_type: std::any::type_name::<T>().to_string(),
            };
            tracing::warn!("⚠️ {}，使用默认值", err);
            default
        }
    }
}
