//! # Config 模块
//!
//! 宿主配置管理，集中管理所有配置项。
//!
//! ## 配置优先级
//!
//! 1. 命令行参数（最高）
//! 2. 配置文件 (config.json)
//! 3. 默认值（最低）

use serde::{Deserialize, Serialize};
use stage_runtime::DirectorConfig;
use std::fs;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;
use tracing::{info, warn};

/// 宿主配置
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HostConfig {
    /// 视图配置
    #[serde(default)]
    pub window: WindowConfig,

    /// 日志配置
    #[serde(default)]
    pub logging: LoggingConfig,

    /// 运行配置
    #[serde(default)]
    pub run: RunConfig,

    /// 导演配置
    #[serde(default)]
    pub director: DirectorConfig,
}

/// 视图配置
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WindowConfig {
    /// 视图宽度（点）
    #[serde(default = "default_window_width")]
    pub width: u32,

    /// 视图高度（点）
    #[serde(default = "default_window_height")]
    pub height: u32,
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingConfig {
    /// 最高日志级别（trace/debug/info/warn/error）
    #[serde(default = "default_log_level")]
    pub level: String,
}

/// 运行配置
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunConfig {
    /// 最多运行的帧数，`None` 表示运行到导演结束
    #[serde(default = "default_max_frames")]
    pub max_frames: Option<u32>,

    /// 每帧推进的时间（秒）
    #[serde(default = "default_frame_time")]
    pub frame_time: f32,
}

// 默认值函数
fn default_window_width() -> u32 {
    960
}

fn default_window_height() -> u32 {
    640
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_max_frames() -> Option<u32> {
    Some(3600)
}

fn default_frame_time() -> f32 {
    1.0 / 60.0
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            window: WindowConfig::default(),
            logging: LoggingConfig::default(),
            run: RunConfig::default(),
            director: DirectorConfig::default(),
        }
    }
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            width: default_window_width(),
            height: default_window_height(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            max_frames: default_max_frames(),
            frame_time: default_frame_time(),
        }
    }
}

impl HostConfig {
    /// 加载配置文件
    ///
    /// 如果文件不存在或解析失败，返回默认配置并记录警告。
    pub fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();

        if !path.exists() {
            warn!(path = %path.display(), "配置文件不存在，使用默认配置");
            return Self::default();
        }

        match fs::read_to_string(path) {
            Ok(content) => match serde_json::from_str(&content) {
                Ok(config) => {
                    info!(path = %path.display(), "配置文件加载成功");
                    config
                }
                Err(e) => {
                    warn!(error = %e, "配置文件解析失败，使用默认配置");
                    Self::default()
                }
            },
            Err(e) => {
                warn!(error = %e, "配置文件读取失败，使用默认配置");
                Self::default()
            }
        }
    }

    /// 保存配置到文件
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| ConfigError::SerializationFailed(e.to_string()))?;

        fs::write(path, json).map_err(|e| ConfigError::IoError(e.to_string()))?;

        Ok(())
    }

    /// 解析后的日志级别
    pub fn log_level(&self) -> Result<tracing::Level, ConfigError> {
        tracing::Level::from_str(&self.logging.level).map_err(|_| {
            ConfigError::ValidationFailed(format!("未知的日志级别: {}", self.logging.level))
        })
    }

    /// 验证配置有效性
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.window.width == 0 || self.window.height == 0 {
            return Err(ConfigError::ValidationFailed(format!(
                "视图尺寸必须大于 0: {}x{}",
                self.window.width, self.window.height
            )));
        }

        if !(self.run.frame_time.is_finite() && self.run.frame_time > 0.0) {
            return Err(ConfigError::ValidationFailed(format!(
                "帧时间必须是正数: {}",
                self.run.frame_time
            )));
        }

        if self.run.max_frames == Some(0) {
            return Err(ConfigError::ValidationFailed(
                "max_frames 不能为 0".to_string(),
            ));
        }

        self.log_level()?;

        self.director
            .validate()
            .map_err(|e| ConfigError::ValidationFailed(e.to_string()))
    }
}

/// 配置错误
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ConfigError {
    /// 序列化失败
    #[error("配置序列化失败: {0}")]
    SerializationFailed(String),
    /// IO 错误
    #[error("配置 IO 错误: {0}")]
    IoError(String),
    /// 验证失败
    #[error("配置验证失败: {0}")]
    ValidationFailed(String),
}
