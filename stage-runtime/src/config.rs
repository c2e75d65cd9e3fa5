//! # Config 模块
//!
//! 导演（Director）的可序列化配置。
//!
//! 所有字段都带有 serde 默认值，缺省的 JSON 字段会回落到默认配置。

use serde::{Deserialize, Serialize};

use crate::error::DirectorError;

/// 投影模式
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Projection {
    /// 正交投影
    #[serde(rename = "2d")]
    TwoD,
    /// 透视投影（z_eye = 高度 / 1.1566）
    #[default]
    #[serde(rename = "3d")]
    ThreeD,
    /// 由渲染器自行决定
    Custom,
}

/// 帧间隔钳制
///
/// 当一帧的 dt 超过 `threshold` 时替换为 `fallback`，
/// 用于断点调试或卡顿之后避免一次性推进过多。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct DeltaClamp {
    #[serde(default = "default_clamp_threshold")]
    pub threshold: f32,
    #[serde(default = "default_animation_interval")]
    pub fallback: f32,
}

impl Default for DeltaClamp {
    fn default() -> Self {
        Self {
            threshold: default_clamp_threshold(),
            fallback: default_animation_interval(),
        }
    }
}

impl DeltaClamp {
    /// 应用钳制，返回 `(dt, 是否被钳制)`
    pub fn apply(&self, dt: f32) -> (f32, bool) {
        if dt > self.threshold {
            (self.fallback, true)
        } else {
            (dt, false)
        }
    }
}

/// 导演配置
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DirectorConfig {
    /// 目标帧间隔（秒）
    #[serde(default = "default_animation_interval")]
    pub animation_interval: f32,

    /// 暂停时使用的帧间隔（秒）
    #[serde(default = "default_paused_animation_interval")]
    pub paused_animation_interval: f32,

    /// 是否显示帧统计
    #[serde(default)]
    pub display_stats: bool,

    /// 帧统计刷新间隔（秒）
    #[serde(default = "default_stats_interval")]
    pub stats_interval: f32,

    /// dt 钳制，`None` 表示不钳制
    #[serde(default = "default_delta_clamp")]
    pub delta_clamp: Option<DeltaClamp>,

    /// 内容缩放因子（点 -> 像素）
    #[serde(default = "default_content_scale_factor")]
    pub content_scale_factor: f32,

    /// 投影模式
    #[serde(default)]
    pub projection: Projection,
}

fn default_animation_interval() -> f32 {
    1.0 / 60.0
}

fn default_paused_animation_interval() -> f32 {
    1.0 / 4.0
}

fn default_stats_interval() -> f32 {
    0.1
}

fn default_clamp_threshold() -> f32 {
    0.2
}

fn default_delta_clamp() -> Option<DeltaClamp> {
    Some(DeltaClamp::default())
}

fn default_content_scale_factor() -> f32 {
    1.0
}

impl Default for DirectorConfig {
    fn default() -> Self {
        Self {
            animation_interval: default_animation_interval(),
            paused_animation_interval: default_paused_animation_interval(),
            display_stats: false,
            stats_interval: default_stats_interval(),
            delta_clamp: default_delta_clamp(),
            content_scale_factor: default_content_scale_factor(),
            projection: Projection::default(),
        }
    }
}

impl DirectorConfig {
    /// 不做 dt 钳制的配置，主要给需要精确控制 dt 的场合使用
    pub fn unclamped() -> Self {
        Self {
            delta_clamp: None,
            ..Self::default()
        }
    }

    /// 验证配置有效性
    pub fn validate(&self) -> Result<(), DirectorError> {
        check_positive("animation_interval", self.animation_interval)?;
        check_positive("paused_animation_interval", self.paused_animation_interval)?;
        check_positive("stats_interval", self.stats_interval)?;
        check_positive("content_scale_factor", self.content_scale_factor)?;

        if let Some(clamp) = &self.delta_clamp {
            check_positive("delta_clamp.threshold", clamp.threshold)?;
            check_positive("delta_clamp.fallback", clamp.fallback)?;
        }

        Ok(())
    }
}

fn check_positive(name: &str, value: f32) -> Result<(), DirectorError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(DirectorError::InvalidConfig {
            message: format!("{name} 必须是正数，实际为 {value}"),
        })
    }
}
