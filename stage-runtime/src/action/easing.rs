//! # Easing 模块
//!
//! 缓动函数库，供 `Ease` 动作对子动作的进度做时间重映射。

use std::f32::consts::PI;

use serde::{Deserialize, Serialize};

/// 缓动函数类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum EasingFunction {
    /// 线性（匀速）
    #[default]
    Linear,
    /// 缓入（三次）
    EaseIn,
    /// 缓出（三次）
    EaseOut,
    /// 缓入缓出（三次）
    EaseInOut,
    /// 二次缓入
    EaseInQuad,
    /// 二次缓出
    EaseOutQuad,
    /// 二次缓入缓出
    EaseInOutQuad,
    /// 正弦缓入
    EaseInSine,
    /// 正弦缓出
    EaseOutSine,
    /// 正弦缓入缓出
    EaseInOutSine,
    /// 弹性缓入
    EaseInElastic,
    /// 弹性缓出
    EaseOutElastic,
    /// 弹跳缓入
    EaseInBounce,
    /// 弹跳缓出
    EaseOutBounce,
}

impl EasingFunction {
    /// 计算缓动值
    ///
    /// 输入先被限制在 0.0 - 1.0；所有曲线都满足 `apply(0) = 0`、`apply(1) = 1`，
    /// 弹性曲线在中途会越过该区间。
    pub fn apply(&self, t: f32) -> f32 {
        let t = t.clamp(0.0, 1.0);

        match self {
            EasingFunction::Linear => t,
            EasingFunction::EaseIn => t * t * t,
            EasingFunction::EaseOut => 1.0 - (1.0 - t).powi(3),
            EasingFunction::EaseInOut => {
                if t < 0.5 {
                    4.0 * t * t * t
                } else {
                    1.0 - (-2.0 * t + 2.0).powi(3) / 2.0
                }
            }
            EasingFunction::EaseInQuad => t * t,
            EasingFunction::EaseOutQuad => 1.0 - (1.0 - t) * (1.0 - t),
            EasingFunction::EaseInOutQuad => {
                if t < 0.5 {
                    2.0 * t * t
                } else {
                    1.0 - (-2.0 * t + 2.0).powi(2) / 2.0
                }
            }
            EasingFunction::EaseInSine => 1.0 - (t * PI / 2.0).cos(),
            EasingFunction::EaseOutSine => (t * PI / 2.0).sin(),
            EasingFunction::EaseInOutSine => -((PI * t).cos() - 1.0) / 2.0,
            EasingFunction::EaseInElastic => 1.0 - ease_out_elastic(1.0 - t),
            EasingFunction::EaseOutElastic => ease_out_elastic(t),
            EasingFunction::EaseInBounce => 1.0 - ease_out_bounce(1.0 - t),
            EasingFunction::EaseOutBounce => ease_out_bounce(t),
        }
    }

    /// 镜像曲线：`mirrored().apply(s) == 1 - apply(1 - s)`
    ///
    /// 反向播放一个缓动动作时，用镜像曲线才能让反向轨迹与正向轨迹重合。
    pub fn mirrored(&self) -> EasingFunction {
        match self {
            EasingFunction::EaseIn => EasingFunction::EaseOut,
            EasingFunction::EaseOut => EasingFunction::EaseIn,
            EasingFunction::EaseInQuad => EasingFunction::EaseOutQuad,
            EasingFunction::EaseOutQuad => EasingFunction::EaseInQuad,
            EasingFunction::EaseInSine => EasingFunction::EaseOutSine,
            EasingFunction::EaseOutSine => EasingFunction::EaseInSine,
            EasingFunction::EaseInElastic => EasingFunction::EaseOutElastic,
            EasingFunction::EaseOutElastic => EasingFunction::EaseInElastic,
            EasingFunction::EaseInBounce => EasingFunction::EaseOutBounce,
            EasingFunction::EaseOutBounce => EasingFunction::EaseInBounce,
            symmetric => *symmetric,
        }
    }

    /// 全部变体，按声明顺序
    pub const ALL: [EasingFunction; 14] = [
        EasingFunction::Linear,
        EasingFunction::EaseIn,
        EasingFunction::EaseOut,
        EasingFunction::EaseInOut,
        EasingFunction::EaseInQuad,
        EasingFunction::EaseOutQuad,
        EasingFunction::EaseInOutQuad,
        EasingFunction::EaseInSine,
        EasingFunction::EaseOutSine,
        EasingFunction::EaseInOutSine,
        EasingFunction::EaseInElastic,
        EasingFunction::EaseOutElastic,
        EasingFunction::EaseInBounce,
        EasingFunction::EaseOutBounce,
    ];
}

/// 弹性缓出
fn ease_out_elastic(t: f32) -> f32 {
    if t == 0.0 {
        0.0
    } else if t == 1.0 {
        1.0
    } else {
        let c4 = (2.0 * PI) / 3.0;
        2.0_f32.powf(-10.0 * t) * ((t * 10.0 - 0.75) * c4).sin() + 1.0
    }
}

/// 弹跳缓出
fn ease_out_bounce(t: f32) -> f32 {
    let n1 = 7.5625;
    let d1 = 2.75;

    if t < 1.0 / d1 {
        n1 * t * t
    } else if t < 2.0 / d1 {
        let t = t - 1.5 / d1;
        n1 * t * t + 0.75
    } else if t < 2.5 / d1 {
        let t = t - 2.25 / d1;
        n1 * t * t + 0.9375
    } else {
        let t = t - 2.625 / d1;
        n1 * t * t + 0.984375
    }
}
