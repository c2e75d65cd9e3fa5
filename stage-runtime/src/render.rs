//! # Render 模块
//!
//! 导演依赖的外部协作者接口：渲染器、资源缓存与触摸分发器。
//!
//! stage-runtime 不做任何实际的绘制或 IO，宿主层实现这些 trait 后注入导演。

use crate::config::Projection;
use crate::director::FrameStats;
use crate::geometry::{Size, Vec2};
use crate::node::{Node, NodeId};

/// 渲染器
pub trait Renderer {
    /// 视图尺寸（点）
    fn size_in_points(&self) -> Size;

    /// 可见区域尺寸，默认与视图尺寸相同
    fn visible_size(&self) -> Size {
        self.size_in_points()
    }

    /// 可见区域原点
    fn visible_origin(&self) -> Vec2 {
        Vec2::ZERO
    }

    fn set_viewport_in_points(&mut self, x: f32, y: f32, width: f32, height: f32);

    /// 应用投影；`z_eye` 为透视投影时眼睛到屏幕的距离
    fn set_projection(&mut self, projection: Projection, win_size: Size, z_eye: f32);

    /// 清屏并压入变换矩阵
    fn begin_frame(&mut self);

    /// 绘制一个节点，节点按先序、子节点按 z 序到达
    fn draw_node(&mut self, id: NodeId, node: &Node);

    /// 弹出变换矩阵并提交
    fn end_frame(&mut self);

    /// 绘制帧统计
    fn draw_stats(&mut self, stats: &FrameStats) {
        let _ = stats;
    }
}

/// 资源缓存
pub trait ResourceCache {
    fn name(&self) -> &str;

    /// 释放当前未被使用的资源
    fn purge_unused(&mut self);

    /// 释放全部资源
    fn purge_all(&mut self);
}

/// 触摸分发器
pub trait TouchDispatcher {
    fn set_enabled(&mut self, enabled: bool);

    fn remove_all_delegates(&mut self);
}
