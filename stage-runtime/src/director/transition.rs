//! 过渡场景

use crate::node::NodeId;

/// 过渡结束定时器的键
pub const TRANSITION_FINISH_KEY: &str = "stage.transition.finish";

/// 过渡场景的状态
///
/// 过渡场景本身位于场景栈中，在 `duration` 秒内同时持有离场与入场场景的生命周期，
/// 结束后由入场场景替换自身。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransitionState {
    /// 入场场景
    pub incoming: NodeId,
    /// 离场场景（开始过渡时正在运行的场景）
    pub outgoing: Option<NodeId>,
    /// 过渡时长（秒）
    pub duration: f32,
    /// 过渡结束时是否清理离场场景（替换为真，压栈为假）
    pub cleanup_outgoing: bool,
}
