//! # Behavior 模块
//!
//! 节点的用户逻辑挂载点。
//!
//! 生命周期钩子、每帧更新、定时器与动作事件都通过 [`NodeBehavior`] 投递。
//! 回调期间行为对象会从节点上暂时取出，回调拿到的 [`NodeCtx`] 可以自由修改
//! 节点树、调度器与动作管理器；场景栈操作则被记录为 [`SceneCommand`]，
//! 在当前派发结束后由导演统一执行。

use crate::action::{Action, ActionEvent, ActionId};
use crate::error::{NodeError, SchedulerError, StageResult};
use crate::scheduler::{Target, TimerSpec};
use crate::stage::{SceneCommand, Stage};

use super::id::{NodeId, NodeTag};
use super::tree::Node;

/// 节点行为
///
/// 所有方法都有空的默认实现，按需覆盖。
#[allow(unused_variables)]
pub trait NodeBehavior: 'static {
    /// 节点进入运行状态（父节点先于子节点）
    fn on_enter(&mut self, ctx: &mut NodeCtx<'_>) {}

    /// 入场过渡结束（父节点先于子节点）
    fn on_enter_transition_did_finish(&mut self, ctx: &mut NodeCtx<'_>) {}

    /// 节点离开运行状态（子节点先于父节点）
    fn on_exit(&mut self, ctx: &mut NodeCtx<'_>) {}

    /// 释放资源，之后节点不再持有定时器与动作
    fn cleanup(&mut self, ctx: &mut NodeCtx<'_>) {}

    /// 每帧更新（需先 `schedule_update`）
    fn update(&mut self, ctx: &mut NodeCtx<'_>, dt: f32) {}

    /// 定时器触发
    fn on_timer(&mut self, ctx: &mut NodeCtx<'_>, key: &str, dt: f32) {}

    /// 本节点上的动作产生了事件（回调或完成）
    fn on_action_event(&mut self, ctx: &mut NodeCtx<'_>, event: &ActionEvent) {}
}

/// 回调上下文
pub struct NodeCtx<'a> {
    pub(crate) stage: &'a mut Stage,
    pub(crate) id: NodeId,
}

impl<'a> NodeCtx<'a> {
    /// 当前节点
    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn node(&self) -> Option<&Node> {
        self.stage.nodes().get(self.id)
    }

    pub fn node_mut(&mut self) -> Option<&mut Node> {
        self.stage.nodes_mut().get_mut(self.id)
    }

    pub fn stage(&self) -> &Stage {
        &*self.stage
    }

    pub fn stage_mut(&mut self) -> &mut Stage {
        &mut *self.stage
    }

    // ========== 子节点 ==========

    /// 添加子节点；当前节点运行中时子节点立即进入
    pub fn add_child(
        &mut self,
        child: NodeId,
        z_order: i32,
        tag: Option<NodeTag>,
    ) -> Result<(), NodeError> {
        self.stage.add_child(self.id, child, z_order, tag)
    }

    pub fn remove_child(&mut self, child: NodeId, cleanup: bool) -> Result<(), NodeError> {
        self.stage.remove_child(self.id, child, cleanup)
    }

    pub fn child_by_tag(&self, tag: impl Into<NodeTag>) -> Option<NodeId> {
        self.stage.nodes().child_by_tag(self.id, tag)
    }

    // ========== 调度 ==========

    /// 注册当前节点的每帧更新
    pub fn schedule_update(&mut self, priority: i32) {
        self.stage.schedule_update(self.id, priority);
    }

    pub fn unschedule_update(&mut self) -> bool {
        self.stage.scheduler_mut().unschedule_update(Target::Node(self.id))
    }

    /// 注册当前节点的定时器
    pub fn schedule(&mut self, key: impl Into<String>, spec: TimerSpec) -> Result<(), SchedulerError> {
        self.stage.schedule(self.id, key, spec)
    }

    pub fn unschedule(&mut self, key: &str) -> bool {
        self.stage.scheduler_mut().unschedule(Target::Node(self.id), key)
    }

    // ========== 动作 ==========

    /// 在当前节点上运行动作
    pub fn run_action(&mut self, action: Action) -> StageResult<ActionId> {
        self.stage.run_action(self.id, action)
    }

    pub fn stop_all_actions(&mut self) {
        self.stage.actions_mut().remove_all_from_target(self.id);
    }

    // ========== 场景栈（延迟执行） ==========

    pub fn push_scene(&mut self, scene: NodeId) {
        self.stage.defer(SceneCommand::Push(scene));
    }

    pub fn replace_scene(&mut self, scene: NodeId) {
        self.stage.defer(SceneCommand::Replace(scene));
    }

    pub fn replace_scene_with_transition(&mut self, scene: NodeId, duration: f32) {
        self.stage
            .defer(SceneCommand::ReplaceWithTransition { scene, duration });
    }

    pub fn push_scene_with_transition(&mut self, scene: NodeId, duration: f32) {
        self.stage
            .defer(SceneCommand::PushWithTransition { scene, duration });
    }

    pub fn pop_scene(&mut self) {
        self.stage.defer(SceneCommand::Pop);
    }

    pub fn pop_to_root_scene(&mut self) {
        self.stage.defer(SceneCommand::PopToRoot);
    }

    /// 请求结束导演（下一次主循环时清理）
    pub fn end(&mut self) {
        self.stage.defer(SceneCommand::End);
    }
}
