//! # ActionManager 模块
//!
//! 按目标节点登记正在运行的动作，并在每帧推进它们。
//!
//! 动作管理器以系统优先级注册在调度器上，每帧先于任何用户钩子执行。
//! 推进过程中不会回调用户代码：具名回调与完成通知都作为 [`ActionEvent`]
//! 返回，由调用方在推进结束后派发。

use tracing::{debug, warn};

use crate::error::NodeError;
use crate::node::{NodeId, NodeTree};

use super::Action;

/// 正在运行的动作标识
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ActionId(u64);

/// 动作事件
#[derive(Debug, Clone, PartialEq)]
pub enum ActionEvent {
    /// `CallFunc` 触发
    Called { target: NodeId, name: String },
    /// 动作完成并已从管理器移除
    Completed {
        target: NodeId,
        action: ActionId,
        tag: Option<i32>,
    },
}

impl ActionEvent {
    pub fn target(&self) -> NodeId {
        match self {
            ActionEvent::Called { target, .. } | ActionEvent::Completed { target, .. } => *target,
        }
    }
}

#[derive(Debug)]
struct RunningAction {
    id: ActionId,
    action: Action,
}

#[derive(Debug)]
struct TargetActions {
    target: NodeId,
    actions: Vec<RunningAction>,
    paused: bool,
}

/// 动作管理器
#[derive(Debug, Default)]
pub struct ActionManager {
    /// 按首次添加顺序
    targets: Vec<TargetActions>,
    next_id: u64,
}

impl ActionManager {
    pub fn new() -> Self {
        Self::default()
    }

    fn entry(&self, target: NodeId) -> Option<&TargetActions> {
        self.targets.iter().find(|entry| entry.target == target)
    }

    fn entry_mut(&mut self, target: NodeId) -> Option<&mut TargetActions> {
        self.targets.iter_mut().find(|entry| entry.target == target)
    }

    // ========== 添加与移除 ==========

    /// 启动动作并登记到目标上
    ///
    /// 目标已有登记时沿用其暂停状态，否则使用 `paused`。
    pub fn add_action(
        &mut self,
        mut action: Action,
        target: NodeId,
        paused: bool,
        nodes: &NodeTree,
    ) -> Result<ActionId, NodeError> {
        let node = nodes.node(target)?;
        action.start(node);

        let id = ActionId(self.next_id);
        self.next_id += 1;
        debug!(node = %target, action = action.name(), "添加动作");

        let running = RunningAction { id, action };
        match self.entry_mut(target) {
            Some(entry) => entry.actions.push(running),
            None => self.targets.push(TargetActions {
                target,
                actions: vec![running],
                paused,
            }),
        }
        Ok(id)
    }

    /// 按标识移除动作
    pub fn remove_action(&mut self, id: ActionId) -> bool {
        let mut removed = false;
        for entry in &mut self.targets {
            let before = entry.actions.len();
            entry.actions.retain(|running| running.id != id);
            removed |= entry.actions.len() != before;
        }
        self.targets.retain(|entry| !entry.actions.is_empty());
        removed
    }

    /// 移除目标上第一个带有该标签的动作
    pub fn remove_action_by_tag(&mut self, target: NodeId, tag: i32) -> bool {
        let Some(entry) = self.entry_mut(target) else {
            return false;
        };
        let Some(index) = entry
            .actions
            .iter()
            .position(|running| running.action.tag() == Some(tag))
        else {
            return false;
        };
        entry.actions.remove(index);
        self.targets.retain(|entry| !entry.actions.is_empty());
        true
    }

    /// 移除目标上的全部动作
    pub fn remove_all_from_target(&mut self, target: NodeId) {
        self.targets.retain(|entry| entry.target != target);
    }

    /// 移除全部动作
    pub fn remove_all(&mut self) {
        self.targets.clear();
    }

    // ========== 查询 ==========

    pub fn action(&self, id: ActionId) -> Option<&Action> {
        self.targets
            .iter()
            .flat_map(|entry| entry.actions.iter())
            .find(|running| running.id == id)
            .map(|running| &running.action)
    }

    pub fn action_by_tag(&self, target: NodeId, tag: i32) -> Option<&Action> {
        self.entry(target)?
            .actions
            .iter()
            .find(|running| running.action.tag() == Some(tag))
            .map(|running| &running.action)
    }

    /// 目标上正在运行的动作数量
    pub fn running_action_count(&self, target: NodeId) -> usize {
        self.entry(target).map_or(0, |entry| entry.actions.len())
    }

    /// 所有目标上的动作总数
    pub fn total_action_count(&self) -> usize {
        self.targets.iter().map(|entry| entry.actions.len()).sum()
    }

    // ========== 暂停 ==========

    pub fn pause_target(&mut self, target: NodeId) {
        if let Some(entry) = self.entry_mut(target) {
            entry.paused = true;
        }
    }

    pub fn resume_target(&mut self, target: NodeId) {
        if let Some(entry) = self.entry_mut(target) {
            entry.paused = false;
        }
    }

    pub fn is_target_paused(&self, target: NodeId) -> bool {
        self.entry(target).is_some_and(|entry| entry.paused)
    }

    /// 暂停所有未暂停的目标，返回被暂停的目标列表
    pub fn pause_all_running_actions(&mut self) -> Vec<NodeId> {
        let mut paused = Vec::new();
        for entry in self.targets.iter_mut().filter(|entry| !entry.paused) {
            entry.paused = true;
            paused.push(entry.target);
        }
        paused
    }

    /// 恢复一组目标（通常来自 `pause_all_running_actions`）
    pub fn resume_targets(&mut self, targets: &[NodeId]) {
        for &target in targets {
            self.resume_target(target);
        }
    }

    // ========== 帧推进 ==========

    /// 推进所有未暂停目标上的动作
    ///
    /// 完成的动作在最后一次推进（进度 1.0）之后移除。
    pub fn update(&mut self, dt: f32, nodes: &mut NodeTree) -> Vec<ActionEvent> {
        let mut events = Vec::new();
        let mut calls = Vec::new();

        for entry in self.targets.iter_mut().filter(|entry| !entry.paused) {
            let target = entry.target;
            let Some(node) = nodes.get_mut(target) else {
                warn!(node = %target, "动作目标已被销毁，丢弃其动作");
                entry.actions.clear();
                continue;
            };

            for running in &mut entry.actions {
                running.action.step(dt, node, &mut calls);
                events.extend(
                    calls
                        .drain(..)
                        .map(|name| ActionEvent::Called { target, name }),
                );
                if running.action.is_done() {
                    events.push(ActionEvent::Completed {
                        target,
                        action: running.id,
                        tag: running.action.tag(),
                    });
                }
            }

            entry.actions.retain(|running| !running.action.is_done());
        }

        self.targets.retain(|entry| !entry.actions.is_empty());
        events
    }
}
