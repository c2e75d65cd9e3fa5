//! # Stage 模块
//!
//! 导演驱动的可变对象图：节点树、调度器、动作管理器，
//! 以及建立在它们之上的生命周期派发与每帧推进。
//!
//! ## 生命周期顺序
//!
//! - 进入：先自身（置为运行、恢复定时器与动作、`on_enter`），再子节点
//! - 入场过渡结束：先自身，再子节点
//! - 退出：先子节点，再自身（`on_exit`、置为非运行、暂停定时器与动作）
//! - 清理：自身钩子，子节点，最后释放自身的定时器与动作
//!
//! 过渡场景在上述顺序之外额外驱动它持有的两个场景：进入时进入入场场景，
//! 退出时退出离场场景并通知入场场景过渡结束，清理时按需清理离场场景。

use tracing::{debug, warn};

use crate::action::{Action, ActionEvent, ActionId, ActionManager};
use crate::director::{TRANSITION_FINISH_KEY, TransitionState};
use crate::error::{NodeError, SchedulerError, StageResult};
use crate::node::{Lifecycle, NodeBehavior, NodeCtx, NodeId, NodeKind, NodeTag, NodeTree};
use crate::render::Renderer;
use crate::scheduler::{
    InvocationKind, PRIORITY_NON_SYSTEM_MIN, PRIORITY_SYSTEM, Scheduler, SystemHook, Target,
    TimerSpec,
};

/// 场景栈操作
///
/// 节点回调期间发出的场景栈操作会被缓存，在当前派发结束后由导演按顺序执行。
#[derive(Debug, Clone, PartialEq)]
pub enum SceneCommand {
    Push(NodeId),
    Replace(NodeId),
    PushWithTransition { scene: NodeId, duration: f32 },
    ReplaceWithTransition { scene: NodeId, duration: f32 },
    Pop,
    PopToRoot,
    End,
    /// 过渡场景的结束定时器到期
    FinishTransition(NodeId),
}

/// 节点树 + 调度器 + 动作管理器
pub struct Stage {
    pub(crate) nodes: NodeTree,
    pub(crate) scheduler: Scheduler,
    pub(crate) actions: ActionManager,
    commands: Vec<SceneCommand>,
}

impl Default for Stage {
    fn default() -> Self {
        Self::new()
    }
}

impl Stage {
    /// 创建并以系统优先级注册动作管理器
    pub fn new() -> Self {
        let mut scheduler = Scheduler::new();
        scheduler.schedule_update(
            Target::System(SystemHook::ActionManager),
            PRIORITY_SYSTEM,
            false,
        );
        Self {
            nodes: NodeTree::new(),
            scheduler,
            actions: ActionManager::new(),
            commands: Vec::new(),
        }
    }

    pub fn nodes(&self) -> &NodeTree {
        &self.nodes
    }

    pub fn nodes_mut(&mut self) -> &mut NodeTree {
        &mut self.nodes
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub fn scheduler_mut(&mut self) -> &mut Scheduler {
        &mut self.scheduler
    }

    pub fn actions(&self) -> &ActionManager {
        &self.actions
    }

    pub fn actions_mut(&mut self) -> &mut ActionManager {
        &mut self.actions
    }

    // ========== 场景栈命令 ==========

    pub(crate) fn defer(&mut self, command: SceneCommand) {
        self.commands.push(command);
    }

    pub(crate) fn take_commands(&mut self) -> Vec<SceneCommand> {
        std::mem::take(&mut self.commands)
    }

    // ========== 子节点（带生命周期） ==========

    /// 添加子节点；父节点运行中时子节点立即进入
    pub fn add_child(
        &mut self,
        parent: NodeId,
        child: NodeId,
        z_order: i32,
        tag: Option<NodeTag>,
    ) -> Result<(), NodeError> {
        self.nodes.attach(parent, child, z_order, tag)?;
        if self.nodes.is_running(parent) {
            self.enter(child);
            self.enter_transition_did_finish(child);
        }
        Ok(())
    }

    /// 移除子节点；运行中的子节点先退出，`cleanup` 为真时再清理
    pub fn remove_child(
        &mut self,
        parent: NodeId,
        child: NodeId,
        cleanup: bool,
    ) -> Result<(), NodeError> {
        self.nodes.check_child(parent, child)?;
        self.exit(child);
        if cleanup {
            self.cleanup(child);
        }
        self.nodes.detach(parent, child)
    }

    /// 从父节点移除；没有父节点时什么也不做
    pub fn remove_from_parent(&mut self, child: NodeId, cleanup: bool) -> Result<(), NodeError> {
        match self.nodes.node(child)?.parent() {
            Some(parent) => self.remove_child(parent, child, cleanup),
            None => Ok(()),
        }
    }

    pub fn remove_all_children(&mut self, parent: NodeId, cleanup: bool) -> Result<(), NodeError> {
        for child in self.nodes.node(parent)?.children().to_vec() {
            self.remove_child(parent, child, cleanup)?;
        }
        Ok(())
    }

    /// 退出、清理并释放整棵子树，返回释放的节点数
    ///
    /// 不要销毁仍在场景栈中的场景。
    pub fn destroy(&mut self, id: NodeId) -> Result<usize, NodeError> {
        match self.nodes.node(id)?.parent() {
            Some(parent) => self.remove_child(parent, id, true)?,
            None => {
                self.exit(id);
                self.cleanup(id);
            }
        }
        Ok(self.nodes.free_subtree(id))
    }

    // ========== 调度与动作 ==========

    /// 在节点上运行动作；节点未运行时动作以暂停状态登记
    pub fn run_action(&mut self, target: NodeId, action: Action) -> StageResult<ActionId> {
        let paused = !self.nodes.is_running(target);
        Ok(self.actions.add_action(action, target, paused, &self.nodes)?)
    }

    /// 注册节点的每帧更新；节点未运行时以暂停状态登记
    pub fn schedule_update(&mut self, target: NodeId, priority: i32) {
        let paused = !self.nodes.is_running(target);
        self.scheduler.schedule_update(
            Target::Node(target),
            priority.max(PRIORITY_NON_SYSTEM_MIN),
            paused,
        );
    }

    /// 注册节点的定时器；节点未运行时以暂停状态登记
    pub fn schedule(
        &mut self,
        target: NodeId,
        key: impl Into<String>,
        spec: TimerSpec,
    ) -> Result<(), SchedulerError> {
        let paused = !self.nodes.is_running(target);
        self.scheduler
            .schedule(Target::Node(target), key, spec, paused)
            .map(|_| ())
    }

    // ========== 生命周期 ==========

    fn transition_state(&self, id: NodeId) -> Option<TransitionState> {
        match self.nodes.get(id)?.kind() {
            NodeKind::Transition(state) => Some(*state),
            _ => None,
        }
    }

    pub(crate) fn enter(&mut self, id: NodeId) {
        let Some(node) = self.nodes.get_mut(id) else {
            return;
        };
        if node.running {
            return;
        }
        node.running = true;
        node.lifecycle = Lifecycle::Entered;

        self.scheduler.resume_target(Target::Node(id));
        self.actions.resume_target(id);
        self.dispatch(id, |behavior, ctx| behavior.on_enter(ctx));

        for child in self.nodes.children(id).to_vec() {
            self.enter(child);
        }

        if let Some(state) = self.transition_state(id) {
            self.enter(state.incoming);
            let finish = TimerSpec::once(state.duration);
            if let Err(e) = self.scheduler.schedule(Target::Node(id), TRANSITION_FINISH_KEY, finish, false) {
                warn!(error = %e, transition = %id, "无法安排过渡结束定时器");
            }
        }
    }

    pub(crate) fn enter_transition_did_finish(&mut self, id: NodeId) {
        let Some(node) = self.nodes.get_mut(id) else {
            return;
        };
        if !node.running {
            return;
        }
        node.lifecycle = Lifecycle::Running;

        self.dispatch(id, |behavior, ctx| behavior.on_enter_transition_did_finish(ctx));

        for child in self.nodes.children(id).to_vec() {
            self.enter_transition_did_finish(child);
        }
    }

    pub(crate) fn exit(&mut self, id: NodeId) {
        if !self.nodes.is_running(id) {
            return;
        }

        for child in self.nodes.children(id).to_vec() {
            self.exit(child);
        }

        self.dispatch(id, |behavior, ctx| behavior.on_exit(ctx));

        if let Some(node) = self.nodes.get_mut(id) {
            node.running = false;
            node.lifecycle = Lifecycle::Exited;
        }
        self.scheduler.pause_target(Target::Node(id));
        self.actions.pause_target(id);

        if let Some(state) = self.transition_state(id) {
            if let Some(outgoing) = state.outgoing {
                self.exit(outgoing);
            }
            self.enter_transition_did_finish(state.incoming);
        }
    }

    pub(crate) fn cleanup(&mut self, id: NodeId) {
        match self.nodes.get(id) {
            Some(node) if node.lifecycle != Lifecycle::Cleaned => {}
            _ => return,
        }

        self.dispatch(id, |behavior, ctx| behavior.cleanup(ctx));

        for child in self.nodes.children(id).to_vec() {
            self.cleanup(child);
        }

        self.actions.remove_all_from_target(id);
        self.scheduler.unschedule_all_for_target(Target::Node(id));
        if let Some(node) = self.nodes.get_mut(id) {
            node.lifecycle = Lifecycle::Cleaned;
        }

        if let Some(state) = self.transition_state(id)
            && state.cleanup_outgoing
            && let Some(outgoing) = state.outgoing
        {
            self.cleanup(outgoing);
        }
    }

    /// 取出节点行为执行回调，结束后放回
    fn dispatch(&mut self, id: NodeId, f: impl FnOnce(&mut dyn NodeBehavior, &mut NodeCtx<'_>)) {
        let Some(mut behavior) = self.nodes.take_behavior(id) else {
            return;
        };
        {
            let mut ctx = NodeCtx { stage: self, id };
            f(behavior.as_mut(), &mut ctx);
        }
        self.nodes.restore_behavior(id, behavior);
    }

    // ========== 帧推进 ==========

    /// 推进调度器一帧并派发所有调用
    pub fn tick(&mut self, dt: f32) {
        let invocations = self.scheduler.update(dt);

        for invocation in invocations {
            if !self.scheduler.is_live(&invocation) {
                // 本帧内被暂停的定时器保留进度，下次恢复时触发
                self.scheduler.cancel_fire(&invocation);
                continue;
            }
            let dt = invocation.dt;
            match (invocation.target, invocation.kind) {
                (Target::System(SystemHook::ActionManager), _) => {
                    let events = self.actions.update(dt, &mut self.nodes);
                    self.deliver_action_events(events);
                }
                (Target::Node(id), InvocationKind::Update) => {
                    self.dispatch(id, |behavior, ctx| behavior.update(ctx, dt));
                }
                (Target::Node(id), InvocationKind::Timer(key)) => self.fire_timer(id, &key, dt),
            }
        }

        self.scheduler.finish_tick();
    }

    fn fire_timer(&mut self, id: NodeId, key: &str, dt: f32) {
        if key == TRANSITION_FINISH_KEY && self.transition_state(id).is_some() {
            debug!(transition = %id, "过渡结束");
            self.defer(SceneCommand::FinishTransition(id));
            return;
        }
        self.dispatch(id, |behavior, ctx| behavior.on_timer(ctx, key, dt));
    }

    fn deliver_action_events(&mut self, events: Vec<ActionEvent>) {
        for event in events {
            self.dispatch(event.target(), |behavior, ctx| behavior.on_action_event(ctx, &event));
        }
    }

    // ========== 绘制 ==========

    /// 先序遍历绘制子树，返回绘制的节点数；不可见节点连同其子树跳过
    pub fn visit(&self, id: NodeId, renderer: &mut dyn Renderer) -> u32 {
        let Some(node) = self.nodes.get(id) else {
            return 0;
        };
        if !node.visible {
            return 0;
        }

        renderer.draw_node(id, node);
        let mut drawn = 1;

        if let NodeKind::Transition(state) = node.kind() {
            if let Some(outgoing) = state.outgoing {
                drawn += self.visit(outgoing, renderer);
            }
            drawn += self.visit(state.incoming, renderer);
        }

        for &child in node.children() {
            drawn += self.visit(child, renderer);
        }
        drawn
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Vec2;
    use std::cell::RefCell;
    use std::rc::Rc;

    type Log = Rc<RefCell<Vec<String>>>;

    /// 记录生命周期事件
    struct Recorder {
        name: &'static str,
        log: Log,
    }

    impl Recorder {
        fn new(name: &'static str, log: &Log) -> Self {
            Self {
                name,
                log: Rc::clone(log),
            }
        }

        fn push(&self, event: &str) {
            self.log.borrow_mut().push(format!("{}.{}", self.name, event));
        }
    }

    impl NodeBehavior for Recorder {
        fn on_enter(&mut self, _ctx: &mut NodeCtx<'_>) {
            self.push("enter");
        }

        fn on_enter_transition_did_finish(&mut self, _ctx: &mut NodeCtx<'_>) {
            self.push("did_finish");
        }

        fn on_exit(&mut self, _ctx: &mut NodeCtx<'_>) {
            self.push("exit");
        }

        fn cleanup(&mut self, _ctx: &mut NodeCtx<'_>) {
            self.push("cleanup");
        }

        fn update(&mut self, _ctx: &mut NodeCtx<'_>, _dt: f32) {
            self.push("update");
        }

        fn on_timer(&mut self, _ctx: &mut NodeCtx<'_>, key: &str, _dt: f32) {
            self.push(&format!("timer:{key}"));
        }

        fn on_action_event(&mut self, _ctx: &mut NodeCtx<'_>, event: &ActionEvent) {
            if let ActionEvent::Called { name, .. } = event {
                self.push(&format!("call:{name}"));
            }
        }
    }

    fn drain(log: &Log) -> Vec<String> {
        std::mem::take(&mut *log.borrow_mut())
    }

    #[test]
    fn test_enter_parent_first_exit_child_first() {
        let log = Log::default();
        let mut stage = Stage::new();
        let scene = stage.nodes_mut().create_scene_with(Recorder::new("scene", &log));
        let child = stage.nodes_mut().create_node_with(Recorder::new("child", &log));
        let leaf = stage.nodes_mut().create_node_with(Recorder::new("leaf", &log));
        stage.add_child(scene, child, 0, None).unwrap();
        stage.add_child(child, leaf, 0, None).unwrap();
        assert!(drain(&log).is_empty());

        stage.enter(scene);
        stage.enter_transition_did_finish(scene);
        stage.exit(scene);
        stage.cleanup(scene);

        insta::assert_debug_snapshot!(drain(&log), @r#"
        [
            "scene.enter",
            "child.enter",
            "leaf.enter",
            "scene.did_finish",
            "child.did_finish",
            "leaf.did_finish",
            "leaf.exit",
            "child.exit",
            "scene.exit",
            "scene.cleanup",
            "child.cleanup",
            "leaf.cleanup",
        ]
        "#);
        assert_eq!(stage.nodes().node(leaf).unwrap().lifecycle(), Lifecycle::Cleaned);
    }

    #[test]
    fn test_add_child_to_running_parent_enters_child() {
        let log = Log::default();
        let mut stage = Stage::new();
        let scene = stage.nodes_mut().create_scene();
        stage.enter(scene);

        let child = stage.nodes_mut().create_node_with(Recorder::new("child", &log));
        stage.add_child(scene, child, 0, None).unwrap();
        assert_eq!(drain(&log), vec!["child.enter", "child.did_finish"]);
        assert!(stage.nodes().is_running(child));

        stage.remove_child(scene, child, true).unwrap();
        assert_eq!(drain(&log), vec!["child.exit", "child.cleanup"]);
        assert_eq!(stage.nodes().parent(child), None);
    }

    #[test]
    fn test_remove_child_precondition_has_no_side_effects() {
        let log = Log::default();
        let mut stage = Stage::new();
        let scene = stage.nodes_mut().create_scene();
        let stranger = stage.nodes_mut().create_node_with(Recorder::new("stranger", &log));
        stage.enter(scene);
        stage.add_child(scene, stranger, 0, None).unwrap();
        drain(&log);

        let other = stage.nodes_mut().create_scene();
        assert_eq!(
            stage.remove_child(other, stranger, true),
            Err(NodeError::NotAChild {
                parent: other,
                child: stranger
            })
        );
        assert!(drain(&log).is_empty());
        assert!(stage.nodes().is_running(stranger));
    }

    #[test]
    fn test_schedule_before_enter_is_paused() {
        let log = Log::default();
        let mut stage = Stage::new();
        let scene = stage.nodes_mut().create_scene_with(Recorder::new("scene", &log));
        stage.schedule_update(scene, 0);
        stage.schedule(scene, "beat", TimerSpec::every(0.5)).unwrap();

        // 未进入时不调度
        stage.tick(1.0);
        assert!(drain(&log).is_empty());

        stage.enter(scene);
        drain(&log);
        stage.tick(0.5);
        assert_eq!(drain(&log), vec!["scene.update", "scene.timer:beat"]);

        // 退出后暂停，清理后释放
        stage.exit(scene);
        drain(&log);
        stage.tick(0.5);
        assert!(drain(&log).is_empty());
        stage.cleanup(scene);
        assert!(!stage.scheduler().has_update(Target::Node(scene)));
        assert!(!stage.scheduler().is_scheduled(Target::Node(scene), "beat"));
    }

    #[test]
    fn test_timer_paused_mid_tick_fires_after_reattach() {
        /// 第 2 帧摘下子节点，第 3 帧挂回
        struct Juggler {
            child: NodeId,
            frame: u32,
        }

        impl NodeBehavior for Juggler {
            fn update(&mut self, ctx: &mut NodeCtx<'_>, _dt: f32) {
                self.frame += 1;
                match self.frame {
                    2 => ctx.remove_child(self.child, false).unwrap(),
                    3 => ctx.add_child(self.child, 0, None).unwrap(),
                    _ => {}
                }
            }
        }

        let log = Log::default();
        let mut stage = Stage::new();
        let child = stage.nodes_mut().create_node_with(Recorder::new("child", &log));
        let scene = stage
            .nodes_mut()
            .create_scene_with(Juggler { child, frame: 0 });
        stage.add_child(scene, child, 0, None).unwrap();
        stage.schedule_update(scene, 0);
        stage.enter(scene);
        stage.schedule(child, "once", TimerSpec::once(0.5)).unwrap();
        drain(&log);

        // 第 2 帧定时器到期，但子节点在派发前已被摘下
        stage.tick(0.3);
        stage.tick(0.3);
        assert_eq!(drain(&log), vec!["child.exit"]);
        assert!(stage.scheduler().is_scheduled(Target::Node(child), "once"));

        for _ in 0..10 {
            stage.tick(0.3);
        }
        assert_eq!(
            drain(&log),
            vec!["child.enter", "child.did_finish", "child.timer:once"]
        );
        assert!(!stage.scheduler().is_scheduled(Target::Node(child), "once"));
    }

    #[test]
    fn test_actions_follow_running_state() {
        let log = Log::default();
        let mut stage = Stage::new();
        let scene = stage.nodes_mut().create_scene_with(Recorder::new("scene", &log));
        let seq = Action::sequence(vec![
            Action::move_by(1.0, Vec2::new(10.0, 0.0)),
            Action::call("done"),
        ])
        .unwrap();
        stage.run_action(scene, seq).unwrap();
        assert!(stage.actions().is_target_paused(scene));

        stage.enter(scene);
        drain(&log);
        stage.tick(0.5);
        stage.tick(0.5);
        assert_eq!(drain(&log), vec!["scene.call:done"]);
        assert_eq!(stage.nodes().node(scene).unwrap().position, Vec2::new(10.0, 0.0));
        assert_eq!(stage.actions().running_action_count(scene), 0);
    }

    #[test]
    fn test_cleanup_releases_whole_subtree() {
        let mut stage = Stage::new();
        let scene = stage.nodes_mut().create_scene();
        let child = stage.nodes_mut().create_node();
        stage.add_child(scene, child, 0, None).unwrap();
        stage.enter(scene);

        stage.run_action(child, Action::repeat_forever(Action::rotate_by(1.0, 90.0))).unwrap();
        stage.schedule_update(child, 3);
        stage.schedule(scene, "t", TimerSpec::every(1.0)).unwrap();

        stage.exit(scene);
        stage.cleanup(scene);
        assert_eq!(stage.actions().total_action_count(), 0);
        // 只剩动作管理器的系统钩子
        assert_eq!(stage.scheduler().len(), 1);
    }

    #[test]
    fn test_destroy_frees_slots() {
        let mut stage = Stage::new();
        let scene = stage.nodes_mut().create_scene();
        let child = stage.nodes_mut().create_node();
        let grandchild = stage.nodes_mut().create_node();
        stage.add_child(scene, child, 0, None).unwrap();
        stage.add_child(child, grandchild, 0, None).unwrap();

        assert_eq!(stage.destroy(child), Ok(2));
        assert!(!stage.nodes().contains(grandchild));
        assert!(stage.nodes().children(scene).is_empty());
        assert_eq!(stage.destroy(child), Err(NodeError::UnknownNode { id: child }));
    }

    #[test]
    fn test_hook_can_mutate_stage() {
        struct Spawner;

        impl NodeBehavior for Spawner {
            fn on_enter(&mut self, ctx: &mut NodeCtx<'_>) {
                let child = ctx.stage_mut().nodes_mut().create_node();
                ctx.add_child(child, 0, Some("spawned".into())).unwrap();
                ctx.schedule_update(0);
            }
        }

        let mut stage = Stage::new();
        let scene = stage.nodes_mut().create_scene_with(Spawner);
        stage.enter(scene);

        let child = stage.nodes().child_by_tag(scene, "spawned").unwrap();
        assert!(stage.nodes().is_running(child));
        assert!(stage.scheduler().has_update(Target::Node(scene)));
        assert!(!stage.scheduler().is_target_paused(Target::Node(scene)));
    }
}
