//! # Director 模块
//!
//! 导演：持有场景栈、驱动每帧的更新与绘制。
//!
//! ## 帧顺序
//!
//! ```text
//! main_loop(dt)
//!   ├─ 如果已请求结束 → purge，本帧结束
//!   ├─ update(dt)
//!   │    ├─ dt 处理（下一帧归零、钳制）
//!   │    ├─ 未暂停时推进调度器（动作管理器先于所有用户钩子）
//!   │    ├─ 执行回调期间缓存的场景栈命令
//!   │    └─ 有待切换的场景时执行切换（无论是否暂停）
//!   └─ draw(renderer)
//!        ├─ 绘制当前场景与通知节点
//!        └─ 帧统计
//! ```
//!
//! ## 场景切换
//!
//! `push_scene` / `replace_scene` / `pop_scene` 只修改场景栈并登记待切换的场景，
//! 真正的 on_exit / on_enter 在下一次 `update` 的切换点统一发生，
//! 因此一帧内多次请求时只有最后一次生效。

mod shared;
mod stats;
mod transition;

pub use shared::{reset_shared_director, with_shared_director};
pub use stats::FrameStats;
pub use transition::{TRANSITION_FINISH_KEY, TransitionState};

use tracing::{debug, info, warn};

use crate::config::{DirectorConfig, Projection};
use crate::error::{DirectorError, NodeError, StageResult};
use crate::geometry::{Size, Vec2};
use crate::node::{NodeId, NodeKind};
use crate::render::{Renderer, ResourceCache, TouchDispatcher};
use crate::stage::{SceneCommand, Stage};

/// 透视投影下 z_eye 与窗口高度的比例
const Z_EYE_RATIO: f32 = 1.1566;

/// 导演
pub struct Director {
    config: DirectorConfig,
    stage: Stage,

    scene_stack: Vec<NodeId>,
    running_scene: Option<NodeId>,
    next_scene: Option<NodeId>,
    send_cleanup_to_scene: bool,
    notification_node: Option<NodeId>,

    paused: bool,
    old_animation_interval: f32,
    next_delta_time_zero: bool,
    delta_time: f32,
    purge_requested: bool,
    animating: bool,
    stats: FrameStats,

    win_size: Size,
    win_size_in_pixels: Size,
    visible_size: Size,
    visible_origin: Vec2,

    caches: Vec<Box<dyn ResourceCache>>,
    touch_dispatcher: Option<Box<dyn TouchDispatcher>>,
}

impl Default for Director {
    fn default() -> Self {
        Self::build(DirectorConfig::default())
    }
}

impl Director {
    /// 创建导演；配置无效时返回错误
    pub fn new(config: DirectorConfig) -> Result<Self, DirectorError> {
        config.validate()?;
        Ok(Self::build(config))
    }

    fn build(config: DirectorConfig) -> Self {
        debug!(?config, "创建导演");
        Self {
            old_animation_interval: config.animation_interval,
            config,
            stage: Stage::new(),
            scene_stack: Vec::new(),
            running_scene: None,
            next_scene: None,
            send_cleanup_to_scene: false,
            notification_node: None,
            paused: false,
            next_delta_time_zero: false,
            delta_time: 0.0,
            purge_requested: false,
            animating: false,
            stats: FrameStats::default(),
            win_size: Size::ZERO,
            win_size_in_pixels: Size::ZERO,
            visible_size: Size::ZERO,
            visible_origin: Vec2::ZERO,
            caches: Vec::new(),
            touch_dispatcher: None,
        }
    }

    // ========== 访问器 ==========

    pub fn config(&self) -> &DirectorConfig {
        &self.config
    }

    pub fn stage(&self) -> &Stage {
        &self.stage
    }

    pub fn stage_mut(&mut self) -> &mut Stage {
        &mut self.stage
    }

    pub fn running_scene(&self) -> Option<NodeId> {
        self.running_scene
    }

    /// 待切换的场景
    pub fn next_scene(&self) -> Option<NodeId> {
        self.next_scene
    }

    /// 场景栈，栈底在前
    pub fn scene_stack(&self) -> &[NodeId] {
        &self.scene_stack
    }

    /// 切换时是否清理被替换的场景
    pub fn is_send_cleanup_to_scene(&self) -> bool {
        self.send_cleanup_to_scene
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn is_animating(&self) -> bool {
        self.animating
    }

    /// 是否已请求结束（下一次主循环时清理）
    pub fn is_purge_pending(&self) -> bool {
        self.purge_requested
    }

    /// 最近一次 `update` 实际使用的 dt
    pub fn delta_time(&self) -> f32 {
        self.delta_time
    }

    pub fn stats(&self) -> &FrameStats {
        &self.stats
    }

    pub fn total_frames(&self) -> u64 {
        self.stats.total_frames
    }

    pub fn animation_interval(&self) -> f32 {
        self.config.animation_interval
    }

    /// 设置目标帧间隔；非正数或非有限值被忽略
    pub fn set_animation_interval(&mut self, interval: f32) {
        if interval.is_finite() && interval > 0.0 {
            self.config.animation_interval = interval;
        } else {
            warn!(interval, "忽略无效的帧间隔");
        }
    }

    pub fn display_stats(&self) -> bool {
        self.config.display_stats
    }

    pub fn set_display_stats(&mut self, display: bool) {
        self.config.display_stats = display;
    }

    /// 下一次 `update` 的 dt 强制为 0
    pub fn set_next_delta_time_zero(&mut self, zero: bool) {
        self.next_delta_time_zero = zero;
    }

    pub fn is_next_delta_time_zero(&self) -> bool {
        self.next_delta_time_zero
    }

    pub fn notification_node(&self) -> Option<NodeId> {
        self.notification_node
    }

    /// 设置通知节点，它在每帧当前场景之后绘制，不属于场景栈
    pub fn set_notification_node(&mut self, node: Option<NodeId>) {
        self.notification_node = node;
    }

    pub fn register_cache(&mut self, cache: Box<dyn ResourceCache>) {
        self.caches.push(cache);
    }

    pub fn set_touch_dispatcher(&mut self, dispatcher: Box<dyn TouchDispatcher>) {
        self.touch_dispatcher = Some(dispatcher);
    }

    // ========== 场景栈 ==========

    fn check_scene(&self, scene: NodeId) -> StageResult<()> {
        if self.stage.nodes().node(scene)?.is_scene() {
            Ok(())
        } else {
            Err(NodeError::NotAScene { id: scene }.into())
        }
    }

    /// 运行第一个场景
    pub fn run_with_scene(&mut self, scene: NodeId) -> StageResult<()> {
        self.check_scene(scene)?;
        if let Some(running) = self.running_scene.or(self.next_scene) {
            return Err(DirectorError::SceneAlreadyRunning { running }.into());
        }

        info!(scene = %scene, "运行首个场景");
        self.push_scene(scene)?;
        self.start_animation();
        Ok(())
    }

    /// 压入场景；当前场景暂停但不清理
    pub fn push_scene(&mut self, scene: NodeId) -> StageResult<()> {
        self.check_scene(scene)?;

        debug!(scene = %scene, depth = self.scene_stack.len() + 1, "压入场景");
        self.send_cleanup_to_scene = false;
        self.scene_stack.push(scene);
        self.next_scene = Some(scene);
        Ok(())
    }

    /// 替换栈顶场景；被替换的场景会被清理
    pub fn replace_scene(&mut self, scene: NodeId) -> StageResult<()> {
        self.check_scene(scene)?;
        let Some(top) = self.scene_stack.last_mut() else {
            return Err(DirectorError::EmptySceneStack.into());
        };

        let replaced = std::mem::replace(top, scene);
        debug!(scene = %scene, replaced = %replaced, "替换场景");
        self.send_cleanup_to_scene = true;
        self.next_scene = Some(scene);
        Ok(())
    }

    /// 弹出栈顶场景；弹空时结束导演
    pub fn pop_scene(&mut self) -> StageResult<()> {
        if self.running_scene.is_none() {
            return Err(DirectorError::NoRunningScene.into());
        }

        self.scene_stack.pop();
        match self.scene_stack.last() {
            None => {
                debug!("场景栈已空，结束导演");
                self.end();
            }
            Some(&top) => {
                debug!(scene = %top, depth = self.scene_stack.len(), "弹出场景");
                self.send_cleanup_to_scene = true;
                self.next_scene = Some(top);
            }
        }
        Ok(())
    }

    /// 弹出根场景之上的所有场景
    ///
    /// 自顶向下依次对仍在运行的场景触发 on_exit，再对每个场景触发 cleanup。
    /// 栈中只有一个场景时等同于 `end`。
    pub fn pop_to_root_scene(&mut self) -> StageResult<()> {
        if self.running_scene.is_none() {
            return Err(DirectorError::NoRunningScene.into());
        }
        if self.scene_stack.is_empty() {
            return Err(DirectorError::EmptySceneStack.into());
        }

        if self.scene_stack.len() == 1 {
            self.scene_stack.pop();
            self.end();
            return Ok(());
        }

        while self.scene_stack.len() > 1 {
            if let Some(top) = self.scene_stack.pop() {
                self.stage.exit(top);
                self.stage.cleanup(top);
            }
        }

        self.next_scene = self.scene_stack.last().copied();
        self.send_cleanup_to_scene = false;
        debug!(root = ?self.next_scene, "回到根场景");
        Ok(())
    }

    /// 请求结束，下一次主循环时清理
    pub fn end(&mut self) {
        self.purge_requested = true;
    }

    // ========== 过渡 ==========

    fn create_transition(
        &mut self,
        scene: NodeId,
        duration: f32,
        cleanup_outgoing: bool,
    ) -> StageResult<NodeId> {
        if !duration.is_finite() || duration < 0.0 {
            return Err(DirectorError::InvalidTransitionDuration { duration }.into());
        }
        self.check_scene(scene)?;

        let state = TransitionState {
            incoming: scene,
            outgoing: self.running_scene,
            duration,
            cleanup_outgoing,
        };
        Ok(self.stage.nodes_mut().create_transition(state))
    }

    /// 以过渡方式替换栈顶场景，返回过渡场景
    pub fn replace_scene_with_transition(
        &mut self,
        scene: NodeId,
        duration: f32,
    ) -> StageResult<NodeId> {
        if self.scene_stack.is_empty() {
            return Err(DirectorError::EmptySceneStack.into());
        }
        let transition = self.create_transition(scene, duration, true)?;
        self.replace_scene(transition)?;
        Ok(transition)
    }

    /// 以过渡方式压入场景，返回过渡场景
    pub fn push_scene_with_transition(
        &mut self,
        scene: NodeId,
        duration: f32,
    ) -> StageResult<NodeId> {
        let transition = self.create_transition(scene, duration, false)?;
        self.push_scene(transition)?;
        Ok(transition)
    }

    fn finish_transition(&mut self, transition: NodeId) -> StageResult<()> {
        if self.running_scene != Some(transition) {
            warn!(transition = %transition, "过渡场景已不在运行，忽略结束信号");
            return Ok(());
        }
        let incoming = match self.stage.nodes().node(transition)?.kind() {
            NodeKind::Transition(state) => state.incoming,
            _ => return Err(NodeError::NotAScene { id: transition }.into()),
        };
        self.replace_scene(incoming)
    }

    // ========== 场景切换 ==========

    /// 切换到待切换的场景
    fn set_next_scene(&mut self) {
        let Some(next) = self.next_scene.take() else {
            return;
        };
        let nodes = self.stage.nodes();
        let running = self.running_scene;
        let running_is_transition =
            running.is_some_and(|r| nodes.get(r).is_some_and(|n| n.is_transition()));
        let next_is_transition = nodes.get(next).is_some_and(|n| n.is_transition());

        // 切换到过渡场景时，旧场景由过渡场景负责退出
        if !next_is_transition && let Some(previous) = running {
            self.stage.exit(previous);
            if self.send_cleanup_to_scene {
                self.stage.cleanup(previous);
                if running_is_transition && previous != next {
                    self.stage.nodes_mut().free_subtree(previous);
                }
            }
        }

        self.running_scene = Some(next);
        debug!(scene = %next, "场景切换");

        // 过渡场景已经让入场场景进入
        if !running_is_transition || !self.stage.nodes().is_running(next) {
            self.stage.enter(next);
            self.stage.enter_transition_did_finish(next);
        }
    }

    fn apply_commands(&mut self) {
        for command in self.stage.take_commands() {
            if let Err(e) = self.apply_command(&command) {
                warn!(error = %e, ?command, "场景命令执行失败");
            }
        }
    }

    fn apply_command(&mut self, command: &SceneCommand) -> StageResult<()> {
        match *command {
            SceneCommand::Push(scene) => self.push_scene(scene),
            SceneCommand::Replace(scene) => self.replace_scene(scene),
            SceneCommand::PushWithTransition { scene, duration } => {
                self.push_scene_with_transition(scene, duration).map(|_| ())
            }
            SceneCommand::ReplaceWithTransition { scene, duration } => {
                self.replace_scene_with_transition(scene, duration).map(|_| ())
            }
            SceneCommand::Pop => self.pop_scene(),
            SceneCommand::PopToRoot => self.pop_to_root_scene(),
            SceneCommand::End => {
                self.end();
                Ok(())
            }
            SceneCommand::FinishTransition(transition) => self.finish_transition(transition),
        }
    }

    // ========== 帧推进 ==========

    /// 推进一帧逻辑
    pub fn update(&mut self, dt: f32) {
        let mut dt = if dt.is_finite() { dt.max(0.0) } else { 0.0 };
        if self.next_delta_time_zero {
            dt = 0.0;
            self.next_delta_time_zero = false;
        }
        if let Some(clamp) = &self.config.delta_clamp {
            let (clamped_dt, clamped) = clamp.apply(dt);
            if clamped {
                warn!(dt, fallback = clamped_dt, "帧间隔过大，已钳制");
            }
            dt = clamped_dt;
        }
        self.delta_time = dt;

        if !self.paused {
            self.stage.tick(dt);
            self.apply_commands();
        }

        if self.next_scene.is_some() {
            self.set_next_scene();
            self.apply_commands();
        }
    }

    /// 绘制一帧
    pub fn draw(&mut self, renderer: &mut dyn Renderer) {
        renderer.begin_frame();

        let mut drawn = 0;
        if let Some(scene) = self.running_scene {
            drawn += self.stage.visit(scene, renderer);
        }
        if let Some(node) = self.notification_node {
            drawn += self.stage.visit(node, renderer);
        }

        self.stats
            .record_frame(self.delta_time, drawn, self.config.stats_interval);
        if self.config.display_stats {
            renderer.draw_stats(&self.stats);
        }

        renderer.end_frame();
    }

    /// 主循环的一次迭代
    pub fn main_loop(&mut self, dt: f32, renderer: &mut dyn Renderer) {
        if self.purge_requested {
            self.purge();
            return;
        }
        if self.animating {
            self.update(dt);
            self.draw(renderer);
        }
    }

    pub fn start_animation(&mut self) {
        self.animating = true;
    }

    pub fn stop_animation(&mut self) {
        self.animating = false;
    }

    /// 暂停：调度器停止推进，帧间隔切换为暂停间隔
    pub fn pause(&mut self) {
        if self.paused {
            return;
        }
        self.old_animation_interval = self.config.animation_interval;
        self.set_animation_interval(self.config.paused_animation_interval);
        self.paused = true;
        debug!("导演暂停");
    }

    /// 恢复：还原帧间隔，下一帧 dt 归零
    pub fn resume(&mut self) {
        if !self.paused {
            return;
        }
        self.set_animation_interval(self.old_animation_interval);
        self.paused = false;
        self.delta_time = 0.0;
        self.next_delta_time_zero = true;
        debug!("导演恢复");
    }

    /// 立即清理：注销所有定时器、退出并清理场景、清空场景栈、停止动画、清空缓存
    pub fn purge(&mut self) {
        info!(total_frames = self.stats.total_frames, "清理导演");

        self.stage.scheduler_mut().unschedule_all();
        if let Some(dispatcher) = self.touch_dispatcher.as_mut() {
            dispatcher.remove_all_delegates();
        }

        if let Some(running) = self.running_scene.take() {
            self.stage.exit(running);
            self.stage.cleanup(running);
        }
        for scene in self.scene_stack.drain(..).rev() {
            self.stage.cleanup(scene);
        }
        self.next_scene = None;
        self.send_cleanup_to_scene = false;

        self.stop_animation();
        for cache in &mut self.caches {
            debug!(cache = cache.name(), "清空缓存");
            cache.purge_all();
        }

        self.purge_requested = false;
    }

    /// 释放所有缓存中未被使用的资源
    pub fn purge_cached_data(&mut self) {
        for cache in &mut self.caches {
            cache.purge_unused();
        }
    }

    // ========== 视图与投影 ==========

    /// 绑定渲染视图：读取尺寸、应用投影、启用触摸
    pub fn attach_view(&mut self, renderer: &mut dyn Renderer) {
        self.read_view_size(renderer);
        self.set_projection(self.config.projection, renderer);
        if let Some(dispatcher) = self.touch_dispatcher.as_mut() {
            dispatcher.set_enabled(true);
        }
    }

    /// 视图尺寸变化后重新计算尺寸与投影
    pub fn reshape_projection(&mut self, renderer: &mut dyn Renderer) {
        self.read_view_size(renderer);
        self.set_projection(self.config.projection, renderer);
    }

    fn read_view_size(&mut self, renderer: &dyn Renderer) {
        self.win_size = renderer.size_in_points();
        self.win_size_in_pixels = self.win_size.scaled(self.config.content_scale_factor);
        self.visible_size = renderer.visible_size();
        self.visible_origin = renderer.visible_origin();
    }

    pub fn projection(&self) -> Projection {
        self.config.projection
    }

    pub fn set_projection(&mut self, projection: Projection, renderer: &mut dyn Renderer) {
        let size = self.win_size;
        renderer.set_viewport_in_points(0.0, 0.0, size.width, size.height);
        renderer.set_projection(projection, size, self.z_eye());
        self.config.projection = projection;
    }

    /// 透视投影下眼睛到屏幕的距离
    pub fn z_eye(&self) -> f32 {
        self.win_size.height / Z_EYE_RATIO
    }

    pub fn win_size(&self) -> Size {
        self.win_size
    }

    pub fn win_size_in_pixels(&self) -> Size {
        self.win_size_in_pixels
    }

    pub fn visible_size(&self) -> Size {
        self.visible_size
    }

    pub fn visible_origin(&self) -> Vec2 {
        self.visible_origin
    }

    pub fn content_scale_factor(&self) -> f32 {
        self.config.content_scale_factor
    }

    pub fn set_content_scale_factor(&mut self, factor: f32) {
        if !(factor.is_finite() && factor > 0.0) {
            warn!(factor, "忽略无效的内容缩放因子");
            return;
        }
        if factor != self.config.content_scale_factor {
            self.config.content_scale_factor = factor;
            self.win_size_in_pixels = self.win_size.scaled(factor);
        }
    }

    /// 屏幕坐标（左上原点）转场景坐标（左下原点）
    pub fn convert_to_gl(&self, point: Vec2) -> Vec2 {
        Vec2::new(point.x, self.win_size.height - point.y)
    }

    /// 场景坐标（左下原点）转屏幕坐标（左上原点）
    pub fn convert_to_ui(&self, point: Vec2) -> Vec2 {
        Vec2::new(point.x, self.win_size.height - point.y)
    }
}
