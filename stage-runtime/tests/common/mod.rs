//! 集成测试共用的行为与渲染器

#![allow(dead_code)]

use std::cell::RefCell;
use std::rc::Rc;

use stage_runtime::{
    ActionEvent, FrameStats, Node, NodeBehavior, NodeCtx, NodeId, Projection, Renderer,
    ResourceCache, Size, TouchDispatcher,
};

pub type Log = Rc<RefCell<Vec<String>>>;

pub fn drain(log: &Log) -> Vec<String> {
    std::mem::take(&mut *log.borrow_mut())
}

/// 把生命周期与调度回调记录到共享日志
pub struct Recorder {
    name: &'static str,
    log: Log,
}

impl Recorder {
    pub fn new(name: &'static str, log: &Log) -> Self {
        Self {
            name,
            log: Rc::clone(log),
        }
    }

    fn push(&self, event: impl AsRef<str>) {
        self.log
            .borrow_mut()
            .push(format!("{}.{}", self.name, event.as_ref()));
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
        self.push(format!("timer:{key}"));
    }

    fn on_action_event(&mut self, _ctx: &mut NodeCtx<'_>, event: &ActionEvent) {
        match event {
            ActionEvent::Called { name, .. } => self.push(format!("call:{name}")),
            ActionEvent::Completed { tag, .. } => self.push(format!("completed:{tag:?}")),
        }
    }
}

/// 渲染器调用记录
#[derive(Debug, Default)]
pub struct RenderLog {
    pub frames: u32,
    pub drawn: Vec<NodeId>,
    pub viewport: Option<(f32, f32, f32, f32)>,
    pub projection: Option<(Projection, Size, f32)>,
    pub stats: Vec<FrameStats>,
}

/// 不做实际绘制的渲染器
pub struct MockRenderer {
    pub size: Size,
    pub log: Rc<RefCell<RenderLog>>,
}

impl MockRenderer {
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            size: Size::new(width, height),
            log: Rc::default(),
        }
    }

    /// 取出并清空已绘制的节点
    pub fn take_drawn(&self) -> Vec<NodeId> {
        std::mem::take(&mut self.log.borrow_mut().drawn)
    }
}

impl Renderer for MockRenderer {
    fn size_in_points(&self) -> Size {
        self.size
    }

    fn set_viewport_in_points(&mut self, x: f32, y: f32, width: f32, height: f32) {
        self.log.borrow_mut().viewport = Some((x, y, width, height));
    }

    fn set_projection(&mut self, projection: Projection, win_size: Size, z_eye: f32) {
        self.log.borrow_mut().projection = Some((projection, win_size, z_eye));
    }

    fn begin_frame(&mut self) {
        self.log.borrow_mut().frames += 1;
    }

    fn draw_node(&mut self, id: NodeId, _node: &Node) {
        self.log.borrow_mut().drawn.push(id);
    }

    fn end_frame(&mut self) {}

    fn draw_stats(&mut self, stats: &FrameStats) {
        self.log.borrow_mut().stats.push(stats.clone());
    }
}

/// 记录清理次数的缓存
pub struct CountingCache {
    pub unused: Rc<RefCell<u32>>,
    pub all: Rc<RefCell<u32>>,
}

impl ResourceCache for CountingCache {
    fn name(&self) -> &str {
        "counting"
    }

    fn purge_unused(&mut self) {
        *self.unused.borrow_mut() += 1;
    }

    fn purge_all(&mut self) {
        *self.all.borrow_mut() += 1;
    }
}

/// 记录调用的触摸分发器
pub struct RecordingDispatcher {
    pub log: Log,
}

impl TouchDispatcher for RecordingDispatcher {
    fn set_enabled(&mut self, enabled: bool) {
        self.log.borrow_mut().push(format!("touch.enabled:{enabled}"));
    }

    fn remove_all_delegates(&mut self) {
        self.log.borrow_mut().push("touch.remove_all".to_string());
    }
}
