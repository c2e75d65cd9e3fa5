//! # Headless 模块
//!
//! 不依赖窗口与 GPU 的协作者实现：记录绘制调用的渲染器、
//! 内存中的资源缓存，以及只记录状态的触摸分发器。

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use stage_runtime::{
    FrameStats, Node, NodeId, Projection, Renderer, ResourceCache, Size, TouchDispatcher,
};
use tracing::{debug, trace};

/// 无窗口渲染器
#[derive(Debug)]
pub struct HeadlessRenderer {
    size: Size,
    projection: Option<Projection>,
    z_eye: f32,
    frames: u64,
    frame_nodes: Vec<NodeId>,
    last_frame: Vec<NodeId>,
    last_stats: Option<FrameStats>,
}

impl HeadlessRenderer {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            size: Size::new(width as f32, height as f32),
            projection: None,
            z_eye: 0.0,
            frames: 0,
            frame_nodes: Vec::new(),
            last_frame: Vec::new(),
            last_stats: None,
        }
    }

    /// 已提交的帧数
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// 上一帧绘制的节点（按绘制顺序）
    pub fn last_frame(&self) -> &[NodeId] {
        &self.last_frame
    }

    pub fn projection(&self) -> Option<Projection> {
        self.projection
    }

    pub fn z_eye(&self) -> f32 {
        self.z_eye
    }

    pub fn last_stats(&self) -> Option<&FrameStats> {
        self.last_stats.as_ref()
    }

    /// 修改视图尺寸，之后需要调用导演的 `reshape_projection`
    pub fn resize(&mut self, width: u32, height: u32) {
        self.size = Size::new(width as f32, height as f32);
    }
}

impl Renderer for HeadlessRenderer {
    fn size_in_points(&self) -> Size {
        self.size
    }

    fn set_viewport_in_points(&mut self, x: f32, y: f32, width: f32, height: f32) {
        debug!(x, y, width, height, "设置视口");
    }

    fn set_projection(&mut self, projection: Projection, _win_size: Size, z_eye: f32) {
        debug!(?projection, z_eye, "设置投影");
        self.projection = Some(projection);
        self.z_eye = z_eye;
    }

    fn begin_frame(&mut self) {
        self.frame_nodes.clear();
    }

    fn draw_node(&mut self, id: NodeId, node: &Node) {
        trace!(
            node = %id,
            x = node.position.x,
            y = node.position.y,
            opacity = node.opacity,
            "绘制节点"
        );
        self.frame_nodes.push(id);
    }

    fn end_frame(&mut self) {
        self.frames += 1;
        std::mem::swap(&mut self.last_frame, &mut self.frame_nodes);
    }

    fn draw_stats(&mut self, stats: &FrameStats) {
        if stats.frames == 0 {
            debug!(
                fps = stats.frame_rate,
                draws = stats.draw_count,
                total = stats.total_frames,
                "帧统计"
            );
        }
        self.last_stats = Some(stats.clone());
    }
}

/// 缓存内容
#[derive(Debug, Default)]
pub struct CacheState {
    /// 资源名 → 引用计数
    pub entries: BTreeMap<String, u32>,
    pub purge_count: u32,
}

/// 内存资源缓存
///
/// 内部状态共享，注册到导演之后仍可通过 [`MemoryCache::handle`] 查看。
#[derive(Debug, Clone)]
pub struct MemoryCache {
    name: String,
    state: Rc<RefCell<CacheState>>,
}

impl MemoryCache {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: Rc::default(),
        }
    }

    pub fn handle(&self) -> Rc<RefCell<CacheState>> {
        Rc::clone(&self.state)
    }

    /// 载入资源并增加引用
    pub fn retain(&self, resource: &str) {
        *self
            .state
            .borrow_mut()
            .entries
            .entry(resource.to_string())
            .or_default() += 1;
    }

    /// 减少引用，计数归零的资源在 `purge_unused` 时释放
    pub fn release(&self, resource: &str) {
        if let Some(count) = self.state.borrow_mut().entries.get_mut(resource) {
            *count = count.saturating_sub(1);
        }
    }

    pub fn len(&self) -> usize {
        self.state.borrow().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ResourceCache for MemoryCache {
    fn name(&self) -> &str {
        &self.name
    }

    fn purge_unused(&mut self) {
        let mut state = self.state.borrow_mut();
        let before = state.entries.len();
        state.entries.retain(|_, count| *count > 0);
        debug!(cache = %self.name, released = before - state.entries.len(), "释放未使用资源");
    }

    fn purge_all(&mut self) {
        let mut state = self.state.borrow_mut();
        state.entries.clear();
        state.purge_count += 1;
    }
}

/// 只记录状态的触摸分发器
#[derive(Debug, Default)]
pub struct HeadlessTouch {
    pub enabled: bool,
    /// `remove_all_delegates` 被调用的次数
    pub cleared: u32,
}

impl TouchDispatcher for HeadlessTouch {
    fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    fn remove_all_delegates(&mut self) {
        self.cleared += 1;
    }
}
