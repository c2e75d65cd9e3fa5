//! # NodeTree 模块
//!
//! 节点仓库（arena）与纯拓扑操作。
//!
//! 这里只维护父子关系、z 序与标签；进入/退出/清理等生命周期事件由
//! [`Stage`](crate::stage::Stage) 在拓扑变化前后派发。

use std::fmt;

use crate::director::TransitionState;
use crate::error::NodeError;
use crate::geometry::{Color, Vec2};

use super::behavior::NodeBehavior;
use super::id::{NodeId, NodeTag};

/// 节点种类
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    /// 普通节点
    Node,
    /// 场景（场景栈中的元素）
    Scene,
    /// 过渡场景：同时持有离场与入场两个场景的生命周期
    Transition(TransitionState),
}

/// 节点生命周期阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Lifecycle {
    /// 刚创建，尚未进入
    #[default]
    Created,
    /// on_enter 已触发
    Entered,
    /// on_enter_transition_did_finish 已触发
    Running,
    /// on_exit 已触发
    Exited,
    /// cleanup 已触发，可以销毁
    Cleaned,
}

/// 场景图节点
pub struct Node {
    pub(crate) kind: NodeKind,
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
    pub(crate) z_order: i32,
    pub(crate) arrival: u64,
    pub(crate) tag: Option<NodeTag>,
    pub(crate) running: bool,
    pub(crate) lifecycle: Lifecycle,
    pub(crate) behavior: Option<Box<dyn NodeBehavior>>,

    /// 位置
    pub position: Vec2,
    /// 旋转角度（度）
    pub rotation: f32,
    /// X 方向缩放
    pub scale_x: f32,
    /// Y 方向缩放
    pub scale_y: f32,
    /// 不透明度 (0.0 - 1.0)
    pub opacity: f32,
    /// 颜色
    pub color: Color,
    /// 是否可见
    pub visible: bool,
}

impl Node {
    fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            parent: None,
            children: Vec::new(),
            z_order: 0,
            arrival: 0,
            tag: None,
            running: false,
            lifecycle: Lifecycle::Created,
            behavior: None,
            position: Vec2::ZERO,
            rotation: 0.0,
            scale_x: 1.0,
            scale_y: 1.0,
            opacity: 1.0,
            color: Color::WHITE,
            visible: true,
        }
    }

    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    pub fn is_scene(&self) -> bool {
        !matches!(self.kind, NodeKind::Node)
    }

    pub fn is_transition(&self) -> bool {
        matches!(self.kind, NodeKind::Transition(_))
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// 子节点，按 (z 序, 加入顺序) 排列
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn z_order(&self) -> i32 {
        self.z_order
    }

    pub fn tag(&self) -> Option<&NodeTag> {
        self.tag.as_ref()
    }

    /// 是否处于 on_enter 与 on_exit 之间
    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    /// 统一缩放（X 与 Y 不同时返回 X）
    pub fn scale(&self) -> f32 {
        self.scale_x
    }

    pub fn set_scale(&mut self, scale: f32) {
        self.scale_x = scale;
        self.scale_y = scale;
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("kind", &self.kind)
            .field("parent", &self.parent)
            .field("children", &self.children)
            .field("z_order", &self.z_order)
            .field("tag", &self.tag)
            .field("running", &self.running)
            .field("lifecycle", &self.lifecycle)
            .field("has_behavior", &self.behavior.is_some())
            .field("position", &self.position)
            .field("visible", &self.visible)
            .finish()
    }
}

struct Slot {
    generation: u32,
    node: Option<Node>,
}

/// 节点仓库
///
/// 以 `NodeId`（下标 + 代数）寻址，释放的槽位进入空闲链表复用。
#[derive(Default)]
pub struct NodeTree {
    slots: Vec<Slot>,
    free: Vec<u32>,
    next_arrival: u64,
}

impl NodeTree {
    pub fn new() -> Self {
        Self::default()
    }

    // ========== 创建 ==========

    /// 创建普通节点
    pub fn create_node(&mut self) -> NodeId {
        self.insert(Node::new(NodeKind::Node))
    }

    /// 创建带行为的普通节点
    pub fn create_node_with(&mut self, behavior: impl NodeBehavior) -> NodeId {
        let id = self.create_node();
        self.set_behavior(id, behavior);
        id
    }

    /// 创建场景
    pub fn create_scene(&mut self) -> NodeId {
        self.insert(Node::new(NodeKind::Scene))
    }

    /// 创建带行为的场景
    pub fn create_scene_with(&mut self, behavior: impl NodeBehavior) -> NodeId {
        let id = self.create_scene();
        self.set_behavior(id, behavior);
        id
    }

    pub(crate) fn create_transition(&mut self, state: TransitionState) -> NodeId {
        self.insert(Node::new(NodeKind::Transition(state)))
    }

    fn insert(&mut self, node: Node) -> NodeId {
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.node = Some(node);
            return NodeId::new(index, slot.generation);
        }

        let index = self.slots.len() as u32;
        self.slots.push(Slot {
            generation: 0,
            node: Some(node),
        });
        NodeId::new(index, 0)
    }

    /// 为节点设置行为，替换已有行为
    pub fn set_behavior(&mut self, id: NodeId, behavior: impl NodeBehavior) -> bool {
        match self.get_mut(id) {
            Some(node) => {
                node.behavior = Some(Box::new(behavior));
                true
            }
            None => false,
        }
    }

    // ========== 查询 ==========

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.slots
            .get(id.index() as usize)
            .filter(|slot| slot.generation == id.generation())
            .and_then(|slot| slot.node.as_ref())
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.slots
            .get_mut(id.index() as usize)
            .filter(|slot| slot.generation == id.generation())
            .and_then(|slot| slot.node.as_mut())
    }

    /// 获取节点，句柄失效时返回错误
    pub fn node(&self, id: NodeId) -> Result<&Node, NodeError> {
        self.get(id).ok_or(NodeError::UnknownNode { id })
    }

    /// 获取可变节点，句柄失效时返回错误
    pub fn node_mut(&mut self, id: NodeId) -> Result<&mut Node, NodeError> {
        self.get_mut(id).ok_or(NodeError::UnknownNode { id })
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.get(id).is_some()
    }

    /// 存活节点数量
    pub fn len(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_scene(&self, id: NodeId) -> bool {
        self.get(id).is_some_and(Node::is_scene)
    }

    pub fn is_running(&self, id: NodeId) -> bool {
        self.get(id).is_some_and(Node::is_running)
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(|node| node.parent)
    }

    /// 子节点列表，句柄失效时为空
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.get(id).map(|node| node.children.as_slice()).unwrap_or(&[])
    }

    /// 按标签查找直接子节点
    pub fn child_by_tag(&self, parent: NodeId, tag: impl Into<NodeTag>) -> Option<NodeId> {
        let tag = tag.into();
        self.children(parent)
            .iter()
            .copied()
            .find(|&child| self.get(child).and_then(|node| node.tag.as_ref()) == Some(&tag))
    }

    /// `ancestor` 是否是 `id` 自身或其祖先
    pub fn is_ancestor_or_self(&self, ancestor: NodeId, id: NodeId) -> bool {
        let mut current = Some(id);
        while let Some(node) = current {
            if node == ancestor {
                return true;
            }
            current = self.parent(node);
        }
        false
    }

    /// 先序遍历子树（含自身），子节点按绘制顺序
    pub fn subtree(&self, root: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        if !self.contains(root) {
            return out;
        }
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            out.push(id);
            stack.extend(self.children(id).iter().rev().copied());
        }
        out
    }

    // ========== 拓扑修改 ==========

    /// 检查挂接前置条件，不修改任何状态
    pub(crate) fn check_attach(
        &self,
        parent: NodeId,
        child: NodeId,
        tag: Option<&NodeTag>,
    ) -> Result<(), NodeError> {
        let parent_node = self.node(parent)?;
        let child_node = self.node(child)?;

        if let Some(existing) = child_node.parent {
            return Err(NodeError::AlreadyHasParent {
                child,
                parent: existing,
            });
        }
        if self.is_ancestor_or_self(child, parent) {
            return Err(NodeError::CyclicAttach { parent, child });
        }
        if let Some(tag) = tag {
            let duplicate = parent_node
                .children
                .iter()
                .any(|&sibling| self.get(sibling).and_then(|n| n.tag.as_ref()) == Some(tag));
            if duplicate {
                return Err(NodeError::DuplicateTag {
                    parent,
                    tag: tag.clone(),
                });
            }
        }
        Ok(())
    }

    /// 把 `child` 挂到 `parent` 下
    pub(crate) fn attach(
        &mut self,
        parent: NodeId,
        child: NodeId,
        z_order: i32,
        tag: Option<NodeTag>,
    ) -> Result<(), NodeError> {
        self.check_attach(parent, child, tag.as_ref())?;

        let arrival = self.bump_arrival();
        let child_node = self.node_mut(child)?;
        child_node.parent = Some(parent);
        child_node.z_order = z_order;
        child_node.arrival = arrival;
        child_node.tag = tag;

        self.insert_sorted(parent, child)
    }

    /// 把 `child` 从 `parent` 下摘除
    pub(crate) fn detach(&mut self, parent: NodeId, child: NodeId) -> Result<(), NodeError> {
        self.check_child(parent, child)?;
        self.node_mut(parent)?.children.retain(|&c| c != child);
        self.node_mut(child)?.parent = None;
        Ok(())
    }

    /// 检查 `child` 是否是 `parent` 的直接子节点
    pub(crate) fn check_child(&self, parent: NodeId, child: NodeId) -> Result<(), NodeError> {
        self.node(child)?;
        if self.node(parent)?.children.contains(&child) {
            Ok(())
        } else {
            Err(NodeError::NotAChild { parent, child })
        }
    }

    /// 修改子节点的 z 序，并重新计入加入顺序
    pub fn reorder_child(
        &mut self,
        parent: NodeId,
        child: NodeId,
        z_order: i32,
    ) -> Result<(), NodeError> {
        self.check_child(parent, child)?;
        self.node_mut(parent)?.children.retain(|&c| c != child);

        let arrival = self.bump_arrival();
        let child_node = self.node_mut(child)?;
        child_node.z_order = z_order;
        child_node.arrival = arrival;

        self.insert_sorted(parent, child)
    }

    fn insert_sorted(&mut self, parent: NodeId, child: NodeId) -> Result<(), NodeError> {
        let key = {
            let node = self.node(child)?;
            (node.z_order, node.arrival)
        };
        let position = {
            let siblings = &self.node(parent)?.children;
            siblings.partition_point(|&sibling| {
                self.get(sibling)
                    .is_some_and(|n| (n.z_order, n.arrival) <= key)
            })
        };
        self.node_mut(parent)?.children.insert(position, child);
        Ok(())
    }

    fn bump_arrival(&mut self) -> u64 {
        let arrival = self.next_arrival;
        self.next_arrival += 1;
        arrival
    }

    /// 释放整棵子树的槽位，返回被释放的节点数
    ///
    /// 只做内存层面的回收；调用方负责先派发 on_exit / cleanup 并摘除父子关系。
    pub(crate) fn free_subtree(&mut self, root: NodeId) -> usize {
        let ids = self.subtree(root);
        for &id in &ids {
            let slot = &mut self.slots[id.index() as usize];
            slot.node = None;
            slot.generation = slot.generation.wrapping_add(1);
            self.free.push(id.index());
        }
        ids.len()
    }

    // ========== 行为借出 ==========

    pub(crate) fn take_behavior(&mut self, id: NodeId) -> Option<Box<dyn NodeBehavior>> {
        self.get_mut(id).and_then(|node| node.behavior.take())
    }

    /// 归还行为；节点在回调期间被销毁或已被设置了新行为时直接丢弃
    pub(crate) fn restore_behavior(&mut self, id: NodeId, behavior: Box<dyn NodeBehavior>) {
        if let Some(node) = self.get_mut(id)
            && node.behavior.is_none()
        {
            node.behavior = Some(behavior);
        }
    }
}
