//! 节点句柄与标签

use std::fmt;

/// 节点句柄
///
/// 由槽位下标与代数组成。槽位被回收后代数递增，旧句柄随之失效，
/// 不会误指向复用该槽位的新节点。
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId {
    index: u32,
    generation: u32,
}

impl NodeId {
    pub(crate) const fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    /// 槽位下标
    pub const fn index(self) -> u32 {
        self.index
    }

    /// 槽位代数
    pub const fn generation(self) -> u32 {
        self.generation
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({}v{})", self.index, self.generation)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}v{}", self.index, self.generation)
    }
}

/// 节点标签，在同一父节点的子节点之间唯一
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum NodeTag {
    Int(i32),
    Name(String),
}

impl fmt::Display for NodeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeTag::Int(v) => write!(f, "{v}"),
            NodeTag::Name(name) => write!(f, "'{name}'"),
        }
    }
}

impl From<i32> for NodeTag {
    fn from(value: i32) -> Self {
        NodeTag::Int(value)
    }
}

impl From<&str> for NodeTag {
    fn from(value: &str) -> Self {
        NodeTag::Name(value.to_string())
    }
}

impl From<String> for NodeTag {
    fn from(value: String) -> Self {
        NodeTag::Name(value)
    }
}
