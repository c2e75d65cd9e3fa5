//! # Node 模块
//!
//! 场景图节点：句柄、仓库与用户行为。

pub mod behavior;
pub mod id;
pub mod tree;

pub use behavior::{NodeBehavior, NodeCtx};
pub use id::{NodeId, NodeTag};
pub use tree::{Lifecycle, Node, NodeKind, NodeTree};
