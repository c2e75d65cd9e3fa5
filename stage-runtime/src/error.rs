//! # Error 模块
//!
//! 定义 stage-runtime 中使用的错误类型。
//!
//! 所有前置条件违规都以 `Err` 返回，并且在返回之前不会修改任何状态。

use thiserror::Error;

use crate::node::{NodeId, NodeTag};

/// 节点树错误
#[derive(Error, Debug, Clone, PartialEq)]
pub enum NodeError {
    /// 句柄不存在或已失效
    #[error("节点 {id} 不存在或已被销毁")]
    UnknownNode { id: NodeId },

    /// 同一父节点下标签重复
    #[error("节点 {parent} 下已存在标签为 {tag} 的子节点")]
    DuplicateTag { parent: NodeId, tag: NodeTag },

    /// 子节点已经挂在别处
    #[error("节点 {child} 已经拥有父节点 {parent}")]
    AlreadyHasParent { child: NodeId, parent: NodeId },

    /// 不是指定父节点的子节点
    #[error("节点 {child} 不是 {parent} 的子节点")]
    NotAChild { parent: NodeId, child: NodeId },

    /// 挂到自身或自身后代之下
    #[error("不能把节点 {child} 挂到自身或其后代 {parent} 之下")]
    CyclicAttach { parent: NodeId, child: NodeId },

    /// 需要场景却得到普通节点
    #[error("节点 {id} 不是场景")]
    NotAScene { id: NodeId },
}

/// 调度器错误
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SchedulerError {
    /// 间隔为负数或非有限值
    #[error("无效的定时器间隔: {interval}")]
    InvalidInterval { interval: f32 },

    /// 重复次数为 0
    #[error("定时器 '{key}' 的重复次数不能为 0")]
    ZeroRepeat { key: String },
}

/// 动作错误
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ActionError {
    /// 绝对目标类动作没有反向
    #[error("动作 {action} 不支持反向")]
    NotReversible { action: &'static str },

    /// 组合动作没有子动作
    #[error("{kind} 至少需要一个子动作")]
    EmptyComposite { kind: &'static str },

    /// Repeat 次数为 0
    #[error("Repeat 的次数不能为 0")]
    ZeroRepeat,

    /// 组合动作中包含无限时长的子动作
    #[error("{kind} 的子动作 {child} 没有有限时长")]
    UnboundedChild {
        kind: &'static str,
        child: &'static str,
    },
}

/// 导演错误
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DirectorError {
    /// 已经有正在运行的场景
    #[error("已有正在运行的场景 {running}，请使用 push_scene 或 replace_scene")]
    SceneAlreadyRunning { running: NodeId },

    /// 没有正在运行的场景
    #[error("当前没有正在运行的场景")]
    NoRunningScene,

    /// 场景栈为空
    #[error("场景栈为空")]
    EmptySceneStack,

    /// 过渡时长为负数或非有限值
    #[error("无效的过渡时长: {duration}")]
    InvalidTransitionDuration { duration: f32 },

    /// 配置无效
    #[error("导演配置无效: {message}")]
    InvalidConfig { message: String },
}

/// stage-runtime 统一错误类型
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StageError {
    /// 节点树错误
    #[error("节点错误: {0}")]
    Node(#[from] NodeError),

    /// 调度器错误
    #[error("调度器错误: {0}")]
    Scheduler(#[from] SchedulerError),

    /// 动作错误
    #[error("动作错误: {0}")]
    Action(#[from] ActionError),

    /// 导演错误
    #[error("导演错误: {0}")]
    Director(#[from] DirectorError),
}

/// Result 类型别名
pub type StageResult<T> = Result<T, StageError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = SchedulerError::InvalidInterval { interval: -1.0 };
        assert_eq!(err.to_string(), "无效的定时器间隔: -1");

        let err: StageError = ActionError::NotReversible { action: "MoveTo" }.into();
        assert_eq!(err.to_string(), "动作错误: 动作 MoveTo 不支持反向");
    }

    #[test]
    fn test_director_error_from() {
        let err: StageError = DirectorError::NoRunningScene.into();
        assert!(matches!(err, StageError::Director(DirectorError::NoRunningScene)));
    }
}
