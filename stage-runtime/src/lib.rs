//! # Stage Runtime
//!
//! 2D 场景引擎的帧生命周期核心：导演、调度器、动作系统与节点生命周期。
//!
//! ## 架构概述
//!
//! `stage-runtime` 不做任何实际的绘制、窗口或 IO。
//! 宿主层实现 [`Renderer`] 等 trait，并以固定节奏驱动 [`Director::main_loop`]：
//!
//! ```text
//! Host                              Director
//!   │                                  │
//!   │──── main_loop(dt, renderer) ───►│ update(dt)
//!   │                                  │   ├─ Scheduler（系统钩子 → ActionManager）
//!   │                                  │   ├─ 节点 update / 定时器回调
//!   │                                  │   └─ 场景切换
//!   │◄─── renderer.draw_node(..) ─────│ draw()
//!   │                                  │
//! ```
//!
//! 所有节点保存在 [`NodeTree`] 中，以代际句柄 [`NodeId`] 引用。
//! 用户逻辑通过 [`NodeBehavior`] 挂在节点上，在回调中经由 [`NodeCtx`]
//! 访问整个 [`Stage`]；回调中发出的场景栈操作会在派发结束后由导演执行。
//!
//! ## 使用示例
//!
//! ```ignore
//! use stage_runtime::{Action, Director, DirectorConfig, Vec2};
//!
//! let mut director = Director::new(DirectorConfig::default())?;
//! let scene = director.stage_mut().nodes_mut().create_scene();
//! let sprite = director.stage_mut().nodes_mut().create_node();
//! director.stage_mut().add_child(scene, sprite, 0, None)?;
//! director.stage_mut().run_action(sprite, Action::move_by(1.0, Vec2::new(100.0, 0.0)))?;
//!
//! director.run_with_scene(scene)?;
//! director.attach_view(&mut renderer);
//! while director.is_animating() || director.is_purge_pending() {
//!     director.main_loop(1.0 / 60.0, &mut renderer);
//! }
//! ```
//!
//! ## 模块结构
//!
//! - [`node`]：节点句柄、节点仓库与用户行为
//! - [`stage`]：生命周期派发与每帧推进
//! - [`scheduler`]：每帧更新与定时器
//! - [`action`]：动作树、缓动与动作管理器
//! - [`director`]：场景栈、主循环、投影与帧统计
//! - [`render`]：宿主需要实现的外部接口
//! - [`config`]：导演配置
//! - [`error`]：错误类型定义

pub mod action;
pub mod config;
pub mod director;
pub mod error;
pub mod geometry;
pub mod node;
pub mod render;
pub mod scheduler;
pub mod stage;

// 重导出核心类型
pub use action::{Action, ActionEvent, ActionId, ActionManager, EasingFunction};
pub use config::{DeltaClamp, DirectorConfig, Projection};
pub use director::{
    Director, FrameStats, TRANSITION_FINISH_KEY, TransitionState, reset_shared_director,
    with_shared_director,
};
pub use error::{
    ActionError, DirectorError, NodeError, SchedulerError, StageError, StageResult,
};
pub use geometry::{Color, Size, Vec2};
pub use node::{Lifecycle, Node, NodeBehavior, NodeCtx, NodeId, NodeKind, NodeTag, NodeTree};
pub use render::{Renderer, ResourceCache, TouchDispatcher};
pub use scheduler::{Repeat, Scheduler, Target, TimerSpec};
pub use stage::{SceneCommand, Stage};
