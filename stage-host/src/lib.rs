//! # Stage Host
//!
//! stage-runtime 的无窗口宿主：读取配置、初始化日志，
//! 用记录型渲染器驱动演示场景。

pub mod app;
pub mod config;
pub mod demo;
pub mod headless;
pub mod logging;

pub use app::{RunSummary, run};
pub use config::{ConfigError, HostConfig};
