//! 日志初始化

use std::sync::Once;

use tracing::Level;
use tracing_subscriber::FmtSubscriber;

static INIT: Once = Once::new();

/// 初始化全局日志，重复调用会被忽略
pub fn init_logging(level: Level) {
    INIT.call_once(|| {
        let subscriber = FmtSubscriber::builder().with_max_level(level).finish();

        if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
            eprintln!("⚠️ 日志初始化失败: {e}");
            return;
        }

        tracing::debug!(%level, "日志已初始化");
    });
}
