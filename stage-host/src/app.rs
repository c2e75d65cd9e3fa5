//! # App 模块
//!
//! 无窗口主循环：按固定帧时间驱动导演，直到导演结束或达到帧数上限。

use stage_runtime::Director;
use tracing::{debug, info};

use crate::config::HostConfig;
use crate::demo::Demo;
use crate::headless::{HeadlessRenderer, HeadlessTouch, MemoryCache};

/// 演示用到的纹理
const DEMO_TEXTURES: [&str; 3] = ["title.png", "sprites.png", "credits.png"];

/// 一次运行的结果
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    /// 执行的主循环次数
    pub iterations: u32,
    /// 实际绘制的帧数
    pub frames_drawn: u64,
    /// 导演是否已经结束（而不是因为帧数上限停止）
    pub ended: bool,
    /// 演示场景的事件
    pub journal: Vec<String>,
    /// 结束时缓存中剩余的资源数
    pub cached_resources: usize,
}

/// 构建导演与演示场景并运行
pub fn run(config: &HostConfig) -> anyhow::Result<RunSummary> {
    config.validate()?;

    let mut director = Director::new(config.director.clone())?;
    let mut renderer = HeadlessRenderer::new(config.window.width, config.window.height);

    let cache = MemoryCache::new("textures");
    for texture in DEMO_TEXTURES {
        cache.retain(texture);
    }
    let cache_state = cache.handle();
    director.register_cache(Box::new(cache));
    director.set_touch_dispatcher(Box::new(HeadlessTouch::default()));

    let demo = Demo::build(director.stage_mut())?;
    director.run_with_scene(demo.title)?;
    director.attach_view(&mut renderer);
    info!(
        width = config.window.width,
        height = config.window.height,
        frame_time = config.run.frame_time,
        "开始运行"
    );

    let mut iterations = 0;
    while director.is_animating() || director.is_purge_pending() {
        if config.run.max_frames.is_some_and(|max| iterations >= max) {
            debug!(iterations, "达到帧数上限");
            break;
        }
        director.main_loop(config.run.frame_time, &mut renderer);
        iterations += 1;
    }

    let ended = !director.is_animating() && director.running_scene().is_none();
    let summary = RunSummary {
        iterations,
        frames_drawn: renderer.frames(),
        ended,
        journal: demo.journal(),
        cached_resources: cache_state.borrow().entries.len(),
    };
    info!(
        iterations = summary.iterations,
        frames = summary.frames_drawn,
        ended = summary.ended,
        "运行结束"
    );
    Ok(summary)
}
