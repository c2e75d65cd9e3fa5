//! # Stage Host
//!
//! 无窗口运行演示场景。
//!
//! ## 用法
//!
//! ```bash
//! cargo run -p stage-host
//! cargo run -p stage-host -- --config config.json --frames 600 --stats
//! cargo run -p stage-host -- --write-config config.json
//! ```

use std::path::PathBuf;

use clap::Parser;
use stage_host::logging::init_logging;
use stage_host::{HostConfig, run};
use tracing::info;

#[derive(Parser)]
#[command(name = "stage-host")]
#[command(about = "无窗口运行演示场景")]
#[command(version)]
struct Cli {
    /// 配置文件（默认：config.json）
    #[arg(short, long, default_value = "config.json")]
    config: PathBuf,

    /// 最多运行的帧数
    #[arg(short, long)]
    frames: Option<u32>,

    /// 每帧推进的时间（秒）
    #[arg(long)]
    frame_time: Option<f32>,

    /// 日志级别
    #[arg(long)]
    log_level: Option<String>,

    /// 显示帧统计
    #[arg(long)]
    stats: bool,

    /// 把最终生效的配置写入文件后退出
    #[arg(long)]
    write_config: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = HostConfig::load(&cli.config);
    if let Some(frames) = cli.frames {
        config.run.max_frames = Some(frames);
    }
    if let Some(frame_time) = cli.frame_time {
        config.run.frame_time = frame_time;
    }
    if let Some(level) = cli.log_level {
        config.logging.level = level;
    }
    if cli.stats {
        config.director.display_stats = true;
    }
    config.validate()?;

    if let Some(path) = cli.write_config {
        config.save(&path)?;
        println!("✅ 配置已写入: {}", path.display());
        return Ok(());
    }

    init_logging(config.log_level()?);
    let summary = run(&config)?;

    for event in &summary.journal {
        info!(%event, "演示事件");
    }
    println!(
        "运行 {} 次主循环，绘制 {} 帧，{}",
        summary.iterations,
        summary.frames_drawn,
        if summary.ended { "导演已结束" } else { "达到帧数上限" }
    );
    Ok(())
}
