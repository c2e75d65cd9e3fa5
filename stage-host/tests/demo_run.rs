//! # 演示运行集成测试
//!
//! 以无窗口方式完整运行演示场景，不依赖真实的窗口或渲染设备。

use stage_host::{HostConfig, run};

/// 测试演示流程完整走完
#[test]
fn test_demo_runs_to_end() {
    let config = HostConfig::default();
    let summary = run(&config).unwrap();

    assert!(summary.ended);
    insta::assert_debug_snapshot!(summary.journal, @r#"
    [
        "title.enter",
        "gallery.enter",
        "slide:faded",
        "gallery.leave",
        "gallery.cleanup",
        "title.enter",
        "credits.enter",
        "credits.end",
    ]
    "#);
    // 最后一次主循环只做清理，不绘制
    assert_eq!(summary.frames_drawn, u64::from(summary.iterations) - 1);
    // 清理时缓存被清空
    assert_eq!(summary.cached_resources, 0);
}

/// 测试帧数上限
#[test]
fn test_frame_limit_stops_early() {
    let mut config = HostConfig::default();
    config.run.max_frames = Some(30);

    let summary = run(&config).unwrap();
    assert!(!summary.ended);
    assert_eq!(summary.iterations, 30);
    assert_eq!(summary.frames_drawn, 30);
    assert_eq!(summary.journal, vec!["title.enter"]);
    assert_eq!(summary.cached_resources, 3);
}

/// 测试无效配置被拒绝
#[test]
fn test_invalid_config_rejected() {
    let mut config = HostConfig::default();
    config.run.frame_time = -1.0;
    assert!(run(&config).is_err());
}

/// 测试配置保存与加载
#[test]
fn test_config_save_and_load() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.json");

    let mut config = HostConfig::default();
    config.window.width = 1280;
    config.director.display_stats = true;
    config.save(&path).unwrap();

    let loaded = HostConfig::load(&path);
    assert_eq!(loaded, config);

    // 文件不存在时回落到默认配置
    let missing = HostConfig::load(dir.path().join("missing.json"));
    assert_eq!(missing, HostConfig::default());

    // 解析失败时同样回落
    std::fs::write(&path, "{ not json").unwrap();
    assert_eq!(HostConfig::load(&path), HostConfig::default());
}
