//! # Demo 模块
//!
//! 演示用的三个场景，覆盖场景栈、过渡、定时器与各类动作：
//!
//! ```text
//! Title ──push(过渡)──► Gallery ──pop──► Title ──replace(过渡)──► Credits ──end
//! ```
//!
//! 每个场景把关键事件写入共享的日志（[`Journal`]），便于宿主和测试检查流程。

use std::cell::RefCell;
use std::rc::Rc;

use stage_runtime::{
    Action, ActionError, ActionEvent, Color, EasingFunction, NodeBehavior, NodeCtx, NodeError,
    NodeId, Stage, TimerSpec, Vec2,
};
use tracing::{info, warn};

/// 场景事件日志
pub type Journal = Rc<RefCell<Vec<String>>>;

const ADVANCE: &str = "advance";
const LEAVE: &str = "leave";
const END: &str = "end";

/// 标题停留时间（秒）
const TITLE_HOLD: f32 = 1.0;
/// 画廊停留时间（秒）
const GALLERY_HOLD: f32 = 2.0;
/// 片尾停留时间（秒）
const CREDITS_HOLD: f32 = 1.0;

const PUSH_TRANSITION: f32 = 0.5;
const REPLACE_TRANSITION: f32 = 0.25;

fn note(journal: &Journal, entry: impl Into<String>) {
    let entry = entry.into();
    info!(event = %entry, "演示");
    journal.borrow_mut().push(entry);
}

/// 演示场景集合
pub struct Demo {
    pub title: NodeId,
    pub gallery: NodeId,
    pub credits: NodeId,
    journal: Journal,
}

impl Demo {
    /// 在舞台上创建所有演示场景
    pub fn build(stage: &mut Stage) -> Result<Self, NodeError> {
        let journal = Journal::default();
        let nodes = stage.nodes_mut();
        let title = nodes.create_scene();
        let gallery = nodes.create_scene_with(GalleryScene {
            built: false,
            journal: Rc::clone(&journal),
        });
        let credits = nodes.create_scene_with(CreditsScene {
            journal: Rc::clone(&journal),
        });
        nodes.set_behavior(
            title,
            TitleScene {
                gallery,
                credits,
                visits: 0,
                journal: Rc::clone(&journal),
            },
        );

        // 标题文字呼吸效果，场景进入前以暂停状态登记
        let label = stage.nodes_mut().create_node();
        stage.add_child(title, label, 0, Some("label".into()))?;
        stage.nodes_mut().node_mut(label)?.position = Vec2::new(480.0, 400.0);
        match breathing() {
            Ok(action) => {
                if let Err(e) = stage.run_action(label, action) {
                    warn!(error = %e, "标题动作启动失败");
                }
            }
            Err(e) => warn!(error = %e, "标题动作构建失败"),
        }

        Ok(Self {
            title,
            gallery,
            credits,
            journal,
        })
    }

    /// 到目前为止的事件
    pub fn journal(&self) -> Vec<String> {
        self.journal.borrow().clone()
    }
}

fn breathing() -> Result<Action, ActionError> {
    Ok(Action::repeat_forever(Action::sequence(vec![
        Action::fade_to(0.5, 0.3),
        Action::fade_to(0.5, 1.0),
    ])?))
}

// ========== 标题 ==========

struct TitleScene {
    gallery: NodeId,
    credits: NodeId,
    visits: u32,
    journal: Journal,
}

impl NodeBehavior for TitleScene {
    fn on_enter(&mut self, ctx: &mut NodeCtx<'_>) {
        self.visits += 1;
        note(&self.journal, "title.enter");
        if let Err(e) = ctx.schedule(ADVANCE, TimerSpec::once(TITLE_HOLD)) {
            warn!(error = %e, "标题定时器注册失败");
        }
    }

    fn on_timer(&mut self, ctx: &mut NodeCtx<'_>, key: &str, _dt: f32) {
        if key != ADVANCE {
            return;
        }
        if self.visits == 1 {
            ctx.push_scene_with_transition(self.gallery, PUSH_TRANSITION);
        } else {
            ctx.replace_scene_with_transition(self.credits, REPLACE_TRANSITION);
        }
    }
}

// ========== 画廊 ==========

struct GalleryScene {
    built: bool,
    journal: Journal,
}

/// 画廊中每个精灵的名字、位置与动作
fn gallery_sprites() -> Result<Vec<(&'static str, Vec2, Action)>, ActionError> {
    let pulse = Action::scale_by(0.5, 1.5, 1.5);
    let pulse = Action::repeat_forever(Action::sequence(vec![
        pulse.clone(),
        pulse.reverse()?,
    ])?);

    let tint = Action::tint_by(0.75, -0.5, -0.5, 0.0);
    let tint = Action::sequence(vec![tint.clone(), tint.reverse()?])?;

    let slide = Action::sequence(vec![
        Action::ease(
            Action::move_by(1.0, Vec2::new(200.0, 0.0)),
            EasingFunction::EaseInOut,
        )?,
        Action::fade_out(0.5),
        Action::call("faded"),
    ])?;

    Ok(vec![
        ("pulse", Vec2::new(160.0, 320.0), pulse),
        (
            "spin",
            Vec2::new(320.0, 320.0),
            Action::repeat_forever(Action::rotate_by(1.0, 360.0)),
        ),
        ("blink", Vec2::new(480.0, 320.0), Action::blink(1.5, 6)),
        ("tint", Vec2::new(640.0, 320.0), tint),
        ("slide", Vec2::new(160.0, 160.0), slide),
    ])
}

impl GalleryScene {
    fn build(&mut self, ctx: &mut NodeCtx<'_>) -> anyhow::Result<()> {
        for (z, (name, position, action)) in gallery_sprites()?.into_iter().enumerate() {
            let sprite = ctx.stage_mut().nodes_mut().create_node_with(Sprite {
                name,
                journal: Rc::clone(&self.journal),
            });
            ctx.add_child(sprite, z as i32, Some(name.into()))?;
            if let Some(node) = ctx.stage_mut().nodes_mut().get_mut(sprite) {
                node.position = position;
                node.color = Color::WHITE;
            }
            ctx.stage_mut().run_action(sprite, action)?;
        }
        self.built = true;
        Ok(())
    }
}

impl NodeBehavior for GalleryScene {
    fn on_enter(&mut self, ctx: &mut NodeCtx<'_>) {
        note(&self.journal, "gallery.enter");
        if !self.built
            && let Err(e) = self.build(ctx)
        {
            warn!(error = %e, "画廊构建失败");
        }
        if let Err(e) = ctx.schedule(LEAVE, TimerSpec::once(GALLERY_HOLD)) {
            warn!(error = %e, "画廊定时器注册失败");
        }
    }

    fn on_timer(&mut self, ctx: &mut NodeCtx<'_>, key: &str, _dt: f32) {
        if key == LEAVE {
            note(&self.journal, "gallery.leave");
            ctx.pop_scene();
        }
    }

    fn cleanup(&mut self, _ctx: &mut NodeCtx<'_>) {
        note(&self.journal, "gallery.cleanup");
    }
}

/// 记录动作回调的精灵
struct Sprite {
    name: &'static str,
    journal: Journal,
}

impl NodeBehavior for Sprite {
    fn on_action_event(&mut self, _ctx: &mut NodeCtx<'_>, event: &ActionEvent) {
        if let ActionEvent::Called { name, .. } = event {
            note(&self.journal, format!("{}:{}", self.name, name));
        }
    }
}

// ========== 片尾 ==========

struct CreditsScene {
    journal: Journal,
}

impl NodeBehavior for CreditsScene {
    fn on_enter(&mut self, ctx: &mut NodeCtx<'_>) {
        note(&self.journal, "credits.enter");
        if let Err(e) = ctx.schedule(END, TimerSpec::once(CREDITS_HOLD)) {
            warn!(error = %e, "片尾定时器注册失败");
        }
    }

    fn on_timer(&mut self, ctx: &mut NodeCtx<'_>, key: &str, _dt: f32) {
        if key == END {
            note(&self.journal, "credits.end");
            ctx.end();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_creates_scenes() {
        let mut stage = Stage::new();
        let demo = Demo::build(&mut stage).unwrap();

        assert!(stage.nodes().is_scene(demo.title));
        assert!(stage.nodes().is_scene(demo.gallery));
        assert!(stage.nodes().is_scene(demo.credits));
        let label = stage.nodes().child_by_tag(demo.title, "label").unwrap();
        // 标题未进入，动作处于暂停状态
        assert!(stage.actions().is_target_paused(label));
        assert!(demo.journal().is_empty());
    }

    #[test]
    fn test_gallery_actions_are_buildable() {
        let sprites = gallery_sprites().unwrap();
        let names: Vec<_> = sprites.iter().map(|(name, _, _)| *name).collect();
        assert_eq!(names, vec!["pulse", "spin", "blink", "tint", "slide"]);
        assert_eq!(sprites[4].2.duration(), 1.5);
    }
}
