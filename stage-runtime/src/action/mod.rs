//! # Action 模块
//!
//! 作用于单个节点、随时间推进的效果。
//!
//! ## 结构
//!
//! 动作是一棵按值持有的树：叶子是瞬时动作（`Show`、`Place`、`CallFunc` 等）
//! 和区间动作（`MoveBy`、`FadeIn` 等），内部节点是组合动作
//! （`Sequence`、`Spawn`、`Repeat`、`RepeatForever`、`Ease`）。
//! 每个动作自带运行状态（起始值、已推进时间），克隆出的动作在 `start`
//! 之后即可独立运行在另一个节点上。
//!
//! ## 推进模型
//!
//! - `start(node)`：重置进度并记录起始值
//! - `step(dt, node)`：顶层推进，累加时间后换算为进度比例
//! - `update(t, node)`：按比例 `t`（0.0 - 1.0）应用效果，组合动作据此驱动子动作
//!
//! 瞬时动作在 `update` 时一次性生效；`CallFunc` 不直接执行用户代码，
//! 而是产出一个具名调用，由 [`ActionManager`] 转换为 [`ActionEvent`]。

mod composite;
pub mod easing;
pub mod manager;

pub use easing::EasingFunction;
pub use manager::{ActionEvent, ActionId, ActionManager};

use crate::error::ActionError;
use crate::geometry::{Color, Vec2};
use crate::node::Node;

use composite::{Repeat, Sequence, Spawn};

#[derive(Debug, Clone, PartialEq)]
enum ActionKind {
    // 瞬时
    Show,
    Hide,
    ToggleVisibility,
    Place(Vec2),
    CallFunc(String),

    // 区间
    Delay,
    MoveBy { delta: Vec2, start: Vec2 },
    MoveTo { end: Vec2, start: Vec2 },
    RotateBy { angle: f32, start: f32 },
    RotateTo { angle: f32, start: f32, diff: f32 },
    ScaleBy { sx: f32, sy: f32, start_x: f32, start_y: f32 },
    ScaleTo { sx: f32, sy: f32, start_x: f32, start_y: f32 },
    FadeIn,
    FadeOut,
    FadeTo { opacity: f32, start: f32 },
    TintBy { dr: f32, dg: f32, db: f32, start: Color },
    TintTo { color: Color, start: Color },
    Blink { times: u32, original: bool },

    // 组合
    Sequence(Sequence),
    Spawn(Spawn),
    Repeat(Repeat),
    RepeatForever(Box<Action>),
    Ease { inner: Box<Action>, easing: EasingFunction },
}

/// 动作
#[derive(Debug, Clone, PartialEq)]
pub struct Action {
    kind: ActionKind,
    duration: f32,
    elapsed: f32,
    done: bool,
    tag: Option<i32>,
}

fn sanitize_duration(duration: f32) -> f32 {
    if duration.is_finite() && duration > 0.0 {
        duration
    } else {
        0.0
    }
}

impl Action {
    fn new(kind: ActionKind, duration: f32) -> Self {
        Self {
            kind,
            duration,
            elapsed: 0.0,
            done: false,
            tag: None,
        }
    }

    fn interval(kind: ActionKind, duration: f32) -> Self {
        Self::new(kind, sanitize_duration(duration))
    }

    // ========== 瞬时动作 ==========

    pub fn show() -> Self {
        Self::new(ActionKind::Show, 0.0)
    }

    pub fn hide() -> Self {
        Self::new(ActionKind::Hide, 0.0)
    }

    pub fn toggle_visibility() -> Self {
        Self::new(ActionKind::ToggleVisibility, 0.0)
    }

    pub fn place(position: Vec2) -> Self {
        Self::new(ActionKind::Place(position), 0.0)
    }

    /// 具名回调，触发时产出 [`ActionEvent::Called`]
    pub fn call(name: impl Into<String>) -> Self {
        Self::new(ActionKind::CallFunc(name.into()), 0.0)
    }

    // ========== 区间动作 ==========

    pub fn delay(duration: f32) -> Self {
        Self::interval(ActionKind::Delay, duration)
    }

    pub fn move_by(duration: f32, delta: Vec2) -> Self {
        Self::interval(
            ActionKind::MoveBy {
                delta,
                start: Vec2::ZERO,
            },
            duration,
        )
    }

    pub fn move_to(duration: f32, position: Vec2) -> Self {
        Self::interval(
            ActionKind::MoveTo {
                end: position,
                start: Vec2::ZERO,
            },
            duration,
        )
    }

    /// 旋转指定角度（度）
    pub fn rotate_by(duration: f32, angle: f32) -> Self {
        Self::interval(ActionKind::RotateBy { angle, start: 0.0 }, duration)
    }

    /// 沿最短方向旋转到指定角度（度）
    pub fn rotate_to(duration: f32, angle: f32) -> Self {
        Self::interval(
            ActionKind::RotateTo {
                angle,
                start: 0.0,
                diff: 0.0,
            },
            duration,
        )
    }

    pub fn scale_by(duration: f32, sx: f32, sy: f32) -> Self {
        Self::interval(
            ActionKind::ScaleBy {
                sx,
                sy,
                start_x: 1.0,
                start_y: 1.0,
            },
            duration,
        )
    }

    pub fn scale_to(duration: f32, sx: f32, sy: f32) -> Self {
        Self::interval(
            ActionKind::ScaleTo {
                sx,
                sy,
                start_x: 1.0,
                start_y: 1.0,
            },
            duration,
        )
    }

    pub fn fade_in(duration: f32) -> Self {
        Self::interval(ActionKind::FadeIn, duration)
    }

    pub fn fade_out(duration: f32) -> Self {
        Self::interval(ActionKind::FadeOut, duration)
    }

    pub fn fade_to(duration: f32, opacity: f32) -> Self {
        Self::interval(
            ActionKind::FadeTo {
                opacity: opacity.clamp(0.0, 1.0),
                start: 1.0,
            },
            duration,
        )
    }

    pub fn tint_by(duration: f32, dr: f32, dg: f32, db: f32) -> Self {
        Self::interval(
            ActionKind::TintBy {
                dr,
                dg,
                db,
                start: Color::WHITE,
            },
            duration,
        )
    }

    pub fn tint_to(duration: f32, color: Color) -> Self {
        Self::interval(
            ActionKind::TintTo {
                color,
                start: Color::WHITE,
            },
            duration,
        )
    }

    /// 闪烁 `times` 次，结束时恢复原来的可见性
    pub fn blink(duration: f32, times: u32) -> Self {
        Self::interval(
            ActionKind::Blink {
                times: times.max(1),
                original: true,
            },
            duration,
        )
    }

    // ========== 组合动作 ==========

    /// 组合动作按比例驱动子动作，子动作必须有有限时长
    fn check_bounded(kind: &'static str, action: &Action) -> Result<(), ActionError> {
        if action.duration.is_finite() {
            Ok(())
        } else {
            Err(ActionError::UnboundedChild {
                kind,
                child: action.name(),
            })
        }
    }

    /// 依次执行，总时长为各子动作时长之和
    pub fn sequence(actions: Vec<Action>) -> Result<Self, ActionError> {
        if actions.is_empty() {
            return Err(ActionError::EmptyComposite { kind: "Sequence" });
        }
        for action in &actions {
            Self::check_bounded("Sequence", action)?;
        }
        let (sequence, duration) = Sequence::new(actions);
        Ok(Self::new(ActionKind::Sequence(sequence), duration))
    }

    /// 同时执行，总时长为最长子动作的时长
    pub fn spawn(actions: Vec<Action>) -> Result<Self, ActionError> {
        if actions.is_empty() {
            return Err(ActionError::EmptyComposite { kind: "Spawn" });
        }
        for action in &actions {
            Self::check_bounded("Spawn", action)?;
        }
        let (spawn, duration) = Spawn::new(actions);
        Ok(Self::new(ActionKind::Spawn(spawn), duration))
    }

    /// 重复执行 `times` 次
    pub fn repeat(action: Action, times: u32) -> Result<Self, ActionError> {
        if times == 0 {
            return Err(ActionError::ZeroRepeat);
        }
        Self::check_bounded("Repeat", &action)?;
        let duration = action.duration * times as f32;
        Ok(Self::new(
            ActionKind::Repeat(Repeat::new(action, times)),
            duration,
        ))
    }

    /// 无限重复，永远不会完成
    pub fn repeat_forever(action: Action) -> Self {
        Self::new(ActionKind::RepeatForever(Box::new(action)), f32::INFINITY)
    }

    /// 对子动作的进度做缓动重映射
    pub fn ease(action: Action, easing: EasingFunction) -> Result<Self, ActionError> {
        Self::check_bounded("Ease", &action)?;
        let duration = action.duration;
        Ok(Self::new(
            ActionKind::Ease {
                inner: Box::new(action),
                easing,
            },
            duration,
        ))
    }

    /// 设置标签
    pub fn with_tag(mut self, tag: i32) -> Self {
        self.tag = Some(tag);
        self
    }

    // ========== 查询 ==========

    pub fn tag(&self) -> Option<i32> {
        self.tag
    }

    /// 总时长（秒）；瞬时动作为 0，`RepeatForever` 为无穷大
    pub fn duration(&self) -> f32 {
        self.duration
    }

    /// 自上次 `start` 以来推进的时间
    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }

    pub fn is_done(&self) -> bool {
        self.done
    }

    pub fn is_instant(&self) -> bool {
        matches!(
            self.kind,
            ActionKind::Show
                | ActionKind::Hide
                | ActionKind::ToggleVisibility
                | ActionKind::Place(_)
                | ActionKind::CallFunc(_)
        )
    }

    /// 被包装的子动作（`Repeat`、`RepeatForever`、`Ease`）
    pub fn inner(&self) -> Option<&Action> {
        match &self.kind {
            ActionKind::Repeat(repeat) => Some(&repeat.inner),
            ActionKind::RepeatForever(inner) | ActionKind::Ease { inner, .. } => Some(inner),
            _ => None,
        }
    }

    /// 子动作列表（`Sequence`、`Spawn`）
    pub fn children(&self) -> &[Action] {
        match &self.kind {
            ActionKind::Sequence(sequence) => &sequence.children,
            ActionKind::Spawn(spawn) => &spawn.children,
            _ => &[],
        }
    }

    /// `Ease` 的缓动曲线
    pub fn easing(&self) -> Option<EasingFunction> {
        match &self.kind {
            ActionKind::Ease { easing, .. } => Some(*easing),
            _ => None,
        }
    }

    /// 动作类型名
    pub fn name(&self) -> &'static str {
        match &self.kind {
            ActionKind::Show => "Show",
            ActionKind::Hide => "Hide",
            ActionKind::ToggleVisibility => "ToggleVisibility",
            ActionKind::Place(_) => "Place",
            ActionKind::CallFunc(_) => "CallFunc",
            ActionKind::Delay => "DelayTime",
            ActionKind::MoveBy { .. } => "MoveBy",
            ActionKind::MoveTo { .. } => "MoveTo",
            ActionKind::RotateBy { .. } => "RotateBy",
            ActionKind::RotateTo { .. } => "RotateTo",
            ActionKind::ScaleBy { .. } => "ScaleBy",
            ActionKind::ScaleTo { .. } => "ScaleTo",
            ActionKind::FadeIn => "FadeIn",
            ActionKind::FadeOut => "FadeOut",
            ActionKind::FadeTo { .. } => "FadeTo",
            ActionKind::TintBy { .. } => "TintBy",
            ActionKind::TintTo { .. } => "TintTo",
            ActionKind::Blink { .. } => "Blink",
            ActionKind::Sequence(_) => "Sequence",
            ActionKind::Spawn(_) => "Spawn",
            ActionKind::Repeat(_) => "Repeat",
            ActionKind::RepeatForever(_) => "RepeatForever",
            ActionKind::Ease { .. } => "Ease",
        }
    }

    // ========== 反向 ==========

    /// 构造反向动作
    ///
    /// 相对类动作取反，组合动作递归反向；绝对目标类动作（`*To`）返回错误。
    /// 反向动作是全新的、未启动的动作，不继承标签。
    pub fn reverse(&self) -> Result<Action, ActionError> {
        let not_reversible = || ActionError::NotReversible {
            action: self.name(),
        };

        let kind = match &self.kind {
            ActionKind::Show => ActionKind::Hide,
            ActionKind::Hide => ActionKind::Show,
            ActionKind::ToggleVisibility => ActionKind::ToggleVisibility,
            ActionKind::Place(position) => ActionKind::Place(*position),
            ActionKind::CallFunc(name) => ActionKind::CallFunc(name.clone()),
            ActionKind::Delay => ActionKind::Delay,
            ActionKind::MoveBy { delta, .. } => ActionKind::MoveBy {
                delta: -*delta,
                start: Vec2::ZERO,
            },
            ActionKind::RotateBy { angle, .. } => ActionKind::RotateBy {
                angle: -*angle,
                start: 0.0,
            },
            ActionKind::ScaleBy { sx, sy, .. } => {
                if *sx == 0.0 || *sy == 0.0 {
                    return Err(not_reversible());
                }
                ActionKind::ScaleBy {
                    sx: 1.0 / *sx,
                    sy: 1.0 / *sy,
                    start_x: 1.0,
                    start_y: 1.0,
                }
            }
            ActionKind::FadeIn => ActionKind::FadeOut,
            ActionKind::FadeOut => ActionKind::FadeIn,
            ActionKind::TintBy { dr, dg, db, .. } => ActionKind::TintBy {
                dr: -*dr,
                dg: -*dg,
                db: -*db,
                start: Color::WHITE,
            },
            ActionKind::Blink { times, .. } => ActionKind::Blink {
                times: *times,
                original: true,
            },
            ActionKind::MoveTo { .. }
            | ActionKind::RotateTo { .. }
            | ActionKind::ScaleTo { .. }
            | ActionKind::FadeTo { .. }
            | ActionKind::TintTo { .. } => return Err(not_reversible()),

            ActionKind::Sequence(sequence) => {
                let reversed = sequence
                    .children
                    .iter()
                    .rev()
                    .map(Action::reverse)
                    .collect::<Result<Vec<_>, _>>()?;
                return Action::sequence(reversed);
            }
            ActionKind::Spawn(spawn) => {
                return Action::spawn(spawn.reversed_children(self.duration)?);
            }
            ActionKind::Repeat(repeat) => {
                return Action::repeat(repeat.inner.reverse()?, repeat.times);
            }
            ActionKind::RepeatForever(inner) => {
                return Ok(Action::repeat_forever(inner.reverse()?));
            }
            ActionKind::Ease { inner, easing } => {
                return Action::ease(inner.reverse()?, easing.mirrored());
            }
        };

        Ok(Action::new(kind, self.duration))
    }

    // ========== 推进 ==========

    /// 重置进度并记录节点的起始状态
    pub(crate) fn start(&mut self, node: &Node) {
        self.elapsed = 0.0;
        self.done = false;

        match &mut self.kind {
            ActionKind::MoveBy { start, .. } | ActionKind::MoveTo { start, .. } => {
                *start = node.position;
            }
            ActionKind::RotateBy { start, .. } => *start = node.rotation,
            ActionKind::RotateTo { angle, start, diff } => {
                *start = node.rotation % 360.0;
                let mut delta = (*angle % 360.0) - *start;
                if delta > 180.0 {
                    delta -= 360.0;
                }
                if delta < -180.0 {
                    delta += 360.0;
                }
                *diff = delta;
            }
            ActionKind::ScaleBy {
                start_x, start_y, ..
            }
            | ActionKind::ScaleTo {
                start_x, start_y, ..
            } => {
                *start_x = node.scale_x;
                *start_y = node.scale_y;
            }
            ActionKind::FadeTo { start, .. } => *start = node.opacity,
            ActionKind::TintBy { start, .. } | ActionKind::TintTo { start, .. } => {
                *start = node.color;
            }
            ActionKind::Blink { original, .. } => *original = node.visible,
            ActionKind::Sequence(sequence) => sequence.start(),
            ActionKind::Spawn(spawn) => spawn.start(node),
            ActionKind::Repeat(repeat) => repeat.start(node),
            ActionKind::RepeatForever(inner) | ActionKind::Ease { inner, .. } => inner.start(node),
            _ => {}
        }
    }

    /// 按比例应用效果，`t` 为 0.0 - 1.0
    pub(crate) fn update(&mut self, t: f32, node: &mut Node, calls: &mut Vec<String>) {
        let duration = self.duration;

        match &mut self.kind {
            ActionKind::Show => node.visible = true,
            ActionKind::Hide => node.visible = false,
            ActionKind::ToggleVisibility => node.visible = !node.visible,
            ActionKind::Place(position) => node.position = *position,
            ActionKind::CallFunc(name) => calls.push(name.clone()),

            ActionKind::Delay => {}
            ActionKind::MoveBy { delta, start } => node.position = *start + *delta * t,
            ActionKind::MoveTo { end, start } => node.position = start.lerp(*end, t),
            ActionKind::RotateBy { angle, start } => node.rotation = *start + *angle * t,
            ActionKind::RotateTo { start, diff, .. } => node.rotation = *start + *diff * t,
            ActionKind::ScaleBy {
                sx,
                sy,
                start_x,
                start_y,
            } => {
                node.scale_x = *start_x + (*start_x * *sx - *start_x) * t;
                node.scale_y = *start_y + (*start_y * *sy - *start_y) * t;
            }
            ActionKind::ScaleTo {
                sx,
                sy,
                start_x,
                start_y,
            } => {
                node.scale_x = *start_x + (*sx - *start_x) * t;
                node.scale_y = *start_y + (*sy - *start_y) * t;
            }
            ActionKind::FadeIn => node.opacity = t.clamp(0.0, 1.0),
            ActionKind::FadeOut => node.opacity = (1.0 - t).clamp(0.0, 1.0),
            ActionKind::FadeTo { opacity, start } => {
                node.opacity = (*start + (*opacity - *start) * t).clamp(0.0, 1.0);
            }
            ActionKind::TintBy { dr, dg, db, start } => {
                node.color = start.offset(*dr * t, *dg * t, *db * t);
            }
            ActionKind::TintTo { color, start } => node.color = start.lerp(*color, t),
            ActionKind::Blink { times, original } => {
                if t >= 1.0 {
                    node.visible = *original;
                } else {
                    let slice = 1.0 / *times as f32;
                    let m = t % slice;
                    node.visible = m > slice / 2.0;
                }
            }

            ActionKind::Sequence(sequence) => sequence.update(t, duration, node, calls),
            ActionKind::Spawn(spawn) => spawn.update(t, duration, node, calls),
            ActionKind::Repeat(repeat) => repeat.update(t, node, calls),
            // 无限动作没有比例进度，只能通过 step 推进
            ActionKind::RepeatForever(_) => return,
            ActionKind::Ease { inner, easing } => inner.update(easing.apply(t), node, calls),
        }

        self.done = t >= 1.0;
    }

    /// 顶层推进 `dt` 秒
    pub(crate) fn step(&mut self, dt: f32, node: &mut Node, calls: &mut Vec<String>) {
        let dt = dt.max(0.0);

        if let ActionKind::RepeatForever(inner) = &mut self.kind {
            self.elapsed += dt;
            inner.step(dt, node, calls);
            while inner.is_done() {
                let overflow = (inner.elapsed - inner.duration).max(0.0);
                inner.start(node);
                // 零时长的内部动作每帧只执行一次
                if inner.duration <= 0.0 {
                    break;
                }
                inner.step(overflow, node, calls);
            }
            return;
        }

        if self.done {
            return;
        }

        self.elapsed += dt;
        let t = if self.duration > 0.0 {
            (self.elapsed / self.duration).min(1.0)
        } else {
            1.0
        };
        self.update(t, node, calls);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::NodeTree;

    const EPS: f32 = 1e-4;

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < EPS
    }

    fn approx_vec(a: Vec2, b: Vec2) -> bool {
        approx(a.x, b.x) && approx(a.y, b.y)
    }

    /// 在一个独立节点上从头到尾运行动作，每帧 `dt`
    fn run_to_end(action: &mut Action, node: &mut Node, dt: f32) -> Vec<String> {
        let mut calls = Vec::new();
        action.start(node);
        let mut guard = 0;
        while !action.is_done() {
            action.step(dt, node, &mut calls);
            guard += 1;
            assert!(guard < 10_000, "动作没有结束");
        }
        calls
    }

    fn fresh_node(tree: &mut NodeTree) -> crate::node::NodeId {
        tree.create_node()
    }

    #[test]
    fn test_move_by_progress() {
        let mut tree = NodeTree::new();
        let id = fresh_node(&mut tree);
        let node = tree.get_mut(id).unwrap();
        node.position = Vec2::new(10.0, 0.0);

        let mut action = Action::move_by(2.0, Vec2::new(100.0, 50.0));
        let mut calls = Vec::new();
        action.start(node);
        action.step(1.0, node, &mut calls);
        assert!(approx_vec(node.position, Vec2::new(60.0, 25.0)));
        assert!(!action.is_done());

        // 超出时长时进度截断为 1
        action.step(5.0, node, &mut calls);
        assert!(approx_vec(node.position, Vec2::new(110.0, 50.0)));
        assert!(action.is_done());
    }

    #[test]
    fn test_rotate_to_takes_shortest_path() {
        let mut tree = NodeTree::new();
        let id = fresh_node(&mut tree);
        let node = tree.get_mut(id).unwrap();
        node.rotation = 350.0;

        let mut action = Action::rotate_to(1.0, 10.0);
        let mut calls = Vec::new();
        action.start(node);
        action.step(0.5, node, &mut calls);
        assert!(approx(node.rotation, 360.0));
        action.step(0.5, node, &mut calls);
        assert!(approx(node.rotation, 370.0));
    }

    #[test]
    fn test_blink_restores_visibility() {
        let mut tree = NodeTree::new();
        let id = fresh_node(&mut tree);
        let node = tree.get_mut(id).unwrap();

        let mut action = Action::blink(1.0, 3);
        run_to_end(&mut action, node, 0.05);
        assert!(node.visible);

        node.visible = false;
        let mut action = Action::blink(1.0, 3);
        run_to_end(&mut action, node, 0.05);
        assert!(!node.visible);
    }

    #[test]
    fn test_instant_completes_on_first_step() {
        let mut tree = NodeTree::new();
        let id = fresh_node(&mut tree);
        let node = tree.get_mut(id).unwrap();

        let mut action = Action::call("hello");
        let calls = run_to_end(&mut action, node, 0.016);
        assert_eq!(calls, vec!["hello".to_string()]);
        assert_eq!(action.duration(), 0.0);
        assert!(action.is_instant());
    }

    #[test]
    fn test_negative_duration_treated_as_zero() {
        let action = Action::fade_in(-1.0);
        assert_eq!(action.duration(), 0.0);
        let action = Action::delay(f32::NAN);
        assert_eq!(action.duration(), 0.0);
    }

    #[test]
    fn test_to_actions_not_reversible() {
        let cases = [
            Action::move_to(1.0, Vec2::ZERO),
            Action::rotate_to(1.0, 90.0),
            Action::scale_to(1.0, 2.0, 2.0),
            Action::fade_to(1.0, 0.5),
            Action::tint_to(1.0, Color::BLACK),
        ];
        for action in cases {
            assert_eq!(
                action.reverse(),
                Err(ActionError::NotReversible {
                    action: action.name()
                })
            );
        }

        // 嵌套在组合动作里同样失败
        let seq = Action::sequence(vec![Action::delay(1.0), Action::move_to(1.0, Vec2::ZERO)])
            .unwrap();
        assert!(seq.reverse().is_err());
    }

    #[test]
    fn test_sequence_with_reverse_returns_to_start() {
        let mut tree = NodeTree::new();
        let id = fresh_node(&mut tree);
        let node = tree.get_mut(id).unwrap();
        node.position = Vec2::new(5.0, 5.0);

        let forward = Action::spawn(vec![
            Action::move_by(1.0, Vec2::new(40.0, -20.0)),
            Action::scale_by(0.7, 3.0, 2.0),
            Action::rotate_by(1.3, 360.0),
            Action::tint_by(0.5, 0.0, -1.0, -1.0),
            Action::fade_out(1.0),
        ])
        .unwrap();
        let backward = forward.reverse().unwrap();
        assert!(approx(backward.duration(), forward.duration()));

        let mut action = Action::sequence(vec![forward, backward]).unwrap();
        run_to_end(&mut action, node, 0.07);

        assert!(approx_vec(node.position, Vec2::new(5.0, 5.0)));
        assert!(approx(node.scale_x, 1.0));
        assert!(approx(node.scale_y, 1.0));
        assert!(approx(node.rotation, 0.0));
        assert!(approx(node.color.g, 1.0));
        assert!(approx(node.opacity, 1.0));
    }

    #[test]
    fn test_ease_reverse_mirrors_curve() {
        let action =
            Action::ease(Action::move_by(1.0, Vec2::new(10.0, 0.0)), EasingFunction::EaseIn)
                .unwrap();
        let reversed = action.reverse().unwrap();
        assert_eq!(reversed.easing(), Some(EasingFunction::EaseOut));

        let mut tree = NodeTree::new();
        let id = fresh_node(&mut tree);
        let node = tree.get_mut(id).unwrap();
        let mut action = Action::sequence(vec![action, reversed]).unwrap();
        run_to_end(&mut action, node, 0.1);
        assert!(approx_vec(node.position, Vec2::ZERO));
    }

    #[test]
    fn test_reverse_does_not_keep_tag() {
        let action = Action::move_by(1.0, Vec2::new(1.0, 0.0)).with_tag(3);
        assert_eq!(action.tag(), Some(3));
        assert_eq!(action.reverse().unwrap().tag(), None);
    }

    #[test]
    fn test_repeat_forever_loops_and_resets() {
        let mut tree = NodeTree::new();
        let id = fresh_node(&mut tree);
        let node = tree.get_mut(id).unwrap();

        let cycle = Action::sequence(vec![Action::delay(0.5), Action::call("tick")]).unwrap();
        let mut action = Action::repeat_forever(cycle);
        let mut calls = Vec::new();
        action.start(node);

        // 4 个完整周期
        for _ in 0..16 {
            action.step(0.125, node, &mut calls);
        }
        assert_eq!(calls.len(), 4);
        assert!(!action.is_done());
        assert!(action.duration().is_infinite());
        // 内部进度每个周期都会重置
        let inner = action.inner().unwrap();
        assert!(inner.elapsed() < inner.duration());
    }

    #[test]
    fn test_repeat_forever_with_instant_fires_once_per_frame() {
        let mut tree = NodeTree::new();
        let id = fresh_node(&mut tree);
        let node = tree.get_mut(id).unwrap();

        let mut action = Action::repeat_forever(Action::toggle_visibility());
        let mut calls = Vec::new();
        action.start(node);
        action.step(0.016, node, &mut calls);
        assert!(!node.visible);
        action.step(0.016, node, &mut calls);
        assert!(node.visible);
    }

    /// 每帧推进 `dt` 直到完成，记录每帧之后的位置与角度
    fn timeline(mut action: Action, dt: f32) -> Vec<(Vec2, f32)> {
        let mut tree = NodeTree::new();
        let id = fresh_node(&mut tree);
        let node = tree.get_mut(id).unwrap();
        let mut calls = Vec::new();
        let mut frames = Vec::new();
        action.start(node);
        while !action.is_done() {
            action.step(dt, node, &mut calls);
            frames.push((node.position, node.rotation));
            assert!(frames.len() < 10_000, "动作没有结束");
        }
        frames
    }

    fn assert_same_timeline(expected: &[(Vec2, f32)], actual: &[(Vec2, f32)]) {
        assert_eq!(expected.len(), actual.len());
        for ((p1, r1), (p2, r2)) in expected.iter().zip(actual) {
            assert!(approx_vec(*p1, *p2), "{p1:?} != {p2:?}");
            assert!(approx(*r1, *r2), "{r1} != {r2}");
        }
    }

    #[test]
    fn test_double_reverse_of_padded_spawn_keeps_timeline() {
        let spawn = Action::spawn(vec![
            Action::move_by(1.0, Vec2::new(10.0, -4.0)),
            Action::rotate_by(0.4, 90.0),
        ])
        .unwrap();
        let reversed = spawn.reverse().unwrap();
        // 较短的子动作反向时前面补等待
        assert_eq!(reversed.children()[1].name(), "Sequence");

        let twice = reversed.reverse().unwrap();
        assert!(approx(twice.duration(), spawn.duration()));
        assert_same_timeline(&timeline(spawn, 0.1), &timeline(twice, 0.1));
    }

    #[test]
    fn test_double_reverse_of_ease_keeps_timeline() {
        let eased = Action::ease(
            Action::move_by(2.0, Vec2::new(30.0, 6.0)),
            EasingFunction::EaseInQuad,
        )
        .unwrap();
        let twice = eased.reverse().unwrap().reverse().unwrap();
        assert_eq!(twice.easing(), Some(EasingFunction::EaseInQuad));
        assert_same_timeline(&timeline(eased, 0.15), &timeline(twice, 0.15));
    }

    #[test]
    fn test_empty_composites_rejected() {
        assert_eq!(
            Action::sequence(Vec::new()),
            Err(ActionError::EmptyComposite { kind: "Sequence" })
        );
        assert_eq!(
            Action::spawn(Vec::new()),
            Err(ActionError::EmptyComposite { kind: "Spawn" })
        );
        assert_eq!(Action::repeat(Action::show(), 0), Err(ActionError::ZeroRepeat));
    }

    #[test]
    fn test_unbounded_children_rejected() {
        let forever = || Action::repeat_forever(Action::rotate_by(1.0, 90.0));
        let unbounded = |kind: &'static str| -> Result<Action, ActionError> {
            Err(ActionError::UnboundedChild {
                kind,
                child: "RepeatForever",
            })
        };

        assert_eq!(
            Action::spawn(vec![Action::move_by(1.0, Vec2::new(10.0, 0.0)), forever()]),
            unbounded("Spawn")
        );
        assert_eq!(
            Action::sequence(vec![Action::show(), forever()]),
            unbounded("Sequence")
        );
        assert_eq!(Action::repeat(forever(), 2), unbounded("Repeat"));
        assert_eq!(
            Action::ease(forever(), EasingFunction::EaseIn),
            unbounded("Ease")
        );
        // 无限动作只能作为最外层
        assert!(Action::repeat_forever(forever()).duration().is_infinite());
    }
}
