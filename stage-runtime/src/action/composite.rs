//! 组合动作的运行状态

use crate::error::ActionError;
use crate::node::Node;

use super::Action;

/// 依次执行的子动作
///
/// 每个子动作有固定的起始偏移；子动作在进度第一次到达它时才 `start`，
/// 同一轮内不会重复启动。瞬时子动作在到达时触发一次，进度倒退越过它之后
/// 才允许再次触发。
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Sequence {
    pub(crate) children: Vec<Action>,
    offsets: Vec<f32>,
    /// 每个子动作最近一次应用的局部进度，`None` 表示本轮尚未启动
    applied: Vec<Option<f32>>,
    last_now: f32,
}

impl Sequence {
    pub(crate) fn new(children: Vec<Action>) -> (Self, f32) {
        let mut offsets = Vec::with_capacity(children.len());
        let mut total = 0.0;
        for child in &children {
            offsets.push(total);
            total += child.duration();
        }
        let applied = vec![None; children.len()];
        (
            Self {
                children,
                offsets,
                applied,
                last_now: 0.0,
            },
            total,
        )
    }

    pub(crate) fn start(&mut self) {
        self.applied.fill(None);
        self.last_now = 0.0;
    }

    pub(crate) fn update(&mut self, t: f32, total: f32, node: &mut Node, calls: &mut Vec<String>) {
        let now = t * total;
        let forward = now >= self.last_now;

        if forward {
            for i in 0..self.children.len() {
                self.advance(i, t, now, node, calls);
            }
        } else {
            for i in (0..self.children.len()).rev() {
                self.advance(i, t, now, node, calls);
            }
        }

        self.last_now = now;
    }

    fn advance(&mut self, i: usize, t: f32, now: f32, node: &mut Node, calls: &mut Vec<String>) {
        let offset = self.offsets[i];
        let child = &mut self.children[i];
        let duration = child.duration();
        let reached = t >= 1.0 || now >= offset;

        let local = if t >= 1.0 {
            1.0
        } else if duration > 0.0 {
            ((now - offset) / duration).clamp(0.0, 1.0)
        } else if reached {
            1.0
        } else {
            0.0
        };

        match self.applied[i] {
            None => {
                let should_start = if duration > 0.0 { local > 0.0 } else { reached };
                if should_start {
                    child.start(node);
                    child.update(local, node, calls);
                    self.applied[i] = Some(local);
                }
            }
            Some(previous) => {
                if duration <= 0.0 {
                    if !reached {
                        self.applied[i] = None;
                    }
                } else if local != previous {
                    child.update(local, node, calls);
                    self.applied[i] = Some(local);
                }
            }
        }
    }
}

/// 同时执行的子动作
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Spawn {
    pub(crate) children: Vec<Action>,
}

impl Spawn {
    pub(crate) fn new(children: Vec<Action>) -> (Self, f32) {
        let total = children
            .iter()
            .map(Action::duration)
            .fold(0.0_f32, f32::max);
        (Self { children }, total)
    }

    pub(crate) fn start(&mut self, node: &Node) {
        for child in &mut self.children {
            child.start(node);
        }
    }

    pub(crate) fn update(&mut self, t: f32, total: f32, node: &mut Node, calls: &mut Vec<String>) {
        for child in &mut self.children {
            let duration = child.duration();
            let local = if t >= 1.0 || duration <= 0.0 {
                1.0
            } else {
                (t * total / duration).min(1.0)
            };
            // 已经完成的短子动作不再重复写入属性
            if child.is_done() && local >= 1.0 {
                continue;
            }
            child.update(local, node, calls);
        }
    }

    /// 反向子动作；较短的子动作前面补等待，使其在反向时间轴上对齐到末尾
    pub(crate) fn reversed_children(&self, total: f32) -> Result<Vec<Action>, ActionError> {
        self.children
            .iter()
            .map(|child| {
                let reversed = child.reverse()?;
                let pad = total - child.duration();
                if pad > 0.0 {
                    Action::sequence(vec![Action::delay(pad), reversed])
                } else {
                    Ok(reversed)
                }
            })
            .collect()
    }
}

/// 重复固定次数
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Repeat {
    pub(crate) inner: Box<Action>,
    pub(crate) times: u32,
    completed: u32,
}

impl Repeat {
    pub(crate) fn new(inner: Action, times: u32) -> Self {
        Self {
            inner: Box::new(inner),
            times,
            completed: 0,
        }
    }

    pub(crate) fn start(&mut self, node: &Node) {
        self.inner.start(node);
        self.completed = 0;
    }

    pub(crate) fn update(&mut self, t: f32, node: &mut Node, calls: &mut Vec<String>) {
        let (cycle, local) = if t >= 1.0 {
            (self.times, 1.0)
        } else {
            let position = t.max(0.0) * self.times as f32;
            let cycle = position.floor() as u32;
            (cycle.min(self.times), position - cycle as f32)
        };

        // 每个完成的周期都先推进到 1.0 再重新启动
        while self.completed < cycle {
            self.inner.update(1.0, node, calls);
            self.completed += 1;
            if self.completed < self.times {
                self.inner.start(node);
            }
        }

        if self.completed < self.times {
            self.inner.update(local, node, calls);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Vec2;
    use crate::node::NodeTree;

    #[test]
    fn test_sequence_duration_and_order() {
        let mut tree = NodeTree::new();
        let id = tree.create_node();
        let node = tree.get_mut(id).unwrap();

        let mut action = Action::sequence(vec![
            Action::move_by(1.0, Vec2::new(10.0, 0.0)),
            Action::call("middle"),
            Action::move_by(1.0, Vec2::new(0.0, 10.0)),
        ])
        .unwrap();
        assert_eq!(action.duration(), 2.0);

        let mut calls = Vec::new();
        action.start(node);

        action.step(0.5, node, &mut calls);
        assert_eq!(node.position, Vec2::new(5.0, 0.0));
        assert!(calls.is_empty());

        // 第一个子动作完成，瞬时回调触发，第三个尚未开始
        action.step(0.5, node, &mut calls);
        assert_eq!(node.position, Vec2::new(10.0, 0.0));
        assert_eq!(calls, vec!["middle".to_string()]);
        assert!(action.children()[0].is_done());
        assert!(!action.children()[2].is_done());
        assert!(!action.is_done());

        action.step(1.0, node, &mut calls);
        assert_eq!(node.position, Vec2::new(10.0, 10.0));
        assert!(action.children()[2].is_done());
        assert!(action.is_done());
        // 回调只触发一次
        assert_eq!(calls.len(), 1);
    }

    #[test]
    fn test_sequence_large_step_runs_every_child_to_end() {
        let mut tree = NodeTree::new();
        let id = tree.create_node();
        let node = tree.get_mut(id).unwrap();

        let mut action = Action::sequence(vec![
            Action::move_by(1.0, Vec2::new(10.0, 0.0)),
            Action::call("a"),
            Action::move_by(1.0, Vec2::new(10.0, 0.0)),
            Action::call("b"),
        ])
        .unwrap();
        let mut calls = Vec::new();
        action.start(node);
        action.step(10.0, node, &mut calls);

        assert_eq!(node.position, Vec2::new(20.0, 0.0));
        assert_eq!(calls, vec!["a".to_string(), "b".to_string()]);
        assert!(action.is_done());
    }

    #[test]
    fn test_spawn_runs_children_together() {
        let mut tree = NodeTree::new();
        let id = tree.create_node();
        let node = tree.get_mut(id).unwrap();

        let mut action = Action::spawn(vec![
            Action::move_by(1.0, Vec2::new(10.0, 0.0)),
            Action::rotate_by(2.0, 90.0),
        ])
        .unwrap();
        assert_eq!(action.duration(), 2.0);

        let mut calls = Vec::new();
        action.start(node);
        action.step(1.0, node, &mut calls);
        assert_eq!(node.position, Vec2::new(10.0, 0.0));
        assert_eq!(node.rotation, 45.0);

        // 短的子动作完成后不再写入位置
        node.position = Vec2::new(-1.0, -1.0);
        action.step(1.0, node, &mut calls);
        assert_eq!(node.position, Vec2::new(-1.0, -1.0));
        assert_eq!(node.rotation, 90.0);
        assert!(action.is_done());
    }

    #[test]
    fn test_spawn_reverse_pads_short_children() {
        let action = Action::spawn(vec![
            Action::move_by(1.0, Vec2::new(10.0, 0.0)),
            Action::rotate_by(3.0, 90.0),
        ])
        .unwrap();
        let reversed = action.reverse().unwrap();
        assert_eq!(reversed.duration(), 3.0);

        let padded = &reversed.children()[0];
        assert_eq!(padded.name(), "Sequence");
        assert_eq!(padded.children()[0].name(), "DelayTime");
        assert_eq!(padded.children()[0].duration(), 2.0);
        assert_eq!(reversed.children()[1].name(), "RotateBy");
    }

    #[test]
    fn test_repeat_runs_inner_n_times() {
        let mut tree = NodeTree::new();
        let id = tree.create_node();
        let node = tree.get_mut(id).unwrap();

        let inner = Action::sequence(vec![
            Action::move_by(0.5, Vec2::new(1.0, 0.0)),
            Action::call("lap"),
        ])
        .unwrap();
        let mut action = Action::repeat(inner, 3).unwrap();
        assert_eq!(action.duration(), 1.5);

        let mut calls = Vec::new();
        action.start(node);
        for _ in 0..6 {
            action.step(0.25, node, &mut calls);
        }
        assert!(action.is_done());
        assert_eq!(calls.len(), 3);
        assert_eq!(node.position, Vec2::new(3.0, 0.0));
    }

    #[test]
    fn test_repeat_of_instant_fires_every_time() {
        let mut tree = NodeTree::new();
        let id = tree.create_node();
        let node = tree.get_mut(id).unwrap();

        let mut action = Action::repeat(Action::call("ping"), 4).unwrap();
        let mut calls = Vec::new();
        action.start(node);
        action.step(0.016, node, &mut calls);
        assert_eq!(calls.len(), 4);
        assert!(action.is_done());
    }
}
