//! # Scheduler 模块
//!
//! 帧调度器：每帧更新钩子与定时器。
//!
//! ## 执行顺序
//!
//! 一次 [`Scheduler::update`] 先按优先级升序（同优先级按注册顺序）产出所有
//! 未暂停的更新钩子调用，再按注册顺序产出到期的定时器调用。
//!
//! 调度器本身不执行回调，而是返回一份调用快照（`Vec<Invocation>`），由持有者
//! 逐个派发。派发过程中对调度器的修改（注销、新增）立即生效：
//! - 被注销的条目通过 [`Scheduler::is_live`] 过滤，不会再被调用
//! - 派发前被暂停的定时器调用通过 [`Scheduler::cancel_fire`] 退回，恢复后照常触发
//! - 新注册的条目从下一帧开始参与调度
//! - 次数用尽的定时器在 [`Scheduler::finish_tick`] 中移除

use std::collections::HashMap;

use tracing::trace;

use crate::error::SchedulerError;
use crate::node::NodeId;

/// 系统钩子优先级，保证先于任何用户钩子执行
pub const PRIORITY_SYSTEM: i32 = i32::MIN;

/// 用户钩子可用的最小优先级
pub const PRIORITY_NON_SYSTEM_MIN: i32 = PRIORITY_SYSTEM + 1;

/// 内置系统钩子
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SystemHook {
    /// 动作管理器的每帧推进
    ActionManager,
}

/// 调度目标
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Target {
    System(SystemHook),
    Node(NodeId),
}

impl Target {
    pub fn is_system(&self) -> bool {
        matches!(self, Target::System(_))
    }
}

/// 调度条目标识，每次注册都会分配新的值
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntryId(u64);

/// 定时器重复方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Repeat {
    /// 无限重复
    Forever,
    /// 总共触发 n 次
    Times(u32),
}

/// 定时器规格
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimerSpec {
    /// 触发间隔（秒），0 表示每帧触发
    pub interval: f32,
    pub repeat: Repeat,
}

impl TimerSpec {
    /// 每隔 `interval` 秒触发一次，无限重复
    pub fn every(interval: f32) -> Self {
        Self {
            interval,
            repeat: Repeat::Forever,
        }
    }

    /// 每帧触发
    pub fn every_frame() -> Self {
        Self::every(0.0)
    }

    /// 每隔 `interval` 秒触发一次，总共 `times` 次
    pub fn times(interval: f32, times: u32) -> Self {
        Self {
            interval,
            repeat: Repeat::Times(times),
        }
    }

    /// `delay` 秒后触发一次
    pub fn once(delay: f32) -> Self {
        Self::times(delay, 1)
    }
}

/// 调用种类
#[derive(Debug, Clone, PartialEq)]
pub enum InvocationKind {
    /// 每帧更新钩子
    Update,
    /// 定时器，附带定时器键
    Timer(String),
}

/// 一次待派发的调用
#[derive(Debug, Clone, PartialEq)]
pub struct Invocation {
    pub entry: EntryId,
    pub target: Target,
    pub kind: InvocationKind,
    pub dt: f32,
}

#[derive(Debug)]
struct UpdateEntry {
    id: EntryId,
    target: Target,
    priority: i32,
    paused: bool,
}

#[derive(Debug)]
struct TimerEntry {
    id: EntryId,
    target: Target,
    key: String,
    interval: f32,
    repeat: Repeat,
    fired: u32,
    elapsed: f32,
    paused: bool,
    exhausted: bool,
}

impl TimerEntry {
    fn refresh_exhausted(&mut self) {
        self.exhausted = matches!(self.repeat, Repeat::Times(n) if self.fired >= n);
    }

    fn fire(&mut self, dt: f32, out: &mut Vec<Invocation>) {
        out.push(Invocation {
            entry: self.id,
            target: self.target,
            kind: InvocationKind::Timer(self.key.clone()),
            dt,
        });
        self.fired += 1;
        self.refresh_exhausted();
    }
}

/// 帧调度器
#[derive(Debug)]
pub struct Scheduler {
    /// 按 (priority, id) 排序
    updates: Vec<UpdateEntry>,
    /// 钩子条目 → 优先级，用于在 `updates` 中二分查找
    update_priorities: HashMap<EntryId, i32>,
    /// 按注册顺序，即按 id 升序
    timers: Vec<TimerEntry>,
    next_id: u64,
    time_scale: f32,
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler {
    pub fn new() -> Self {
        Self {
            updates: Vec::new(),
            update_priorities: HashMap::new(),
            timers: Vec::new(),
            next_id: 0,
            time_scale: 1.0,
        }
    }

    fn alloc_id(&mut self) -> EntryId {
        let id = EntryId(self.next_id);
        self.next_id += 1;
        id
    }

    /// dt 缩放系数
    pub fn time_scale(&self) -> f32 {
        self.time_scale
    }

    pub fn set_time_scale(&mut self, scale: f32) {
        self.time_scale = scale.max(0.0);
    }

    // ========== 每帧更新钩子 ==========

    /// 注册每帧更新钩子
    ///
    /// 同一目标重复注册时替换原有的优先级与暂停状态。
    pub fn schedule_update(&mut self, target: Target, priority: i32, paused: bool) -> EntryId {
        if self.unschedule_update(target) {
            trace!(?target, priority, "更新钩子重复注册，替换原有注册");
        }

        let id = self.alloc_id();
        let position = self
            .updates
            .partition_point(|entry| (entry.priority, entry.id) <= (priority, id));
        self.updates.insert(
            position,
            UpdateEntry {
                id,
                target,
                priority,
                paused,
            },
        );
        self.update_priorities.insert(id, priority);
        id
    }

    /// 注销每帧更新钩子
    pub fn unschedule_update(&mut self, target: Target) -> bool {
        let before = self.updates.len();
        let priorities = &mut self.update_priorities;
        self.updates.retain(|entry| {
            let keep = entry.target != target;
            if !keep {
                priorities.remove(&entry.id);
            }
            keep
        });
        self.updates.len() != before
    }

    fn update_entry(&self, id: EntryId) -> Option<&UpdateEntry> {
        let priority = *self.update_priorities.get(&id)?;
        self.updates
            .binary_search_by_key(&(priority, id), |entry| (entry.priority, entry.id))
            .ok()
            .map(|index| &self.updates[index])
    }

    fn timer_index(&self, id: EntryId) -> Option<usize> {
        self.timers.binary_search_by_key(&id, |timer| timer.id).ok()
    }

    pub fn has_update(&self, target: Target) -> bool {
        self.updates.iter().any(|entry| entry.target == target)
    }

    /// 更新钩子的优先级
    pub fn update_priority(&self, target: Target) -> Option<i32> {
        self.updates
            .iter()
            .find(|entry| entry.target == target)
            .map(|entry| entry.priority)
    }

    // ========== 定时器 ==========

    /// 注册定时器
    ///
    /// 同一目标同名的定时器会被替换（重新计时）。
    pub fn schedule(
        &mut self,
        target: Target,
        key: impl Into<String>,
        spec: TimerSpec,
        paused: bool,
    ) -> Result<EntryId, SchedulerError> {
        let key = key.into();
        if !spec.interval.is_finite() || spec.interval < 0.0 {
            return Err(SchedulerError::InvalidInterval {
                interval: spec.interval,
            });
        }
        if spec.repeat == Repeat::Times(0) {
            return Err(SchedulerError::ZeroRepeat { key });
        }

        if self.unschedule(target, &key) {
            trace!(?target, key = %key, "定时器重复注册，替换原有注册");
        }

        let id = self.alloc_id();
        self.timers.push(TimerEntry {
            id,
            target,
            key,
            interval: spec.interval,
            repeat: spec.repeat,
            fired: 0,
            elapsed: 0.0,
            paused,
            exhausted: false,
        });
        Ok(id)
    }

    /// 注销定时器
    pub fn unschedule(&mut self, target: Target, key: &str) -> bool {
        let before = self.timers.len();
        self.timers
            .retain(|timer| !(timer.target == target && timer.key == key));
        self.timers.len() != before
    }

    /// 定时器是否仍在调度中（次数用尽的不算）
    pub fn is_scheduled(&self, target: Target, key: &str) -> bool {
        self.timers
            .iter()
            .any(|timer| timer.target == target && timer.key == key && !timer.exhausted)
    }

    // ========== 批量操作 ==========

    /// 注销目标的所有钩子与定时器
    pub fn unschedule_all_for_target(&mut self, target: Target) {
        self.unschedule_update(target);
        self.timers.retain(|timer| timer.target != target);
    }

    /// 注销所有非系统的钩子与定时器
    pub fn unschedule_all(&mut self) {
        self.updates.retain(|entry| entry.target.is_system());
        let kept: Vec<EntryId> = self.updates.iter().map(|entry| entry.id).collect();
        self.update_priorities.retain(|id, _| kept.contains(id));
        self.timers.retain(|timer| timer.target.is_system());
    }

    pub fn pause_target(&mut self, target: Target) {
        self.set_target_paused(target, true);
    }

    pub fn resume_target(&mut self, target: Target) {
        self.set_target_paused(target, false);
    }

    fn set_target_paused(&mut self, target: Target, paused: bool) {
        for entry in self.updates.iter_mut().filter(|e| e.target == target) {
            entry.paused = paused;
        }
        for timer in self.timers.iter_mut().filter(|t| t.target == target) {
            timer.paused = paused;
        }
    }

    /// 目标是否有条目且全部处于暂停状态
    pub fn is_target_paused(&self, target: Target) -> bool {
        let mut flags = self
            .updates
            .iter()
            .filter(|e| e.target == target)
            .map(|e| e.paused)
            .chain(
                self.timers
                    .iter()
                    .filter(|t| t.target == target)
                    .map(|t| t.paused),
            )
            .peekable();
        flags.peek().is_some() && flags.all(|paused| paused)
    }

    /// 条目总数（钩子 + 定时器）
    pub fn len(&self) -> usize {
        self.updates.len() + self.timers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // ========== 帧推进 ==========

    /// 推进一帧，返回本帧需要派发的调用
    pub fn update(&mut self, dt: f32) -> Vec<Invocation> {
        let dt = dt * self.time_scale;
        let mut out = Vec::new();

        for entry in self.updates.iter().filter(|e| !e.paused) {
            out.push(Invocation {
                entry: entry.id,
                target: entry.target,
                kind: InvocationKind::Update,
                dt,
            });
        }

        for timer in self
            .timers
            .iter_mut()
            .filter(|t| !t.paused && !t.exhausted)
        {
            if timer.interval <= 0.0 {
                timer.fire(dt, &mut out);
                continue;
            }

            timer.elapsed += dt;
            while timer.elapsed >= timer.interval && !timer.exhausted {
                timer.elapsed -= timer.interval;
                let interval = timer.interval;
                timer.fire(interval, &mut out);
            }
        }

        out
    }

    /// 调用是否仍然有效（条目未被注销且未暂停）
    pub fn is_live(&self, invocation: &Invocation) -> bool {
        match invocation.kind {
            InvocationKind::Update => self
                .update_entry(invocation.entry)
                .is_some_and(|entry| !entry.paused),
            InvocationKind::Timer(_) => self
                .timer_index(invocation.entry)
                .is_some_and(|index| !self.timers[index].paused),
        }
    }

    /// 退回一次未派发的定时器调用
    ///
    /// 条目仍存在时恢复它的累计时间与触发次数，已注销的条目和更新钩子不受影响。
    pub fn cancel_fire(&mut self, invocation: &Invocation) {
        if invocation.kind == InvocationKind::Update {
            return;
        }
        let Some(index) = self.timer_index(invocation.entry) else {
            return;
        };
        let timer = &mut self.timers[index];
        if timer.interval > 0.0 {
            timer.elapsed += timer.interval;
        }
        timer.fired = timer.fired.saturating_sub(1);
        timer.refresh_exhausted();
    }

    /// 帧末清理：移除次数用尽的定时器
    pub fn finish_tick(&mut self) {
        self.timers.retain(|timer| !timer.exhausted);
    }
}
