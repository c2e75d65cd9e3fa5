//! 帧统计

/// 帧统计
///
/// 每帧绘制后累计，累计时间超过刷新间隔时重新计算帧率。
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameStats {
    /// 自导演创建以来绘制的总帧数
    pub total_frames: u64,
    /// 当前统计窗口内的帧数
    pub frames: u32,
    /// 当前统计窗口内累计的时间
    pub accum_dt: f32,
    /// 最近一次刷新得到的帧率
    pub frame_rate: f32,
    /// 上一帧的耗时（秒）
    pub seconds_per_frame: f32,
    /// 上一帧绘制的节点数
    pub draw_count: u32,
}

impl FrameStats {
    /// 记录一帧，返回本次是否刷新了帧率
    pub(crate) fn record_frame(&mut self, dt: f32, drawn: u32, interval: f32) -> bool {
        self.total_frames += 1;
        self.frames += 1;
        self.accum_dt += dt;
        self.seconds_per_frame = dt;
        self.draw_count = drawn;

        if self.accum_dt > interval {
            self.frame_rate = self.frames as f32 / self.accum_dt;
            self.frames = 0;
            self.accum_dt = 0.0;
            true
        } else {
            false
        }
    }
}
