//! 批次生成统计.

use seg_berry::prelude::Batch;
use std::time::{Duration, Instant};

/// ablation/benchmark 计时器.
///
/// 支持 "中途中断" 与 "结束中断, 继续开始计时".
#[derive(Clone, Debug)]
struct AccTimer {
    consumed: Duration,
    since: Instant,
}

impl AccTimer {
    /// 初始化计时器. 初始化时会视为已经开始计时 (`self.start()`).
    #[inline]
    fn new() -> Self {
        Self {
            consumed: Duration::ZERO,
            since: Instant::now(),
        }
    }

    /// 开始计时.
    #[inline]
    fn start(&mut self) {
        self.since = Instant::now();
    }

    /// 结束计时, 并将这一区间的时间累加. 返回本轮计时时长.
    ///
    /// # 注意
    ///
    /// 上一次调用必须是 `self.start()`, 否则计算时间值无意义.
    #[inline]
    fn elapsed(&mut self) -> Duration {
        let d = self.since.elapsed();
        self.consumed += d;
        d
    }

    /// 获得总共累计下来的时间 (以微秒为单位).
    #[inline]
    fn get_total_us(&self) -> u64 {
        self.consumed.as_micros() as u64
    }
}

/// 一种取批次策略的运行统计.
#[derive(Clone, Debug)]
pub struct Profile {
    /// 取得的批次个数.
    batches: u64,

    /// 取得的样本总数.
    samples: u64,

    /// 增强后仍含前景的样本个数.
    foreground: u64,

    /// 等待批次花费的总时间.
    batch_time: AccTimer,

    /// 整个任务花费的总时间 (包括线程创建与回收).
    real_time: AccTimer,

    /// 等待最久的一个批次.
    most: Option<(usize, Duration)>,
}

impl Profile {
    /// 初始化. 总计时同时开始.
    #[inline]
    pub fn new() -> Self {
        Self {
            batches: 0,
            samples: 0,
            foreground: 0,
            batch_time: AccTimer::new(),
            real_time: AccTimer::new(),
            most: None,
        }
    }

    /// 开始等待下一个批次.
    #[inline]
    pub fn batch_start(&mut self) {
        self.batch_time.start();
    }

    /// 第 `index` 个批次到达.
    pub fn batch_done(&mut self, index: usize, batch: &Batch) {
        let d = self.batch_time.elapsed();
        if self.most.map_or(true, |(_, m)| d > m) {
            self.most = Some((index, d));
        }
        self.batches += 1;
        self.samples += batch.len() as u64;
        self.foreground += batch
            .masks()
            .outer_iter()
            .filter(|m| m.iter().any(|&v| v != 0))
            .count() as u64;
    }

    /// 结束全部计时.
    #[inline]
    pub fn finish(mut self) -> Self {
        self.real_time.elapsed();
        self
    }

    #[inline]
    pub fn get_batches(&self) -> u64 {
        self.batches
    }

    #[inline]
    pub fn get_samples(&self) -> u64 {
        self.samples
    }

    #[inline]
    pub fn get_foreground(&self) -> u64 {
        self.foreground
    }

    /// 以微秒为单位获得等待批次的总时间.
    #[inline]
    pub fn get_batch_time_us(&self) -> u64 {
        self.batch_time.get_total_us()
    }

    /// 以微秒为单位获得任务的总自然时间.
    #[inline]
    pub fn get_real_time_us(&self) -> u64 {
        self.real_time.get_total_us()
    }

    /// 以微秒为单位获得每个样本的平均等待时间.
    pub fn get_avg_sample_time_us(&self) -> Option<f64> {
        match self.samples {
            0 => None,
            n => Some(self.get_batch_time_us() as f64 / n as f64),
        }
    }

    /// 含前景样本的比例.
    pub fn get_foreground_ratio(&self) -> Option<f64> {
        match self.samples {
            0 => None,
            n => Some(self.foreground as f64 / n as f64),
        }
    }

    /// 等待最久的批次下标与时长. 没有批次时返回 `None`.
    #[inline]
    pub fn get_most_time_consuming(&self) -> Option<(usize, Duration)> {
        self.most
    }
}

impl Default for Profile {
    fn default() -> Self {
        Self::new()
    }
}
