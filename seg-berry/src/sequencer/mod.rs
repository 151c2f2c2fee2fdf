//! 合成 epoch 批次生成器.
//!
//! epoch 长度 (`sequence_size`) 与原始切片数解耦: 每个批次都从原始切片池中
//! 有放回地抽样, 再逐个做成对增强.
//!
//! 批次 `index` 的随机流只由 `(seed, epoch, index)` 决定, 与调用线程、调用顺序无关.
//! 因此 [`Sequencer`] 只需要 `&self`, 可以被任意多个线程同时调用.

mod batch;
mod prefetch;

pub use batch::Batch;
pub use prefetch::Prefetcher;

use crate::augment::{AugmentConfig, PairedAugmenter};
use crate::consts::gray::is_foreground;
use crate::{Idx2d, SegError, SegResult};
use ndarray::{Array2, Array3, Axis};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// 切片抽样方式.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Sampling {
    /// 从整个切片池均匀抽样.
    #[default]
    Uniform,

    /// 以 `foreground_prob` 概率从含前景的切片中抽样, 否则从整个切片池抽样.
    ///
    /// 切片池中没有任何前景切片时退化为 [`Sampling::Uniform`].
    Balanced {
        /// 取值 `[0, 1]`.
        foreground_prob: f64,
    },
}

/// 生成器配置.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SequencerConfig {
    /// 每个 epoch 的样本数.
    pub sequence_size: usize,

    /// 每个批次的样本数. 最后一个批次可能更小.
    pub batch_size: usize,

    /// 全局种子.
    pub seed: u64,

    /// 切片抽样方式.
    pub sampling: Sampling,
}

impl Default for SequencerConfig {
    fn default() -> Self {
        Self {
            sequence_size: 500,
            batch_size: 32,
            seed: 0,
            sampling: Sampling::Uniform,
        }
    }
}

impl SequencerConfig {
    /// 检查配置是否合法.
    pub fn validate(&self) -> SegResult<()> {
        if self.batch_size == 0 {
            return Err(SegError::config("batch_size must be positive"));
        }
        if self.sequence_size == 0 {
            return Err(SegError::config("sequence_size must be positive"));
        }
        if let Sampling::Balanced { foreground_prob } = self.sampling {
            if !(0.0..=1.0).contains(&foreground_prob) {
                return Err(SegError::config(format!(
                    "foreground_prob must lie in [0, 1], got {foreground_prob}"
                )));
            }
        }
        Ok(())
    }
}

/// splitmix64 的混合函数.
#[inline]
fn mix(mut z: u64) -> u64 {
    z = z.wrapping_add(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// 批次 `(epoch, index)` 的种子.
#[inline]
fn batch_seed(seed: u64, epoch: u64, index: usize) -> u64 {
    mix(mix(mix(seed) ^ epoch) ^ index as u64)
}

/// 合成 epoch 批次生成器.
///
/// 原始数据放在 `Arc` 中只读共享. 除 epoch 计数器 (原子变量) 外没有任何可变状态.
#[derive(Debug)]
pub struct Sequencer {
    images: Arc<Array3<f32>>,
    masks: Arc<Array3<u8>>,
    foreground: Vec<usize>,
    config: SequencerConfig,
    augmenter: PairedAugmenter,
    epoch: AtomicU64,
}

impl Sequencer {
    /// 由 `(n, h, w)` 的原始切片池构建生成器.
    ///
    /// 以下情形返回 [`SegError::Configuration`]:
    /// `batch_size == 0`, `sequence_size == 0`, 切片池为空, 扫描与标签形状不一致,
    /// 或增强配置非法.
    pub fn new(
        images: impl Into<Arc<Array3<f32>>>,
        masks: impl Into<Arc<Array3<u8>>>,
        config: SequencerConfig,
        augment: AugmentConfig,
    ) -> SegResult<Self> {
        let (images, masks) = (images.into(), masks.into());
        config.validate()?;
        if images.dim() != masks.dim() {
            return Err(SegError::config(format!(
                "image pool {:?} and mask pool {:?} differ in shape",
                images.shape(),
                masks.shape()
            )));
        }
        let (n, h, w) = images.dim();
        if n == 0 {
            return Err(SegError::config("empty training pool"));
        }
        let augmenter = PairedAugmenter::new(augment, (h, w))?;
        let foreground: Vec<usize> = masks
            .axis_iter(Axis(0))
            .enumerate()
            .filter(|(_, m)| m.iter().any(|&v| is_foreground(v)))
            .map(|(i, _)| i)
            .collect();
        log::info!(
            "sequencer ready: {} slices ({} with foreground), {} batches of {} per epoch",
            n,
            foreground.len(),
            config.sequence_size.div_ceil(config.batch_size),
            config.batch_size
        );
        Ok(Self {
            images,
            masks,
            foreground,
            config,
            augmenter,
            epoch: AtomicU64::new(0),
        })
    }

    /// 每个 epoch 的批次数, `ceil(sequence_size / batch_size)`.
    #[inline]
    pub fn len(&self) -> usize {
        self.config.sequence_size.div_ceil(self.config.batch_size)
    }

    /// 恒为 `false`: 合法配置至少产生一个批次.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 批次 `index` 的样本数.
    ///
    /// 除最后一个批次外都是 `batch_size`; 最后一个批次收缩为剩余样本数, 不补齐也不丢弃.
    pub fn batch_len(&self, index: usize) -> SegResult<usize> {
        let len = self.len();
        if index >= len {
            return Err(SegError::IndexOutOfRange { index, len });
        }
        let SequencerConfig {
            sequence_size,
            batch_size,
            ..
        } = self.config;
        Ok(if index + 1 == len {
            sequence_size - (len - 1) * batch_size
        } else {
            batch_size
        })
    }

    /// 配置.
    #[inline]
    pub fn config(&self) -> &SequencerConfig {
        &self.config
    }

    /// 增强器.
    #[inline]
    pub fn augmenter(&self) -> &PairedAugmenter {
        &self.augmenter
    }

    /// 原始切片池大小.
    #[inline]
    pub fn pool_len(&self) -> usize {
        self.images.len_of(Axis(0))
    }

    /// 含前景的切片个数.
    #[inline]
    pub fn foreground_len(&self) -> usize {
        self.foreground.len()
    }

    /// 切片形状.
    #[inline]
    pub fn slice_shape(&self) -> Idx2d {
        self.augmenter.shape()
    }

    /// 当前 epoch.
    #[inline]
    pub fn epoch(&self) -> u64 {
        self.epoch.load(Ordering::Acquire)
    }

    /// epoch 结束钩子: 推进 epoch 计数器, 返回新的 epoch.
    ///
    /// 已经开始的 `get_batch` 调用在开始时就读取了 epoch, 不受影响.
    pub fn on_epoch_end(&self) -> u64 {
        let next = self.epoch.fetch_add(1, Ordering::AcqRel) + 1;
        log::debug!("sequencer advanced to epoch {next}");
        next
    }

    /// 按抽样方式抽取一个切片索引.
    fn draw_slice<R: Rng + ?Sized>(&self, rng: &mut R) -> usize {
        let n = self.pool_len();
        match self.config.sampling {
            Sampling::Balanced { foreground_prob }
                if !self.foreground.is_empty() && rng.random_bool(foreground_prob) =>
            {
                self.foreground[rng.random_range(0..self.foreground.len())]
            }
            _ => rng.random_range(0..n),
        }
    }

    /// 批次 `(epoch, index)` 的抽样计划: 每个样本的 `(切片索引, 样本种子)`.
    pub fn plan(&self, epoch: u64, index: usize) -> SegResult<Vec<(usize, u64)>> {
        let n = self.batch_len(index)?;
        let mut rng = ChaCha8Rng::seed_from_u64(batch_seed(self.config.seed, epoch, index));
        Ok((0..n)
            .map(|_| {
                let slice = self.draw_slice(&mut rng);
                (slice, rng.random::<u64>())
            })
            .collect())
    }

    /// 用独立的随机流增强第 `slice` 张原始切片.
    fn sample(&self, (slice, seed): (usize, u64)) -> SegResult<(Array2<f32>, Array2<u8>)> {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        self.augmenter.augment(
            self.images.index_axis(Axis(0), slice),
            self.masks.index_axis(Axis(0), slice),
            &mut rng,
        )
    }

    /// 获取当前 epoch 的第 `index` 个批次.
    ///
    /// `index >= self.len()` 时返回 [`SegError::IndexOutOfRange`].
    #[inline]
    pub fn get_batch(&self, index: usize) -> SegResult<Batch> {
        self.get_batch_at(self.epoch(), index)
    }

    /// 获取指定 epoch 的第 `index` 个批次. 同一 `(epoch, index)` 的结果永远相同.
    pub fn get_batch_at(&self, epoch: u64, index: usize) -> SegResult<Batch> {
        let samples = self
            .plan(epoch, index)?
            .into_iter()
            .map(|p| self.sample(p))
            .collect::<SegResult<Vec<_>>>()?;
        log::debug!("epoch {epoch}: produced batch {index} ({} samples)", samples.len());
        Batch::from_samples(self.slice_shape(), samples)
    }

    /// 顺序遍历当前 epoch 的所有批次. epoch 在创建迭代器时确定.
    pub fn iter(&self) -> impl ExactSizeIterator<Item = SegResult<Batch>> + '_ {
        let epoch = self.epoch();
        (0..self.len()).map(move |i| self.get_batch_at(epoch, i))
    }
}

#[cfg(feature = "rayon")]
impl Sequencer {
    /// 借助 `rayon`, 并行地增强当前 epoch 第 `index` 个批次的各个样本.
    ///
    /// 结果与 [`Sequencer::get_batch`] 完全相同.
    #[inline]
    pub fn par_get_batch(&self, index: usize) -> SegResult<Batch> {
        self.par_get_batch_at(self.epoch(), index)
    }

    /// 借助 `rayon`, 并行地生成指定 epoch 的第 `index` 个批次.
    pub fn par_get_batch_at(&self, epoch: u64, index: usize) -> SegResult<Batch> {
        use rayon::iter::{IntoParallelIterator, ParallelIterator};
        let samples = self
            .plan(epoch, index)?
            .into_par_iter()
            .map(|p| self.sample(p))
            .collect::<SegResult<Vec<_>>>()?;
        log::debug!("epoch {epoch}: produced batch {index} ({} samples, parallel)", samples.len());
        Batch::from_samples(self.slice_shape(), samples)
    }
}
