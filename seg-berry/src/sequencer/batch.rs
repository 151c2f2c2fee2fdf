//! 一个批次的增强样本.

use crate::data::ImgWriteVis;
use crate::{Idx2d, LabelSlice, ScanSlice, SegError, SegResult};
use ndarray::{Array2, Array3, ArrayView3, Axis};
use std::path::Path;

/// 批次: `(n, h, w)` 的扫描与同形状的标签.
#[derive(Debug, Clone, PartialEq)]
pub struct Batch {
    images: Array3<f32>,
    masks: Array3<u8>,
}

impl Batch {
    /// 由已有数组构造. 两者形状不一致时返回 [`SegError::ShapeMismatch`].
    pub fn new(images: Array3<f32>, masks: Array3<u8>) -> SegResult<Self> {
        if images.dim() != masks.dim() {
            return Err(SegError::shape(images.shape(), masks.shape()));
        }
        Ok(Self { images, masks })
    }

    /// 将若干 `(扫描, 标签)` 样本按顺序堆叠为批次. 所有样本形状必须为 `shape`.
    pub fn from_samples(shape: Idx2d, samples: Vec<(Array2<f32>, Array2<u8>)>) -> SegResult<Self> {
        let (h, w) = shape;
        let mut images = Array3::zeros((samples.len(), h, w));
        let mut masks = Array3::zeros((samples.len(), h, w));
        for (i, (img, mask)) in samples.into_iter().enumerate() {
            if img.dim() != shape {
                return Err(SegError::shape(&[h, w], img.shape()));
            }
            if mask.dim() != shape {
                return Err(SegError::shape(&[h, w], mask.shape()));
            }
            images.index_axis_mut(Axis(0), i).assign(&img);
            masks.index_axis_mut(Axis(0), i).assign(&mask);
        }
        Ok(Self { images, masks })
    }

    /// 样本个数.
    #[inline]
    pub fn len(&self) -> usize {
        self.images.len_of(Axis(0))
    }

    /// 是否为空批次?
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 单个样本的形状 `(h, w)`.
    #[inline]
    pub fn slice_shape(&self) -> Idx2d {
        let (_, h, w) = self.images.dim();
        (h, w)
    }

    /// 扫描.
    #[inline]
    pub fn images(&self) -> ArrayView3<'_, f32> {
        self.images.view()
    }

    /// 标签.
    #[inline]
    pub fn masks(&self) -> ArrayView3<'_, u8> {
        self.masks.view()
    }

    /// 第 `i` 个样本. 越界时 panic.
    #[inline]
    pub fn sample(&self, i: usize) -> (ScanSlice<'_>, LabelSlice<'_>) {
        (
            ScanSlice::new(self.images.index_axis(Axis(0), i)),
            LabelSlice::new(self.masks.index_axis(Axis(0), i)),
        )
    }

    /// 拆分为 `(扫描, 标签)`, 交给训练循环.
    #[inline]
    pub fn into_parts(self) -> (Array3<f32>, Array3<u8>) {
        (self.images, self.masks)
    }

    /// 将每个样本以 `{prefix}_{i}_image.png`, `{prefix}_{i}_mask.png` 保存到 `dir`.
    pub fn save_preview(&self, dir: impl AsRef<Path>, prefix: &str) -> SegResult<()> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir)?;
        for i in 0..self.len() {
            let (scan, label) = self.sample(i);
            scan.save(dir.join(format!("{prefix}_{i:03}_image.png")))?;
            label.save(dir.join(format!("{prefix}_{i:03}_mask.png")))?;
        }
        log::debug!("saved {} preview pairs to {}", self.len(), dir.display());
        Ok(())
    }
}
