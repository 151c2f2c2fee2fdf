//! 数据准备: 逐切片缩放, 曲率流平滑, 用训练集统计量归一化.

use super::DatasetSplit;
use crate::data::resize::resize_stack;
use crate::smooth::{CurvatureFlow, NormStats};
use crate::{Case, Idx2d, SegError, SegResult};
use itertools::izip;
use ndarray::{concatenate, Array3, ArrayView3, Axis};

/// 准备好的一组切片: `(n, h, w)` 的扫描与标签, 以及每个病例贡献的切片数.
#[derive(Clone, Debug, PartialEq)]
pub struct PreparedPart {
    /// 平滑并归一化后的扫描.
    pub images: Array3<f32>,

    /// 缩放后的标签.
    pub masks: Array3<u8>,

    /// 按病例顺序排列的切片数, 和为 `n`.
    pub slice_counts: Vec<usize>,
}

impl PreparedPart {
    /// 切片总数.
    #[inline]
    pub fn len(&self) -> usize {
        self.images.len_of(Axis(0))
    }

    /// 是否为空?
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn empty(shape: Idx2d) -> Self {
        Self {
            images: Array3::zeros((0, shape.0, shape.1)),
            masks: Array3::zeros((0, shape.0, shape.1)),
            slice_counts: Vec::new(),
        }
    }
}

/// 准备好的整个数据集, 以及训练集统计量.
#[derive(Clone, Debug, PartialEq)]
pub struct PreparedSet {
    /// 训练集统计量. 验证集与测试集都用它归一化.
    pub stats: NormStats,

    /// 训练集.
    pub train: PreparedPart,

    /// 验证集.
    pub validation: PreparedPart,

    /// 测试集.
    pub test: PreparedPart,
}

/// 预处理器.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Preprocessor {
    slice_shape: Idx2d,
    smoothing: Option<CurvatureFlow>,
}

impl Preprocessor {
    /// 将所有切片缩放到 `slice_shape`, 并使用默认的曲率流平滑.
    pub fn new(slice_shape: Idx2d) -> SegResult<Self> {
        if slice_shape.0 == 0 || slice_shape.1 == 0 {
            return Err(SegError::config(format!("empty slice shape {slice_shape:?}")));
        }
        Ok(Self {
            slice_shape,
            smoothing: Some(CurvatureFlow::default()),
        })
    }

    /// 替换平滑设置. `None` 表示不平滑.
    #[inline]
    pub fn with_smoothing(mut self, smoothing: Option<CurvatureFlow>) -> Self {
        self.smoothing = smoothing;
        self
    }

    /// 目标切片形状.
    #[inline]
    pub fn slice_shape(&self) -> Idx2d {
        self.slice_shape
    }

    /// 缩放并平滑一组扫描, 按顺序拼接. 尚未归一化.
    pub fn stack_scans<'a>(&self, scans: impl IntoIterator<Item = ArrayView3<'a, f32>>) -> SegResult<Array3<f32>> {
        let resized: Vec<Array3<f32>> = scans
            .into_iter()
            .map(|s| resize_stack(s, self.slice_shape))
            .collect();
        let mut images = self.concat(&resized)?;
        if let Some(flow) = &self.smoothing {
            flow.smooth_stack_mut(&mut images);
        }
        Ok(images)
    }

    fn concat<T: Clone>(&self, parts: &[Array3<T>]) -> SegResult<Array3<T>> {
        if parts.is_empty() {
            return Err(SegError::config("nothing to stack"));
        }
        let views: Vec<_> = parts.iter().map(Array3::view).collect();
        concatenate(Axis(0), &views).map_err(|e| SegError::config(format!("cannot stack volumes: {e}")))
    }

    /// 缩放并平滑一组病例, 尚未归一化.
    fn stack_cases(&self, cases: &[Case]) -> SegResult<PreparedPart> {
        if cases.is_empty() {
            return Ok(PreparedPart::empty(self.slice_shape));
        }
        let images = self.stack_scans(cases.iter().map(Case::image))?;
        let masks: Vec<Array3<u8>> = cases
            .iter()
            .map(|c| resize_stack(c.mask(), self.slice_shape))
            .collect();
        Ok(PreparedPart {
            images,
            masks: self.concat(&masks)?,
            slice_counts: cases.iter().map(Case::len_z).collect(),
        })
    }

    /// 准备整个数据集.
    ///
    /// 只在训练集上拟合 [`NormStats`], 然后用同一个统计量归一化三个集合.
    /// 训练集为空时返回 [`SegError::Configuration`].
    pub fn prepare(&self, split: &DatasetSplit) -> SegResult<PreparedSet> {
        if split.train.is_empty() {
            return Err(SegError::config("training split is empty"));
        }
        let mut train = self.stack_cases(&split.train)?;
        let stats = NormStats::fit(train.images.view())?;

        let mut validation = self.stack_cases(&split.validation)?;
        let mut test = self.stack_cases(&split.test)?;
        for part in [&mut train, &mut validation, &mut test] {
            stats.apply(&mut part.images);
        }
        for (name, part) in izip!(["train", "validation", "test"], [&train, &validation, &test]) {
            log::info!("prepared {name}: {} slices from {} cases", part.len(), part.slice_counts.len());
        }
        Ok(PreparedSet {
            stats,
            train,
            validation,
            test,
        })
    }

    /// 用已有的训练集统计量准备一组只有扫描的体数据 (如无标签的测试集).
    pub fn prepare_scans<'a>(
        &self,
        scans: impl IntoIterator<Item = ArrayView3<'a, f32>>,
        stats: &NormStats,
    ) -> SegResult<Array3<f32>> {
        let mut images = self.stack_scans(scans)?;
        stats.apply(&mut images);
        Ok(images)
    }
}
