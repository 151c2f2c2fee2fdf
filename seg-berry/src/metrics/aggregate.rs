//! 逐病例评估与跨病例汇总.

use super::dice::{binarize, dice, rel_abs_vol_diff, slice_dice};
use super::surface::{surface_distances, SurfaceStats};
use crate::consts::PRED_THRESHOLD;
use crate::data::resize::resize_stack;
use crate::{Case, SegError, SegResult};
use ndarray::{s, ArrayView3};
use std::ops::Range;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// 评估配置.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct EvalConfig {
    /// 概率预测的二值化阈值.
    pub threshold: f32,
}

impl Default for EvalConfig {
    fn default() -> Self {
        Self {
            threshold: PRED_THRESHOLD,
        }
    }
}

/// 按各病例切片数, 计算每个病例在拼接后的预测数组中占据的连续区间.
///
/// `[10, 8, 12]` 得到 `[0..10, 10..18, 18..30]`.
pub fn case_ranges(slice_counts: &[usize]) -> Vec<Range<usize>> {
    let mut end = 0;
    slice_counts
        .iter()
        .map(|&n| {
            let start = end;
            end += n;
            start..end
        })
        .collect()
}

/// 单个病例的评估结果. 无定义的指标为 `None`.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CaseMetrics {
    /// 病例编号.
    pub id: u32,

    /// 预测在拼接数组中的切片区间.
    pub range: Range<usize>,

    /// 体积 Dice.
    pub dice: Option<f64>,

    /// 逐切片 Dice.
    pub slice_dice: Vec<Option<f64>>,

    /// Hausdorff 距离 (毫米).
    pub hausdorff: Option<f64>,

    /// 95% Hausdorff 距离 (毫米).
    pub hd95: Option<f64>,

    /// 平均表面距离 (毫米).
    pub msd: Option<f64>,

    /// 相对绝对体积差 (百分比).
    pub rel_vol_diff: Option<f64>,
}

impl CaseMetrics {
    /// 用病例原生分辨率下的二值预测 `pred` 评估病例 `case`.
    pub fn compute(case: &Case, range: Range<usize>, pred: ArrayView3<'_, u8>) -> SegResult<Self> {
        let truth = case.mask();
        let surf = surface_distances(truth, pred, case.spacing())?
            .and_then(|d| SurfaceStats::from_distances(&d));
        Ok(Self {
            id: case.id(),
            range,
            dice: dice(truth, pred)?,
            slice_dice: slice_dice(truth, pred)?,
            hausdorff: surf.map(|s| s.hausdorff),
            hd95: surf.map(|s| s.hd95),
            msd: surf.map(|s| s.msd),
            rel_vol_diff: rel_abs_vol_diff(truth, pred)?,
        })
    }

    /// 记录无定义的指标.
    fn warn_undefined(&self) {
        let undefined: Vec<&str> = [
            ("dice", self.dice),
            ("surface distance", self.msd),
            ("relative volume difference", self.rel_vol_diff),
        ]
        .into_iter()
        .filter_map(|(name, v)| v.is_none().then_some(name))
        .collect();
        if !undefined.is_empty() {
            log::warn!(
                "case {}: {} undefined, excluded from aggregates",
                self.id,
                undefined.join(", ")
            );
        }
    }
}

/// 均值与总体标准差.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Summary {
    /// 均值.
    pub mean: f64,

    /// 总体标准差.
    pub std: f64,

    /// 参与统计的病例数.
    pub count: usize,
}

impl Summary {
    /// 汇总有定义的值. 没有任何有定义的值时返回 `None`.
    pub fn of(values: impl IntoIterator<Item = Option<f64>>) -> Option<Self> {
        let v: Vec<f64> = values.into_iter().flatten().collect();
        if v.is_empty() {
            return None;
        }
        let n = v.len() as f64;
        let mean = v.iter().sum::<f64>() / n;
        let var = v.iter().map(|x| (x - mean) * (x - mean)).sum::<f64>() / n;
        Some(Self {
            mean,
            std: var.sqrt(),
            count: v.len(),
        })
    }
}

/// 一次评估的结果.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct EvalReport {
    /// 按输入顺序排列的逐病例结果.
    pub cases: Vec<CaseMetrics>,

    /// 体积 Dice 汇总.
    pub dice: Option<Summary>,

    /// Hausdorff 距离汇总.
    pub hausdorff: Option<Summary>,

    /// 95% Hausdorff 距离汇总.
    pub hd95: Option<Summary>,

    /// 平均表面距离汇总.
    pub msd: Option<Summary>,

    /// 相对绝对体积差汇总.
    pub rel_vol_diff: Option<Summary>,
}

macro_rules! impl_summary_getters {
    ($($field: ident => $mean: ident, $std: ident;)+) => {
        $(
            #[doc = concat!("`", stringify!($field), "` 的均值.")]
            #[inline]
            pub fn $mean(&self) -> Option<f64> {
                self.$field.map(|s| s.mean)
            }

            #[doc = concat!("`", stringify!($field), "` 的总体标准差.")]
            #[inline]
            pub fn $std(&self) -> Option<f64> {
                self.$field.map(|s| s.std)
            }
        )+
    };
}

impl EvalReport {
    /// 由逐病例结果汇总.
    pub fn from_cases(cases: Vec<CaseMetrics>) -> Self {
        let summary = |f: fn(&CaseMetrics) -> Option<f64>| Summary::of(cases.iter().map(f));
        Self {
            dice: summary(|c| c.dice),
            hausdorff: summary(|c| c.hausdorff),
            hd95: summary(|c| c.hd95),
            msd: summary(|c| c.msd),
            rel_vol_diff: summary(|c| c.rel_vol_diff),
            cases,
        }
    }

    impl_summary_getters! {
        dice => mean_dice, std_dice;
        hausdorff => mean_hausdorff, std_hausdorff;
        hd95 => mean_hd95, std_hd95;
        msd => mean_msd, std_msd;
        rel_vol_diff => mean_rel_vol_diff, std_rel_vol_diff;
    }

    /// 以 `info` 级别输出汇总结果.
    pub fn log_summary(&self) {
        let show = |s: Option<Summary>| match s {
            Some(s) => format!("{:.4} ± {:.4} (n = {})", s.mean, s.std, s.count),
            None => "undefined".to_string(),
        };
        log::info!("volumetric dice: {}", show(self.dice));
        log::info!("hausdorff: {}", show(self.hausdorff));
        log::info!("hd95: {}", show(self.hd95));
        log::info!("mean surface distance: {}", show(self.msd));
        log::info!("relative abs. volume difference: {}", show(self.rel_vol_diff));
    }
}

/// 评估一组病例.
///
/// `predictions` 为 `(n, rows, cols)` 的概率预测, 按 `cases` 的顺序拼接. `n` 必须等于
/// 所有病例切片数之和, 否则返回 [`SegError::ShapeMismatch`]. 每个病例的预测先最近邻
/// 缩放回原生 `(h, w)`, 再二值化.
pub fn evaluate(predictions: ArrayView3<'_, f32>, cases: &[Case], config: &EvalConfig) -> SegResult<EvalReport> {
    let counts: Vec<usize> = cases.iter().map(Case::len_z).collect();
    let total: usize = counts.iter().sum();
    let (n, rows, cols) = predictions.dim();
    if n != total {
        return Err(SegError::shape(&[total, rows, cols], predictions.shape()));
    }
    if cases.is_empty() {
        return Err(SegError::config("no cases to evaluate"));
    }
    if rows == 0 || cols == 0 {
        return Err(SegError::shape(&[total, 1, 1], predictions.shape()));
    }

    let one = |(case, range): (&Case, Range<usize>)| -> SegResult<CaseMetrics> {
        let pred = predictions.slice(s![range.clone(), .., ..]);
        let pred = binarize(resize_stack(pred, case.slice_shape()).view(), config.threshold);
        let m = CaseMetrics::compute(case, range, pred.view())?;
        m.warn_undefined();
        Ok(m)
    };

    let jobs = cases.iter().zip(case_ranges(&counts));
    #[cfg(feature = "rayon")]
    let metrics = {
        use rayon::iter::{IntoParallelIterator, ParallelIterator};
        jobs.collect::<Vec<_>>()
            .into_par_iter()
            .map(one)
            .collect::<SegResult<Vec<_>>>()?
    };
    #[cfg(not(feature = "rayon"))]
    let metrics = jobs.map(one).collect::<SegResult<Vec<_>>>()?;

    let report = EvalReport::from_cases(metrics);
    report.log_summary();
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{Array3, Axis};

    #[test]
    fn test_case_ranges() {
        assert_eq!(case_ranges(&[10, 8, 12]), vec![0..10, 10..18, 18..30]);
        assert_eq!(case_ranges(&[]), Vec::<Range<usize>>::new());
        assert_eq!(case_ranges(&[3, 0, 2]), vec![0..3, 3..3, 3..5]);
    }

    #[test]
    fn test_summary() {
        let s = Summary::of([Some(1.0), None, Some(3.0)]).unwrap();
        assert_eq!(s.mean, 2.0);
        assert_eq!(s.std, 1.0);
        assert_eq!(s.count, 2);
        assert_eq!(Summary::of([None, None]), None);
    }

    /// 每张切片的值都是它所属病例的编号, 检查切片被分给了正确的病例.
    #[test]
    fn test_slices_attributed_to_right_case() {
        let counts = [10usize, 8, 12];
        let cases: Vec<Case> = counts
            .iter()
            .enumerate()
            .map(|(id, &z)| {
                let mask = Array3::from_shape_fn((z, 6, 6), |(_, h, w)| u8::from(h < 3 && w < 3));
                Case::new(id as u32, Array3::zeros((z, 6, 6)), mask, [1.0; 3]).unwrap()
            })
            .collect();

        // 只有病例 1 的切片预测正确, 其余全为背景.
        let mut preds = Array3::<f32>::zeros((30, 6, 6));
        for mut sli in preds.slice_mut(s![10..18, .., ..]).axis_iter_mut(Axis(0)) {
            sli.slice_mut(s![..3, ..3]).fill(1.0);
        }
        let report = evaluate(preds.view(), &cases, &EvalConfig::default()).unwrap();
        let dice: Vec<Option<f64>> = report.cases.iter().map(|c| c.dice).collect();
        assert_eq!(dice, vec![Some(0.0), Some(1.0), Some(0.0)]);
        assert_eq!(report.cases[2].range, 18..30);
        assert_eq!(report.cases[1].slice_dice.len(), 8);
        assert_eq!(report.cases[1].hausdorff, Some(0.0));
        assert_eq!(report.cases[0].hausdorff, None);
        assert_eq!(report.cases[0].rel_vol_diff, Some(100.0));
    }

    #[test]
    fn test_wrong_total() {
        let case = Case::new(0, Array3::zeros((4, 4, 4)), Array3::zeros((4, 4, 4)), [1.0; 3]).unwrap();
        let err = evaluate(Array3::zeros((5, 4, 4)).view(), &[case], &EvalConfig::default()).unwrap_err();
        assert!(matches!(err, SegError::ShapeMismatch { .. }));
    }

    #[test]
    fn test_resized_back() {
        let mask = Array3::from_shape_fn((2, 8, 8), |(_, h, _)| u8::from(h < 4));
        let case = Case::new(3, Array3::zeros((2, 8, 8)), mask, [3.0, 0.5, 0.5]).unwrap();
        // 预测在 4x4 网格上.
        let preds = Array3::from_shape_fn((2, 4, 4), |(_, h, _)| if h < 2 { 0.8f32 } else { 0.1 });
        let report = evaluate(preds.view(), &[case], &EvalConfig::default()).unwrap();
        assert_eq!(report.mean_dice(), Some(1.0));
        assert_eq!(report.std_dice(), Some(0.0));
        assert_eq!(report.mean_rel_vol_diff(), Some(0.0));
    }
}
