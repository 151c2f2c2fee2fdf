//! Dice 系数与相对体积差.

use crate::consts::gray::is_foreground;
use crate::{SegError, SegResult};
use ndarray::{Array, ArrayView, ArrayView3, Axis, Dimension, Zip};

/// 按阈值将概率图二值化: `p >= threshold` 为前景 `1`, 否则为背景 `0`.
pub fn binarize<D: Dimension>(probs: ArrayView<'_, f32, D>, threshold: f32) -> Array<u8, D> {
    probs.mapv(|p| u8::from(p >= threshold))
}

/// `(|A ∩ B|, |A|, |B|)`, 任何非背景标签都视为前景.
fn overlap<D: Dimension>(truth: &ArrayView<'_, u8, D>, pred: &ArrayView<'_, u8, D>) -> (usize, usize, usize) {
    let (mut both, mut a, mut b) = (0, 0, 0);
    Zip::from(truth).and(pred).for_each(|&t, &p| {
        let (t, p) = (is_foreground(t), is_foreground(p));
        both += usize::from(t && p);
        a += usize::from(t);
        b += usize::from(p);
    });
    (both, a, b)
}

fn check<D: Dimension>(truth: &ArrayView<'_, u8, D>, pred: &ArrayView<'_, u8, D>) -> SegResult<()> {
    if truth.shape() != pred.shape() {
        return Err(SegError::shape(truth.shape(), pred.shape()));
    }
    Ok(())
}

/// 两个二值标签的 Dice 系数 `2|A ∩ B| / (|A| + |B|)`.
///
/// 两者都没有前景时 Dice 无定义, 返回 `Ok(None)`.
pub fn dice<D: Dimension>(truth: ArrayView<'_, u8, D>, pred: ArrayView<'_, u8, D>) -> SegResult<Option<f64>> {
    check(&truth, &pred)?;
    let (both, a, b) = overlap(&truth, &pred);
    Ok(match a + b {
        0 => None,
        sum => Some(2.0 * both as f64 / sum as f64),
    })
}

/// 真值标签与概率预测之间的 Dice, 预测先按 `threshold` 二值化.
///
/// 用于在整个训练集上打印一个总体 Dice.
pub fn dice_score<D: Dimension>(
    truth: ArrayView<'_, u8, D>,
    probs: ArrayView<'_, f32, D>,
    threshold: f32,
) -> SegResult<Option<f64>> {
    let pred = binarize(probs, threshold);
    dice(truth, pred.view())
}

/// 逐切片 Dice. 每个元素对应一张 `(h, w)` 切片.
pub fn slice_dice(truth: ArrayView3<'_, u8>, pred: ArrayView3<'_, u8>) -> SegResult<Vec<Option<f64>>> {
    check(&truth, &pred)?;
    truth
        .axis_iter(Axis(0))
        .zip(pred.axis_iter(Axis(0)))
        .map(|(t, p)| dice(t, p))
        .collect()
}

/// 相对绝对体积差 `|V_pred / V_true - 1| * 100`.
///
/// 真值没有前景时无定义, 返回 `Ok(None)`.
pub fn rel_abs_vol_diff<D: Dimension>(
    truth: ArrayView<'_, u8, D>,
    pred: ArrayView<'_, u8, D>,
) -> SegResult<Option<f64>> {
    check(&truth, &pred)?;
    let (_, a, b) = overlap(&truth, &pred);
    Ok((a > 0).then(|| (b as f64 / a as f64 - 1.0).abs() * 100.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{array, Array3};

    #[test]
    fn test_dice() {
        let t = array![[1u8, 1, 0], [0, 0, 0]];
        let p = array![[1u8, 0, 0], [0, 1, 0]];
        assert_eq!(dice(t.view(), p.view()).unwrap(), Some(0.5));
        assert_eq!(dice(t.view(), t.view()).unwrap(), Some(1.0));
        let z = Array3::<u8>::zeros((2, 2, 2));
        assert_eq!(dice(z.view(), z.view()).unwrap(), None);
        assert!(dice(t.view(), array![[1u8, 0]].view()).is_err());
    }

    #[test]
    fn test_dice_score_thresholds() {
        let t = array![1u8, 1, 0, 0];
        let probs = array![0.9f32, 0.5, 0.49, 0.1];
        assert_eq!(binarize(probs.view(), 0.5), array![1u8, 1, 0, 0]);
        assert_eq!(dice_score(t.view(), probs.view(), 0.5).unwrap(), Some(1.0));
    }

    #[test]
    fn test_slice_dice() {
        let t = Array3::from_shape_fn((3, 2, 2), |(z, h, _)| u8::from(z != 2 && h == 0));
        let mut p = t.clone();
        p[(1, 0, 0)] = 0;
        let d = slice_dice(t.view(), p.view()).unwrap();
        assert_eq!(d.len(), 3);
        assert_eq!(d[0], Some(1.0));
        assert!((d[1].unwrap() - 2.0 / 3.0).abs() < 1e-12);
        assert_eq!(d[2], None);
    }

    #[test]
    fn test_rel_abs_vol_diff() {
        let t = array![1u8, 1, 1, 1, 0];
        let p = array![1u8, 1, 0, 0, 0];
        assert_eq!(rel_abs_vol_diff(t.view(), p.view()).unwrap(), Some(50.0));
        assert_eq!(rel_abs_vol_diff(t.view(), t.view()).unwrap(), Some(0.0));
        assert_eq!(rel_abs_vol_diff(p.mapv(|_| 0u8).view(), p.view()).unwrap(), None);
    }
}
