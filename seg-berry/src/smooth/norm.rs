use crate::{SegError, SegResult};
use ndarray::{Array, Array1, ArrayView, ArrayView1, Dimension};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// 训练集强度统计量 `(mu, sigma)`.
///
/// 该对象只读, 且只应由训练集扫描拟合得到 ([`NormStats::fit`]).
/// 验证集与测试集必须复用同一个实例归一化, 不得重新拟合.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct NormStats {
    mu: f64,
    sigma: f64,
}

impl NormStats {
    /// 由已知统计量直接构建. `sigma` 必须是正有限值, `mu` 必须有限.
    pub fn new(mu: f64, sigma: f64) -> SegResult<Self> {
        if !mu.is_finite() || !sigma.is_finite() || sigma <= 0.0 {
            return Err(SegError::Numerical(format!(
                "degenerate normalization statistics: mu = {mu}, sigma = {sigma}"
            )));
        }
        Ok(Self { mu, sigma })
    }

    /// 在训练集扫描上计算均值与总体标准差.
    ///
    /// 输入为空, 含非有限值, 或标准差为 0 时返回 [`SegError::Numerical`].
    pub fn fit<D: Dimension>(images: ArrayView<'_, f32, D>) -> SegResult<Self> {
        if images.is_empty() {
            return Err(SegError::Numerical(
                "cannot fit normalization statistics on empty data".to_string(),
            ));
        }
        if images.iter().any(|v| !v.is_finite()) {
            return Err(SegError::Numerical(
                "training images contain non-finite values".to_string(),
            ));
        }
        let n = images.len() as f64;
        let mu = images.iter().map(|v| *v as f64).sum::<f64>() / n;
        let var = images
            .iter()
            .map(|v| {
                let d = *v as f64 - mu;
                d * d
            })
            .sum::<f64>()
            / n;
        let stats = Self::new(mu, var.sqrt())?;
        log::info!(
            "fitted normalization statistics: mu = {:.6}, sigma = {:.6}",
            stats.mu,
            stats.sigma
        );
        Ok(stats)
    }

    /// 均值.
    #[inline]
    pub fn mu(&self) -> f64 {
        self.mu
    }

    /// 标准差.
    #[inline]
    pub fn sigma(&self) -> f64 {
        self.sigma
    }

    /// 归一化单个强度值: `(x - mu) / sigma`.
    #[inline]
    pub fn apply_value(&self, x: f32) -> f32 {
        ((x as f64 - self.mu) / self.sigma) as f32
    }

    /// 就地归一化.
    pub fn apply<D: Dimension>(&self, images: &mut Array<f32, D>) {
        images.mapv_inplace(|x| self.apply_value(x));
    }

    /// 返回归一化后的新数组.
    pub fn normalized<D: Dimension>(&self, images: ArrayView<'_, f32, D>) -> Array<f32, D> {
        images.mapv(|x| self.apply_value(x))
    }

    /// 以 `[mu, sigma]` 形式导出, 便于与数组一起缓存.
    #[inline]
    pub fn to_array(&self) -> Array1<f64> {
        Array1::from(vec![self.mu, self.sigma])
    }

    /// 从 `[mu, sigma]` 形式恢复.
    pub fn from_array(a: ArrayView1<'_, f64>) -> SegResult<Self> {
        match a.as_slice() {
            Some(&[mu, sigma]) => Self::new(mu, sigma),
            _ => Err(SegError::shape(&[2], a.shape())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::NormStats;
    use crate::SegError;
    use ndarray::{array, Array3};

    fn f64_eq(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_fit_population_std() {
        let x = array![[1.0f32, 2.0], [3.0, 4.0]];
        let s = NormStats::fit(x.view()).unwrap();
        assert!(f64_eq(s.mu(), 2.5));
        assert!(f64_eq(s.sigma(), 1.25f64.sqrt()));
    }

    #[test]
    fn test_zero_std_is_error() {
        let x = Array3::<f32>::from_elem((2, 3, 3), 7.0);
        assert!(matches!(
            NormStats::fit(x.view()).unwrap_err(),
            SegError::Numerical(_)
        ));
        assert!(NormStats::new(0.0, 0.0).is_err());
        assert!(NormStats::new(f64::NAN, 1.0).is_err());
    }

    #[test]
    fn test_non_finite_input_is_error() {
        let x = array![1.0f32, f32::INFINITY];
        assert!(NormStats::fit(x.view()).is_err());
    }

    /// 验证集用训练集统计量归一化, 结果严格等于 `(x - mu) / sigma`.
    #[test]
    fn test_apply_uses_stored_stats() {
        let train = array![0.0f32, 10.0, 20.0];
        let stats = NormStats::fit(train.view()).unwrap();

        let mut val = array![5.0f32, 100.0, -3.0];
        let expect = val.mapv(|x| ((x as f64 - stats.mu()) / stats.sigma()) as f32);
        stats.apply(&mut val);
        assert_eq!(val, expect);

        // 验证集自身的统计量不同, 但不影响结果.
        let refit = NormStats::fit(array![5.0f32, 100.0, -3.0].view()).unwrap();
        assert_ne!(refit, stats);
    }

    #[test]
    fn test_array_round_trip() {
        let stats = NormStats::new(1.5, 2.0).unwrap();
        assert_eq!(NormStats::from_array(stats.to_array().view()).unwrap(), stats);
        assert!(NormStats::from_array(array![1.0, 2.0, 3.0].view()).is_err());
    }
}
