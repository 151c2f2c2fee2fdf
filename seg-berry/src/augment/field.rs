//! 弹性位移场.

use crate::Idx2d;
use ndarray::{Array1, Array2, Axis};
use rand::Rng;

/// 截断高斯核. 核长为 `int(4 * sigma) | 1` (奇数), 归一化到和为 1.
///
/// `sigma` 必须为正, 否则 panic.
pub fn gaussian_kernel(sigma: f64) -> Array1<f64> {
    assert!(sigma > 0.0, "高斯核 sigma 必须为正");
    let size = ((4.0 * sigma) as usize) | 1;
    let radius = (size / 2) as f64;
    let mut k = Array1::from_shape_fn(size, |i| {
        let x = i as f64 - radius;
        (-(x * x) / (2.0 * sigma * sigma)).exp()
    });
    let sum = k.sum();
    k /= sum;
    k
}

/// `BORDER_REFLECT_101` 边界规则下的合法索引: `..., 2, 1, | 0, 1, 2, ... n-1, | n-2, ...`.
#[inline]
fn reflect101(i: isize, n: usize) -> usize {
    if n == 1 {
        return 0;
    }
    let period = 2 * (n as isize - 1);
    let m = i.rem_euclid(period);
    if m < n as isize {
        m as usize
    } else {
        (period - m) as usize
    }
}

/// 沿 `axis` 做一维卷积.
fn convolve_axis(src: &Array2<f64>, kernel: &Array1<f64>, axis: Axis) -> Array2<f64> {
    let radius = (kernel.len() / 2) as isize;
    let n = src.len_of(axis);
    Array2::from_shape_fn(src.dim(), |(r, c)| {
        let center = (if axis == Axis(0) { r } else { c }) as isize;
        kernel
            .iter()
            .enumerate()
            .map(|(k, wk)| {
                let j = reflect101(center + k as isize - radius, n);
                let v = if axis == Axis(0) { src[(j, c)] } else { src[(r, j)] };
                wk * v
            })
            .sum()
    })
}

/// 可分离高斯模糊.
pub(crate) fn gaussian_blur(src: &Array2<f64>, sigma: f64) -> Array2<f64> {
    let kernel = gaussian_kernel(sigma);
    let tmp = convolve_axis(src, &kernel, Axis(0));
    convolve_axis(&tmp, &kernel, Axis(1))
}

/// 平滑的随机位移场. `dy` 为行方向位移, `dx` 为列方向位移, 单位像素.
///
/// 每个分量由 `[-1, 1)` 均匀噪声经高斯模糊后乘以 `alpha` 得到.
#[derive(Clone, Debug, PartialEq)]
pub struct DisplacementField {
    dy: Array2<f64>,
    dx: Array2<f64>,
}

impl DisplacementField {
    /// 从 `rng` 抽取一个形状为 `shape` 的位移场.
    ///
    /// 先抽取完整的 `dy` 噪声, 再抽取 `dx` 噪声, 抽取顺序固定.
    pub fn draw<R: Rng + ?Sized>(shape: Idx2d, alpha: f64, sigma: f64, rng: &mut R) -> Self {
        let mut noise = || Array2::from_shape_simple_fn(shape, || rng.random_range(-1.0..1.0));
        let ny = noise();
        let nx = noise();
        Self {
            dy: gaussian_blur(&ny, sigma) * alpha,
            dx: gaussian_blur(&nx, sigma) * alpha,
        }
    }

    /// 全零位移场.
    pub fn zeros(shape: Idx2d) -> Self {
        Self {
            dy: Array2::zeros(shape),
            dx: Array2::zeros(shape),
        }
    }

    /// 位移场形状.
    #[inline]
    pub fn shape(&self) -> Idx2d {
        self.dy.dim()
    }

    /// 位置 `pos` 的位移 `(dy, dx)`. 越界时 panic.
    #[inline]
    pub fn at(&self, pos: Idx2d) -> (f64, f64) {
        (self.dy[pos], self.dx[pos])
    }

    /// 所有位移分量绝对值的最大值.
    pub fn max_abs(&self) -> f64 {
        self.dy
            .iter()
            .chain(self.dx.iter())
            .fold(0.0, |m, v| m.max(v.abs()))
    }
}
