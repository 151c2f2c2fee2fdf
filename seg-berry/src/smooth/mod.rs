//! 扫描强度的预处理: 曲率流平滑与 z-score 归一化.
//!
//! 两者都只作用于扫描, 标签永远原样通过.

mod norm;

pub use norm::NormStats;

use crate::consts::{CURVATURE_ITERATIONS, CURVATURE_TIME_STEP};
use crate::{SegError, SegResult};
use ndarray::{Array2, Array3, ArrayView2, ArrayView3, ArrayViewMut2, Axis};

cfg_if::cfg_if! {
    if #[cfg(feature = "rayon")] {
        use rayon::iter::{IntoParallelIterator, ParallelIterator};
    }
}

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// 梯度模平方小于该值时视为平坦区域, 不做更新.
const FLAT_EPS: f64 = 1e-9;

/// 曲率流 (mean curvature flow) 平滑器. 一种保边去噪方法.
///
/// 每次迭代执行 `I += dt * (Ixx*Iy^2 - 2*Ix*Iy*Ixy + Iyy*Ix^2) / (Ix^2 + Iy^2)`,
/// 差分使用中心差分, 边界按复制边缘处理. 直线边缘的曲率为 0, 因此不会被抹平.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CurvatureFlow {
    time_step: f64,
    iterations: u32,
}

impl Default for CurvatureFlow {
    /// 时间步长 0.125, 迭代 5 次.
    fn default() -> Self {
        Self {
            time_step: CURVATURE_TIME_STEP,
            iterations: CURVATURE_ITERATIONS,
        }
    }
}

impl CurvatureFlow {
    /// 构建平滑器.
    ///
    /// 显式差分格式要求 `0 < time_step <= 0.25`, 否则返回配置错误.
    pub fn new(time_step: f64, iterations: u32) -> SegResult<Self> {
        if !(time_step > 0.0 && time_step <= 0.25) {
            return Err(SegError::config(format!(
                "curvature flow time step must be in (0, 0.25], got {time_step}"
            )));
        }
        Ok(Self {
            time_step,
            iterations,
        })
    }

    /// 时间步长.
    #[inline]
    pub fn time_step(&self) -> f64 {
        self.time_step
    }

    /// 迭代次数.
    #[inline]
    pub fn iterations(&self) -> u32 {
        self.iterations
    }

    /// 平滑单张切片, 返回新切片.
    pub fn smooth_slice(&self, slice: ArrayView2<'_, f32>) -> Array2<f32> {
        let mut cur = slice.mapv(f64::from);
        let mut next = cur.clone();
        for _ in 0..self.iterations {
            self.step(&cur, &mut next);
            std::mem::swap(&mut cur, &mut next);
        }
        cur.mapv(|v| v as f32)
    }

    /// 就地平滑单张切片.
    #[inline]
    pub fn smooth_slice_mut(&self, mut slice: ArrayViewMut2<'_, f32>) {
        let out = self.smooth_slice(slice.view());
        slice.assign(&out);
    }

    /// 平滑 `(n, h, w)` 切片栈的每一张切片, 返回新数组.
    pub fn smooth_stack(&self, stack: ArrayView3<'_, f32>) -> Array3<f32> {
        let mut out = stack.to_owned();
        self.smooth_stack_mut(&mut out);
        out
    }

    /// 就地平滑 `(n, h, w)` 切片栈的每一张切片. 打开 `rayon` feature 时切片间并行.
    pub fn smooth_stack_mut(&self, stack: &mut Array3<f32>) {
        #[cfg(feature = "rayon")]
        {
            stack
                .axis_iter_mut(Axis(0))
                .into_par_iter()
                .for_each(|s| self.smooth_slice_mut(s));
        }

        #[cfg(not(feature = "rayon"))]
        {
            stack
                .axis_iter_mut(Axis(0))
                .for_each(|s| self.smooth_slice_mut(s));
        }
    }

    /// 一次显式迭代, 从 `cur` 写入 `next`.
    fn step(&self, cur: &Array2<f64>, next: &mut Array2<f64>) {
        let (h, w) = cur.dim();
        let at = |r: isize, c: isize| {
            let r = r.clamp(0, h as isize - 1) as usize;
            let c = c.clamp(0, w as isize - 1) as usize;
            cur[(r, c)]
        };
        for ((r, c), out) in next.indexed_iter_mut() {
            let (r, c) = (r as isize, c as isize);
            let u = at(r, c);
            let ix = (at(r, c + 1) - at(r, c - 1)) / 2.0;
            let iy = (at(r + 1, c) - at(r - 1, c)) / 2.0;
            let g2 = ix * ix + iy * iy;
            *out = if g2 < FLAT_EPS {
                u
            } else {
                let ixx = at(r, c + 1) - 2.0 * u + at(r, c - 1);
                let iyy = at(r + 1, c) - 2.0 * u + at(r - 1, c);
                let ixy = (at(r + 1, c + 1) - at(r + 1, c - 1) - at(r - 1, c + 1)
                    + at(r - 1, c - 1))
                    / 4.0;
                let k = (ixx * iy * iy - 2.0 * ix * iy * ixy + iyy * ix * ix) / g2;
                u + self.time_step * k
            };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::CurvatureFlow;
    use ndarray::{Array2, Array3};

    #[test]
    fn test_invalid_time_step() {
        assert!(CurvatureFlow::new(0.0, 3).is_err());
        assert!(CurvatureFlow::new(0.3, 3).is_err());
        assert!(CurvatureFlow::new(f64::NAN, 3).is_err());
        assert!(CurvatureFlow::new(0.125, 0).is_ok());
    }

    #[test]
    fn test_constant_and_zero_iterations() {
        let flat = Array2::<f32>::from_elem((8, 8), 3.5);
        assert_eq!(CurvatureFlow::default().smooth_slice(flat.view()), flat);

        let noisy = Array2::<f32>::from_shape_fn((5, 6), |(h, w)| ((h * 7 + w * 13) % 5) as f32);
        let id = CurvatureFlow::new(0.125, 0).unwrap();
        assert_eq!(id.smooth_slice(noisy.view()), noisy);
    }

    /// 直线边缘曲率为 0, 平滑前后不变.
    #[test]
    fn test_straight_edge_preserved() {
        let edge = Array2::<f32>::from_shape_fn((10, 10), |(_, w)| if w < 5 { 0.0 } else { 10.0 });
        let out = CurvatureFlow::default().smooth_slice(edge.view());
        assert_eq!(out, edge);
    }

    #[test]
    fn test_stack_matches_slices() {
        let stack = Array3::<f32>::from_shape_fn((3, 7, 7), |(z, h, w)| {
            ((z * 31 + h * 17 + w * 5) % 11) as f32
        });
        let cf = CurvatureFlow::default();
        let out = cf.smooth_stack(stack.view());
        for z in 0..3 {
            let single = cf.smooth_slice(stack.index_axis(ndarray::Axis(0), z));
            assert_eq!(out.index_axis(ndarray::Axis(0), z), single);
        }
        assert!(out.iter().all(|v| v.is_finite()));
    }
}
