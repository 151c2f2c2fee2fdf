//! 最近邻缩放.
//!
//! 采样规则与 OpenCV `INTER_NEAREST` 一致: `src = floor(dst * src_len / dst_len)`.
//! 对标签而言这保证不会产生新的标签值.

use crate::Idx2d;
use ndarray::{Array2, Array3, ArrayView2, ArrayView3, Axis, Zip};

/// 输出第 `dst` 行 (列) 对应的输入行 (列).
#[inline]
fn nearest_src(dst: usize, src_len: usize, dst_len: usize) -> usize {
    let scale = src_len as f64 / dst_len as f64;
    ((dst as f64 * scale).floor() as usize).min(src_len - 1)
}

/// 将二维切片最近邻缩放到 `(h, w)`.
///
/// 输入为空或目标形状含 0 时 panic.
pub fn resize_nearest<T: Copy>(src: ArrayView2<'_, T>, (h, w): Idx2d) -> Array2<T> {
    let (sh, sw) = src.dim();
    assert!(sh > 0 && sw > 0 && h > 0 && w > 0, "不能缩放空图像");
    if (sh, sw) == (h, w) {
        return src.to_owned();
    }
    let rows: Vec<usize> = (0..h).map(|r| nearest_src(r, sh, h)).collect();
    let cols: Vec<usize> = (0..w).map(|c| nearest_src(c, sw, w)).collect();
    Array2::from_shape_fn((h, w), |(r, c)| src[(rows[r], cols[c])])
}

/// 将三维体逐切片最近邻缩放到 `(z, h, w)`, 切片个数不变.
pub fn resize_stack<T: Copy + Default>(src: ArrayView3<'_, T>, shape: Idx2d) -> Array3<T> {
    let (z, _, _) = src.dim();
    let mut out = Array3::<T>::default((z, shape.0, shape.1));
    Zip::from(out.axis_iter_mut(Axis(0)))
        .and(src.axis_iter(Axis(0)))
        .for_each(|mut dst, s| dst.assign(&resize_nearest(s, shape)));
    out
}
