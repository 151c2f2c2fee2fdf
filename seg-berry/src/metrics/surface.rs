//! 表面距离: 表面提取, 各向异性欧氏距离变换, 以及由此导出的 Hausdorff 距离.

use crate::consts::gray::is_foreground;
use crate::{Idx3d, SegError, SegResult};
use ndarray::{Array3, ArrayView3, Axis, Zip};
use ordered_float::OrderedFloat;

/// 提取 3D 标签的表面: 前景体素中, 6-邻域内存在背景或越出边界的那些.
pub fn surface(mask: ArrayView3<'_, u8>) -> Array3<bool> {
    let (d, h, w) = mask.dim();
    let fg = |(z, y, x): Idx3d| is_foreground(mask[(z, y, x)]);
    Array3::from_shape_fn((d, h, w), |p @ (z, y, x)| {
        if !fg(p) {
            return false;
        }
        // 边界外视为背景.
        if z == 0 || y == 0 || x == 0 || z + 1 == d || y + 1 == h || x + 1 == w {
            return true;
        }
        ![
            (z - 1, y, x),
            (z + 1, y, x),
            (z, y - 1, x),
            (z, y + 1, x),
            (z, y, x - 1),
            (z, y, x + 1),
        ]
        .into_iter()
        .all(fg)
    })
}

/// 一维加权平方距离变换 `out[p] = min_q weight * (p - q)^2 + f[q]`.
///
/// `f` 中的无穷值代表 "不是目标", 全为无穷时输出全为无穷.
fn sq_dist_1d(f: &[f64], weight: f64, out: &mut [f64]) {
    // 下包络中的抛物线顶点与各自管辖区间的左端点.
    let mut v: Vec<usize> = Vec::with_capacity(f.len());
    let mut z: Vec<f64> = Vec::with_capacity(f.len());
    let height = |q: usize| f[q] + weight * (q * q) as f64;

    for q in (0..f.len()).filter(|&q| f[q].is_finite()) {
        while let Some(&p) = v.last() {
            let s = (height(q) - height(p)) / (2.0 * weight * (q - p) as f64);
            if z.last().is_some_and(|&zl| s <= zl) {
                v.pop();
                z.pop();
            } else {
                v.push(q);
                z.push(s);
                break;
            }
        }
        if v.is_empty() {
            v.push(q);
            z.push(f64::NEG_INFINITY);
        }
    }

    if v.is_empty() {
        out.fill(f64::INFINITY);
        return;
    }
    let mut k = 0;
    for (p, o) in out.iter_mut().enumerate() {
        while k + 1 < v.len() && z[k + 1] < p as f64 {
            k += 1;
        }
        let d = p as f64 - v[k] as f64;
        *o = weight * d * d + f[v[k]];
    }
}

/// 各向异性精确欧氏距离变换: 每个体素到 `target` 中最近目标体素的物理距离.
///
/// `spacing` 按 `[z, h, w]` 给出. `target` 为空时所有距离为无穷.
pub fn distance_to(target: ArrayView3<'_, bool>, spacing: [f64; 3]) -> Array3<f64> {
    let mut dist = target.mapv(|t| if t { 0.0 } else { f64::INFINITY });
    let mut buf = Vec::new();
    let mut out = Vec::new();
    for (axis, s) in spacing.into_iter().enumerate() {
        let weight = s * s;
        for mut lane in dist.lanes_mut(Axis(axis)) {
            buf.clear();
            buf.extend(lane.iter().copied());
            out.resize(buf.len(), 0.0);
            sq_dist_1d(&buf, weight, &mut out);
            lane.iter_mut().zip(out.iter()).for_each(|(l, o)| *l = *o);
        }
    }
    dist.mapv_inplace(f64::sqrt);
    dist
}

/// 对称表面距离: 预测表面到真值表面的距离, 接上真值表面到预测表面的距离.
///
/// 任意一方没有表面 (即没有前景) 时无定义, 返回 `Ok(None)`.
pub fn surface_distances(
    truth: ArrayView3<'_, u8>,
    pred: ArrayView3<'_, u8>,
    spacing: [f64; 3],
) -> SegResult<Option<Vec<f64>>> {
    if truth.dim() != pred.dim() {
        return Err(SegError::shape(truth.shape(), pred.shape()));
    }
    let (st, sp) = (surface(truth), surface(pred));
    if !st.iter().any(|&b| b) || !sp.iter().any(|&b| b) {
        return Ok(None);
    }
    let (dt, dp) = (distance_to(st.view(), spacing), distance_to(sp.view(), spacing));

    let mut out = Vec::new();
    Zip::from(&sp).and(&dt).for_each(|&on, &d| {
        if on {
            out.push(d);
        }
    });
    Zip::from(&st).and(&dp).for_each(|&on, &d| {
        if on {
            out.push(d);
        }
    });
    Ok(Some(out))
}

/// 由表面距离导出的统计量.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct SurfaceStats {
    /// Hausdorff 距离 (最大值).
    pub hausdorff: f64,

    /// 95% 分位 Hausdorff 距离.
    pub hd95: f64,

    /// 平均表面距离.
    pub msd: f64,
}

impl SurfaceStats {
    /// 从表面距离计算. 输入为空时返回 `None`.
    pub fn from_distances(distances: &[f64]) -> Option<Self> {
        if distances.is_empty() {
            return None;
        }
        let mut sorted: Vec<OrderedFloat<f64>> = distances.iter().copied().map(OrderedFloat).collect();
        sorted.sort_unstable();
        let n = sorted.len();
        let hausdorff = sorted[n - 1].0;
        let msd = distances.iter().sum::<f64>() / n as f64;

        // 线性插值分位数.
        let rank = 0.95 * (n - 1) as f64;
        let (lo, hi) = (rank.floor() as usize, rank.ceil() as usize);
        let frac = rank - lo as f64;
        let hd95 = sorted[lo].0 + (sorted[hi].0 - sorted[lo].0) * frac;
        Some(Self { hausdorff, hd95, msd })
    }
}
