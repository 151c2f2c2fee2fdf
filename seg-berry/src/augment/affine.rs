//! 仿射变换参数 (旋转, 平移, 缩放, 翻转).

use super::AugmentConfig;
use crate::{Idx2d, Idx2dF};
use rand::Rng;

/// 在 `[lo, hi)` 中均匀抽取. 区间退化时直接返回 `lo`, 不消耗随机数.
#[inline]
pub(crate) fn uniform<R: Rng + ?Sized>(rng: &mut R, lo: f64, hi: f64) -> f64 {
    if hi > lo {
        rng.random_range(lo..hi)
    } else {
        lo
    }
}

/// 一次抽取得到的仿射参数.
///
/// 变换以切片中心 `((rows - 1) / 2, (cols - 1) / 2)` 为原点,
/// 采用逆向映射: 给定输出坐标, 求输入坐标.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct AffineParams {
    /// 旋转角度 (度).
    pub rotation_deg: f64,

    /// 平移 `(行, 列)`, 单位像素.
    pub shift: Idx2dF,

    /// 缩放 `(行, 列)`. 大于 1 表示采样范围变大, 即图像内容缩小.
    pub zoom: Idx2dF,

    /// 左右翻转.
    pub flip_h: bool,

    /// 上下翻转.
    pub flip_v: bool,
}

impl Default for AffineParams {
    fn default() -> Self {
        Self::identity()
    }
}

impl AffineParams {
    /// 恒等变换.
    pub const fn identity() -> Self {
        Self {
            rotation_deg: 0.0,
            shift: (0.0, 0.0),
            zoom: (1.0, 1.0),
            flip_h: false,
            flip_v: false,
        }
    }

    /// 从 `rng` 按 `config` 抽取一组参数.
    ///
    /// 抽取顺序固定为: 角度, 行平移, 列平移, 行缩放, 列缩放, 左右翻转, 上下翻转.
    pub fn draw<R: Rng + ?Sized>(config: &AugmentConfig, (rows, cols): Idx2d, rng: &mut R) -> Self {
        let rg = config.rotation_range;
        let rotation_deg = uniform(rng, -rg, rg);
        let hs = config.height_shift_range;
        let ws = config.width_shift_range;
        let shift = (
            uniform(rng, -hs, hs) * rows as f64,
            uniform(rng, -ws, ws) * cols as f64,
        );
        let [z0, z1] = config.zoom_range;
        let zoom = (uniform(rng, z0, z1), uniform(rng, z0, z1));
        let flip_h = config.horizontal_flip && rng.random_bool(0.5);
        let flip_v = config.vertical_flip && rng.random_bool(0.5);
        Self {
            rotation_deg,
            shift,
            zoom,
            flip_h,
            flip_v,
        }
    }

    /// 是否为恒等变换?
    pub fn is_identity(&self) -> bool {
        *self == Self::identity()
    }

    /// 逆向映射: 输出坐标 `p` 对应的输入坐标.
    ///
    /// 先翻转, 再缩放, 平移, 最后绕中心旋转.
    pub fn source(&self, (r, c): Idx2dF, (rows, cols): Idx2d) -> Idx2dF {
        let (max_r, max_c) = ((rows - 1) as f64, (cols - 1) as f64);
        let r = if self.flip_v { max_r - r } else { r };
        let c = if self.flip_h { max_c - c } else { c };
        if self.rotation_deg == 0.0 && self.shift == (0.0, 0.0) && self.zoom == (1.0, 1.0) {
            return (r, c);
        }

        let (cr, cc) = (max_r / 2.0, max_c / 2.0);
        let yr = self.zoom.0 * (r - cr) + self.shift.0;
        let yc = self.zoom.1 * (c - cc) + self.shift.1;
        let (sin, cos) = self.rotation_deg.to_radians().sin_cos();
        (cr + cos * yr - sin * yc, cc + sin * yr + cos * yc)
    }
}

#[cfg(test)]
mod tests {
    use super::AffineParams;
    use crate::augment::AugmentConfig;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn close(a: (f64, f64), b: (f64, f64)) -> bool {
        (a.0 - b.0).abs() < 1e-9 && (a.1 - b.1).abs() < 1e-9
    }

    #[test]
    fn test_identity() {
        let p = AffineParams::identity();
        assert!(p.is_identity());
        assert_eq!(p.source((3.0, 7.0), (10, 10)), (3.0, 7.0));
    }

    #[test]
    fn test_flips() {
        let mut p = AffineParams::identity();
        p.flip_h = true;
        assert_eq!(p.source((2.0, 1.0), (5, 4)), (2.0, 2.0));
        p.flip_v = true;
        assert_eq!(p.source((2.0, 1.0), (5, 4)), (2.0, 2.0));
        assert_eq!(p.source((0.0, 0.0), (5, 4)), (4.0, 3.0));
    }

    #[test]
    fn test_rotation_about_center() {
        let mut p = AffineParams::identity();
        p.rotation_deg = 90.0;
        // 中心 (2, 2) 不动.
        assert!(close(p.source((2.0, 2.0), (5, 5)), (2.0, 2.0)));
        // (r, c) - center = (1, 0) 旋转后变为 (0, 1).
        assert!(close(p.source((3.0, 2.0), (5, 5)), (2.0, 3.0)));
    }

    #[test]
    fn test_shift_and_zoom() {
        let mut p = AffineParams::identity();
        p.shift = (1.0, -2.0);
        assert!(close(p.source((0.0, 0.0), (5, 5)), (1.0, -2.0)));

        let mut p = AffineParams::identity();
        p.zoom = (2.0, 1.0);
        assert!(close(p.source((3.0, 3.0), (5, 5)), (4.0, 3.0)));
    }

    #[test]
    fn test_draw_within_ranges() {
        let cfg = AugmentConfig::for_rows(64);
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        for _ in 0..200 {
            let p = AffineParams::draw(&cfg, (64, 48), &mut rng);
            assert!(p.rotation_deg.abs() <= 10.0);
            assert!(p.shift.0.abs() <= 6.4 && p.shift.1.abs() <= 4.8);
            assert!((1.0..=1.2).contains(&p.zoom.0) && (1.0..=1.2).contains(&p.zoom.1));
        }
        let id = AffineParams::draw(&AugmentConfig::identity(), (8, 8), &mut rng);
        assert!(id.is_identity());
    }
}
