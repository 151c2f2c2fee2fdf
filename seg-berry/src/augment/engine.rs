//! 变换引擎: 坐标网格, 坐标映射与重采样.

use super::{AffineParams, DisplacementField};
use crate::consts::{LABEL_FILL, SCAN_FILL};
use crate::{Idx2d, Idx2dF, SegError, SegResult};
use ndarray::{Array2, ArrayView2};
use rand::Rng;

/// 预先计算好的坐标网格 (`indexing = "ij"`), 每种切片形状只需计算一次.
#[derive(Clone, Debug)]
pub struct Mesh {
    rows: Array2<f64>,
    cols: Array2<f64>,
}

impl Mesh {
    /// 为形状 `(rows, cols)` 构建网格.
    pub fn new(shape: Idx2d) -> Self {
        Self {
            rows: Array2::from_shape_fn(shape, |(r, _)| r as f64),
            cols: Array2::from_shape_fn(shape, |(_, c)| c as f64),
        }
    }

    /// 网格形状.
    #[inline]
    pub fn shape(&self) -> Idx2d {
        self.rows.dim()
    }

    /// 网格点 `pos` 的坐标.
    #[inline]
    pub fn at(&self, pos: Idx2d) -> Idx2dF {
        (self.rows[pos], self.cols[pos])
    }
}

/// 坐标是否落在 `[0, len - 1]` 内?
#[inline]
fn within(v: f64, len: usize) -> bool {
    v >= 0.0 && v <= (len - 1) as f64
}

/// 输出切片每个像素对应的输入坐标. `None` 代表越界, 应当填充常数.
///
/// 扫描和标签共用同一个 `CoordMap`, 越界判定因此完全一致.
#[derive(Clone, Debug)]
pub struct CoordMap {
    src: Array2<Option<Idx2dF>>,
}

impl CoordMap {
    /// 恒等映射.
    pub fn identity(mesh: &Mesh) -> Self {
        Self {
            src: Array2::from_shape_fn(mesh.shape(), |pos| Some(mesh.at(pos))),
        }
    }

    /// 映射形状.
    #[inline]
    pub fn shape(&self) -> Idx2d {
        self.src.dim()
    }

    /// 输出像素 `pos` 对应的输入坐标.
    #[inline]
    pub fn get(&self, pos: Idx2d) -> Option<Idx2dF> {
        self.src[pos]
    }

    /// 落在输入范围内的像素个数.
    pub fn valid_count(&self) -> usize {
        self.src.iter().filter(|p| p.is_some()).count()
    }

    fn check<T>(&self, input: &ArrayView2<'_, T>) -> SegResult<()> {
        let (h, w) = self.shape();
        match input.dim() {
            (ih, iw) if (ih, iw) == (h, w) => Ok(()),
            (ih, iw) => Err(SegError::shape(&[h, w], &[ih, iw])),
        }
    }

    /// 以双线性插值重采样扫描, 越界处填充 [`SCAN_FILL`].
    pub fn apply_scan(&self, image: ArrayView2<'_, f32>) -> SegResult<Array2<f32>> {
        self.check(&image)?;
        let (h, w) = image.dim();
        Ok(self.src.map(|src| match *src {
            None => SCAN_FILL,
            Some((r, c)) => {
                let (r0, c0) = (r.floor() as usize, c.floor() as usize);
                let (fr, fc) = (r - r0 as f64, c - c0 as f64);
                if fr == 0.0 && fc == 0.0 {
                    return image[(r0, c0)];
                }
                let (r1, c1) = ((r0 + 1).min(h - 1), (c0 + 1).min(w - 1));
                let v = (1.0 - fr) * (1.0 - fc) * image[(r0, c0)] as f64
                    + (1.0 - fr) * fc * image[(r0, c1)] as f64
                    + fr * (1.0 - fc) * image[(r1, c0)] as f64
                    + fr * fc * image[(r1, c1)] as f64;
                v as f32
            }
        }))
    }

    /// 以最近邻重采样标签, 越界处填充 [`LABEL_FILL`]. 不会产生新的标签值.
    pub fn apply_label(&self, mask: ArrayView2<'_, u8>) -> SegResult<Array2<u8>> {
        self.check(&mask)?;
        Ok(self.src.map(|src| match *src {
            None => LABEL_FILL,
            Some((r, c)) => mask[(r.round() as usize, c.round() as usize)],
        }))
    }
}

/// 变换引擎. 持有某一切片形状的坐标网格.
#[derive(Clone, Debug)]
pub struct TransformEngine {
    mesh: Mesh,
}

impl TransformEngine {
    /// 为形状 `shape` 构建引擎. 形状含 0 时返回配置错误.
    pub fn new(shape: Idx2d) -> SegResult<Self> {
        if shape.0 == 0 || shape.1 == 0 {
            return Err(SegError::config(format!("empty slice shape {shape:?}")));
        }
        Ok(Self {
            mesh: Mesh::new(shape),
        })
    }

    /// 坐标网格.
    #[inline]
    pub fn mesh(&self) -> &Mesh {
        &self.mesh
    }

    /// 切片形状.
    #[inline]
    pub fn shape(&self) -> Idx2d {
        self.mesh.shape()
    }

    /// 由仿射参数和 (可选的) 位移场构建坐标映射.
    ///
    /// 输出像素 `p` 先按位移场偏移到 `q = p + d(p)`, 再经仿射逆映射得到输入坐标.
    /// `q` 或最终坐标任一越界, 该像素即视为越界.
    pub fn coord_map(&self, affine: &AffineParams, field: Option<&DisplacementField>) -> CoordMap {
        let shape @ (rows, cols) = self.shape();
        if let Some(f) = field {
            debug_assert_eq!(f.shape(), shape);
        }
        let src = Array2::from_shape_fn(shape, |pos| {
            let (mut r, mut c) = self.mesh.at(pos);
            if let Some(f) = field {
                let (dy, dx) = f.at(pos);
                r += dy;
                c += dx;
                if !(within(r, rows) && within(c, cols)) {
                    return None;
                }
            }
            let (sr, sc) = affine.source((r, c), shape);
            (within(sr, rows) && within(sc, cols)).then_some((sr, sc))
        });
        CoordMap { src }
    }

    /// 仅做弹性形变的扫描变换. 位移场从 `rng` 抽取.
    pub fn elastic_scan<R: Rng + ?Sized>(
        &self,
        image: ArrayView2<'_, f32>,
        alpha: f64,
        sigma: f64,
        rng: &mut R,
    ) -> SegResult<Array2<f32>> {
        let field = DisplacementField::draw(self.shape(), alpha, sigma, rng);
        self.coord_map(&AffineParams::identity(), Some(&field))
            .apply_scan(image)
    }

    /// 仅做弹性形变的标签变换. 位移场从 `rng` 抽取.
    ///
    /// 对同一种子, 与 [`Self::elastic_scan`] 抽取到相同的位移场.
    pub fn elastic_label<R: Rng + ?Sized>(
        &self,
        mask: ArrayView2<'_, u8>,
        alpha: f64,
        sigma: f64,
        rng: &mut R,
    ) -> SegResult<Array2<u8>> {
        let field = DisplacementField::draw(self.shape(), alpha, sigma, rng);
        self.coord_map(&AffineParams::identity(), Some(&field))
            .apply_label(mask)
    }
}

#[cfg(test)]
mod tests {
    use super::{CoordMap, TransformEngine};
    use crate::augment::{AffineParams, DisplacementField};
    use crate::SegError;
    use ndarray::{array, Array2};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_identity_map_is_exact() {
        let e = TransformEngine::new((4, 5)).unwrap();
        let img = Array2::from_shape_fn((4, 5), |(h, w)| (h as f32 * 0.3) - w as f32);
        let mask = Array2::from_shape_fn((4, 5), |(h, w)| ((h + w) % 3) as u8);
        let map = CoordMap::identity(e.mesh());
        assert_eq!(map.apply_scan(img.view()).unwrap(), img);
        assert_eq!(map.apply_label(mask.view()).unwrap(), mask);

        let same = e.coord_map(&AffineParams::identity(), Some(&DisplacementField::zeros((4, 5))));
        assert_eq!(same.apply_scan(img.view()).unwrap(), img);
        assert_eq!(same.valid_count(), 20);
    }

    #[test]
    fn test_empty_shape() {
        assert!(TransformEngine::new((0, 3)).is_err());
    }

    #[test]
    fn test_shape_checked() {
        let e = TransformEngine::new((4, 4)).unwrap();
        let map = CoordMap::identity(e.mesh());
        let err = map.apply_label(Array2::<u8>::zeros((4, 3)).view()).unwrap_err();
        assert!(matches!(err, SegError::ShapeMismatch { .. }));
    }

    #[test]
    fn test_bilinear_midpoint() {
        let e = TransformEngine::new((1, 2)).unwrap();
        let mut p = AffineParams::identity();
        p.shift = (0.0, 0.5);
        // 第 0 列映射到 0.5, 第 1 列映射到 1.5 越界.
        let map = e.coord_map(&p, None);
        let out = map.apply_scan(array![[2.0f32, 4.0]].view()).unwrap();
        assert_eq!(out, array![[3.0f32, 0.0]]);
        let out = map.apply_label(array![[1u8, 2]].view()).unwrap();
        // 0.5 四舍五入到 1.
        assert_eq!(out, array![[2u8, 0]]);
    }

    /// 扫描与标签的越界填充位置完全一致.
    #[test]
    fn test_fill_positions_agree() {
        let e = TransformEngine::new((32, 32)).unwrap();
        let mut p = AffineParams::identity();
        p.rotation_deg = 30.0;
        p.shift = (5.0, -3.0);
        p.zoom = (1.2, 1.1);
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let field = DisplacementField::draw((32, 32), 20.0, 2.0, &mut rng);
        let map = e.coord_map(&p, Some(&field));

        let ones_img = Array2::<f32>::ones((32, 32));
        let ones_mask = Array2::<u8>::ones((32, 32));
        let img = map.apply_scan(ones_img.view()).unwrap();
        let mask = map.apply_label(ones_mask.view()).unwrap();
        assert!(map.valid_count() < 32 * 32);
        for (a, b) in img.iter().zip(mask.iter()) {
            assert_eq!(*a == 0.0, *b == 0);
        }
    }

    #[test]
    fn test_elastic_same_seed_same_field() {
        let e = TransformEngine::new((16, 16)).unwrap();
        let img = Array2::from_shape_fn((16, 16), |(h, w)| if h > 4 && w > 4 { 1.0f32 } else { 0.0 });
        let mask = img.mapv(|v| v as u8);
        let mut r1 = ChaCha8Rng::seed_from_u64(9);
        let mut r2 = ChaCha8Rng::seed_from_u64(9);
        let a = e.elastic_scan(img.view(), 4.0, 1.5, &mut r1).unwrap();
        let b = e.elastic_label(mask.view(), 4.0, 1.5, &mut r2).unwrap();
        assert_eq!(a.dim(), (16, 16));
        // 同一位移场: 扫描完全为 1 的像素在标签中也必为 1.
        for (x, y) in a.iter().zip(b.iter()) {
            if *x == 1.0 {
                assert_eq!(*y, 1);
            }
        }
    }
}
