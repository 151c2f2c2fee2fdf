use super::{AffineParams, AugmentConfig, CoordMap, DisplacementField, TransformEngine};
use crate::{Idx2d, SegError, SegResult};
use ndarray::{Array2, ArrayView2};
use rand::Rng;

/// 一个样本的增强参数. 抽取一次, 同时作用于扫描与标签, 用完即弃.
#[derive(Clone, Debug, PartialEq)]
pub struct AugmentParams {
    /// 仿射与翻转.
    pub affine: AffineParams,

    /// 弹性位移场, 关闭弹性形变时为 `None`.
    pub field: Option<DisplacementField>,
}

impl AugmentParams {
    /// 从 `rng` 抽取. 先抽仿射参数, 再抽位移场.
    pub fn draw<R: Rng + ?Sized>(config: &AugmentConfig, shape: Idx2d, rng: &mut R) -> Self {
        let affine = AffineParams::draw(config, shape, rng);
        let field = config
            .elastic
            .map(|e| DisplacementField::draw(shape, e.alpha, e.sigma, rng));
        Self { affine, field }
    }
}

/// 成对增强器. 构造后只读, 可以在线程间共享.
#[derive(Clone, Debug)]
pub struct PairedAugmenter {
    config: AugmentConfig,
    engine: TransformEngine,
}

impl PairedAugmenter {
    /// 为形状 `shape` 的切片构建增强器. 配置非法时返回 [`SegError::Configuration`].
    pub fn new(config: AugmentConfig, shape: Idx2d) -> SegResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            engine: TransformEngine::new(shape)?,
        })
    }

    /// 增强配置.
    #[inline]
    pub fn config(&self) -> &AugmentConfig {
        &self.config
    }

    /// 切片形状.
    #[inline]
    pub fn shape(&self) -> Idx2d {
        self.engine.shape()
    }

    /// 抽取一组参数.
    pub fn draw_params<R: Rng + ?Sized>(&self, rng: &mut R) -> AugmentParams {
        AugmentParams::draw(&self.config, self.shape(), rng)
    }

    /// 由参数构建坐标映射.
    pub fn coord_map(&self, params: &AugmentParams) -> CoordMap {
        self.engine.coord_map(&params.affine, params.field.as_ref())
    }

    /// 用给定参数变换一对切片.
    pub fn apply(
        &self,
        params: &AugmentParams,
        image: ArrayView2<'_, f32>,
        mask: ArrayView2<'_, u8>,
    ) -> SegResult<(Array2<f32>, Array2<u8>)> {
        self.check(&image, &mask)?;
        let map = self.coord_map(params);
        Ok((map.apply_scan(image)?, map.apply_label(mask)?))
    }

    /// 增强一对切片.
    ///
    /// 输出标签的取值属于输入标签的取值加上 [`LABEL_FILL`](crate::consts::LABEL_FILL):
    /// 即使输入全为前景, 越界区域也填充背景.
    ///
    /// 形状检查先于随机数抽取: 出错时不消耗 `rng`.
    pub fn augment<R: Rng + ?Sized>(
        &self,
        image: ArrayView2<'_, f32>,
        mask: ArrayView2<'_, u8>,
        rng: &mut R,
    ) -> SegResult<(Array2<f32>, Array2<u8>)> {
        self.check(&image, &mask)?;
        let params = self.draw_params(rng);
        self.apply(&params, image, mask)
    }

    fn check(&self, image: &ArrayView2<'_, f32>, mask: &ArrayView2<'_, u8>) -> SegResult<()> {
        if image.dim() != mask.dim() {
            return Err(SegError::shape(image.shape(), mask.shape()));
        }
        let (h, w) = self.shape();
        if image.dim() != (h, w) {
            return Err(SegError::shape(&[h, w], image.shape()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::PairedAugmenter;
    use crate::augment::AugmentConfig;
    use crate::SegError;
    use ndarray::Array2;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use std::collections::BTreeSet;

    fn phantom(shape: (usize, usize)) -> (Array2<f32>, Array2<u8>) {
        let (h, w) = shape;
        let mask = Array2::from_shape_fn(shape, |(r, c)| {
            let dr = r as f64 - h as f64 / 2.0;
            let dc = c as f64 - w as f64 / 2.0;
            match dr * dr + dc * dc {
                d if d < 25.0 => 2,
                d if d < 100.0 => 1,
                _ => 0,
            }
        });
        let image = Array2::from_shape_fn(shape, |(r, c)| (r * w + c) as f32 / 10.0);
        (image, mask)
    }

    fn labels(a: &Array2<u8>) -> BTreeSet<u8> {
        a.iter().copied().collect()
    }

    #[test]
    fn test_shape_and_labels_preserved() {
        let shape = (40, 36);
        let aug = PairedAugmenter::new(AugmentConfig::for_rows(40), shape).unwrap();
        let (image, mask) = phantom(shape);
        let allowed = labels(&mask);
        let mut rng = ChaCha8Rng::seed_from_u64(2024);
        for _ in 0..10 {
            let (i2, m2) = aug.augment(image.view(), mask.view(), &mut rng).unwrap();
            assert_eq!(i2.dim(), shape);
            assert_eq!(m2.dim(), shape);
            assert!(labels(&m2).is_subset(&allowed));
        }
    }

    #[test]
    fn test_full_foreground_gains_only_background() {
        let shape = (32, 32);
        let aug = PairedAugmenter::new(AugmentConfig::for_rows(32), shape).unwrap();
        let image = Array2::<f32>::ones(shape);
        let mask = Array2::<u8>::ones(shape);
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let mut seen = BTreeSet::new();
        for _ in 0..10 {
            let (_, m2) = aug.augment(image.view(), mask.view(), &mut rng).unwrap();
            seen.extend(labels(&m2));
        }
        assert!(seen.is_subset(&BTreeSet::from([0, 1])));
        assert!(seen.contains(&0));
    }

    #[test]
    fn test_deterministic() {
        let shape = (24, 24);
        let aug = PairedAugmenter::new(AugmentConfig::for_rows(24), shape).unwrap();
        let (image, mask) = phantom(shape);
        let a = aug
            .augment(image.view(), mask.view(), &mut ChaCha8Rng::seed_from_u64(7))
            .unwrap();
        let b = aug
            .augment(image.view(), mask.view(), &mut ChaCha8Rng::seed_from_u64(7))
            .unwrap();
        assert_eq!(a, b);

        let c = aug
            .augment(image.view(), mask.view(), &mut ChaCha8Rng::seed_from_u64(8))
            .unwrap();
        assert_ne!(a.0, c.0);
    }

    #[test]
    fn test_identity_config_is_pass_through() {
        let shape = (12, 10);
        let aug = PairedAugmenter::new(AugmentConfig::identity(), shape).unwrap();
        let (image, mask) = phantom(shape);
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let (i2, m2) = aug.augment(image.view(), mask.view(), &mut rng).unwrap();
        assert_eq!(i2, image);
        assert_eq!(m2, mask);
    }

    #[test]
    fn test_flip_only() {
        let shape = (6, 6);
        let mut cfg = AugmentConfig::identity();
        cfg.horizontal_flip = true;
        let aug = PairedAugmenter::new(cfg, shape).unwrap();
        let (image, mask) = phantom(shape);
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        for _ in 0..8 {
            let params = aug.draw_params(&mut rng);
            let (i2, m2) = aug.apply(&params, image.view(), mask.view()).unwrap();
            if params.affine.flip_h {
                assert_eq!(i2[(2, 0)], image[(2, 5)]);
                assert_eq!(m2[(3, 1)], mask[(3, 4)]);
            } else {
                assert_eq!(i2, image);
            }
        }
    }

    #[test]
    fn test_mismatch_is_error() {
        let aug = PairedAugmenter::new(AugmentConfig::for_rows(8), (8, 8)).unwrap();
        let image = Array2::<f32>::zeros((8, 8));
        let mut rng = ChaCha8Rng::seed_from_u64(0);

        let err = aug
            .augment(image.view(), Array2::<u8>::zeros((8, 7)).view(), &mut rng)
            .unwrap_err();
        assert!(matches!(err, SegError::ShapeMismatch { .. }));

        let err = aug
            .augment(
                Array2::<f32>::zeros((9, 9)).view(),
                Array2::<u8>::zeros((9, 9)).view(),
                &mut rng,
            )
            .unwrap_err();
        assert!(err.is_contract_violation());
    }

    #[test]
    fn test_invalid_config() {
        let mut cfg = AugmentConfig::identity();
        cfg.zoom_range = [-1.0, 1.0];
        assert!(PairedAugmenter::new(cfg, (4, 4)).is_err());
    }
}
