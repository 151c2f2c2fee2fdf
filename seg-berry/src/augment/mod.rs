//! 成对 (扫描, 标签) 数据增强.
//!
//! 一次增强抽取一组 [`AugmentParams`] (旋转, 平移, 缩放, 翻转, 弹性位移场),
//! 由其生成 **一张** 坐标映射 [`CoordMap`], 再用同一张映射分别重采样扫描
//! (双线性) 与标签 (最近邻). 因此:
//!
//! 1. 扫描与标签的空间对应关系永远不被破坏, 包括越界填充的位置;
//! 2. 标签中不会出现插值产生的新类别;
//! 3. 用同一个种子重放, 输出逐位相同.
//!
//! 变换顺序与训练脚本中的 Keras 流程一致: 先仿射 + 翻转, 再弹性形变.

mod affine;
mod engine;
mod field;
mod paired;

pub use affine::AffineParams;
pub use engine::{CoordMap, Mesh, TransformEngine};
pub use field::{gaussian_kernel, DisplacementField};
pub use paired::{AugmentParams, PairedAugmenter};

use crate::consts::augment::*;
use crate::{SegError, SegResult};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// 弹性形变参数.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ElasticConfig {
    /// 位移幅度 (像素).
    pub alpha: f64,

    /// 高斯平滑尺度 (像素).
    pub sigma: f64,
}

impl ElasticConfig {
    /// 训练脚本使用的默认值: `alpha = rows * 1.5`, `sigma = rows * 0.07`.
    #[inline]
    pub fn for_rows(rows: usize) -> Self {
        Self {
            alpha: rows as f64 * ALPHA_PER_ROW,
            sigma: rows as f64 * SIGMA_PER_ROW,
        }
    }
}

/// 增强配置.
///
/// 字段公开, 但任何使用方 ([`PairedAugmenter::new`]) 都会先调用
/// [`AugmentConfig::validate`].
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct AugmentConfig {
    /// 最大旋转角度 (度), 实际角度在 `[-rotation_range, rotation_range]` 中抽取.
    pub rotation_range: f64,

    /// 垂直方向最大平移, 相对于图像高度.
    pub height_shift_range: f64,

    /// 水平方向最大平移, 相对于图像宽度.
    pub width_shift_range: f64,

    /// 缩放因子区间 `[lo, hi]`, 两个轴独立抽取.
    pub zoom_range: [f64; 2],

    /// 是否以 0.5 概率左右翻转.
    pub horizontal_flip: bool,

    /// 是否以 0.5 概率上下翻转.
    pub vertical_flip: bool,

    /// 弹性形变. `None` 表示关闭.
    pub elastic: Option<ElasticConfig>,
}

impl AugmentConfig {
    /// 训练脚本使用的完整增强配置, 弹性参数按切片高度 `rows` 推算.
    pub fn for_rows(rows: usize) -> Self {
        Self {
            rotation_range: ROTATION_RANGE,
            height_shift_range: HEIGHT_SHIFT_RANGE,
            width_shift_range: WIDTH_SHIFT_RANGE,
            zoom_range: ZOOM_RANGE,
            horizontal_flip: true,
            vertical_flip: true,
            elastic: Some(ElasticConfig::for_rows(rows)),
        }
    }

    /// 不做任何变换的配置. 输出与输入逐位相同.
    pub const fn identity() -> Self {
        Self {
            rotation_range: 0.0,
            height_shift_range: 0.0,
            width_shift_range: 0.0,
            zoom_range: [1.0, 1.0],
            horizontal_flip: false,
            vertical_flip: false,
            elastic: None,
        }
    }

    /// 检查配置是否合法.
    pub fn validate(&self) -> SegResult<()> {
        let non_negative = |name: &str, v: f64| {
            if v.is_finite() && v >= 0.0 {
                Ok(())
            } else {
                Err(SegError::config(format!("{name} must be finite and >= 0, got {v}")))
            }
        };
        non_negative("rotation_range", self.rotation_range)?;
        non_negative("height_shift_range", self.height_shift_range)?;
        non_negative("width_shift_range", self.width_shift_range)?;

        let [lo, hi] = self.zoom_range;
        if !(lo.is_finite() && hi.is_finite() && lo > 0.0 && lo <= hi) {
            return Err(SegError::config(format!(
                "zoom_range must satisfy 0 < lo <= hi, got {:?}",
                self.zoom_range
            )));
        }

        if let Some(ElasticConfig { alpha, sigma }) = self.elastic {
            non_negative("elastic alpha", alpha)?;
            if !(sigma.is_finite() && sigma > 0.0) {
                return Err(SegError::config(format!(
                    "elastic sigma must be finite and > 0, got {sigma}"
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{AugmentConfig, ElasticConfig};

    #[test]
    fn test_default_for_rows() {
        let c = AugmentConfig::for_rows(256);
        let e = c.elastic.unwrap();
        assert!((e.alpha - 384.0).abs() < 1e-9);
        assert!((e.sigma - 17.92).abs() < 1e-9);
        assert!(c.validate().is_ok());
        assert!(AugmentConfig::identity().validate().is_ok());
    }

    #[test]
    fn test_invalid_configs() {
        let mut c = AugmentConfig::identity();
        c.rotation_range = -1.0;
        assert!(c.validate().is_err());

        let mut c = AugmentConfig::identity();
        c.zoom_range = [1.2, 1.0];
        assert!(c.validate().is_err());

        let mut c = AugmentConfig::identity();
        c.zoom_range = [0.0, 1.0];
        assert!(c.validate().is_err());

        let mut c = AugmentConfig::identity();
        c.elastic = Some(ElasticConfig {
            alpha: 10.0,
            sigma: 0.0,
        });
        assert!(c.validate().is_err());
    }
}
