//! 扫描/标签二维切片视图.

use crate::consts::gray::*;
use crate::Idx2d;
use ndarray::iter::Iter;
use ndarray::{ArrayView2, Ix2};
use std::collections::BTreeSet;
use std::ops::Index;

/// 不可变、借用的二维 MR 扫描切片.
#[derive(Clone, Copy)]
pub struct ScanSlice<'a> {
    /// 底层数据的轻量级视图, 借用于 [`crate::Case`] 或批次.
    data: ArrayView2<'a, f32>,
}

/// 不可变、借用的二维标签切片.
#[derive(Clone, Copy)]
pub struct LabelSlice<'a> {
    /// 底层数据的轻量级视图, 借用于 [`crate::Case`] 或批次.
    data: ArrayView2<'a, u8>,
}

/// 两类切片共用的不可变方法.
macro_rules! impl_slice_common {
    ($life: lifetime, $slice: ty, $elem: ty) => {
        impl<$life> $slice {
            /// 直接包装一个二维视图.
            #[inline]
            pub fn new(data: ArrayView2<$life, $elem>) -> Self {
                Self { data }
            }

            /// 获得 **底层** 数据的一份不可变 shallow copy.
            #[inline]
            pub fn array_view(&self) -> ArrayView2<$life, $elem> {
                self.data
            }

            /// 获取可以迭代图像像素的迭代器.
            #[inline]
            pub fn iter(&self) -> Iter<'_, $elem, Ix2> {
                self.data.iter()
            }

            /// 以行优先规则, 获取能迭代图像所有 `(索引, 像素值)` 的迭代器.
            #[inline]
            pub fn indexed_iter(&self) -> impl Iterator<Item = (Idx2d, &$elem)> {
                self.data.indexed_iter()
            }

            /// 获取给定位置 (高, 宽) 的像素值. 越界时返回 `None`.
            #[inline]
            pub fn get(&self, pos: Idx2d) -> Option<&$elem> {
                self.data.get(pos)
            }

            /// 图像的分辨率 (高, 宽).
            #[inline]
            pub fn shape(&self) -> Idx2d {
                self.data.dim()
            }

            /// 图像的像素个数.
            #[inline]
            pub fn size(&self) -> usize {
                self.data.len()
            }
        }

        impl<$life> Index<Idx2d> for $slice {
            type Output = $elem;

            #[inline]
            fn index(&self, index: Idx2d) -> &Self::Output {
                &self.data[index]
            }
        }
    };
}

impl_slice_common!('a, ScanSlice<'a>, f32);
impl_slice_common!('a, LabelSlice<'a>, u8);

impl ScanSlice<'_> {
    /// 获取切片强度的 `(最小值, 最大值)`. 忽略非有限值; 若不存在有限值则返回 `None`.
    pub fn min_max(&self) -> Option<(f32, f32)> {
        self.data
            .iter()
            .copied()
            .filter(|v| v.is_finite())
            .fold(None, |acc, v| match acc {
                None => Some((v, v)),
                Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
            })
    }
}

impl LabelSlice<'_> {
    /// 该图是否为全背景图?
    #[inline]
    pub fn is_background(&self) -> bool {
        self.data.iter().copied().all(is_background)
    }

    /// 该图是否含有前景像素?
    #[inline]
    pub fn has_foreground(&self) -> bool {
        !self.is_background()
    }

    /// 统计图像中值为 `label` 的像素总个数.
    #[inline]
    pub fn count(&self, label: u8) -> usize {
        self.data.iter().filter(|&p| *p == label).count()
    }

    /// 图像中出现过的所有标签值, 升序.
    pub fn labels(&self) -> BTreeSet<u8> {
        self.data.iter().copied().collect()
    }
}
