//! 切片的可视化持久化存储.

use super::{LabelSlice, ScanSlice};
use image::{GrayImage, ImageResult, Luma};
use std::path::Path;

/// 表明一个可以通过 **可视化友好** 模式持久化存储的图像对象.
///
/// 对于 [`LabelSlice`], 背景保存为黑色, 前景标签保存为白色 (多类别时依次变暗);
/// 对于 [`ScanSlice`], 归一化后的强度会按切片自身的最小/最大值线性拉伸到 `0..=255`.
pub trait ImgWriteVis {
    /// 按照一定的可视化规则将图片保存到 `path` 路径.
    fn save<P: AsRef<Path>>(&self, path: P) -> ImageResult<()>;
}

/// 使标签像素更有利于单通道可视化.
#[inline]
pub(crate) fn pretty(label: u8) -> u8 {
    use crate::consts::gray::*;
    match label {
        BACKGROUND => BLACK,
        FOREGROUND => WHITE,
        // 其他前景类别落在灰色与白色之间.
        other => GRAY.saturating_add(other.saturating_mul(16)),
    }
}

impl ImgWriteVis for LabelSlice<'_> {
    fn save<P: AsRef<Path>>(&self, path: P) -> ImageResult<()> {
        let (height, width) = self.shape();
        let mut buf = GrayImage::new(width as u32, height as u32);
        for ((h, w), &pix) in self.indexed_iter() {
            buf.put_pixel(w as u32, h as u32, Luma([pretty(pix)]));
        }
        buf.save(path)
    }
}

impl ImgWriteVis for ScanSlice<'_> {
    fn save<P: AsRef<Path>>(&self, path: P) -> ImageResult<()> {
        let (height, width) = self.shape();
        let mut buf = GrayImage::new(width as u32, height as u32);
        let (lo, hi) = self.min_max().unwrap_or((0.0, 0.0));
        let range = hi - lo;
        for ((h, w), &v) in self.indexed_iter() {
            let gray = if range > 0.0 && v.is_finite() {
                // 255, not 256.
                (((v - lo) / range) * 255.0) as u8
            } else {
                0
            };
            buf.put_pixel(w as u32, h as u32, Luma([gray]));
        }
        buf.save(path)
    }
}
