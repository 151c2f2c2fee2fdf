//! 消融实验依赖的通用组件.

use ndarray::Array3;
use seg_berry::Idx2d;

pub mod loader;

const SEP: &str = "--------------------------------------------------------";

/// 简单分隔线.
#[inline]
pub fn sep() {
    println!("{SEP}");
}

/// 获得可并行核心数.
pub fn cpus() -> usize {
    std::thread::available_parallelism().map_or_else(|_| num_cpus::get(), usize::from)
}

/// 生成 `n` 张合成切片: 强度随位置缓变的背景上, 一个大小随切片变化的椭圆前景.
///
/// 约三分之一的切片不含前景, 模拟真实体数据的首尾切片.
pub fn phantom_pool(n: usize, (h, w): Idx2d) -> (Array3<f32>, Array3<u8>) {
    let masks = Array3::from_shape_fn((n, h, w), |(z, r, c)| {
        if z % 3 == 0 {
            return 0;
        }
        let (ry, rx) = (h as f64 * (0.1 + 0.02 * (z % 5) as f64), w as f64 * 0.15);
        let dy = (r as f64 - h as f64 / 2.0) / ry;
        let dx = (c as f64 - w as f64 / 2.0) / rx;
        u8::from(dy * dy + dx * dx < 1.0)
    });
    let images = Array3::from_shape_fn((n, h, w), |(z, r, c)| {
        let base = (r as f32 / h as f32 + c as f32 / w as f32) * 0.3;
        base + masks[(z, r, c)] as f32 + ((r * 13 + c * 7 + z) % 11) as f32 * 0.02
    });
    (images, masks)
}
