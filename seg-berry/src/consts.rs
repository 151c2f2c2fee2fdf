//! 通用常量.

/// 单通道标签值与可视化颜色.
pub mod gray {
    /// 标签中背景的像素值. 增强时越界区域也填充为该值.
    pub const BACKGROUND: u8 = 0;

    /// 标签中前景 (前列腺) 的像素值.
    pub const FOREGROUND: u8 = 1;

    /// 单通道黑色.
    pub const BLACK: u8 = 0b_0000_0000;

    /// 单通道灰色.
    pub const GRAY: u8 = 0b_1000_0000;

    /// 单通道白色.
    pub const WHITE: u8 = 0b_1111_1111;

    /// 像素是否是背景?
    #[inline]
    pub const fn is_background(p: u8) -> bool {
        matches!(p, BACKGROUND)
    }

    /// 像素是否是前景 (任意非背景标签)?
    #[inline]
    pub const fn is_foreground(p: u8) -> bool {
        !is_background(p)
    }
}

/// PROMISE12 训练集病例个数. 病例编号为 `0..PROMISE_TRAINING_SET_LEN`.
pub const PROMISE_TRAINING_SET_LEN: u32 = 50;

/// 默认的验证集病例编号. 其余训练集病例全部用于训练.
pub const DEFAULT_VALIDATION_CASES: [u32; 5] = [5, 15, 25, 35, 45];

/// 网络输入切片的默认边长.
pub const DEFAULT_SLICE_LEN: usize = 256;

/// 扫描越界区域的填充值. 归一化后的 0.0 即训练集均值.
pub const SCAN_FILL: f32 = 0.0;

/// 标签越界区域的填充值.
pub const LABEL_FILL: u8 = gray::BACKGROUND;

/// 预测概率二值化阈值.
pub const PRED_THRESHOLD: f32 = 0.5;

/// 增强参数默认值. 与训练脚本中使用的 Keras `ImageDataGenerator` 参数一致.
pub mod augment {
    /// 最大旋转角度 (度). 实际角度在 `[-10, 10]` 中均匀抽取.
    pub const ROTATION_RANGE: f64 = 10.0;

    /// 垂直方向最大平移, 相对于图像高度.
    pub const HEIGHT_SHIFT_RANGE: f64 = 0.1;

    /// 水平方向最大平移, 相对于图像宽度.
    pub const WIDTH_SHIFT_RANGE: f64 = 0.1;

    /// 缩放因子区间.
    pub const ZOOM_RANGE: [f64; 2] = [1.0, 1.2];

    /// 弹性形变幅度相对于图像高度的倍率: `alpha = rows * 1.5`.
    pub const ALPHA_PER_ROW: f64 = 1.5;

    /// 弹性形变平滑尺度相对于图像高度的倍率: `sigma = rows * 0.07`.
    pub const SIGMA_PER_ROW: f64 = 0.07;
}

/// 曲率流平滑的默认时间步长.
pub const CURVATURE_TIME_STEP: f64 = 0.125;

/// 曲率流平滑的默认迭代次数.
pub const CURVATURE_ITERATIONS: u32 = 5;
