//! 运行时错误.

use thiserror::Error;

/// 本 crate 所有可失败操作的返回类型.
pub type SegResult<T> = Result<T, SegError>;

/// 运行时错误.
///
/// 前四类对应数据契约被违反的情形, 出现时不应重试: 它们说明上游数据或配置有误.
/// 其余变体包装外围 I/O 辅助功能的底层错误.
#[derive(Debug, Error)]
pub enum SegError {
    /// 构造时发现的非法配置, 如 `batch_size == 0`.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// 批次索引越界.
    #[error("batch index {index} out of range 0..{len}")]
    IndexOutOfRange {
        /// 请求的索引.
        index: usize,
        /// 合法索引上界 (不含).
        len: usize,
    },

    /// 扫描与标签 (或输入与期望) 形状不一致.
    #[error("shape mismatch: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        /// 期望的形状.
        expected: Vec<usize>,
        /// 实际的形状.
        actual: Vec<usize>,
    },

    /// 数值退化, 如标准差为 0.
    #[error("numerical error: {0}")]
    Numerical(String),

    /// 读取 nifti 文件错误.
    #[error(transparent)]
    Nifti(#[from] nifti::NiftiError),

    /// 读取 npz 归档错误.
    #[error(transparent)]
    ReadNpz(#[from] ndarray_npy::ReadNpzError),

    /// 写入 npz 归档错误.
    #[error(transparent)]
    WriteNpz(#[from] ndarray_npy::WriteNpzError),

    /// 保存图像错误.
    #[error(transparent)]
    Image(#[from] image::ImageError),

    /// 其他底层 I/O 错误.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl SegError {
    /// 构造形状不一致错误.
    pub(crate) fn shape(expected: &[usize], actual: &[usize]) -> Self {
        Self::ShapeMismatch {
            expected: expected.to_vec(),
            actual: actual.to_vec(),
        }
    }

    /// 构造配置错误.
    pub(crate) fn config(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// 是否属于数据契约错误 (不应重试)?
    pub fn is_contract_violation(&self) -> bool {
        matches!(
            self,
            Self::Configuration(_)
                | Self::IndexOutOfRange { .. }
                | Self::ShapeMismatch { .. }
                | Self::Numerical(_)
        )
    }
}
