use std::path::Path;

use ndarray::{Array3, ArrayView3, Axis, Ix3};
use nifti::{IntoNdArray, NiftiHeader, NiftiObject, ReaderOptions};

use crate::consts::gray::is_foreground;
use crate::{Idx2d, Idx3d, SegError, SegResult};

pub mod resize;
mod save;
mod slice;

pub use save::ImgWriteVis;
pub use slice::{LabelSlice, ScanSlice};

/// 单个病例: 一个 MR 扫描体, 一个同形状的标签体, 以及体素物理尺寸.
///
/// 病例在数据加载阶段构造一次, 之后不可变. 所有字段私有, 只提供借用访问.
#[derive(Debug, Clone)]
pub struct Case {
    id: u32,
    image: Array3<f32>,
    mask: Array3<u8>,
    spacing: [f64; 3],
}

/// 从 header 获取体素尺寸, 并将 (W, H, z) 转换成 (z, H, W).
#[inline]
fn spacing_from_header(header: &NiftiHeader) -> [f64; 3] {
    let [_, w, h, z, ..] = header.pixdim;
    [z as f64, h as f64, w as f64]
}

/// 将 nifti 原生的 `[W, H, z]` 动态维数组转换为 `(z, H, W)` 的标准布局三维数组.
macro_rules! read_volume {
    ($path: expr, $elem: ty) => {{
        let obj = ReaderOptions::new().read_file($path)?;
        let spacing = spacing_from_header(obj.header());
        let data = obj.into_volume().into_ndarray::<$elem>()?;
        let dims = data.shape().to_vec();
        let data = data
            .into_dimensionality::<Ix3>()
            .map_err(|_| SegError::shape(&[0, 0, 0], &dims))?;

        // hint: 原第一维向下增长, 原第二维向右增长.
        let data = data.permuted_axes([2, 1, 0]);
        let data = if data.is_standard_layout() {
            data
        } else {
            data.as_standard_layout().into_owned()
        };
        (data, spacing)
    }};
}

impl Case {
    /// 由内存数据直接构造病例.
    ///
    /// `spacing` 按 `[z, h, w]` 顺序给出, 单位毫米, 必须全为正有限值.
    /// 扫描和标签形状不一致时返回 [`SegError::ShapeMismatch`].
    pub fn new(id: u32, image: Array3<f32>, mask: Array3<u8>, spacing: [f64; 3]) -> SegResult<Self> {
        if image.shape() != mask.shape() {
            return Err(SegError::shape(image.shape(), mask.shape()));
        }
        if image.is_empty() {
            return Err(SegError::config(format!("case {id} is empty")));
        }
        if !spacing.iter().all(|s| s.is_finite() && *s > 0.0) {
            return Err(SegError::config(format!(
                "case {id} has invalid spacing {spacing:?}"
            )));
        }
        Ok(Self {
            id,
            image,
            mask,
            spacing,
        })
    }

    /// 分别打开 nii 格式的扫描和标签. 体素尺寸取自标签文件的 header.
    pub fn open(id: u32, image_path: impl AsRef<Path>, mask_path: impl AsRef<Path>) -> SegResult<Self> {
        let (image, _) = read_volume!(image_path.as_ref(), f32);
        let (mask, spacing) = read_volume!(mask_path.as_ref(), u8);
        log::debug!("case {id}: loaded volume of shape {:?}", image.shape());
        Self::new(id, image, mask, spacing)
    }

    /// 仅打开 nii 格式的扫描 (测试集没有标签). 返回 `(扫描, 体素尺寸)`.
    pub fn open_scan(path: impl AsRef<Path>) -> SegResult<(Array3<f32>, [f64; 3])> {
        Ok(read_volume!(path.as_ref(), f32))
    }

    /// 病例编号.
    #[inline]
    pub fn id(&self) -> u32 {
        self.id
    }

    /// 扫描数据的不可变视图.
    #[inline]
    pub fn image(&self) -> ArrayView3<'_, f32> {
        self.image.view()
    }

    /// 标签数据的不可变视图.
    #[inline]
    pub fn mask(&self) -> ArrayView3<'_, u8> {
        self.mask.view()
    }

    /// 体素尺寸 `[z, h, w]`, 以毫米为单位. 仅评估阶段使用.
    #[inline]
    pub fn spacing(&self) -> [f64; 3] {
        self.spacing
    }

    /// 数据形状 `(z, h, w)`.
    #[inline]
    pub fn shape(&self) -> Idx3d {
        self.image.dim()
    }

    /// 水平切片形状 `(h, w)`.
    #[inline]
    pub fn slice_shape(&self) -> Idx2d {
        let (_, h, w) = self.shape();
        (h, w)
    }

    /// 切片个数.
    #[inline]
    pub fn len_z(&self) -> usize {
        self.shape().0
    }

    /// 单个体素的实际体积, 以立方毫米为单位.
    #[inline]
    pub fn voxel(&self) -> f64 {
        self.spacing.iter().product()
    }

    /// 标签中前景体素的个数.
    pub fn foreground_voxels(&self) -> usize {
        self.mask.iter().filter(|p| is_foreground(**p)).count()
    }

    /// 依次获取第 `z_index` 层的扫描切片和标签切片.
    ///
    /// 当 `z_index` 越界时 panic.
    #[inline]
    pub fn slice_at(&self, z_index: usize) -> (ScanSlice<'_>, LabelSlice<'_>) {
        (
            ScanSlice::new(self.image.index_axis(Axis(0), z_index)),
            LabelSlice::new(self.mask.index_axis(Axis(0), z_index)),
        )
    }

    /// 获取能按升序迭代 (扫描, 标签) 切片的迭代器.
    pub fn slice_iter(&self) -> impl ExactSizeIterator<Item = (ScanSlice<'_>, LabelSlice<'_>)> {
        self.image
            .axis_iter(Axis(0))
            .map(ScanSlice::new)
            .zip(self.mask.axis_iter(Axis(0)).map(LabelSlice::new))
    }

    /// 消费自我, 获得底层 `(扫描, 标签)`.
    #[inline]
    pub fn into_parts(self) -> (Array3<f32>, Array3<u8>) {
        (self.image, self.mask)
    }
}

#[cfg(test)]
mod tests {
    use super::Case;
    use crate::SegError;
    use ndarray::Array3;

    #[test]
    fn test_case_shape_mismatch() {
        let err = Case::new(
            0,
            Array3::zeros((2, 4, 4)),
            Array3::zeros((2, 4, 5)),
            [1.0, 1.0, 1.0],
        )
        .unwrap_err();
        assert!(matches!(err, SegError::ShapeMismatch { .. }));
    }

    #[test]
    fn test_case_bad_spacing() {
        let err = Case::new(
            0,
            Array3::zeros((2, 4, 4)),
            Array3::zeros((2, 4, 4)),
            [1.0, 0.0, 1.0],
        )
        .unwrap_err();
        assert!(matches!(err, SegError::Configuration(_)));
    }

    #[test]
    fn test_case_accessors() {
        let mut mask = Array3::zeros((3, 4, 5));
        mask[(1, 2, 3)] = 1;
        mask[(2, 0, 0)] = 1;
        let case = Case::new(7, Array3::zeros((3, 4, 5)), mask, [3.0, 0.5, 0.5]).unwrap();
        assert_eq!(case.id(), 7);
        assert_eq!(case.shape(), (3, 4, 5));
        assert_eq!(case.slice_shape(), (4, 5));
        assert_eq!(case.len_z(), 3);
        assert_eq!(case.foreground_voxels(), 2);
        assert!((case.voxel() - 0.75).abs() < 1e-12);
        assert_eq!(case.slice_iter().len(), 3);
        let (_, label) = case.slice_at(1);
        assert_eq!(label.count(1), 1);
    }
}
