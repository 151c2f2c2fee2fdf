//! PROMISE12 组织形式的 nifti 病例加载器.
//!
//! 提供迭代器风格的数据集获取模式.

use crate::consts::PROMISE_TRAINING_SET_LEN;
use crate::{Case, SegResult};
use ndarray::Array3;
use std::path::{Path, PathBuf};

/// 第 `id` 个病例扫描的文件名, 形如 `Case07.nii`.
#[inline]
pub fn image_filename(id: u32) -> String {
    format!("Case{id:02}.nii")
}

/// 第 `id` 个病例标签的文件名, 形如 `Case07_segmentation.nii`.
#[inline]
pub fn mask_filename(id: u32) -> String {
    format!("Case{id:02}_segmentation.nii")
}

/// 从指定编号和路径创建病例 ([`Case`]) 加载器.
///
/// # 注意
///
/// 1. `path` 必须是目录, 否则程序 panic.
/// 2. `ids` 的所有值 `id` 必须在 `path` 下有 [`image_filename`] 与 [`mask_filename`]
///   对应的文件, 否则加载器在迭代时会返回 `Err`.
pub fn case_loader<I: IntoIterator<Item = u32>, P: AsRef<Path>>(ids: I, path: P) -> CaseLoader {
    let path = path.as_ref().to_owned();
    assert!(path.is_dir());

    let mut ids: Vec<u32> = ids.into_iter().collect();
    ids.reverse();

    CaseLoader { path, ids_rev: ids }
}

/// 按编号顺序加载 `path` 下 **训练集** 的全部病例.
///
/// `path` 必须是目录, 否则程序 panic.
pub fn full_case_loader<P: AsRef<Path>>(path: P) -> CaseLoader {
    case_loader(0..PROMISE_TRAINING_SET_LEN, path)
}

/// 病例加载器.
#[derive(Debug)]
pub struct CaseLoader {
    path: PathBuf,
    ids_rev: Vec<u32>,
}

impl Iterator for CaseLoader {
    type Item = (u32, SegResult<Case>);

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.ids_rev.pop()?;
        let case = Case::open(
            id,
            self.path.join(image_filename(id)),
            self.path.join(mask_filename(id)),
        );
        Some((id, case))
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.ids_rev.len(), Some(self.ids_rev.len()))
    }
}

impl ExactSizeIterator for CaseLoader {}

/// 从指定编号和路径创建只含扫描的加载器 (测试集没有标签).
///
/// `path` 必须是目录, 否则程序 panic.
pub fn scan_loader<I: IntoIterator<Item = u32>, P: AsRef<Path>>(ids: I, path: P) -> ScanLoader {
    let path = path.as_ref().to_owned();
    assert!(path.is_dir());

    let mut ids: Vec<u32> = ids.into_iter().collect();
    ids.reverse();

    ScanLoader { path, ids_rev: ids }
}

/// 扫描加载器. 每一项为 `(编号, (扫描, 体素尺寸))`.
#[derive(Debug)]
pub struct ScanLoader {
    path: PathBuf,
    ids_rev: Vec<u32>,
}

impl Iterator for ScanLoader {
    type Item = (u32, SegResult<(Array3<f32>, [f64; 3])>);

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.ids_rev.pop()?;
        Some((id, Case::open_scan(self.path.join(image_filename(id)))))
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.ids_rev.len(), Some(self.ids_rev.len()))
    }
}

impl ExactSizeIterator for ScanLoader {}
