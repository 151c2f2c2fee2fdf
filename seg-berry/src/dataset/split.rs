//! 训练 / 验证 / 测试集划分.

use super::loader::case_loader;
use crate::consts::{DEFAULT_VALIDATION_CASES, PROMISE_TRAINING_SET_LEN};
use crate::{Case, SegError, SegResult};
use itertools::Itertools;
use std::path::Path;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// 按病例编号描述的数据集划分. 三个列表两两不相交.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SplitSpec {
    /// 训练集病例编号.
    pub train: Vec<u32>,

    /// 验证集病例编号.
    pub validation: Vec<u32>,

    /// 测试集病例编号.
    pub test: Vec<u32>,
}

impl Default for SplitSpec {
    /// 训练脚本的划分: 验证集为 `[5, 15, 25, 35, 45]`, 其余训练病例为训练集.
    fn default() -> Self {
        let validation = DEFAULT_VALIDATION_CASES.to_vec();
        let train = (0..PROMISE_TRAINING_SET_LEN)
            .filter(|id| !validation.contains(id))
            .collect();
        Self {
            train,
            validation,
            test: Vec::new(),
        }
    }
}

impl SplitSpec {
    /// 检查三个列表是否两两不相交 (包括列表内部无重复).
    pub fn validate(&self) -> SegResult<()> {
        let dup: Vec<u32> = self
            .train
            .iter()
            .chain(&self.validation)
            .chain(&self.test)
            .duplicates()
            .copied()
            .collect();
        if dup.is_empty() {
            Ok(())
        } else {
            Err(SegError::config(format!(
                "case ids {dup:?} appear more than once in the split"
            )))
        }
    }

    /// 所有病例编号个数.
    #[inline]
    pub fn len(&self) -> usize {
        self.train.len() + self.validation.len() + self.test.len()
    }

    /// 是否没有任何病例?
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// 划分后的病例.
#[derive(Clone, Debug)]
pub struct DatasetSplit {
    /// 训练集.
    pub train: Vec<Case>,

    /// 验证集.
    pub validation: Vec<Case>,

    /// 测试集.
    pub test: Vec<Case>,
}

impl DatasetSplit {
    /// 按 `spec` 将 `cases` 分配到三个集合, 每个集合内保持 `spec` 中的编号顺序.
    ///
    /// `spec` 非法, `cases` 中编号重复, 或 `spec` 中的编号找不到对应病例时返回
    /// [`SegError::Configuration`]. 不在 `spec` 中的病例被忽略.
    pub fn from_cases(spec: &SplitSpec, cases: impl IntoIterator<Item = Case>) -> SegResult<Self> {
        spec.validate()?;
        let mut pool: Vec<Option<Case>> = cases.into_iter().map(Some).collect();
        let ids: Vec<u32> = pool.iter().flatten().map(Case::id).collect();
        if let Some(dup) = ids.iter().duplicates().next() {
            return Err(SegError::config(format!("case {dup} supplied more than once")));
        }

        let mut take = |wanted: &[u32]| -> SegResult<Vec<Case>> {
            wanted
                .iter()
                .map(|id| {
                    ids.iter()
                        .position(|x| x == id)
                        .and_then(|i| pool[i].take())
                        .ok_or_else(|| SegError::config(format!("case {id} is missing")))
                })
                .collect()
        };
        let split = Self {
            train: take(&spec.train)?,
            validation: take(&spec.validation)?,
            test: take(&spec.test)?,
        };
        log::info!(
            "dataset split: {} train, {} validation, {} test cases",
            split.train.len(),
            split.validation.len(),
            split.test.len()
        );
        Ok(split)
    }

    /// 从目录 `path` 加载 `spec` 中列出的全部病例.
    ///
    /// `path` 必须是目录, 否则程序 panic.
    pub fn open(spec: &SplitSpec, path: impl AsRef<Path>) -> SegResult<Self> {
        spec.validate()?;
        let ids = spec.train.iter().chain(&spec.validation).chain(&spec.test).copied();
        let cases = case_loader(ids, path)
            .map(|(_, case)| case)
            .collect::<SegResult<Vec<_>>>()?;
        Self::from_cases(spec, cases)
    }
}

#[cfg(test)]
mod tests {
    use super::{DatasetSplit, SplitSpec};
    use crate::{Case, SegError};
    use ndarray::Array3;

    fn case(id: u32) -> Case {
        Case::new(id, Array3::zeros((1, 2, 2)), Array3::zeros((1, 2, 2)), [1.0; 3]).unwrap()
    }

    #[test]
    fn test_default_split() {
        let s = SplitSpec::default();
        assert_eq!(s.validation, vec![5, 15, 25, 35, 45]);
        assert_eq!(s.train.len(), 45);
        assert!(!s.train.contains(&25));
        assert!(s.validate().is_ok());
    }

    #[test]
    fn test_overlap_rejected() {
        let s = SplitSpec {
            train: vec![1, 2],
            validation: vec![2],
            test: vec![],
        };
        assert!(matches!(s.validate().unwrap_err(), SegError::Configuration(_)));
    }

    #[test]
    fn test_from_cases() {
        let s = SplitSpec {
            train: vec![3, 1],
            validation: vec![2],
            test: vec![0],
        };
        let split = DatasetSplit::from_cases(&s, (0..5).map(case)).unwrap();
        let ids = |v: &[Case]| v.iter().map(Case::id).collect::<Vec<_>>();
        assert_eq!(ids(&split.train), vec![3, 1]);
        assert_eq!(ids(&split.validation), vec![2]);
        assert_eq!(ids(&split.test), vec![0]);

        assert!(DatasetSplit::from_cases(&s, (0..3).map(case)).is_err());
        assert!(DatasetSplit::from_cases(&s, [0, 1, 2, 3, 3].map(case)).is_err());
    }
}
