//! 准备好的数据集的 npz 缓存.
//!
//! 所有数组存放在同一个 npz 归档中, 训练时直接加载, 不必重新缩放和平滑.

use super::{PreparedPart, PreparedSet};
use crate::smooth::NormStats;
use crate::SegResult;
use ndarray::{Array1, Ix1, Ix3, OwnedRepr};
use ndarray_npy::{NpzReader, NpzWriter};
use std::fs::File;
use std::path::Path;

/// 归档中统计量 `[mu, sigma]` 的名字.
const STATS: &str = "stats.npy";

/// 三个集合在归档中的后缀.
const PARTS: [&str; 3] = ["train", "val", "test"];

impl PreparedSet {
    /// 保存到 `path`. 数组命名为 `x_{part}.npy`, `y_{part}.npy`, `n_{part}.npy` 与 `stats.npy`,
    /// 与 `numpy.savez` 的命名一致.
    pub fn save_npz(&self, path: impl AsRef<Path>) -> SegResult<()> {
        let mut npz = NpzWriter::new(File::create(path.as_ref())?);
        npz.add_array(STATS, &self.stats.to_array())?;
        for (name, part) in PARTS.into_iter().zip(self.parts()) {
            let counts: Array1<u64> = part.slice_counts.iter().map(|&n| n as u64).collect();
            npz.add_array(format!("x_{name}.npy"), &part.images)?;
            npz.add_array(format!("y_{name}.npy"), &part.masks)?;
            npz.add_array(format!("n_{name}.npy"), &counts)?;
        }
        npz.finish()?;
        log::info!("cached prepared dataset to {}", path.as_ref().display());
        Ok(())
    }

    /// 从 [`PreparedSet::save_npz`] 写出的归档加载.
    pub fn load_npz(path: impl AsRef<Path>) -> SegResult<Self> {
        let mut npz = NpzReader::new(File::open(path.as_ref())?)?;
        let stats = npz.by_name::<OwnedRepr<f64>, Ix1>(STATS)?;
        let stats = NormStats::from_array(stats.view())?;

        let mut read_part = |name: &str| -> SegResult<PreparedPart> {
            let images = npz.by_name::<OwnedRepr<f32>, Ix3>(&format!("x_{name}.npy"))?;
            let masks = npz.by_name::<OwnedRepr<u8>, Ix3>(&format!("y_{name}.npy"))?;
            let counts = npz.by_name::<OwnedRepr<u64>, Ix1>(&format!("n_{name}.npy"))?;
            Ok(PreparedPart {
                images,
                masks,
                slice_counts: counts.iter().map(|&n| n as usize).collect(),
            })
        };
        let [train, validation, test] = PARTS;
        Ok(Self {
            stats,
            train: read_part(train)?,
            validation: read_part(validation)?,
            test: read_part(test)?,
        })
    }

    fn parts(&self) -> [&PreparedPart; 3] {
        [&self.train, &self.validation, &self.test]
    }
}
