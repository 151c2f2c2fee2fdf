//! 对 `seg-berry::dataset` 的更一层封装. 提供更直接的数据集加载器.

use seg_berry::dataset::{DatasetSplit, SplitSpec};
use seg_berry::SegResult;
use std::env;
use std::path::{Path, PathBuf};

/// 获取 PROMISE12 训练集基本路径.
///
/// 1. 若环境变量 `$PROMISE12_DIR` 非空, 则返回其值;
/// 2. 否则, 返回 `$HOME/dataset/promise12/train`.
pub fn train_dir_from_env_or_home() -> PathBuf {
    if let Ok(d) = env::var("PROMISE12_DIR") {
        PathBuf::from(d)
    } else {
        seg_berry::dataset::home_dataset_dir_with(["promise12", "train"]).unwrap()
    }
}

/// 按训练脚本的默认划分加载 `path` 下的病例.
pub fn default_split<P: AsRef<Path>>(path: P) -> SegResult<DatasetSplit> {
    DatasetSplit::open(&SplitSpec::default(), path)
}

/// 若 `$PROMISE12_DIR` 或 `$HOME/dataset/promise12/train` 是目录, 则按默认划分加载.
pub fn default_split_from_env_or_home() -> Option<SegResult<DatasetSplit>> {
    let dir = train_dir_from_env_or_home();
    dir.is_dir().then(|| default_split(dir))
}
