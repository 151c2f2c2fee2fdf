//! 数据集操作: 加载, 划分, 准备与缓存.

use std::path::{Path, PathBuf};

mod cache;
pub mod loader;
mod prepare;
mod split;

pub use prepare::{PreparedPart, PreparedSet, Preprocessor};
pub use split::{DatasetSplit, SplitSpec};

/// 获取 `{用户主目录}/dataset` 目录.
pub fn home_dataset_dir() -> Option<PathBuf> {
    let mut ans = dirs::home_dir()?;
    ans.push("dataset");
    Some(ans)
}

/// 获取 `{用户主目录}/dataset` 目录下给定继续项组成的全路径.
pub fn home_dataset_dir_with<P: AsRef<Path>, I: IntoIterator<Item = P>>(it: I) -> Option<PathBuf> {
    let mut ans = home_dataset_dir()?;
    ans.extend(it);
    Some(ans)
}

#[cfg(test)]
mod tests {
    use super::{home_dataset_dir, home_dataset_dir_with};

    #[test]
    fn test_dataset_dir() {
        if let Some(base) = home_dataset_dir() {
            let p = home_dataset_dir_with(["promise12", "train"]).unwrap();
            assert!(p.starts_with(&base));
            assert!(p.ends_with("promise12/train"));
        }
    }
}
