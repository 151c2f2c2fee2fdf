//! 分割评估指标.
//!
//! 训练循环在每个 epoch 之后显式调用 [`evaluate`], 得到结构化的 [`EvalReport`].
//! 无定义的指标 (如两者均无前景时的 Dice) 在病例层面记为 `None`,
//! 记录一条警告, 并且不参与汇总.

mod aggregate;
mod dice;
mod history;
mod surface;

pub use aggregate::{case_ranges, evaluate, CaseMetrics, EvalConfig, EvalReport, Summary};
pub use dice::{binarize, dice, dice_score, rel_abs_vol_diff, slice_dice};
pub use history::EvalHistory;
pub use surface::{distance_to, surface, surface_distances, SurfaceStats};
