//! 🍇欢迎光临🍓
//!
//! 涵盖了本 crate 一系列常用的功能.

pub use crate::{Idx2d, Idx3d};
pub use crate::{SegError, SegResult};

pub use crate::data::resize::{resize_nearest, resize_stack};
pub use crate::data::{Case, ImgWriteVis, LabelSlice, ScanSlice};

pub use crate::consts::gray::{BACKGROUND, FOREGROUND};
pub use crate::consts::{DEFAULT_SLICE_LEN, PROMISE_TRAINING_SET_LEN};

pub use crate::dataset::home_dataset_dir_with;
pub use crate::dataset::{self, loader, DatasetSplit, PreparedSet, Preprocessor, SplitSpec};

pub use crate::smooth::{CurvatureFlow, NormStats};

pub use crate::augment::{AugmentConfig, ElasticConfig, PairedAugmenter};

pub use crate::sequencer::{Batch, Prefetcher, Sampling, Sequencer, SequencerConfig};

pub use crate::metrics::{evaluate, EvalConfig, EvalHistory, EvalReport};
