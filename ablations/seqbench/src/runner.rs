//! 程序运行函数.

use crate::profile::Profile;
use crate::result::AblationResult;
use ndarray::Array3;
use seg_berry::prelude::*;
use std::sync::Arc;
use utils::loader;

const SLICE_SHAPE: Idx2d = (96, 96);
const PHANTOM_SLICES: usize = 300;

/// 优先使用真实训练集; 不存在时退回合成切片池.
fn load_pool() -> (Array3<f32>, Array3<u8>) {
    match loader::default_split_from_env_or_home() {
        Some(split) => {
            let split = split.expect("Loading dataset error");
            log::info!("{} training cases found", split.train.len());
            let set = Preprocessor::new(SLICE_SHAPE)
                .expect("Preprocessor config error")
                .prepare(&split)
                .expect("Preprocessing error");
            (set.train.images, set.train.masks)
        }
        None => {
            log::warn!("dataset not found, using {PHANTOM_SLICES} phantom slices");
            utils::phantom_pool(PHANTOM_SLICES, SLICE_SHAPE)
        }
    }
}

/// 单线程依次生成.
fn sequential(seq: &Sequencer) -> Profile {
    let mut p = Profile::new();
    for index in 0..seq.len() {
        p.batch_start();
        let batch = seq.get_batch_at(0, index).expect("Batch error");
        p.batch_done(index, &batch);
    }
    p.finish()
}

/// 批次内样本由 rayon 并行生成.
fn rayon(seq: &Sequencer) -> Profile {
    let mut p = Profile::new();
    for index in 0..seq.len() {
        p.batch_start();
        let batch = seq.par_get_batch_at(0, index).expect("Batch error");
        p.batch_done(index, &batch);
    }
    p.finish()
}

/// 后台线程预取.
fn prefetch(seq: &Arc<Sequencer>) -> Profile {
    let mut p = Profile::new();
    let mut it = Prefetcher::new(seq.clone(), utils::cpus(), 8).expect("Prefetcher config error");
    loop {
        p.batch_start();
        let Some((index, batch)) = it.next() else {
            break;
        };
        p.batch_done(index, &batch.expect("Batch error"));
    }
    drop(it);
    p.finish()
}

/// 实际运行.
pub fn run() -> AblationResult {
    let (images, masks) = load_pool();
    let cfg = SequencerConfig {
        sampling: Sampling::Balanced {
            foreground_prob: 0.8,
        },
        ..SequencerConfig::default()
    };
    let seq = Sequencer::new(images, masks, cfg, AugmentConfig::for_rows(SLICE_SHAPE.0))
        .expect("Sequencer config error");
    let seq = Arc::new(seq);
    log::info!(
        "{} slices ({} with foreground), {} batches per epoch",
        seq.pool_len(),
        seq.foreground_len(),
        seq.len()
    );

    println!("Running ablation studies...");
    AblationResult::from_iter([
        ("sequential", sequential(&seq)),
        ("rayon", rayon(&seq)),
        ("prefetch", prefetch(&seq)),
    ])
}
