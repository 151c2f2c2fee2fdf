//! 后台预取一个 epoch 的批次.

use super::{Batch, Sequencer};
use crate::{SegError, SegResult};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::mpsc::{sync_channel, Receiver};
use std::sync::Arc;
use std::thread::{Builder, JoinHandle};

/// 预取器. 若干工作线程按 "先到先取" 的方式认领批次索引, 产出的批次
/// 写入有界通道, 通道满时工作线程阻塞.
///
/// 批次按完成顺序到达, 附带其索引. 丢弃预取器时会通知所有工作线程停止并等待它们退出.
pub struct Prefetcher {
    rx: Option<Receiver<(usize, SegResult<Batch>)>>,
    stop: Arc<AtomicBool>,
    workers: Vec<JoinHandle<()>>,
    epoch: u64,
    len: usize,
}

impl Prefetcher {
    /// 以 `workers` 个线程预取 `seq` 当前 epoch 的全部批次, 通道容量为 `capacity`.
    pub fn new(seq: Arc<Sequencer>, workers: usize, capacity: usize) -> SegResult<Self> {
        if workers == 0 {
            return Err(SegError::config("prefetcher needs at least one worker"));
        }
        let epoch = seq.epoch();
        let len = seq.len();
        let (tx, rx) = sync_channel(capacity);
        let stop = Arc::new(AtomicBool::new(false));
        let next = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::with_capacity(workers);
        for id in 0..workers {
            let (seq, tx, halt, next) = (seq.clone(), tx.clone(), stop.clone(), next.clone());
            let handle = Builder::new()
                .name(format!("seg-prefetch-{id}"))
                .spawn(move || {
                    while !halt.load(Ordering::Acquire) {
                        let index = next.fetch_add(1, Ordering::AcqRel);
                        if index >= len {
                            break;
                        }
                        let batch = seq.get_batch_at(epoch, index);
                        // 接收端已关闭.
                        if tx.send((index, batch)).is_err() {
                            break;
                        }
                    }
                });
            match handle {
                Ok(h) => handles.push(h),
                Err(e) => {
                    stop.store(true, Ordering::Release);
                    drop(rx);
                    for h in handles {
                        let _ = h.join();
                    }
                    return Err(e.into());
                }
            }
        }
        log::debug!("prefetching epoch {epoch}: {len} batches on {workers} threads");
        Ok(Self {
            rx: Some(rx),
            stop,
            workers: handles,
            epoch,
            len,
        })
    }

    /// 预取的 epoch.
    #[inline]
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// 该 epoch 的批次总数.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// 该 epoch 是否没有批次?
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// 请求工作线程尽快停止. 已经在通道中的批次仍可读取.
    pub fn cancel(&self) {
        self.stop.store(true, Ordering::Release);
    }
}

impl Iterator for Prefetcher {
    type Item = (usize, SegResult<Batch>);

    /// 阻塞直到下一个批次就绪. 所有批次都已送达 (或已取消) 时返回 `None`.
    fn next(&mut self) -> Option<Self::Item> {
        self.rx.as_ref()?.recv().ok()
    }
}

impl Drop for Prefetcher {
    fn drop(&mut self) {
        self.cancel();
        // 先关闭接收端, 阻塞在 `send` 上的线程才能返回.
        drop(self.rx.take());
        for h in self.workers.drain(..) {
            if h.join().is_err() {
                log::warn!("a prefetch worker panicked");
            }
        }
    }
}
