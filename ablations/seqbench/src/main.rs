//! 比较几种取批次方式的吞吐.
//!
//! 数据集目录由 `$PROMISE12_DIR` 指定, 默认 `$HOME/dataset/promise12/train`.

mod profile;
mod result;
mod runner;

fn main() {
    simple_logger::SimpleLogger::new()
        .with_level(log::LevelFilter::Info)
        .init()
        .unwrap();
    runner::run().analyze();
}
