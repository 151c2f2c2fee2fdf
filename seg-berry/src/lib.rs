#![warn(missing_docs)] // <= 合适时移除它.

//! 核心库. 为 3D MR (前列腺, PROMISE12 组织形式) 分割网络的训练提供数据侧支撑:
//! 成对 (扫描, 标签) 数据增强, 合成 epoch 批次生成, 以及分割评估指标.
//!
//! 网络结构、优化器、训练回调循环均不在本 crate 内. 本 crate 只负责
//! "喂给训练循环的数据" 和 "训练循环吐出的预测怎么评估".
//!
//! # 注意
//!
//! 1. 所有体数据均按 `(z, h, w)` 组织, 即 "切片, 高, 宽".
//!   扫描以 `f32` 保存, 标签以 `u8` 保存.
//! 2. 所有随机性都通过显式传入的随机数发生器获得. 库内部没有全局随机状态,
//!   也没有全局归一化统计量.
//! 3. 契约被违反时 (形状不一致, 配置非法, 索引越界, 统计量退化)
//!   返回 [`SegError`], 而不是静默广播或截断.
//!
//! # 模块一览
//!
//! ### 数据模型 ✅
//!
//! [`Case`] 及其切片视图, 最近邻缩放, PNG 预览.
//!
//! 实现位于 `seg-berry/src/data`.
//!
//! ### 数据集划分与预处理 ✅
//!
//! 按病例编号划分训练/验证/测试集, 缩放 + 曲率流平滑 + 训练集统计量归一化,
//! 以及 npz 缓存.
//!
//! 实现位于 `seg-berry/src/dataset`.
//!
//! ### 曲率流平滑与归一化 ✅
//!
//! 实现位于 `seg-berry/src/smooth`.
//!
//! ### 成对增强 ✅
//!
//! 弹性形变 + 仿射 (旋转, 平移, 缩放, 翻转). 同一次抽取的参数生成同一张坐标映射,
//! 扫描走双线性插值, 标签走最近邻, 边界填充判定完全一致.
//!
//! 实现位于 `seg-berry/src/augment`.
//!
//! ### 合成 epoch 批次生成器 ✅
//!
//! epoch 长度与原始病例数解耦. 每个批次的随机流由 `(seed, epoch, index)`
//! 确定性地派生, 因此可以被任意线程乱序、并发地获取.
//!
//! 实现位于 `seg-berry/src/sequencer`.
//!
//! ### 评估指标 ✅
//!
//! 体积 Dice, 逐切片 Dice, Hausdorff 距离, 平均表面距离, 相对体积差.
//!
//! 实现位于 `seg-berry/src/metrics`.

/// 二维索引 `(h, w)`.
pub type Idx2d = (usize, usize);

/// 三维索引 `(z, h, w)`.
pub type Idx3d = (usize, usize, usize);

/// 高精度二维坐标 `(h, w)`, 可以落在像素之间.
type Idx2dF = (f64, f64);

pub mod consts;

mod error;

pub use error::{SegError, SegResult};

/// 病例与切片的基础数据结构.
pub mod data;

pub use data::{Case, LabelSlice, ScanSlice};

pub mod dataset;

pub mod smooth;

pub mod augment;

pub mod sequencer;

pub mod metrics;

pub mod prelude;
