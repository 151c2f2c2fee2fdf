use super::EvalReport;

/// 逐 epoch 的评估记录, 由训练循环持有.
///
/// 本 crate 只负责产出 [`EvalReport`], 何时评估, 何时清空, 都由调用方决定.
#[derive(Clone, Debug, Default)]
pub struct EvalHistory {
    reports: Vec<EvalReport>,
}

impl EvalHistory {
    /// 空记录.
    pub fn new() -> Self {
        Self::default()
    }

    /// 追加一个 epoch 的评估结果.
    pub fn push(&mut self, report: EvalReport) {
        self.reports.push(report);
    }

    /// 已记录的 epoch 数.
    #[inline]
    pub fn len(&self) -> usize {
        self.reports.len()
    }

    /// 是否还没有任何记录?
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.reports.is_empty()
    }

    /// 最近一次的评估结果.
    #[inline]
    pub fn last(&self) -> Option<&EvalReport> {
        self.reports.last()
    }

    /// 按 epoch 顺序遍历.
    pub fn iter(&self) -> impl ExactSizeIterator<Item = &EvalReport> {
        self.reports.iter()
    }

    /// 每个 epoch 的平均 Dice.
    pub fn dice_curve(&self) -> Vec<Option<f64>> {
        self.reports.iter().map(EvalReport::mean_dice).collect()
    }

    /// 平均 Dice 最高的 epoch 及其结果.
    pub fn best_by_dice(&self) -> Option<(usize, &EvalReport)> {
        self.reports
            .iter()
            .enumerate()
            .filter_map(|(i, r)| r.mean_dice().map(|d| (i, r, d)))
            .max_by(|a, b| a.2.total_cmp(&b.2))
            .map(|(i, r, _)| (i, r))
    }

    /// 训练结束时输出最近一次的汇总.
    pub fn log_last(&self) {
        match self.last() {
            Some(r) => {
                log::info!("final evaluation after {} epochs:", self.len());
                r.log_summary();
            }
            None => log::info!("no evaluation recorded"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::EvalHistory;
    use crate::metrics::{EvalReport, Summary};

    fn report(dice: Option<f64>) -> EvalReport {
        let mut r = EvalReport::from_cases(Vec::new());
        r.dice = dice.map(|mean| Summary {
            mean,
            std: 0.0,
            count: 1,
        });
        r
    }

    #[test]
    fn test_history() {
        let mut h = EvalHistory::new();
        assert!(h.is_empty());
        assert!(h.best_by_dice().is_none());
        h.push(report(Some(0.6)));
        h.push(report(None));
        h.push(report(Some(0.8)));
        h.push(report(Some(0.7)));
        assert_eq!(h.len(), 4);
        assert_eq!(h.dice_curve(), vec![Some(0.6), None, Some(0.8), Some(0.7)]);
        assert_eq!(h.best_by_dice().unwrap().0, 2);
        assert_eq!(h.last().unwrap().mean_dice(), Some(0.7));
        h.log_last();
    }
}
