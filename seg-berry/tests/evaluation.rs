use ndarray::{s, Array3};
use seg_berry::metrics::{case_ranges, dice_score};
use seg_berry::prelude::*;

/// 两个病例, 各 4 张同形状切片. 病例 0 的真值全为背景, 预测给出了前景;
/// 病例 1 的预测与真值完全一致.
#[test]
fn test_end_to_end_dice() {
    let truth0 = Array3::<u8>::zeros((4, 16, 16));
    let truth1 = Array3::from_shape_fn((4, 16, 16), |(_, h, w)| u8::from((4..12).contains(&h) && (3..9).contains(&w)));
    let cases = vec![
        Case::new(0, Array3::zeros((4, 16, 16)), truth0, [3.0, 0.6, 0.6]).unwrap(),
        Case::new(1, Array3::zeros((4, 16, 16)), truth1.clone(), [3.0, 0.6, 0.6]).unwrap(),
    ];

    let mut preds = Array3::<f32>::zeros((8, 16, 16));
    preds.slice_mut(s![0..4, 2..6, 2..6]).fill(0.9);
    preds.slice_mut(s![4..8, .., ..]).assign(&truth1.mapv(f32::from));

    let report = evaluate(preds.view(), &cases, &EvalConfig::default()).unwrap();
    assert_eq!(report.cases.len(), 2);
    assert_eq!(report.cases[0].dice, Some(0.0));
    assert_eq!(report.cases[1].dice, Some(1.0));
    assert!(report.cases[1].slice_dice.iter().all(|d| *d == Some(1.0)));
    assert_eq!(report.cases[1].hausdorff, Some(0.0));
    assert_eq!(report.cases[1].msd, Some(0.0));
    assert_eq!(report.cases[1].rel_vol_diff, Some(0.0));

    // 真值为空: 表面距离与体积差无定义, 不参与汇总.
    assert_eq!(report.cases[0].hausdorff, None);
    assert_eq!(report.cases[0].rel_vol_diff, None);
    assert_eq!(report.mean_dice(), Some(0.5));
    assert_eq!(report.std_dice(), Some(0.5));
    assert_eq!(report.mean_hausdorff(), Some(0.0));
    assert_eq!(report.hausdorff.unwrap().count, 1);

    let mut history = EvalHistory::new();
    history.push(report);
    assert_eq!(history.best_by_dice().unwrap().0, 0);
}

#[test]
fn test_train_set_dice_and_ranges() {
    let truth = Array3::from_shape_fn((3, 4, 4), |(z, _, _)| u8::from(z == 1));
    let probs = truth.mapv(|v| if v == 1 { 0.7f32 } else { 0.2 });
    assert_eq!(dice_score(truth.view(), probs.view(), 0.5).unwrap(), Some(1.0));
    assert_eq!(case_ranges(&[10, 8, 12]), vec![0..10, 10..18, 18..30]);
}
