// tests/calibration.rs
use notice_dedup::calibrate::{calibrate, evaluate_at, Label, ScoredPair, ThresholdRange};
use notice_dedup::pairs::{labeled_pairs, LabeledRow};
use notice_dedup::storage::csv_store::decode_rows;
use notice_dedup::ThresholdProfile;
use std::path::Path;

use notice_dedup::calibrate::Label::{Duplicate as D, NotDuplicate as N};

/// (seq, cos, label). Against (cos 0.85, seq 0.85):
/// TP = #1 #2 #3, FN = #4 (cos) #5 (seq), FP = #6 #9 (boundary), TN = #7 #8 #10.
fn fixture() -> Vec<ScoredPair> {
    [
        (0.95, 0.95, D),
        (0.90, 0.88, D),
        (0.86, 0.90, D),
        (0.99, 0.80, D),
        (0.84, 0.99, D),
        (0.92, 0.91, N),
        (0.70, 0.95, N),
        (0.88, 0.60, N),
        (0.85, 0.85, N),
        (0.50, 0.40, N),
    ]
    .into_iter()
    .map(|(s, c, l)| ScoredPair::new(s, c, l))
    .collect()
}

#[test]
fn precision_and_recall_match_hand_counts() {
    let pairs = fixture();

    let row = evaluate_at(&pairs, &ThresholdProfile::new(0.85, 0.85).unwrap());
    assert_eq!((row.true_positives, row.predicted, row.actual), (3, 5, 5));
    assert_eq!(row.precision, 3.0 / 5.0);
    assert_eq!(row.recall, 3.0 / 5.0);

    let row = evaluate_at(&pairs, &ThresholdProfile::new(0.90, 0.90).unwrap());
    assert_eq!((row.true_positives, row.predicted, row.actual), (1, 2, 5));
    assert_eq!(row.precision, 0.5);
    assert_eq!(row.recall, 0.2);
}

#[test]
fn ranked_table_keeps_only_rows_over_the_floor() {
    let pairs = fixture();
    let range: ThresholdRange = "0.85:0.95:0.05".parse().unwrap();
    let ranked = calibrate(&pairs, &range, &range, 0.95);

    // Only #1 survives at these five grid points; ties keep cos-major grid order.
    let points: Vec<(f64, f64)> = ranked.iter().map(|r| (r.cos_threshold, r.seq_threshold)).collect();
    assert_eq!(
        points,
        vec![(0.85, 0.95), (0.9, 0.95), (0.95, 0.85), (0.95, 0.9), (0.95, 0.95)]
    );
    assert!(ranked.iter().all(|r| r.precision == 1.0 && r.recall == 0.2));

    let everything = calibrate(&pairs, &range, &range, 0.0);
    assert_eq!(everything.len(), 9);
    assert!(everything
        .windows(2)
        .all(|w| (w[0].precision, w[0].recall) >= (w[1].precision, w[1].recall)));
}

#[test]
fn labeled_sheet_parses_from_csv() {
    let sheet = "\u{feff}제목1,제목2,seq_score,jac_score,cos_score,lev_score,label\n\
                 가,나,0.95,0.5,0.95,0.9,duplication\n\
                 다,라,0.85,0.2,0.85,0.8,not_duplicate\n\
                 마,바,0.70,0.1,0.95,0.6,unrelated\n";
    let rows: Vec<LabeledRow> = decode_rows(sheet.as_bytes(), Path::new("sheet.csv")).unwrap();
    let pairs = labeled_pairs(rows).unwrap();
    assert_eq!(pairs.len(), 3);
    assert_eq!(pairs[0].label, Label::Duplicate);
    assert_eq!(pairs[2].label, Label::NotDuplicate);

    let row = evaluate_at(&pairs, &ThresholdProfile::new(0.85, 0.85).unwrap());
    assert_eq!((row.precision, row.recall), (0.5, 1.0));
}
