// tests/scenarios.rs
use notice_dedup::engine::{DecisionEngine, EngineSettings, MatchKind, Verdict};
use notice_dedup::{dedup_records, CorpusMerger, DedupConfig, NoticeRecord, Origin};

fn merger_for(batch: &[NoticeRecord]) -> CorpusMerger {
    let engine = DecisionEngine::fit(EngineSettings::default(), batch.iter().map(|r| r.title.as_str()));
    CorpusMerger::new(engine, Vec::new(), 0)
}

#[test]
fn summer_contest_batch() {
    let batch = vec![
        NoticeRecord::new("2025 하계 공모전 안내", "2025-06-01"),
        NoticeRecord::new("2025 하계 공모전 안내!!", "2025-06-02"),
        NoticeRecord::new("장학금 신청 안내", "2025-05-01"),
    ];
    let mut m = merger_for(&batch);
    let verdicts: Vec<_> = batch.iter().cloned().map(|r| m.offer(r)).collect();

    assert_eq!(verdicts[0].verdict, Verdict::Unique);

    let second = verdicts[1].matched.as_ref().unwrap();
    assert_eq!(second.origin, Origin::Session);
    assert_eq!(second.title, "2025 하계 공모전 안내");
    match second.kind {
        MatchKind::Similar { seq, cos } => {
            assert!(seq >= 0.90, "seq {seq}");
            assert!(cos >= 0.80, "cos {cos}");
        }
        other => panic!("expected similarity match, got {other:?}"),
    }

    assert_eq!(verdicts[2].verdict, Verdict::Unique);
    assert_eq!(m.finish().len(), 2);
}

#[test]
fn identical_title_ten_days_apart_stays_unique() {
    let batch = vec![
        NoticeRecord::new("동계 계절학기 수강신청 안내", "2025-12-11"),
        NoticeRecord::new("동계 계절학기 수강신청 안내", "2025-12-01"),
    ];
    let mut m = merger_for(&batch);
    for r in batch {
        assert_eq!(m.offer(r).verdict, Verdict::Unique);
    }
    assert_eq!(m.stats().accepted, 2);
}

#[test]
fn seq_short_circuit_agrees_with_full_evaluation() {
    let titles = [
        "2025 하계 공모전 안내",
        "2025 하계 공모전 안내!!",
        "2025 동계 공모전 안내",
        "장학금 신청 안내",
        "장학금 신청 기간 연장 안내",
        "중앙도서관 임시 휴관 안내",
        "중앙도서관 휴관 안내",
        "",
    ];
    let e = DecisionEngine::fit(EngineSettings::default(), titles);
    let profile = &e.settings().thresholds;
    let policy = e.settings().normalization;

    for a in titles {
        for b in titles {
            let (na, nb) = (policy.similarity_title(a), policy.similarity_title(b));
            let full = e.scorer().score(&na, &nb);
            let short = e.near_duplicate(&na, &nb);
            assert_eq!(
                short.is_some(),
                profile.accepts(full.seq, full.cos),
                "{a:?} vs {b:?}: {full:?}"
            );
            if full.seq < profile.seq() {
                assert!(short.is_none());
            }
        }
    }
}

#[test]
fn batch_dedup_is_idempotent() {
    let batch = vec![
        NoticeRecord::new("2025 하계 공모전 안내", "2025-06-01"),
        NoticeRecord::new("2025 하계 공모전 안내!!", "2025-06-02"),
        NoticeRecord::new("장학금 신청 안내", "2025-05-01"),
        NoticeRecord::new("장학금 신청 안내", "2025.05.01"),
        NoticeRecord::new("학과 행사", "미정"),
    ];
    let cfg = DedupConfig::default();
    let (first, _) = dedup_records(batch.clone(), &cfg);
    let (again, _) = dedup_records(batch, &cfg);
    assert_eq!(first, again);

    // feeding the output back in changes nothing
    let (second, stats) = dedup_records(first.clone(), &cfg);
    assert_eq!(second, first);
    assert_eq!(stats.duplicates(), 0);
}
