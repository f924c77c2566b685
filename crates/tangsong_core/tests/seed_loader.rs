use tangsong_core::{
    ensure_seeded, PoetryStore, QueryService, SeedReport, SeedSource, ANONYMOUS_AUTHOR,
};

const SEED_JSON: &str = r#"[
    {"title": "静夜思", "author": "李白", "dynasty": "唐",
     "content": "床前明月光，\r\n疑是地上霜。", "tags": ["思乡", " ", "月亮"]},
    {"title": "望庐山瀑布", "author": "李白", "dynasty": "唐",
     "content": "日照香炉生紫烟，\n遥看瀑布挂前川。", "translation": "  "},
    {"title": "念奴娇·赤壁怀古", "author": "苏轼", "dynasty": "宋",
     "content": "大江东去，浪淘尽，千古风流人物。", "analysis": "豪放词", "tags": null},
    {"title": "无题", "content": "一句"}
]"#;

#[test]
fn seeding_twice_imports_once() {
    let mut store = PoetryStore::open_in_memory().unwrap();
    let source = SeedSource::Json(SEED_JSON.to_string());

    assert_eq!(
        ensure_seeded(&mut store, &source),
        SeedReport::Seeded {
            poems: 4,
            authors: 3
        }
    );
    assert_eq!(ensure_seeded(&mut store, &source), SeedReport::AlreadySeeded);

    let query = QueryService::new(&store);
    assert_eq!(query.search_poems(None, 100).len(), 4);
    assert_eq!(query.search_authors(None).len(), 3);
}

#[test]
fn authors_are_deduplicated_by_name_and_dynasty() {
    let mut store = PoetryStore::open_in_memory().unwrap();
    ensure_seeded(&mut store, &SeedSource::Json(SEED_JSON.to_string()));

    let query = QueryService::new(&store);
    let li_bai = query.search_authors(Some("李白"));
    assert_eq!(li_bai.len(), 1);
    assert_eq!(query.author_poem_count(&li_bai[0]), 2);

    let poems = query.poems_by_author(&li_bai[0]);
    assert!(poems.iter().all(|poem| poem.author.id == li_bai[0].id));
}

#[test]
fn seeded_fields_follow_import_rules() {
    let mut store = PoetryStore::open_in_memory().unwrap();
    ensure_seeded(&mut store, &SeedSource::Json(SEED_JSON.to_string()));
    let query = QueryService::new(&store);

    let jing_ye_si = query.search_poems(Some("静夜思"), 10).remove(0);
    assert_eq!(jing_ye_si.content, "床前明月光，\n疑是地上霜。");
    assert_eq!(jing_ye_si.lines(), vec!["床前明月光，", "疑是地上霜。"]);
    assert_eq!(jing_ye_si.tags, vec!["思乡", "月亮"]);
    assert_eq!(jing_ye_si.dynasty, jing_ye_si.author.dynasty);

    let pu_bu = query.search_poems(Some("望庐山瀑布"), 10).remove(0);
    assert_eq!(pu_bu.translation, None);

    let chi_bi = query.search_poems(Some("赤壁"), 10).remove(0);
    assert_eq!(chi_bi.analysis.as_deref(), Some("豪放词"));
    assert!(chi_bi.tags.is_empty());

    let wu_ti = query.search_poems(Some("无题"), 10).remove(0);
    assert_eq!(wu_ti.author.name, ANONYMOUS_AUTHOR);
    assert_eq!(wu_ti.dynasty, "");
}

#[test]
fn null_author_and_dynasty_import_with_defaults() {
    let mut store = PoetryStore::open_in_memory().unwrap();
    let source = SeedSource::Json(
        r#"[{"title": "静夜思", "author": "李白", "dynasty": "唐", "content": "床前明月光"},
            {"title": "无题", "author": null, "dynasty": null, "content": "一句"}]"#
            .to_string(),
    );

    assert_eq!(
        ensure_seeded(&mut store, &source),
        SeedReport::Seeded {
            poems: 2,
            authors: 2
        }
    );
    let wu_ti = QueryService::new(&store)
        .search_poems(Some("无题"), 10)
        .remove(0);
    assert_eq!(wu_ti.author.name, ANONYMOUS_AUTHOR);
    assert_eq!(wu_ti.dynasty, "");
}

#[test]
fn invalid_record_fails_atomically_and_retry_succeeds() {
    let mut store = PoetryStore::open_in_memory().unwrap();
    let broken = SeedSource::Json(
        r#"[{"title": "静夜思", "author": "李白", "dynasty": "唐", "content": "床前明月光"},
            {"title": "   ", "content": "无题之诗"}]"#
            .to_string(),
    );

    match ensure_seeded(&mut store, &broken) {
        SeedReport::Failed { reason } => assert!(reason.contains("#1"), "{reason}"),
        other => panic!("unexpected report: {other:?}"),
    }
    let query = QueryService::new(&store);
    assert!(query.search_poems(None, 100).is_empty());
    assert!(query.search_authors(None).is_empty());

    let report = ensure_seeded(&mut store, &SeedSource::Json(SEED_JSON.to_string()));
    assert!(matches!(report, SeedReport::Seeded { poems: 4, .. }));
}

#[test]
fn malformed_json_and_missing_file_report_failure() {
    let mut store = PoetryStore::open_in_memory().unwrap();

    let malformed = ensure_seeded(&mut store, &SeedSource::Json("{not json".to_string()));
    assert!(matches!(malformed, SeedReport::Failed { .. }));

    let dir = tempfile::tempdir().unwrap();
    let missing = ensure_seeded(
        &mut store,
        &SeedSource::File(dir.path().join("missing.json")),
    );
    assert!(matches!(missing, SeedReport::Failed { .. }));

    assert!(QueryService::new(&store).search_poems(None, 10).is_empty());
}

#[test]
fn seeds_from_file_and_bundled_dataset() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("poems.json");
    std::fs::write(&path, SEED_JSON).unwrap();

    let mut from_file = PoetryStore::open_in_memory().unwrap();
    assert!(matches!(
        ensure_seeded(&mut from_file, &SeedSource::File(path)),
        SeedReport::Seeded { poems: 4, .. }
    ));

    let mut bundled = PoetryStore::open_in_memory().unwrap();
    let report = ensure_seeded(&mut bundled, &SeedSource::Bundled);
    assert!(matches!(report, SeedReport::Seeded { poems, .. } if poems > 0));

    let query = QueryService::new(&bundled);
    let jing_ye_si = query.search_poems(Some("静夜思"), 10);
    assert_eq!(jing_ye_si.len(), 1);
    assert_eq!(jing_ye_si[0].author.name, "李白");
    assert_eq!(jing_ye_si[0].dynasty, "唐");
}
