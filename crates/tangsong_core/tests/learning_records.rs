use tangsong_core::{
    ensure_seeded, LearningRecordRepository, MutationService, Poem, PoetryStore, QueryService,
    SeedSource, SqliteLearningRecordRepository,
};

const SEED_JSON: &str = r#"[
    {"title": "登鹳雀楼", "author": "王之涣", "dynasty": "唐", "content": "白日依山尽"},
    {"title": "相思", "author": "王维", "dynasty": "唐", "content": "红豆生南国"},
    {"title": "题西林壁", "author": "苏轼", "dynasty": "宋", "content": "横看成岭侧成峰"}
]"#;

fn seeded_store() -> PoetryStore {
    let mut store = PoetryStore::open_in_memory().unwrap();
    ensure_seeded(&mut store, &SeedSource::Json(SEED_JSON.to_string()));
    store
}

fn poem(store: &PoetryStore, title: &str) -> Poem {
    QueryService::new(store)
        .search_poems(Some(title), 10)
        .into_iter()
        .find(|poem| poem.title == title)
        .unwrap()
}

fn record_count(store: &PoetryStore) -> u32 {
    SqliteLearningRecordRepository::try_new(store.connection())
        .unwrap()
        .count_learning_records()
        .unwrap()
}

#[test]
fn first_view_creates_record_with_defaults() {
    let mut store = seeded_store();
    let xiang_si = poem(&store, "相思");

    MutationService::new(&mut store).record_view(&xiang_si, false, "");

    let records = QueryService::new(&store).learning_records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].poem, xiang_si);
    assert!(!records[0].is_memorized);
    assert_eq!(records[0].notes, None);
}

#[test]
fn repeated_views_upsert_a_single_record() {
    let mut store = seeded_store();
    let guan_que = poem(&store, "登鹳雀楼");

    MutationService::new(&mut store).record_view(&guan_que, false, "欲穷千里目");
    let first = QueryService::new(&store)
        .learning_record_for(&guan_que)
        .unwrap();

    MutationService::new(&mut store).record_view(&guan_que, true, "");
    let second = QueryService::new(&store)
        .learning_record_for(&guan_que)
        .unwrap();

    assert_eq!(record_count(&store), 1);
    assert_eq!(second.id, first.id);
    assert!(second.date_viewed > first.date_viewed);
    assert!(second.is_memorized);
    assert_eq!(second.notes.as_deref(), Some("欲穷千里目"));

    MutationService::new(&mut store).record_view(&guan_que, false, "更上一层楼");
    let third = QueryService::new(&store)
        .learning_record_for(&guan_que)
        .unwrap();
    assert!(!third.is_memorized);
    assert_eq!(third.notes.as_deref(), Some("更上一层楼"));
}

#[test]
fn records_are_listed_most_recently_viewed_first() {
    let mut store = seeded_store();
    let a = poem(&store, "登鹳雀楼");
    let b = poem(&store, "相思");
    let c = poem(&store, "题西林壁");

    {
        let mut mutations = MutationService::new(&mut store);
        mutations.record_view(&a, false, "");
        mutations.record_view(&b, false, "");
        mutations.record_view(&c, false, "");
        mutations.record_view(&a, true, "");
    }

    let titles = QueryService::new(&store)
        .learning_records()
        .into_iter()
        .map(|record| record.poem.title)
        .collect::<Vec<_>>();
    assert_eq!(titles, vec!["登鹳雀楼", "题西林壁", "相思"]);
}

#[test]
fn remove_and_clear_learning_records() {
    let mut store = seeded_store();
    let a = poem(&store, "登鹳雀楼");
    let b = poem(&store, "相思");

    {
        let mut mutations = MutationService::new(&mut store);
        mutations.record_view(&a, false, "");
        mutations.record_view(&b, true, "背熟了");

        assert!(mutations.remove_learning_record(&a));
        assert!(!mutations.remove_learning_record(&a));
    }
    assert_eq!(QueryService::new(&store).learning_record_for(&a), None);
    assert_eq!(record_count(&store), 1);

    assert_eq!(MutationService::new(&mut store).clear_learning_records(), 1);
    assert!(QueryService::new(&store).learning_records().is_empty());
    assert_eq!(MutationService::new(&mut store).clear_learning_records(), 0);
}

#[test]
fn viewing_unknown_poem_leaves_history_untouched() {
    let mut store = seeded_store();
    let mut ghost = poem(&store, "相思");
    ghost.id = uuid::Uuid::new_v4();

    MutationService::new(&mut store).record_view(&ghost, true, "不存在");
    assert_eq!(record_count(&store), 0);
}
