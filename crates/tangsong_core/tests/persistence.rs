use tangsong_core::{
    ensure_seeded, AuthorRepository, MutationService, PoemRepository, PoetryStore, QueryService,
    RepoError, SeedReport, SeedSource, SqliteAuthorRepository, SqlitePoemRepository,
};

const SEED_JSON: &str = r#"[
    {"title": "示儿", "author": "陆游", "dynasty": "宋", "content": "死去元知万事空，\n但悲不见九州同。"},
    {"title": "过零丁洋", "author": "文天祥", "dynasty": "宋", "content": "人生自古谁无死？\n留取丹心照汗青。"}
]"#;

#[test]
fn catalog_and_user_state_survive_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tangsong.sqlite3");
    let source = SeedSource::Json(SEED_JSON.to_string());

    let (poem_id, author_id) = {
        let mut store = PoetryStore::open(&path).unwrap();
        assert!(matches!(
            ensure_seeded(&mut store, &source),
            SeedReport::Seeded { poems: 2, authors: 2 }
        ));
        let shi_er = QueryService::new(&store)
            .search_poems(Some("示儿"), 1)
            .remove(0);
        let mut mutations = MutationService::new(&mut store);
        assert!(mutations.toggle_favorite(&shi_er));
        mutations.record_view(&shi_er, true, "家祭无忘告乃翁");
        (shi_er.id, shi_er.author.id)
    };

    let mut store = PoetryStore::open(&path).unwrap();
    assert_eq!(ensure_seeded(&mut store, &source), SeedReport::AlreadySeeded);

    let query = QueryService::new(&store);
    let shi_er = query.poem(poem_id).unwrap();
    assert_eq!(shi_er.author.id, author_id);
    assert_eq!(shi_er.lines().len(), 2);
    assert!(query.is_favorite(&shi_er));

    let record = query.learning_record_for(&shi_er).unwrap();
    assert!(record.is_memorized);
    assert_eq!(record.notes.as_deref(), Some("家祭无忘告乃翁"));
}

#[test]
fn referenced_poem_cannot_be_deleted() {
    let mut store = PoetryStore::open_in_memory().unwrap();
    ensure_seeded(&mut store, &SeedSource::Json(SEED_JSON.to_string()));
    let shi_er = QueryService::new(&store)
        .search_poems(Some("示儿"), 1)
        .remove(0);
    assert!(MutationService::new(&mut store).toggle_favorite(&shi_er));

    let result = store.write(|tx| -> Result<(), RepoError> {
        SqlitePoemRepository::try_new(tx)?.delete_poem(shi_er.id)
    });
    assert!(matches!(result, Err(RepoError::PoemReferenced(id)) if id == shi_er.id));
    assert!(QueryService::new(&store).poem(shi_er.id).is_some());

    assert!(!MutationService::new(&mut store).toggle_favorite(&shi_er));
    store
        .write(|tx| -> Result<(), RepoError> {
            SqlitePoemRepository::try_new(tx)?.delete_poem(shi_er.id)
        })
        .unwrap();
    assert_eq!(QueryService::new(&store).poem(shi_er.id), None);
}

#[test]
fn author_with_poems_cannot_be_deleted() {
    let mut store = PoetryStore::open_in_memory().unwrap();
    ensure_seeded(&mut store, &SeedSource::Json(SEED_JSON.to_string()));
    let poem = QueryService::new(&store)
        .search_poems(Some("过零丁洋"), 1)
        .remove(0);
    let author_id = poem.author.id;

    let result = store.write(|tx| -> Result<(), RepoError> {
        SqliteAuthorRepository::try_new(tx)?.delete_author(author_id)
    });
    assert!(matches!(result, Err(RepoError::AuthorReferenced(id)) if id == author_id));

    store
        .write(|tx| -> Result<(), RepoError> {
            SqlitePoemRepository::try_new(tx)?.delete_poem(poem.id)?;
            SqliteAuthorRepository::try_new(tx)?.delete_author(author_id)
        })
        .unwrap();
    assert_eq!(QueryService::new(&store).author(author_id), None);
}

#[test]
fn failed_unit_of_work_leaves_committed_state_untouched() {
    let mut store = PoetryStore::open_in_memory().unwrap();
    ensure_seeded(&mut store, &SeedSource::Json(SEED_JSON.to_string()));

    let result = store.write(|tx| -> Result<(), RepoError> {
        let poems = SqlitePoemRepository::try_new(tx)?;
        let all = poems.list_poems(&Default::default())?;
        poems.delete_poem(all[0].id)?;
        Err(RepoError::InvalidData("abort".to_string()))
    });
    assert!(result.is_err());

    let remaining = SqlitePoemRepository::try_new(store.connection())
        .unwrap()
        .count_poems()
        .unwrap();
    assert_eq!(remaining, 2);
}
