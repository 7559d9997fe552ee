use bookquery::collection::Collection;
use bookquery::document::Document;
use bookquery::errors::DbError;
use bookquery::index::{IndexManager, IndexSpec, index_insert_all, index_remove_all};
use bookquery::query::{self, FindOptions, Order, parse_filter, parse_update};
use bookquery::types::DocumentId;
use bson::{Bson, doc};

fn library() -> Collection {
    let col = Collection::new("books".into());
    for (title, author, year) in [
        ("Emma", "Jane Austen", 1815),
        ("Persuasion", "Jane Austen", 1817),
        ("Dune", "Frank Herbert", 1965),
        ("Dune Messiah", "Frank Herbert", 1969),
    ] {
        col.insert_document(Document::new(doc! {"title": title, "author": author, "published_year": year}));
    }
    col
}

fn leaf_index(col: &Collection, filter: bson::Document) -> Option<String> {
    let report = query::explain_find(col, &parse_filter(&filter).unwrap(), &FindOptions::default());
    report.query_planner.winning_plan.index_name().map(str::to_string)
}

#[test]
fn spec_parsing_and_naming() {
    let spec = IndexSpec::from_document(&doc! {"author": 1, "published_year": -1}).unwrap();
    assert_eq!(spec.default_name(), "author_1_published_year_-1");
    assert_eq!(spec.fields(), ["author", "published_year"]);
    assert_eq!(spec.keys[1].1, Order::Desc);
    assert_eq!(spec.key_pattern(), doc! {"author": 1, "published_year": -1});
    assert!(IndexSpec::from_document(&doc! {}).is_err());
    assert!(IndexSpec::from_document(&doc! {"title": "text"}).is_err());
}

#[test]
fn manager_lookup_and_removal() {
    let mut mgr = IndexManager::new();
    let spec = IndexSpec::from_document(&doc! {"k": 1}).unwrap();
    assert!(mgr.create_index("k_1", spec.clone()).unwrap());
    assert!(!mgr.create_index("k_1", spec).unwrap());
    let mut ids = Vec::new();
    for i in 0..20i32 {
        let id = DocumentId::new();
        let k = i % 5;
        index_insert_all(&mut mgr, &doc! {"k": k}, &id);
        ids.push((id, i));
    }
    let idx = mgr.get_mut("k_1").unwrap();
    let scan = idx.lookup_prefix_eq(&[Bson::Int32(3)]).unwrap();
    assert_eq!(scan.ids.len(), 4);
    // numeric keys compare by value across types
    let scan = idx.lookup_prefix_eq(&[Bson::Double(3.0)]).unwrap();
    assert_eq!(scan.ids.len(), 4);
    for (id, _) in ids.iter().filter(|(_, i)| i % 5 == 3) {
        index_remove_all(&mut mgr, &doc! {"k": 3}, id);
    }
    let idx = mgr.get_mut("k_1").unwrap();
    assert!(idx.lookup_prefix_eq(&[Bson::Int32(3)]).unwrap().ids.is_empty());
    assert!(mgr.drop_index("k_1"));
    assert!(mgr.get("k_1").is_none());
}

#[test]
fn conflicting_definitions_are_rejected() {
    let col = library();
    col.create_index_named("by_title", IndexSpec::from_document(&doc! {"title": 1}).unwrap()).unwrap();
    let err = col
        .create_index_named("by_title", IndexSpec::from_document(&doc! {"title": -1}).unwrap())
        .unwrap_err();
    assert!(matches!(err, DbError::IndexConflict(_)));
    assert!(matches!(col.drop_index("nope"), Err(DbError::NoSuchIndex(_))));
}

#[test]
fn planner_prefers_longest_equality_prefix() {
    let col = library();
    assert_eq!(leaf_index(&col, doc! {"author": "Frank Herbert"}), None);
    col.create_index(&doc! {"author": 1}).unwrap();
    col.create_index(&doc! {"author": 1, "published_year": -1}).unwrap();
    assert_eq!(leaf_index(&col, doc! {"author": "Frank Herbert"}).as_deref(), Some("author_1"));
    assert_eq!(
        leaf_index(&col, doc! {"author": "Frank Herbert", "published_year": 1965}).as_deref(),
        Some("author_1_published_year_-1")
    );
    // a range predicate cannot drive an equality probe
    assert_eq!(leaf_index(&col, doc! {"published_year": {"$gt": 1900}}), None);
}

#[test]
fn indexed_results_match_collection_scan() {
    let col = library();
    let filter = parse_filter(&doc! {"author": "Jane Austen"}).unwrap();
    let scanned = query::find_docs(&col, &filter, &FindOptions::default()).into_bson();
    col.create_index(&doc! {"author": 1}).unwrap();
    let indexed = query::find_docs(&col, &filter, &FindOptions::default()).into_bson();
    assert_eq!(scanned, indexed);
    assert_eq!(indexed.len(), 2);
}

#[test]
fn indexes_follow_updates_and_deletes() {
    let col = library();
    col.create_index(&doc! {"title": 1}).unwrap();
    let set = parse_update(&doc! {"$set": {"title": "Emma (Annotated)"}}).unwrap();
    let report = query::update_one(&col, &parse_filter(&doc! {"title": "Emma"}).unwrap(), &set).unwrap();
    assert_eq!(report.modified, 1);
    let old = parse_filter(&doc! {"title": "Emma"}).unwrap();
    let new = parse_filter(&doc! {"title": "Emma (Annotated)"}).unwrap();
    assert_eq!(query::count_docs(&col, &old), 0);
    assert_eq!(query::count_docs(&col, &new), 1);

    let del = query::delete_one(&col, &new);
    assert_eq!(del.deleted, 1);
    let report = query::explain_find(&col, &new, &FindOptions::default());
    assert_eq!(report.query_planner.winning_plan.index_name(), Some("title_1"));
    assert_eq!(report.execution_stats.n_returned, 0);
    assert_eq!(report.execution_stats.total_keys_examined, 0);
}

#[test]
fn list_indexes_reports_key_patterns() {
    let col = library();
    col.create_index(&doc! {"title": 1}).unwrap();
    col.create_index(&doc! {"author": 1, "published_year": -1}).unwrap();
    let names: Vec<String> = col.list_indexes().into_iter().map(|d| d.name).collect();
    assert_eq!(names, ["title_1", "author_1_published_year_-1"]);
    col.drop_index("title_1").unwrap();
    assert_eq!(col.list_indexes().len(), 1);
}
