use bookquery::Database;
use bookquery::catalog::Outcome;
use bookquery::errors::DbError;
use bookquery::query::{FindOptions, parse_filter, parse_update};
use bson::doc;

#[test]
fn database_facade_routes_by_collection_name() {
    let db = Database::with_sample_books("books").unwrap();
    assert_eq!(db.list_collection_names(), ["books"]);
    let f = parse_filter(&doc! {"genre": "Adventure"}).unwrap();
    assert_eq!(db.count("books", &f).unwrap(), 2);
    assert_eq!(db.find("books", &f, &FindOptions::default()).unwrap().remaining(), 2);
    assert!(matches!(db.count("nope", &f), Err(DbError::NoSuchCollection(_))));

    let upd = parse_update(&doc! {"$inc": {"price": 1}}).unwrap();
    assert_eq!(db.update_many("books", &f, &upd).unwrap().modified, 2);
    assert_eq!(db.delete_one("books", &f).unwrap().deleted, 1);
    assert_eq!(db.delete_many("books", &f).unwrap().deleted, 1);
}

#[test]
fn statements_run_through_the_facade() {
    let db = Database::with_sample_books("books").unwrap();
    match db.run_statement("books", "top-author").unwrap() {
        Outcome::Documents(d) => assert_eq!(d[0].get_str("_id").unwrap(), "George Orwell"),
        other => panic!("unexpected {other:?}"),
    }
    assert!(matches!(db.run_statement("books", "nope"), Err(DbError::NoSuchStatement(_))));
    assert!(matches!(db.run_statement("other", "top-author"), Err(DbError::NoSuchCollection(_))));
}

#[test]
fn collections_can_be_renamed_and_dropped() {
    let db = Database::new();
    db.create_collection("drafts").unwrap();
    db.rename_collection("drafts", "books").unwrap();
    assert!(db.get_collection("drafts").is_none());
    assert_eq!(db.get_collection("books").unwrap().name_str(), "books");
    assert!(db.delete_collection("books"));
    assert!(db.list_collection_names().is_empty());
}

#[test]
fn facade_covers_update_aggregate_and_explain() {
    let db = Database::with_sample_books("books").unwrap();
    let lee = parse_filter(&doc! {"author": "Harper Lee"}).unwrap();
    let upd = parse_update(&doc! {"$set": {"price": 15}}).unwrap();
    let report = db.update_one("books", &lee, &upd).unwrap();
    assert_eq!((report.matched, report.modified), (1, 1));

    let pipeline = bookquery::aggregate::parse_pipeline(&[doc! {"$count": "n"}]).unwrap();
    let counted = db.aggregate("books", &pipeline).unwrap();
    assert_eq!(counted.len(), 1);

    let explained = db.explain("books", &lee, &FindOptions::default()).unwrap();
    assert_eq!(explained.query_planner.winning_plan.name(), "COLLSCAN");
    assert_eq!(explained.execution_stats.n_returned, 1);
    assert!(matches!(db.aggregate("nope", &pipeline), Err(DbError::NoSuchCollection(_))));
}
