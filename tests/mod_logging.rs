use bookquery::collection::Collection;
use bookquery::document::Document;
use bookquery::logger;
use bookquery::query::{FindOptions, parse_filter};
use bson::doc;

// The global logger can only be installed once per process; only this test installs it.
#[test]
fn audit_and_metrics_lines_are_routed_to_their_files() {
    let dir = tempfile::tempdir().unwrap();
    logger::configure_logging(Some(dir.path()), Some("info"), Some(2)).unwrap();

    let col = Collection::new("books".into());
    col.insert_document(Document::new(doc! {"title": "1984"}));
    col.create_index(&doc! {"title": 1}).unwrap();
    let f = parse_filter(&doc! {"title": "1984"}).unwrap();
    bookquery::query::explain_find(&col, &f, &FindOptions::default());
    log::info!("application line");
    log::logger().flush();

    let read = |name: &str| std::fs::read_to_string(dir.path().join(name)).unwrap();
    let audit = read("audit.log");
    assert!(audit.contains("\"op\":\"insert\""));
    assert!(!audit.contains("index_build"));
    let metrics = read("metrics.log");
    assert!(metrics.contains("index_build"));
    assert!(metrics.contains("\"stage\":\"IXSCAN\""));
    let app = read("app.log");
    assert!(app.contains("application line"));
    assert!(!app.contains("\"op\":\"insert\""));

    // a second configuration keeps the first logger
    let other = tempfile::tempdir().unwrap();
    logger::configure_logging(Some(other.path()), Some("debug"), None).unwrap();
    log::info!("still routed to the first directory");
    log::logger().flush();
    assert!(read("app.log").contains("still routed"));
}

#[test]
fn devlog_lines_are_captured_per_thread() {
    let _guard = bookquery::utils::devlog::enable_thread_sink();
    let col = Collection::new("books".into());
    col.insert_document(Document::new(doc! {"title": "Emma"}));
    bookquery::query::count_docs(&col, &parse_filter(&doc! {}).unwrap());
    let lines = bookquery::utils::devlog::drain();
    assert!(lines.iter().any(|l| l.contains("\"op\":\"count\"")));
}
