use bookquery::catalog::{self, Outcome, Statement, find_entry};
use bookquery::collection::Collection;
use bookquery::fixtures::{books_to_documents, sample_books, seed_collection};
use bookquery::query::{DeleteReport, UpdateReport};
use bson::{Bson, Document as BsonDocument};

fn books() -> Collection {
    let col = Collection::new("books".into());
    seed_collection(&col, books_to_documents(&sample_books()).unwrap());
    col
}

fn run_on(col: &Collection, name: &str) -> Outcome {
    find_entry(name).unwrap().statement.run(col).unwrap()
}

fn docs(name: &str) -> Vec<BsonDocument> {
    match run_on(&books(), name) {
        Outcome::Documents(d) => d,
        other => panic!("{name} returned {other:?}"),
    }
}

fn num(v: &Bson) -> f64 {
    match v {
        Bson::Int32(i) => f64::from(*i),
        Bson::Int64(i) => *i as f64,
        Bson::Double(f) => *f,
        other => panic!("not a number: {other:?}"),
    }
}

fn titles(docs: &[BsonDocument]) -> Vec<String> {
    docs.iter().map(|d| d.get_str("title").unwrap().to_string()).collect()
}

#[test]
fn every_statement_parses() {
    for entry in catalog::catalog() {
        entry
            .statement
            .validate()
            .unwrap_or_else(|e| panic!("{} does not parse: {e}", entry.name));
    }
}

#[test]
fn every_statement_runs_against_fresh_fixtures() {
    for entry in catalog::catalog() {
        let col = books();
        entry.statement.run(&col).unwrap_or_else(|e| panic!("{} failed: {e}", entry.name));
    }
}

#[test]
fn projection_returns_exactly_title_author_price() {
    let out = docs("find-projection");
    assert_eq!(out.len(), sample_books().len());
    for d in &out {
        let mut keys: Vec<&str> = d.keys().map(String::as_str).collect();
        keys.sort_unstable();
        assert_eq!(keys, ["author", "price", "title"]);
    }
}

#[test]
fn decade_grouping_buckets_1993_into_1990() {
    let out = docs("books-by-decade");
    let nineties = out.iter().find(|d| num(d.get("_id").unwrap()) == 1990.0).unwrap();
    assert_eq!(num(nineties.get("count").unwrap()), 1.0);
    assert!(out.iter().all(|d| num(d.get("_id").unwrap()) % 10.0 == 0.0));
    let ids: Vec<f64> = out.iter().map(|d| num(d.get("_id").unwrap())).collect();
    assert!(ids.windows(2).all(|w| w[0] < w[1]));
    let total: f64 = out.iter().map(|d| num(d.get("count").unwrap())).sum();
    assert_eq!(total, sample_books().len() as f64);
}

#[test]
fn top_author_is_the_single_clear_maximum() {
    let out = docs("top-author");
    assert_eq!(out.len(), 1);
    assert_eq!(out[0].get_str("_id").unwrap(), "George Orwell");
    assert_eq!(num(out[0].get("count").unwrap()), 3.0);
}

#[test]
fn autor_update_matches_nothing() {
    let col = books();
    let out = run_on(&col, "update-price");
    assert_eq!(out, Outcome::Updated(UpdateReport { matched: 0, modified: 0 }));
    let harper = col
        .get_all_documents()
        .into_iter()
        .find(|d| d.data.get_str("author").ok() == Some("Harper Lee"))
        .unwrap();
    assert_eq!(harper.data.get_f64("price").unwrap(), 12.99);
}

#[test]
fn corrected_author_update_would_match_one() {
    let col = books();
    let fixed = Statement::UpdateOne {
        filter: bson::doc! {"author": "Harper Lee"},
        update: bson::doc! {"$set": {"price": 15}},
    };
    assert_eq!(fixed.run(&col).unwrap(), Outcome::Updated(UpdateReport { matched: 1, modified: 1 }));
}

#[test]
fn basic_finds() {
    assert_eq!(titles(&docs("find-by-genre")), ["Moby Dick", "Treasure Island"]);
    assert_eq!(titles(&docs("find-by-author")), ["To Kill a Mockingbird"]);
    let before = docs("find-published-before");
    assert_eq!(before.len(), 10);
    assert!(before.iter().all(|d| num(d.get("published_year").unwrap()) < 2010.0));
    assert_eq!(titles(&docs("find-in-stock-recent")), ["The Martian", "Project Hail Mary"]);
}

#[test]
fn delete_by_title_removes_one() {
    let col = books();
    assert_eq!(run_on(&col, "delete-by-title"), Outcome::Deleted(DeleteReport { deleted: 1 }));
    assert_eq!(col.len(), sample_books().len() - 1);
    assert_eq!(run_on(&col, "delete-by-title"), Outcome::Deleted(DeleteReport { deleted: 0 }));
}

#[test]
fn sorting_by_price() {
    let asc = docs("sort-price-asc");
    let desc = docs("sort-price-desc");
    assert_eq!(asc.first().unwrap().get_str("title").unwrap(), "Treasure Island");
    assert_eq!(desc.first().unwrap().get_str("title").unwrap(), "Project Hail Mary");
    let prices: Vec<f64> = asc.iter().map(|d| num(d.get("price").unwrap())).collect();
    assert!(prices.windows(2).all(|w| w[0] <= w[1]));
}

#[test]
fn second_page_is_items_six_to_ten() {
    let expected: Vec<String> = sample_books()[5..10].iter().map(|b| b.title.clone()).collect();
    assert_eq!(titles(&docs("paginate-page-2")), expected);
}

#[test]
fn average_price_per_genre() {
    let out = docs("avg-price-by-genre");
    assert_eq!(out.len(), 10);
    let avg = |genre: &str| {
        num(out.iter().find(|d| d.get_str("_id").ok() == Some(genre)).unwrap().get("avgPrice").unwrap())
    };
    assert!((avg("Adventure") - 10.5).abs() < 1e-9);
    assert!((avg("Science Fiction") - 16.995).abs() < 1e-9);
    assert!((avg("Fiction") - 12.99).abs() < 1e-9);
}

#[test]
fn explain_switches_from_collscan_to_ixscan() {
    let col = books();
    let Outcome::Explained(before) = run_on(&col, "explain-title") else { panic!("not an explain") };
    assert_eq!(before.query_planner.winning_plan.leaf().name(), "COLLSCAN");
    assert_eq!(before.execution_stats.total_docs_examined, 12);
    assert_eq!(before.execution_stats.n_returned, 1);

    assert_eq!(run_on(&col, "index-title"), Outcome::IndexCreated("title_1".into()));
    let Outcome::Explained(after) = run_on(&col, "explain-title") else { panic!("not an explain") };
    assert_eq!(after.query_planner.winning_plan.index_name(), Some("title_1"));
    assert_eq!(after.query_planner.winning_plan.name(), "FETCH");
    assert_eq!(after.execution_stats.total_keys_examined, 1);
    assert_eq!(after.execution_stats.total_docs_examined, 1);
    assert_eq!(after.execution_stats.n_returned, 1);

    let json = Outcome::Explained(after).to_json().unwrap();
    assert_eq!(json["queryPlanner"]["winningPlan"]["inputStage"]["stage"], "IXSCAN");
    assert_eq!(json["executionStats"]["nReturned"], 1);
}

#[test]
fn compound_index_is_named_from_its_keys() {
    let col = books();
    assert_eq!(
        run_on(&col, "index-author-year"),
        Outcome::IndexCreated("author_1_published_year_-1".into())
    );
    // re-creating is a no-op with the same name
    assert_eq!(
        run_on(&col, "index-author-year"),
        Outcome::IndexCreated("author_1_published_year_-1".into())
    );
    assert_eq!(col.list_indexes().len(), 1);
}

#[test]
fn shell_rendering_keeps_literal_arguments() {
    let shell = find_entry("find-published-before").unwrap().statement.to_shell("books");
    assert_eq!(shell, "db.books.find({ published_year: { $lt: 2010 } });");
    let top = find_entry("top-author").unwrap().statement.to_shell("books");
    assert!(top.starts_with("db.books.aggregate(["));
    assert!(top.contains("{ $limit: 1 }"));
}
