use super::statement::Statement;
use bson::doc;
use once_cell::sync::Lazy;
use serde::Serialize;
use std::fmt;

/// Thematic grouping of the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Section {
    BasicCrud,
    AdvancedQueries,
    Aggregation,
    Indexing,
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::BasicCrud => "Basic CRUD Operations",
            Self::AdvancedQueries => "Advanced Queries",
            Self::Aggregation => "Aggregation Pipelines",
            Self::Indexing => "Indexing",
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CatalogEntry {
    pub name: &'static str,
    pub section: Section,
    pub description: &'static str,
    pub statement: Statement,
}

fn find(filter: bson::Document) -> Statement {
    Statement::Find { filter, projection: None, sort: None, skip: None, limit: None }
}

fn entry(
    name: &'static str,
    section: Section,
    description: &'static str,
    statement: Statement,
) -> CatalogEntry {
    CatalogEntry { name, section, description, statement }
}

static CATALOG: Lazy<Vec<CatalogEntry>> = Lazy::new(build);

// The filters below are kept exactly as written in the assignment, including
// the `autor` field name and the `$lt` comparison on the "after" query.
fn build() -> Vec<CatalogEntry> {
    use Section::{AdvancedQueries, Aggregation, BasicCrud, Indexing};
    vec![
        entry(
            "find-by-genre",
            BasicCrud,
            "Find all books in a specific genre",
            find(doc! {"genre": "Adventure"}),
        ),
        entry(
            "find-published-before",
            BasicCrud,
            "Find books published after a certain year",
            find(doc! {"published_year": {"$lt": 2010}}),
        ),
        entry(
            "find-by-author",
            BasicCrud,
            "Find books by a specific author",
            find(doc! {"author": "Harper Lee"}),
        ),
        entry(
            "update-price",
            BasicCrud,
            "Update the price of a specific book",
            Statement::UpdateOne {
                filter: doc! {"autor": "Harper Lee"},
                update: doc! {"$set": {"price": 15}},
            },
        ),
        entry(
            "delete-by-title",
            BasicCrud,
            "Delete a book by its title",
            Statement::DeleteOne { filter: doc! {"title": "Moby Dick"} },
        ),
        entry(
            "find-in-stock-recent",
            AdvancedQueries,
            "Books that are in stock and published after 2010",
            find(doc! {"in_stock": true, "published_year": {"$gt": 2010}}),
        ),
        entry(
            "find-projection",
            AdvancedQueries,
            "Return only title, author and price",
            Statement::Find {
                filter: doc! {},
                projection: Some(doc! {"title": 1, "author": 1, "price": 1, "_id": 0}),
                sort: None,
                skip: None,
                limit: None,
            },
        ),
        entry(
            "sort-price-asc",
            AdvancedQueries,
            "Sort by price ascending",
            Statement::Find {
                filter: doc! {},
                projection: None,
                sort: Some(doc! {"price": 1}),
                skip: None,
                limit: None,
            },
        ),
        entry(
            "sort-price-desc",
            AdvancedQueries,
            "Sort by price descending",
            Statement::Find {
                filter: doc! {},
                projection: None,
                sort: Some(doc! {"price": -1}),
                skip: None,
                limit: None,
            },
        ),
        entry(
            "paginate-page-2",
            AdvancedQueries,
            "Pagination, 5 books per page, page 2",
            Statement::Find {
                filter: doc! {},
                projection: None,
                sort: None,
                skip: Some(5),
                limit: Some(5),
            },
        ),
        entry(
            "avg-price-by-genre",
            Aggregation,
            "Average price of books by genre",
            Statement::Aggregate {
                pipeline: vec![doc! {"$group": {"_id": "$genre", "avgPrice": {"$avg": "$price"}}}],
            },
        ),
        entry(
            "top-author",
            Aggregation,
            "Author with the most books",
            Statement::Aggregate {
                pipeline: vec![
                    doc! {"$group": {"_id": "$author", "count": {"$sum": 1}}},
                    doc! {"$sort": {"count": -1}},
                    doc! {"$limit": 1},
                ],
            },
        ),
        entry(
            "books-by-decade",
            Aggregation,
            "Group books by publication decade and count them",
            Statement::Aggregate {
                pipeline: vec![
                    doc! {"$project": {"decade": {
                        "$subtract": ["$published_year", {"$mod": ["$published_year", 10]}]
                    }}},
                    doc! {"$group": {"_id": "$decade", "count": {"$sum": 1}}},
                    doc! {"$sort": {"_id": 1}},
                ],
            },
        ),
        entry(
            "index-title",
            Indexing,
            "Create an index on title",
            Statement::CreateIndex { keys: doc! {"title": 1} },
        ),
        entry(
            "index-author-year",
            Indexing,
            "Compound index on author and published_year",
            Statement::CreateIndex { keys: doc! {"author": 1, "published_year": -1} },
        ),
        entry(
            "explain-title",
            Indexing,
            "Inspect the plan chosen for a title lookup",
            Statement::Explain { filter: doc! {"title": "1984"} },
        ),
    ]
}

/// All statements in source order.
#[must_use]
pub fn catalog() -> &'static [CatalogEntry] {
    &CATALOG
}

#[must_use]
pub fn find_entry(name: &str) -> Option<&'static CatalogEntry> {
    CATALOG.iter().find(|e| e.name == name)
}

/// Entries of one section, in source order.
pub fn section(section: Section) -> impl Iterator<Item = &'static CatalogEntry> {
    CATALOG.iter().filter(move |e| e.section == section)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn names_are_unique_and_sections_ordered() {
        let names: HashSet<_> = catalog().iter().map(|e| e.name).collect();
        assert_eq!(names.len(), catalog().len());
        assert_eq!(catalog().len(), 16);
        let sections: Vec<Section> = catalog().iter().map(|e| e.section).collect();
        let mut sorted = sections.clone();
        sorted.sort_by_key(|s| *s as u8);
        assert_eq!(sections, sorted);
        assert_eq!(section(Section::Indexing).count(), 3);
    }

    #[test]
    fn autor_typo_is_kept() {
        let e = find_entry("update-price").unwrap();
        match &e.statement {
            Statement::UpdateOne { filter, .. } => {
                assert!(filter.contains_key("autor"));
                assert!(!filter.contains_key("author"));
            }
            other => panic!("unexpected statement {other:?}"),
        }
        assert!(find_entry("no-such-thing").is_none());
    }
}
