use bookquery::collection::Collection;
use bookquery::document::Document;
use bookquery::query::{Filter, FindOptions, Order, SortSpec, compare_bson, find_docs};
use bson::Bson;
use proptest::prelude::*;
use std::cmp::Ordering;

fn price() -> impl Strategy<Value = Bson> {
    prop_oneof![
        any::<i32>().prop_map(Bson::Int32),
        any::<i64>().prop_map(Bson::Int64),
        (-1.0e6f64..1.0e6).prop_map(Bson::Double),
        Just(Bson::Null),
    ]
}

fn seeded(prices: &[Option<Bson>]) -> Collection {
    let col = Collection::new("books".into());
    for (i, p) in prices.iter().enumerate() {
        let mut d = bson::doc! {"seq": i as i64};
        if let Some(p) = p {
            d.insert("price", p.clone());
        }
        col.insert_document(Document::new(d));
    }
    col
}

fn sorted(col: &Collection, order: Order) -> Vec<bson::Document> {
    let opts = FindOptions {
        sort: Some(vec![SortSpec { field: "price".into(), order }]),
        ..FindOptions::default()
    };
    find_docs(col, &Filter::True, &opts).into_bson()
}

fn key(d: &bson::Document) -> Bson {
    d.get("price").cloned().unwrap_or(Bson::Null)
}

proptest! {
    #[test]
    fn prop_ascending_is_non_decreasing(prices in proptest::collection::vec(proptest::option::of(price()), 0..40)) {
        let col = seeded(&prices);
        let docs = sorted(&col, Order::Asc);
        prop_assert_eq!(docs.len(), prices.len());
        for w in docs.windows(2) {
            prop_assert!(compare_bson(&key(&w[0]), &key(&w[1])) != Ordering::Greater);
        }
    }

    #[test]
    fn prop_descending_is_non_increasing(prices in proptest::collection::vec(proptest::option::of(price()), 0..40)) {
        let col = seeded(&prices);
        let docs = sorted(&col, Order::Desc);
        for w in docs.windows(2) {
            prop_assert!(compare_bson(&key(&w[0]), &key(&w[1])) != Ordering::Less);
        }
    }

    #[test]
    fn prop_sort_is_stable(prices in proptest::collection::vec(0i32..4, 0..40)) {
        let values: Vec<Option<Bson>> = prices.into_iter().map(|p| Some(Bson::Int32(p))).collect();
        let col = seeded(&values);
        let docs = sorted(&col, Order::Asc);
        for w in docs.windows(2) {
            if compare_bson(&key(&w[0]), &key(&w[1])) == Ordering::Equal {
                prop_assert!(w[0].get_i64("seq").unwrap() < w[1].get_i64("seq").unwrap());
            }
        }
    }

    #[test]
    fn prop_skip_limit_is_a_window(n in 0usize..30, skip in 0usize..35, limit in 0usize..10) {
        let values: Vec<Option<Bson>> = (0..n).map(|i| Some(Bson::Int64(i as i64))).collect();
        let col = seeded(&values);
        let opts = FindOptions { skip: Some(skip), limit: Some(limit), ..FindOptions::default() };
        let docs = find_docs(&col, &Filter::True, &opts).into_bson();
        let take = if limit == 0 { n } else { limit };
        let expected: Vec<i64> = (0..n as i64).skip(skip).take(take).collect();
        let got: Vec<i64> = docs.iter().map(|d| d.get_i64("seq").unwrap()).collect();
        prop_assert_eq!(got, expected);
    }
}
