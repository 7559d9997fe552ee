use super::Book;
use fake::Fake;
use fake::faker::lorem::en::Words;
use fake::faker::name::en::Name;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const GENRES: &[&str] = &[
    "Adventure",
    "Fiction",
    "Fantasy",
    "Science Fiction",
    "Mystery",
    "Romance",
    "Dystopian",
    "Biography",
];

fn title_case(words: &[String]) -> String {
    words
        .iter()
        .map(|w| {
            let mut chars = w.chars();
            chars.next().map_or_else(String::new, |c| c.to_uppercase().chain(chars).collect())
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Synthetic books. The same `seed` always yields the same books.
#[must_use]
pub fn generate_books(n: usize, seed: u64) -> Vec<Book> {
    let mut rng = StdRng::seed_from_u64(seed);
    // a small author pool so grouping by author has repeats
    let authors: Vec<String> =
        (0..(n / 3).max(1)).map(|_| Name().fake_with_rng(&mut rng)).collect();
    (0..n)
        .map(|_| {
            let words: Vec<String> = Words(2..5).fake_with_rng(&mut rng);
            let cents: u32 = rng.random_range(499..=4999);
            Book {
                title: title_case(&words),
                author: authors[rng.random_range(0..authors.len())].clone(),
                genre: GENRES[rng.random_range(0..GENRES.len())].to_string(),
                published_year: rng.random_range(1800..=2024),
                price: f64::from(cents) / 100.0,
                in_stock: rng.random_bool(0.7),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeded_generation_is_deterministic() {
        let a = generate_books(20, 7);
        let b = generate_books(20, 7);
        assert_eq!(a, b);
        assert_eq!(a.len(), 20);
        assert!(a.iter().all(|b| (1800..=2024).contains(&b.published_year)));
        assert!(a.iter().all(|b| (4.99..=49.99).contains(&b.price)));
        assert!(generate_books(0, 1).is_empty());
    }

    #[test]
    fn titles_are_capitalized() {
        assert_eq!(title_case(&["brave".into(), "new".into()]), "Brave New");
    }
}
