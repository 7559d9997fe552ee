use super::Book;

fn book(title: &str, author: &str, genre: &str, year: i32, price: f64, in_stock: bool) -> Book {
    Book {
        title: title.to_string(),
        author: author.to_string(),
        genre: genre.to_string(),
        published_year: year,
        price,
        in_stock,
    }
}

/// Deterministic seed set. George Orwell has the most titles, "The Giver"
/// falls in the 1990s, and two in-stock titles are newer than 2010.
#[must_use]
pub fn sample_books() -> Vec<Book> {
    vec![
        book("To Kill a Mockingbird", "Harper Lee", "Fiction", 1960, 12.99, true),
        book("1984", "George Orwell", "Dystopian", 1949, 10.99, true),
        book("Moby Dick", "Herman Melville", "Adventure", 1851, 14.5, false),
        book("The Hobbit", "J.R.R. Tolkien", "Fantasy", 1937, 16.25, true),
        book("Animal Farm", "George Orwell", "Political Satire", 1945, 8.5, true),
        book("The Giver", "Lois Lowry", "Young Adult", 1993, 9.99, true),
        book("The Martian", "Andy Weir", "Science Fiction", 2011, 15.0, true),
        book("Pride and Prejudice", "Jane Austen", "Romance", 1813, 7.99, true),
        book("The Road", "Cormac McCarthy", "Post-apocalyptic", 2006, 13.49, false),
        book("Homage to Catalonia", "George Orwell", "Memoir", 1938, 11.75, false),
        book("Treasure Island", "Robert Louis Stevenson", "Adventure", 1883, 6.5, true),
        book("Project Hail Mary", "Andy Weir", "Science Fiction", 2021, 18.99, true),
    ]
}
