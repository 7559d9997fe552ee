use crate::document::Document;

/// Materialized result set of a `find`.
#[derive(Debug, Clone, Default)]
pub struct Cursor {
    docs: Vec<Document>,
    pos: usize,
}

impl Cursor {
    #[must_use]
    pub const fn new(docs: Vec<Document>) -> Self {
        Self { docs, pos: 0 }
    }

    pub fn advance(&mut self) -> Option<Document> {
        let d = self.docs.get(self.pos)?.clone();
        self.pos += 1;
        Some(d)
    }

    /// Documents not yet consumed.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.docs.len().saturating_sub(self.pos)
    }

    #[must_use]
    pub fn to_vec(mut self) -> Vec<Document> {
        self.docs.split_off(self.pos.min(self.docs.len()))
    }

    /// Just the BSON payloads, as the shell would print them.
    #[must_use]
    pub fn into_bson(self) -> Vec<bson::Document> {
        self.to_vec().into_iter().map(|d| d.data).collect()
    }
}

impl Iterator for Cursor {
    type Item = Document;
    fn next(&mut self) -> Option<Self::Item> {
        self.advance()
    }
}
