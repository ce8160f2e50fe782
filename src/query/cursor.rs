use crate::document::Document;

/// A forward-only cursor over materialized query results.
#[derive(Debug, Clone)]
pub struct Cursor {
    docs: Vec<Document>,
    pos: usize,
}

impl Cursor {
    pub(crate) fn new(docs: Vec<Document>) -> Self {
        Self { docs, pos: 0 }
    }

    pub fn advance(&mut self) -> Option<Document> {
        if self.pos >= self.docs.len() {
            return None;
        }
        let doc = self.docs[self.pos].clone();
        self.pos += 1;
        Some(doc)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.docs.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }

    #[must_use]
    pub fn to_vec(self) -> Vec<Document> {
        self.docs
    }
}

impl Iterator for Cursor {
    type Item = Document;
    fn next(&mut self) -> Option<Self::Item> {
        self.advance()
    }
}
