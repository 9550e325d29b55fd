use serde::{Deserialize, Serialize};

/// Pages accumulated by a paginated query, oldest first.
///
/// `next_page` is the parameter for the page after the last one loaded, or
/// `None` once the source is exhausted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pages<T, P> {
    pub pages: Vec<T>,
    pub next_page: Option<P>,
}

impl<T, P> Pages<T, P> {
    /// Nothing loaded yet; the first fetch uses `first_page`.
    pub fn start(first_page: P) -> Self {
        Self {
            pages: Vec::new(),
            next_page: Some(first_page),
        }
    }

    pub fn has_next_page(&self) -> bool {
        self.next_page.is_some()
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }
}
