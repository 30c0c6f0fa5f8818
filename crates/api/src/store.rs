//! Generated articles kept for download.

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;
use uuid::Uuid;

/// Bounded in-memory store; inserting past capacity drops the oldest article.
#[derive(Debug)]
pub struct ArticleStore {
    capacity: usize,
    articles: Mutex<VecDeque<(String, Arc<str>)>>,
}

impl ArticleStore {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            articles: Mutex::new(VecDeque::with_capacity(capacity)),
        }
    }

    /// Store an article and return its id.
    pub fn insert(&self, article: impl Into<Arc<str>>) -> String {
        let id = Uuid::new_v4().to_string();
        let mut articles = self.articles.lock();
        if articles.len() >= self.capacity {
            articles.pop_front();
        }
        articles.push_back((id.clone(), article.into()));
        id
    }

    pub fn get(&self, id: &str) -> Option<Arc<str>> {
        self.articles
            .lock()
            .iter()
            .find(|(stored, _)| stored == id)
            .map(|(_, article)| article.clone())
    }

    pub fn len(&self) -> usize {
        self.articles.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.articles.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn returns_stored_article() {
        let store = ArticleStore::new(4);
        let id = store.insert("# Title");
        assert_eq!(store.get(&id).as_deref(), Some("# Title"));
        assert!(store.get("unknown").is_none());
    }

    #[test]
    fn oldest_article_is_evicted() {
        let store = ArticleStore::new(2);
        let first = store.insert("one");
        let second = store.insert("two");
        let third = store.insert("three");

        assert_eq!(store.len(), 2);
        assert!(store.get(&first).is_none());
        assert_eq!(store.get(&second).as_deref(), Some("two"));
        assert_eq!(store.get(&third).as_deref(), Some("three"));
    }

    #[test]
    fn ids_are_unique() {
        let store = ArticleStore::new(8);
        assert_ne!(store.insert("a"), store.insert("a"));
    }
}
