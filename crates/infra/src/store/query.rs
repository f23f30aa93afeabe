//! Ordered queries with simple predicates.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::r#trait::Document;

/// Ordering by creation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    #[default]
    NewestFirst,
    OldestFirst,
}

type Predicate<D> = Arc<dyn Fn(&D) -> bool + Send + Sync>;

/// A query over one collection: optional predicate, `created_until`
/// (inclusive), creation-time ordering and a limit.
pub struct Query<D> {
    predicate: Option<Predicate<D>>,
    created_until: Option<DateTime<Utc>>,
    order: SortOrder,
    limit: Option<usize>,
}

impl<D> Clone for Query<D> {
    fn clone(&self) -> Self {
        Self {
            predicate: self.predicate.clone(),
            created_until: self.created_until,
            order: self.order,
            limit: self.limit,
        }
    }
}

impl<D> core::fmt::Debug for Query<D> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Query")
            .field("filtered", &self.predicate.is_some())
            .field("created_until", &self.created_until)
            .field("order", &self.order)
            .field("limit", &self.limit)
            .finish()
    }
}

impl<D> Default for Query<D> {
    fn default() -> Self {
        Self {
            predicate: None,
            created_until: None,
            order: SortOrder::default(),
            limit: None,
        }
    }
}

impl<D: Document> Query<D> {
    /// Every document, newest first.
    pub fn all() -> Self {
        Self::default()
    }

    pub fn oldest_first() -> Self {
        Self {
            order: SortOrder::OldestFirst,
            ..Self::default()
        }
    }

    /// Add a predicate. Multiple calls are AND-ed.
    pub fn filter(mut self, predicate: impl Fn(&D) -> bool + Send + Sync + 'static) -> Self {
        self.predicate = Some(match self.predicate.take() {
            Some(prev) => Arc::new(move |d: &D| prev(d) && predicate(d)),
            None => Arc::new(predicate),
        });
        self
    }

    pub fn created_until(mut self, until: DateTime<Utc>) -> Self {
        self.created_until = Some(until);
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn order(&self) -> SortOrder {
        self.order
    }

    pub fn max_rows(&self) -> Option<usize> {
        self.limit
    }

    pub fn matches(&self, doc: &D) -> bool {
        if self.created_until.is_some_and(|until| doc.created_at() > until) {
            return false;
        }
        self.predicate.as_ref().is_none_or(|p| p(doc))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use brewstock_core::Entity;
    use chrono::TimeZone;

    #[derive(Debug, Clone)]
    struct Note {
        id: u32,
        at: DateTime<Utc>,
    }

    impl Entity for Note {
        type Id = u32;

        fn id(&self) -> &u32 {
            &self.id
        }

        fn created_at(&self) -> DateTime<Utc> {
            self.at
        }
    }

    fn note(id: u32, day: u32) -> Note {
        Note {
            id,
            at: Utc.with_ymd_and_hms(2025, 1, day, 0, 0, 0).unwrap(),
        }
    }

    #[test]
    fn filters_are_combined() {
        let q = Query::<Note>::all().filter(|n| n.id > 1).filter(|n| n.id < 4);
        assert!(!q.matches(&note(1, 1)));
        assert!(q.matches(&note(2, 1)));
        assert!(!q.matches(&note(4, 1)));
    }

    #[test]
    fn created_until_is_inclusive() {
        let cutoff = Utc.with_ymd_and_hms(2025, 1, 2, 0, 0, 0).unwrap();
        let q = Query::<Note>::oldest_first().created_until(cutoff);
        assert!(q.matches(&note(1, 2)));
        assert!(!q.matches(&note(2, 3)));
        assert_eq!(q.order(), SortOrder::OldestFirst);
    }
}
