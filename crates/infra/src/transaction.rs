//! Single-document read-modify-write on top of compare-and-set.

use brewstock_core::{DomainError, DomainResult, Versioned};

use crate::store::{Document, DocumentStore, StoreError};

/// Read `id`, compute the next value with `f`, and write it back only if
/// nobody else wrote in between. Lost races are retried up to `max_attempts`
/// times; `f` runs once per attempt against a fresh read and may abort the
/// transaction by returning an error (nothing is written in that case).
pub fn run_transaction<D, S, F>(store: &S, id: &D::Id, max_attempts: u32, mut f: F) -> DomainResult<Versioned<D>>
where
    D: Document,
    S: DocumentStore<D> + ?Sized,
    F: FnMut(&D) -> DomainResult<D>,
{
    for attempt in 1..=max_attempts {
        let current = store.get(id)?.ok_or(DomainError::NotFound)?;
        let next = f(&current.value)?;
        match store.replace(next, current.expected()) {
            Ok(committed) => return Ok(committed),
            Err(StoreError::Concurrency(reason)) => {
                tracing::debug!(attempt, %reason, "transaction lost a race, retrying");
                std::thread::yield_now();
            }
            Err(err) => return Err(err.into()),
        }
    }

    Err(DomainError::conflict(format!(
        "transaction gave up after {max_attempts} attempts"
    )))
}
