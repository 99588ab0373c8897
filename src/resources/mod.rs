//! In-memory stores for backend resources.
//!
//! Each store mirrors one backend collection. Async operations go through
//! the HTTP adapter and reconcile the cached copy; failures are recorded in
//! store state rather than propagated, so consumers observe
//! `is_loading`/`error` instead of catching errors.

mod dashboard;
mod investors;
mod projects;

pub use dashboard::{DashboardService, DashboardState};
pub use investors::{InvestorFilters, InvestorService, InvestorsState};
pub use projects::{ProjectFilters, ProjectService, ProjectsState};

use uuid::Uuid;

/// Entities addressable by id inside a cached collection.
pub trait Keyed {
    fn key(&self) -> Uuid;
}

/// Reconciliation operations applied to a cached collection.
#[derive(Debug, Clone)]
pub enum CacheOp<T> {
    /// Replace the whole collection with a fresh fetch result. Stale items
    /// absent from the new result disappear; nothing is merged.
    Replace(Vec<T>),
    /// Insert a newly created entity at the front (newest-first is a
    /// presentation convenience, not a backend-confirmed order).
    Prepend(T),
    /// Replace the matching entity in place; entities with other ids are
    /// left untouched. No-op when the id is not cached.
    Update(T),
    /// Remove exactly the matching entity, preserving the order of the
    /// remainder.
    Remove(Uuid),
}

/// Applies one reconciliation step to a cached collection.
pub fn reconcile<T: Keyed>(items: &mut Vec<T>, op: CacheOp<T>) {
    match op {
        CacheOp::Replace(fresh) => *items = fresh,
        CacheOp::Prepend(entity) => items.insert(0, entity),
        CacheOp::Update(entity) => {
            if let Some(slot) = items.iter_mut().find(|item| item.key() == entity.key()) {
                *slot = entity;
            }
        }
        CacheOp::Remove(id) => items.retain(|item| item.key() != id),
    }
}
