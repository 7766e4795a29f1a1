//! In-memory tables backing the demo resource routers.

use dashmap::{mapref::entry::Entry, DashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::models::{Comment, Post, Record, RecordStatus, User};

/// Concurrent table with sequential ids starting at 1
#[derive(Debug)]
pub struct InMemoryTable<T> {
    rows: DashMap<u64, T>,
    next_id: AtomicU64,
}

impl<T: Record> Default for InMemoryTable<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Record> InMemoryTable<T> {
    pub fn new() -> Self {
        Self {
            rows: DashMap::new(),
            next_id: AtomicU64::new(1),
        }
    }

    /// Allocate an id and store the row built from it
    pub fn insert_with<F>(&self, build: F) -> T
    where
        F: FnOnce(u64) -> T,
    {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let row = build(id);
        self.rows.insert(id, row.clone());
        row
    }

    pub fn get_active(&self, id: u64) -> Option<T> {
        self.rows
            .get(&id)
            .filter(|row| row.is_active())
            .map(|row| row.value().clone())
    }

    pub fn exists(&self, id: u64) -> bool {
        self.get_active(id).is_some()
    }

    /// Active rows ordered by id
    pub fn list_active(&self) -> Vec<T> {
        let mut rows: Vec<T> = self
            .rows
            .iter()
            .filter(|row| row.is_active())
            .map(|row| row.value().clone())
            .collect();
        rows.sort_by_key(|row| row.id());
        rows
    }

    /// Apply `change` to an active row; `None` when it is missing or deleted
    pub fn update<F>(&self, id: u64, change: F) -> Option<T>
    where
        F: FnOnce(&mut T),
    {
        let mut row = self.rows.get_mut(&id)?;
        if !row.is_active() {
            return None;
        }
        change(row.value_mut());
        Some(row.value().clone())
    }

    pub fn soft_delete(&self, id: u64) -> bool {
        self.update(id, |row| row.set_status(RecordStatus::Deleted))
            .is_some()
    }
}

/// Tables shared by the users, posts and comments routers
#[derive(Debug, Clone, Default)]
pub struct BlogStore {
    pub users: Arc<InMemoryTable<User>>,
    pub posts: Arc<InMemoryTable<Post>>,
    pub comments: Arc<InMemoryTable<Comment>>,
    /// Lowercased email -> id of the active user holding it
    emails: Arc<DashMap<String, u64>>,
}

impl BlogStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert the user built by `build` unless `email` is already held.
    ///
    /// The index entry stays locked until the row exists, so two concurrent
    /// creates with one email cannot both succeed.
    pub fn insert_user<F>(&self, email: &str, build: F) -> Option<User>
    where
        F: FnOnce(u64) -> User,
    {
        match self.emails.entry(email.to_string()) {
            Entry::Occupied(_) => None,
            Entry::Vacant(slot) => {
                let user = self.users.insert_with(build);
                slot.insert(user.id);
                Some(user)
            }
        }
    }

    /// Reserve `email` for `user_id`; false when another user holds it
    pub fn claim_email(&self, email: &str, user_id: u64) -> bool {
        match self.emails.entry(email.to_string()) {
            Entry::Occupied(owner) => *owner.get() == user_id,
            Entry::Vacant(slot) => {
                slot.insert(user_id);
                true
            }
        }
    }

    /// Drop `email` from the index if `user_id` still holds it
    pub fn release_email(&self, email: &str, user_id: u64) {
        self.emails.remove_if(email, |_, owner| *owner == user_id);
    }
}
