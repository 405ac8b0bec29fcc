use setsync_models::ContentSet;
use std::sync::{Arc, Mutex, PoisonError};

/// A [`ContentSet`] shared between its owner and in-flight resolutions.
///
/// Cloning is cheap and every clone refers to the same set. The lock is
/// synchronous and is only ever held for the duration of a field update,
/// never across an `.await`.
#[derive(Debug, Clone, Default)]
pub struct SharedSet(Arc<Mutex<ContentSet>>);
impl SharedSet {
    pub fn new(set: ContentSet) -> Self {
        Self(Arc::new(Mutex::new(set)))
    }

    /// Run `f` with exclusive access to the set.
    ///
    /// A panic in another holder doesn't make the set unusable: every update
    /// made under this lock is a complete field assignment, so the data is
    /// consistent even if the lock is poisoned.
    pub fn with<R>(&self, f: impl FnOnce(&mut ContentSet) -> R) -> R {
        let mut guard = self.0.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut guard)
    }

    pub fn len(&self) -> usize {
        self.with(|set| set.len())
    }

    pub fn is_empty(&self) -> bool {
        self.with(|set| set.is_empty())
    }

    /// Copy of the set as it is right now.
    pub fn snapshot(&self) -> ContentSet {
        self.with(|set| set.clone())
    }

    /// Take the set back, cloning only if other handles are still alive.
    pub fn into_inner(self) -> ContentSet {
        match Arc::try_unwrap(self.0) {
            Ok(mutex) => mutex.into_inner().unwrap_or_else(PoisonError::into_inner),
            Err(shared) => Self(shared).snapshot(),
        }
    }
}
impl From<ContentSet> for SharedSet {
    fn from(set: ContentSet) -> Self {
        Self::new(set)
    }
}
