//! A thread-safe handle around one [`Model`].
//!
//! The model itself is single-threaded. When several threads need the same
//! model, each mutate-then-notify sequence must be atomic, otherwise a binding
//! could observe a half-applied write. [`SharedModel`] takes one coarse lock
//! per call.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::{Model, PathBuf, Value};
use crate::Result;

/// Cloneable, lock-guarded access to a [`Model`].
///
/// ```
/// use livemodel::model::{Model, SharedModel, Value};
/// # fn main() -> livemodel::Result<()> {
/// let shared = SharedModel::new(Model::new());
/// let other = shared.clone();
///
/// std::thread::spawn(move || other.set("count", 1)).join().unwrap()?;
/// assert_eq!(shared.get("count")?, Some(Value::Int(1)));
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct SharedModel {
    inner: Arc<Mutex<Model>>,
}

impl SharedModel {
    pub fn new(model: Model) -> Self {
        Self {
            inner: Arc::new(Mutex::new(model)),
        }
    }

    /// Runs `f` with exclusive access, for batches that must not interleave.
    pub fn with<R>(&self, f: impl FnOnce(&mut Model) -> R) -> R {
        f(&mut self.lock())
    }

    pub fn init(&self, doc: impl Into<Value>) {
        self.lock().init(doc);
    }

    pub fn get(&self, path: impl Into<PathBuf>) -> Result<Option<Value>> {
        self.lock().get(path)
    }

    pub fn set(&self, path: impl Into<PathBuf>, value: impl Into<Value>) -> Result<()> {
        self.lock().set(path, value)
    }

    pub fn push(&self, path: impl Into<PathBuf>, value: impl Into<Value>) -> Result<()> {
        self.lock().push(path, value)
    }

    // A panic inside an adapter or function leaves the tree consistent (writes
    // land before notification), so a poisoned lock is still usable.
    fn lock(&self) -> MutexGuard<'_, Model> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl From<Model> for SharedModel {
    fn from(model: Model) -> Self {
        Self::new(model)
    }
}
