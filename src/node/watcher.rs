use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

use hashlink::LinkedHashSet;
use snafu::Whatever;

use crate::path::NodePath;

type Callback = dyn Fn(&NodePath) -> Result<(), Whatever>;

/// A change-notification callback registered on a leaf.
///
/// Watchers compare by identity: clones of one watcher are equal, two
/// watchers built from identical closures are not.
#[derive(Clone)]
pub struct Watcher {
    callback: Rc<Callback>,
}

impl Watcher {
    pub fn new(callback: impl Fn(&NodePath) + 'static) -> Self {
        Self::fallible(move |path| {
            callback(path);
            Ok(())
        })
    }

    /// A watcher whose failure aborts the write notification it runs in.
    pub fn fallible(callback: impl Fn(&NodePath) -> Result<(), Whatever> + 'static) -> Self {
        Self {
            callback: Rc::new(callback),
        }
    }

    pub fn notify(&self, path: &NodePath) -> Result<(), Whatever> {
        (self.callback)(path)
    }

    fn address(&self) -> *const () {
        Rc::as_ptr(&self.callback) as *const ()
    }
}

impl PartialEq for Watcher {
    fn eq(&self, other: &Self) -> bool {
        self.address() == other.address()
    }
}

impl Eq for Watcher {}

impl Hash for Watcher {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.address().hash(state);
    }
}

impl fmt::Debug for Watcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Watcher({:p})", self.address())
    }
}

/// Insertion ordered set of watchers owned by one leaf.
#[derive(Debug, Default)]
pub struct WatcherRegistry {
    watchers: LinkedHashSet<Watcher>,
}

impl WatcherRegistry {
    /// Returns `false` if the watcher was already registered.
    pub fn register(&mut self, watcher: Watcher) -> bool {
        self.watchers.insert(watcher)
    }

    /// Returns `false` if the watcher was not registered.
    pub fn unregister(&mut self, watcher: &Watcher) -> bool {
        self.watchers.remove(watcher)
    }

    pub fn clear(&mut self) {
        self.watchers.clear();
    }

    pub fn len(&self) -> usize {
        self.watchers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.watchers.is_empty()
    }

    /// Copies the current watchers so they can be invoked while the registry
    /// itself is being modified.
    pub fn snapshot(&self) -> Vec<Watcher> {
        self.watchers.iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn clones_are_equal_and_distinct_closures_are_not() {
        let first = Watcher::new(|_| {});
        let second = Watcher::new(|_| {});

        assert_eq!(first, first.clone());
        assert_ne!(first, second);
    }

    #[test]
    fn registry_deduplicates_by_identity() {
        let watcher = Watcher::new(|_| {});
        let mut registry = WatcherRegistry::default();

        assert!(registry.register(watcher.clone()));
        assert!(!registry.register(watcher.clone()));
        assert_eq!(registry.len(), 1);

        assert!(registry.unregister(&watcher));
        assert!(!registry.unregister(&watcher));
        assert!(registry.is_empty());
    }

    #[test]
    fn snapshot_preserves_registration_order() {
        let calls = Rc::new(Cell::new(0u32));
        let order = Rc::new(std::cell::RefCell::new(Vec::new()));
        let mut registry = WatcherRegistry::default();

        for id in 0..3 {
            let order = order.clone();
            let calls = calls.clone();
            registry.register(Watcher::new(move |_| {
                order.borrow_mut().push(id);
                calls.set(calls.get() + 1);
            }));
        }

        let path = NodePath::root();
        for watcher in registry.snapshot() {
            watcher.notify(&path).unwrap();
        }

        assert_eq!(calls.get(), 3);
        assert_eq!(*order.borrow(), vec![0, 1, 2]);
    }
}
