use std::fmt;

/// Handle returned when a watcher is registered, used to remove it again.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WatcherId(u64);

type Watcher<T> = Box<dyn Fn(&T) + Send + Sync + 'static>;

/// Callbacks fired synchronously, in registration order.
pub struct Watchers<T> {
    watchers: Vec<(WatcherId, Watcher<T>)>,
    next_id: u64,
}

impl<T> Default for Watchers<T> {
    fn default() -> Self {
        Self {
            watchers: Vec::new(),
            next_id: 0,
        }
    }
}

impl<T> Watchers<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, watcher: impl Fn(&T) + Send + Sync + 'static) -> WatcherId {
        let id = WatcherId(self.next_id);
        self.next_id += 1;
        self.watchers.push((id, Box::new(watcher)));
        id
    }

    /// Returns false when `id` was never registered or is already removed.
    pub fn remove(&mut self, id: WatcherId) -> bool {
        let before = self.watchers.len();
        self.watchers.retain(|(watcher_id, _)| *watcher_id != id);
        self.watchers.len() != before
    }

    pub fn accept(&self, event: &T) {
        for (_, watcher) in &self.watchers {
            watcher(event);
        }
    }

    pub fn len(&self) -> usize {
        self.watchers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.watchers.is_empty()
    }
}

impl<T> fmt::Debug for Watchers<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Watchers")
            .field("len", &self.watchers.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn fires_in_order_until_removed() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut watchers = Watchers::new();

        let first = {
            let seen = Arc::clone(&seen);
            watchers.add(move |n: &i32| seen.lock().unwrap().push(("first", *n)))
        };
        {
            let seen = Arc::clone(&seen);
            watchers.add(move |n: &i32| seen.lock().unwrap().push(("second", *n)));
        }

        watchers.accept(&1);
        assert!(watchers.remove(first));
        assert!(!watchers.remove(first));
        watchers.accept(&2);

        assert_eq!(
            *seen.lock().unwrap(),
            vec![("first", 1), ("second", 1), ("second", 2)]
        );
        assert_eq!(watchers.len(), 1);
    }
}
