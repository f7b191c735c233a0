use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};

/// Loading spinner state shared between nested operations.
///
/// Each [`show`](LoadingIndicator::show) returns a guard; the indicator is
/// visible while any guard is alive.
#[derive(Debug, Clone, Default)]
pub struct LoadingIndicator {
    depth: Arc<AtomicUsize>,
}

impl LoadingIndicator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn show(&self) -> LoadingGuard {
        self.depth.fetch_add(1, Ordering::SeqCst);
        LoadingGuard {
            depth: Arc::clone(&self.depth),
        }
    }

    pub fn is_visible(&self) -> bool {
        self.depth.load(Ordering::SeqCst) > 0
    }
}

#[must_use = "the indicator hides as soon as the guard is dropped"]
#[derive(Debug)]
pub struct LoadingGuard {
    depth: Arc<AtomicUsize>,
}

impl Drop for LoadingGuard {
    fn drop(&mut self) {
        self.depth.fetch_sub(1, Ordering::SeqCst);
    }
}
