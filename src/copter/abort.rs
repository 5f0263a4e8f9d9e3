use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Operator abort request, checked by the control loop at every tick.
///
/// Clones share the same flag, so one can be raised from a signal handler while the
/// flight runs on another thread.
#[derive(Clone, Debug, Default)]
pub struct AbortSignal {
    raised: Arc<AtomicBool>,
}

impl AbortSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn raise(&self) {
        self.raised.store(true, Ordering::SeqCst);
    }

    pub fn is_raised(&self) -> bool {
        self.raised.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::AbortSignal;

    #[test]
    fn clones_share_the_flag() {
        let signal = AbortSignal::new();
        let handle = signal.clone();
        assert!(!signal.is_raised());

        std::thread::spawn(move || handle.raise()).join().unwrap();
        assert!(signal.is_raised());
    }
}
