use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};

type Listener = Arc<dyn Fn() + Send + Sync>;

#[derive(Default)]
struct Slots {
    next_id: AtomicU64,
    listeners: Mutex<BTreeMap<u64, Listener>>,
}

/// A change notification with synchronous listeners.
///
/// Listeners run in connection order on the emitting thread. The listener
/// table is not locked while they run, so a listener may connect or
/// disconnect other listeners.
#[derive(Clone, Default)]
pub struct Signal {
    slots: Arc<Slots>,
}

impl Signal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn connect<F>(&self, listener: F) -> Subscription
    where
        F: Fn() + Send + Sync + 'static,
    {
        let id = self.slots.next_id.fetch_add(1, Ordering::Relaxed);
        if let Ok(mut listeners) = self.slots.listeners.lock() {
            listeners.insert(id, Arc::new(listener));
        }

        Subscription {
            slots: Arc::downgrade(&self.slots),
            id,
        }
    }

    pub fn emit(&self) {
        let listeners: Vec<Listener> = match self.slots.listeners.lock() {
            Ok(listeners) => listeners.values().cloned().collect(),
            Err(_) => return,
        };

        for listener in listeners {
            listener();
        }
    }

    pub fn listener_count(&self) -> usize {
        self.slots
            .listeners
            .lock()
            .map(|listeners| listeners.len())
            .unwrap_or_default()
    }
}

impl std::fmt::Debug for Signal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Signal")
            .field("listeners", &self.listener_count())
            .finish()
    }
}

/// Handle returned by [`Signal::connect`]. Dropping it disconnects the
/// listener.
#[must_use = "dropping a subscription disconnects its listener"]
pub struct Subscription {
    slots: Weak<Slots>,
    id: u64,
}

impl Subscription {
    pub fn disconnect(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        let Some(slots) = self.slots.upgrade() else {
            return;
        };
        if let Ok(mut listeners) = slots.listeners.lock() {
            listeners.remove(&self.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn emit_reaches_every_listener() {
        let signal = Signal::new();
        let hits = Arc::new(AtomicUsize::new(0));

        let a = {
            let hits = hits.clone();
            signal.connect(move || {
                hits.fetch_add(1, Ordering::SeqCst);
            })
        };
        let b = {
            let hits = hits.clone();
            signal.connect(move || {
                hits.fetch_add(10, Ordering::SeqCst);
            })
        };

        signal.emit();
        assert_eq!(hits.load(Ordering::SeqCst), 11);

        a.disconnect();
        signal.emit();
        assert_eq!(hits.load(Ordering::SeqCst), 21);

        drop(b);
        assert_eq!(signal.listener_count(), 0);
    }

    #[test]
    fn listener_may_disconnect_others_while_emitting() {
        let signal = Signal::new();
        let held: Arc<Mutex<Option<Subscription>>> = Arc::new(Mutex::new(None));

        let other = signal.connect(|| {});
        *held.lock().unwrap() = Some(other);

        let _sub = {
            let held = held.clone();
            signal.connect(move || {
                held.lock().unwrap().take();
            })
        };

        signal.emit();
        assert_eq!(signal.listener_count(), 1);
    }

    #[test]
    fn subscription_outliving_signal_is_harmless() {
        let signal = Signal::new();
        let sub = signal.connect(|| {});
        drop(signal);
        sub.disconnect();
    }
}
