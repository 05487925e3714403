use super::{DtmfDetectorListener, ToneSymbol};
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, RwLock};
use tracing::{debug, warn};

type ListenerRef = Arc<dyn DtmfDetectorListener>;

/// Copy-on-write set of listeners.
///
/// Writers replace the whole list under a short write lock; a notification
/// pass takes a snapshot and iterates it without holding any lock, so
/// listeners may register or unregister (even from inside a callback) while
/// a pass is in progress. Listeners are identified by the address of their
/// shared allocation.
#[derive(Default)]
pub struct ListenerRegistry {
    listeners: RwLock<Arc<Vec<ListenerRef>>>,
}

fn same_listener<L: ?Sized>(registered: &ListenerRef, listener: &Arc<L>) -> bool {
    Arc::as_ptr(registered) as *const () == Arc::as_ptr(listener) as *const ()
}

impl ListenerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `listener` unless it is already registered.
    pub fn register(&self, listener: ListenerRef) -> bool {
        let mut guard = self.listeners.write().unwrap_or_else(|e| e.into_inner());
        if guard.iter().any(|l| same_listener(l, &listener)) {
            return false;
        }
        let mut updated = Vec::with_capacity(guard.len() + 1);
        updated.extend(guard.iter().cloned());
        updated.push(listener.clone());
        *guard = Arc::new(updated);
        debug!(
            "Registered listener DtmfDetectorListener@{:p}. Count: {}",
            Arc::as_ptr(&listener) as *const (),
            guard.len()
        );
        true
    }

    /// Removes `listener` if it is registered.
    pub fn unregister<L>(&self, listener: &Arc<L>) -> bool
    where
        L: DtmfDetectorListener + ?Sized,
    {
        let mut guard = self.listeners.write().unwrap_or_else(|e| e.into_inner());
        if !guard.iter().any(|l| same_listener(l, listener)) {
            return false;
        }
        let updated: Vec<ListenerRef> = guard
            .iter()
            .filter(|l| !same_listener(l, listener))
            .cloned()
            .collect();
        *guard = Arc::new(updated);
        debug!(
            "Unregistered listener DtmfDetectorListener@{:p}. Count: {}",
            Arc::as_ptr(listener) as *const (),
            guard.len()
        );
        true
    }

    /// Delivers `tone` to every listener registered when the pass starts.
    /// Returns how many listeners accepted it.
    pub fn notify_all(&self, tone: ToneSymbol) -> usize {
        let snapshot = self.snapshot();
        let mut delivered = 0;
        for listener in snapshot.iter() {
            match panic::catch_unwind(AssertUnwindSafe(|| listener.on_dtmf_detected(tone))) {
                Ok(Ok(())) => delivered += 1,
                Ok(Err(e)) => {
                    warn!(
                        "DtmfDetectorListener@{:p} failed on tone {}: {}",
                        Arc::as_ptr(listener) as *const (),
                        tone,
                        e
                    );
                }
                Err(_) => {
                    warn!(
                        "DtmfDetectorListener@{:p} panicked on tone {}",
                        Arc::as_ptr(listener) as *const (),
                        tone
                    );
                }
            }
        }
        delivered
    }

    pub fn len(&self) -> usize {
        self.snapshot().len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshot().is_empty()
    }

    fn snapshot(&self) -> Arc<Vec<ListenerRef>> {
        self.listeners
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::dtmf::MockDtmfDetectorListener;
    use mockall::predicate::eq;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;

    #[derive(Default)]
    struct CountingListener {
        count: AtomicUsize,
    }

    impl DtmfDetectorListener for CountingListener {
        fn on_dtmf_detected(&self, _tone: ToneSymbol) -> anyhow::Result<()> {
            self.count.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    struct PanickingListener;

    impl DtmfDetectorListener for PanickingListener {
        fn on_dtmf_detected(&self, tone: ToneSymbol) -> anyhow::Result<()> {
            panic!("listener bug on {}", tone)
        }
    }

    #[test]
    fn test_register_is_idempotent() {
        let registry = ListenerRegistry::new();
        let listener = Arc::new(CountingListener::default());

        assert!(registry.register(listener.clone()));
        assert!(!registry.register(listener.clone()));
        assert_eq!(registry.len(), 1);

        registry.notify_all(ToneSymbol::One);
        assert_eq!(listener.count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_unregister_unknown_is_noop() {
        let registry = ListenerRegistry::new();
        let kept = Arc::new(CountingListener::default());
        let stranger = Arc::new(CountingListener::default());
        registry.register(kept.clone());

        assert!(!registry.unregister(&stranger));
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.notify_all(ToneSymbol::Nine), 1);
        assert_eq!(kept.count.load(Ordering::SeqCst), 1);
        assert_eq!(stranger.count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_unregister_through_trait_object() {
        let registry = ListenerRegistry::new();
        let listener: Arc<dyn DtmfDetectorListener> = Arc::new(CountingListener::default());
        registry.register(listener.clone());
        assert!(registry.unregister(&listener));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_failing_listener_does_not_stop_delivery() {
        let registry = ListenerRegistry::new();

        let mut failing = MockDtmfDetectorListener::new();
        failing
            .expect_on_dtmf_detected()
            .with(eq(ToneSymbol::Five))
            .times(1)
            .returning(|_| Err(anyhow::anyhow!("listener gone")));
        let counting = Arc::new(CountingListener::default());

        registry.register(Arc::new(failing));
        registry.register(Arc::new(PanickingListener));
        registry.register(counting.clone());

        assert_eq!(registry.notify_all(ToneSymbol::Five), 1);
        assert_eq!(counting.count.load(Ordering::SeqCst), 1);
    }

    struct SelfRemovingListener {
        registry: Arc<ListenerRegistry>,
        me: std::sync::Mutex<Option<Arc<dyn DtmfDetectorListener>>>,
        count: AtomicUsize,
    }

    impl DtmfDetectorListener for SelfRemovingListener {
        fn on_dtmf_detected(&self, _tone: ToneSymbol) -> anyhow::Result<()> {
            self.count.fetch_add(1, Ordering::SeqCst);
            if let Some(me) = self.me.lock().unwrap().take() {
                self.registry.unregister(&me);
            }
            Ok(())
        }
    }

    #[test]
    fn test_listener_can_unregister_during_notification() {
        let registry = Arc::new(ListenerRegistry::new());
        let listener = Arc::new(SelfRemovingListener {
            registry: registry.clone(),
            me: std::sync::Mutex::new(None),
            count: AtomicUsize::new(0),
        });
        let as_dyn: Arc<dyn DtmfDetectorListener> = listener.clone();
        *listener.me.lock().unwrap() = Some(as_dyn.clone());
        registry.register(as_dyn);

        registry.notify_all(ToneSymbol::A);
        registry.notify_all(ToneSymbol::B);
        assert_eq!(listener.count.load(Ordering::SeqCst), 1);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_concurrent_register_and_notify() {
        let registry = Arc::new(ListenerRegistry::new());
        let listeners: Vec<Arc<CountingListener>> =
            (0..32).map(|_| Arc::new(CountingListener::default())).collect();

        let writer = {
            let registry = registry.clone();
            let listeners = listeners.clone();
            thread::spawn(move || {
                for listener in &listeners {
                    registry.register(listener.clone());
                }
                for listener in listeners.iter().step_by(2) {
                    registry.unregister(listener);
                }
            })
        };
        for _ in 0..1000 {
            registry.notify_all(ToneSymbol::Zero);
        }
        writer.join().unwrap();

        assert_eq!(registry.len(), 16);
        let before: Vec<usize> = listeners
            .iter()
            .map(|l| l.count.load(Ordering::SeqCst))
            .collect();
        registry.notify_all(ToneSymbol::Zero);
        for (i, listener) in listeners.iter().enumerate() {
            let expected = if i % 2 == 0 { before[i] } else { before[i] + 1 };
            assert_eq!(listener.count.load(Ordering::SeqCst), expected);
        }
    }
}
