//! Hardware event monitoring.
//!
//! A [`HotplugSource`] delivers raw bus notifications on its own thread. The
//! [`HardwareMonitor`] feeds arrivals through the session store's classifier, resets
//! the session on removals, and fans the resulting [`DeviceEvent`]s out to every
//! subscriber channel.

pub mod usb;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::JoinHandle;

use tracing::{info, warn};

use crate::app::error::AppError;
use crate::app::models::{DeviceEvent, DeviceKey};
use crate::app::session::SessionStore;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HotplugEvent {
    Arrived {
        key: DeviceKey,
        name: String,
        description: String,
    },
    Removed {
        key: DeviceKey,
    },
}

pub type HotplugSink = Arc<dyn Fn(HotplugEvent) + Send + Sync>;

/// Handle returned by [`HotplugSource::subscribe`].
pub struct Subscription {
    stop_flag: Arc<AtomicBool>,
    join: Option<JoinHandle<()>>,
}

impl Subscription {
    pub fn new(stop_flag: Arc<AtomicBool>, join: Option<JoinHandle<()>>) -> Self {
        Self { stop_flag, join }
    }

    /// The watcher thread may be parked in the OS until the next bus event; it is only
    /// joined when it has already finished.
    pub fn unsubscribe(mut self) {
        self.stop_flag.store(true, Ordering::Relaxed);
        if let Some(join) = self.join.take() {
            if join.is_finished() {
                let _ = join.join();
            }
        }
    }
}

pub trait HotplugSource: Send + Sync {
    fn subscribe(&self, sink: HotplugSink) -> Result<Subscription, AppError>;
}

/// For hosts without a notification facility.
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledSource;

impl HotplugSource for DisabledSource {
    fn subscribe(&self, _sink: HotplugSink) -> Result<Subscription, AppError> {
        Err(AppError::unsupported_platform(
            "hardware notifications are disabled on this host",
            "",
        ))
    }
}

type Subscribers = Arc<Mutex<Vec<Sender<DeviceEvent>>>>;

pub struct HardwareMonitor {
    store: Arc<SessionStore>,
    subscribers: Subscribers,
    subscription: Mutex<Option<Subscription>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl HardwareMonitor {
    pub fn new(store: Arc<SessionStore>) -> Self {
        Self {
            store,
            subscribers: Arc::new(Mutex::new(Vec::new())),
            subscription: Mutex::new(None),
        }
    }

    pub fn subscribe(&self) -> Receiver<DeviceEvent> {
        let (tx, rx) = channel();
        lock(&self.subscribers).push(tx);
        rx
    }

    pub fn is_running(&self) -> bool {
        lock(&self.subscription).is_some()
    }

    /// Failure to subscribe is logged and swallowed; monitoring is not retried.
    pub fn start(&self, source: &dyn HotplugSource) -> bool {
        let mut slot = lock(&self.subscription);
        if slot.is_some() {
            return true;
        }
        let store = Arc::clone(&self.store);
        let subscribers = Arc::clone(&self.subscribers);
        let sink: HotplugSink = Arc::new(move |event| dispatch(&store, &subscribers, event));
        match source.subscribe(sink) {
            Ok(subscription) => {
                info!("hardware monitoring started");
                *slot = Some(subscription);
                true
            }
            Err(err) => {
                warn!(error = %err, code = %err.code, "hardware monitoring unavailable");
                false
            }
        }
    }

    pub fn stop(&self) {
        if let Some(subscription) = lock(&self.subscription).take() {
            subscription.unsubscribe();
            info!("hardware monitoring stopped");
        }
    }
}

impl Drop for HardwareMonitor {
    fn drop(&mut self) {
        self.stop();
    }
}

fn dispatch(store: &SessionStore, subscribers: &Subscribers, event: HotplugEvent) {
    let outgoing = match event {
        HotplugEvent::Arrived {
            key,
            name,
            description,
        } => store
            .attach(Some(key), &name, &description)
            .map(DeviceEvent::Attached),
        HotplugEvent::Removed { key } => store
            .detach(Some(&key))
            .map(|session| DeviceEvent::Detached { session }),
    };
    let Some(outgoing) = outgoing else {
        return;
    };
    lock(subscribers).retain(|tx| tx.send(outgoing.clone()).is_ok());
}
