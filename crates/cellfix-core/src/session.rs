//! Public entry points for location acquisition.
//!
//! A [`LocationSession`] owns the worker thread and the mailboxes to it.
//! One session per process is the intended shape; every entry point takes
//! `&self` and may be called from any thread.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

use arc_swap::ArcSwap;
use thiserror::Error;
use tracing::{info, trace};

use crate::channel::{mailbox, MailboxReceiver, MailboxSender, Take};
use crate::config::LocationConfig;
use crate::modem::{self, detect_variant, ModemVariant};
use crate::platform::{AntennaPower, CellularPort, EventPublisher};
use crate::point::{LocationPoint, LocationResult};
use crate::publish;
use crate::worker::{self, AcquireRequest, Delivery, WorkerCommand};

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("failed to spawn location worker: {0}")]
    Spawn(#[from] std::io::Error),
}

/// State shared between the facade and the worker thread.
pub(crate) struct SessionShared {
    pub port: Arc<dyn CellularPort>,
    pub antenna: Option<Arc<dyn AntennaPower>>,
    pub publisher: Option<Arc<dyn EventPublisher>>,
    pub acquiring: AtomicBool,
    pub config: ArcSwap<LocationConfig>,
    variant: Mutex<ModemVariant>,
    req_id: AtomicU32,
}

impl SessionShared {
    pub(crate) fn variant(&self) -> ModemVariant {
        *self.variant.lock().unwrap()
    }

    /// Resolve and cache the modem variant. `Unknown` is never cached as a
    /// terminal answer; any other resolution is sticky.
    pub(crate) fn resolve_variant(&self) -> ModemVariant {
        let mut cached = self.variant.lock().unwrap();
        if *cached != ModemVariant::Unknown {
            return *cached;
        }
        let model = self.port.device_model();
        let detected = detect_variant(self.port.is_on(), model.as_deref());
        if detected != ModemVariant::Unknown {
            *cached = detected;
        }
        detected
    }

    /// Publish one point under the `loc` topic; the sequence number only
    /// advances when the publisher accepted the event.
    pub(crate) fn publish_point(&self, point: &LocationPoint) {
        let Some(publisher) = &self.publisher else {
            return;
        };
        let seq = self.req_id.load(Ordering::Relaxed);
        info!("publishing loc event");
        if publisher.publish(publish::TOPIC, &publish::build_payload(point, seq)) {
            self.req_id.store(seq.wrapping_add(1), Ordering::Relaxed);
        }
    }
}

/// Owner of the acquisition worker and the public operation surface.
pub struct LocationSession {
    shared: Arc<SessionShared>,
    commands: MailboxSender<WorkerCommand>,
    replies: MailboxReceiver<(LocationResult, LocationPoint)>,
    worker: Option<JoinHandle<()>>,
}

impl LocationSession {
    /// Spawn the worker thread. It serves requests until the session is
    /// dropped.
    pub fn new(
        port: Arc<dyn CellularPort>,
        antenna: Option<Arc<dyn AntennaPower>>,
        publisher: Option<Arc<dyn EventPublisher>>,
    ) -> Result<Self, SessionError> {
        let shared = Arc::new(SessionShared {
            port,
            antenna,
            publisher,
            acquiring: AtomicBool::new(false),
            config: ArcSwap::from_pointee(LocationConfig::default()),
            variant: Mutex::new(ModemVariant::Unknown),
            req_id: AtomicU32::new(1),
        });
        let (command_tx, command_rx) = mailbox();
        let (reply_tx, reply_rx) = mailbox();
        let worker_shared = shared.clone();
        let worker = std::thread::Builder::new()
            .name("gnss-cellular".into())
            .spawn(move || worker::worker_loop(worker_shared, command_rx, reply_tx))?;

        Ok(Self {
            shared,
            commands: command_tx,
            replies: reply_rx,
            worker: Some(worker),
        })
    }

    /// Apply a configuration, replacing any previous one wholesale.
    ///
    /// When the modem is already on and its variant has not been resolved
    /// yet, detection runs now and a constellation-capable modem receives
    /// the constellation selection immediately, independent of any
    /// acquisition.
    pub fn begin(&self, config: LocationConfig) {
        info!("beginning location session");
        if let Some(antenna) = &self.shared.antenna {
            info!("configuring antenna power pin");
            antenna.configure();
        }
        self.shared.config.store(Arc::new(config));

        if self.shared.port.is_on() && self.shared.variant() == ModemVariant::Unknown {
            info!("detecting modem variant");
            let variant = self.shared.resolve_variant();
            if variant.supports_constellation_config() {
                let set = self.shared.config.load().constellations();
                self.shared
                    .port
                    .send_command(&modem::constellation_select_command(set));
            }
        }
    }

    /// Reject a request before any state mutation, or pass it through.
    fn check_preconditions(&self) -> Option<LocationResult> {
        if !self.shared.port.is_on() {
            trace!("modem is not on");
            return Some(LocationResult::Unavailable);
        }
        if !self.shared.resolve_variant().is_resolved() {
            trace!("modem is not supported");
            return Some(LocationResult::Unsupported);
        }
        if self.shared.acquiring.load(Ordering::SeqCst) {
            trace!("acquisition is already underway");
            return Some(LocationResult::Pending);
        }
        None
    }

    /// Acquire a position, blocking until the attempt concludes.
    ///
    /// The returned point is only meaningful on [`LocationResult::Fixed`].
    /// A reply that never arrives within `max_fix_wait` plus one poll
    /// interval degrades to [`LocationResult::Idle`]. With `publish` set, a
    /// fixed point is published before returning, provided connectivity is
    /// up.
    pub fn get_location(&self, publish: bool) -> (LocationResult, LocationPoint) {
        if let Some(rejected) = self.check_preconditions() {
            return (rejected, LocationPoint::default());
        }
        trace!("starting synchronous acquisition");
        let config = self.shared.config.load_full();
        // drop a stale reply a previous caller never collected
        while let Take::Value(_) = self.replies.take(Duration::ZERO) {}
        let request = AcquireRequest {
            point: LocationPoint::default(),
            delivery: Delivery::SyncReply,
            publish: false,
        };
        if !self
            .commands
            .send_within(WorkerCommand::Acquire(request), Duration::ZERO)
        {
            return (LocationResult::Pending, LocationPoint::default());
        }

        let wait = config.max_fix_wait() + config.poll_interval();
        let (result, point) = match self.replies.take(wait) {
            Take::Value(reply) => reply,
            Take::Empty | Take::Closed => (LocationResult::Idle, LocationPoint::default()),
        };

        if publish && result == LocationResult::Fixed && self.shared.port.is_connected() {
            self.shared.publish_point(&point);
        }
        (result, point)
    }

    /// Acquire a position asynchronously.
    ///
    /// Returns [`LocationResult::Acquiring`] on acceptance (or an early
    /// rejection); `callback` then fires exactly once from the worker
    /// thread with the outcome and the point. With `publish` set, a fixed
    /// point is published before the callback runs.
    pub fn get_location_async(
        &self,
        callback: impl FnOnce(LocationResult, LocationPoint) + Send + 'static,
        publish: bool,
    ) -> LocationResult {
        if let Some(rejected) = self.check_preconditions() {
            return rejected;
        }
        trace!("starting asynchronous acquisition");
        let request = AcquireRequest {
            point: LocationPoint::default(),
            delivery: Delivery::Callback(Box::new(callback)),
            publish,
        };
        if !self
            .commands
            .send_within(WorkerCommand::Acquire(request), Duration::ZERO)
        {
            return LocationResult::Pending;
        }
        LocationResult::Acquiring
    }

    /// Lock-free acquisition status: [`LocationResult::Acquiring`] while an
    /// attempt runs, [`LocationResult::Idle`] otherwise.
    pub fn get_status(&self) -> LocationResult {
        if self.shared.acquiring.load(Ordering::SeqCst) {
            LocationResult::Acquiring
        } else {
            LocationResult::Idle
        }
    }
}

impl Drop for LocationSession {
    fn drop(&mut self) {
        let _ = self.commands.send(WorkerCommand::Exit);
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}
