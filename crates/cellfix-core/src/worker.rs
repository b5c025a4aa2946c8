//! The acquisition worker.
//!
//! One long-lived thread owns the modem's GNSS session. It blocks on the
//! request mailbox while idle and drives the poll state machine for one
//! acquisition at a time; a second request is rejected at the facade while
//! the acquiring flag is up.

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use chrono::Utc;
use tracing::trace;

use crate::channel::{MailboxReceiver, MailboxSender, Take};
use crate::gate::FixGate;
use crate::modem;
use crate::parse::{self, CmeError};
use crate::point::{LocationPoint, LocationResult};
use crate::session::SessionShared;

/// Idle wait on the request mailbox per wakeup.
const IDLE_POLL: Duration = Duration::from_secs(1);
/// Antenna rail settling time after power-on.
const ANTENNA_SETTLING: Duration = Duration::from_millis(100);

/// Completion delivery for one acquisition.
pub(crate) enum Delivery {
    /// Push the outcome into the reply mailbox.
    SyncReply,
    /// Invoke from the worker thread; fires exactly once.
    Callback(Box<dyn FnOnce(LocationResult, LocationPoint) + Send>),
}

/// One acquisition order. Consumed exactly once by the worker; the point
/// moves in with the request and back out with the completion.
pub(crate) struct AcquireRequest {
    pub point: LocationPoint,
    pub delivery: Delivery,
    pub publish: bool,
}

pub(crate) enum WorkerCommand {
    Acquire(AcquireRequest),
    Exit,
}

pub(crate) fn worker_loop(
    shared: Arc<SessionShared>,
    commands: MailboxReceiver<WorkerCommand>,
    replies: MailboxSender<(LocationResult, LocationPoint)>,
) {
    loop {
        match commands.take(IDLE_POLL) {
            Take::Value(WorkerCommand::Acquire(request)) => {
                run_acquisition(&shared, request, &replies);
            }
            Take::Value(WorkerCommand::Exit) | Take::Closed => break,
            Take::Empty => {}
        }
    }
    trace!("location worker exiting");
}

/// Clears the acquiring flag and antenna power on every exit path from an
/// acquisition, including panics in the completion callback.
struct AcquireGuard<'a> {
    shared: &'a SessionShared,
}

impl Drop for AcquireGuard<'_> {
    fn drop(&mut self) {
        self.shared.acquiring.store(false, Ordering::SeqCst);
        if let Some(antenna) = &self.shared.antenna {
            antenna.power_off();
        }
    }
}

fn run_acquisition(
    shared: &SessionShared,
    mut request: AcquireRequest,
    replies: &MailboxSender<(LocationResult, LocationPoint)>,
) {
    shared.acquiring.store(true, Ordering::SeqCst);
    let _guard = AcquireGuard { shared };

    if let Some(antenna) = &shared.antenna {
        antenna.power_on();
        thread::sleep(ANTENNA_SETTLING);
    }

    let config = shared.config.load_full();
    let variant = shared.variant();

    trace!("started acquisition");
    shared.port.send_command(modem::CMD_SESSION_START);
    if variant.supports_estimation_error() {
        shared.port.send_command(modem::CMD_ESTIMATION_ERROR_ENABLE);
    }
    if variant.supports_constellation_config() {
        shared
            .port
            .send_command(&modem::constellation_select_command(config.constellations()));
    }

    let point = &mut request.point;
    let mut gate = FixGate::begin(Instant::now());
    let mut response = LocationResult::TimedOut;
    let mut power;

    loop {
        power = shared.port.is_on();
        if !power {
            break;
        }
        if gate.elapsed(Instant::now()) >= config.max_fix_wait() {
            break;
        }

        let raw = shared.port.send_command(modem::CMD_FIX_QUERY);
        let line = parse::strip_cr_lf(&raw);
        let mut fixed_this_poll = false;
        if let Some(report) = parse::parse_fix_report(&line) {
            report.apply_to(point);
            if report.fix != 0 {
                fixed_this_poll = true;
                if gate.observe_fix(Instant::now()) {
                    point.system_time = Some(Utc::now().timestamp());
                }
            }
        } else if parse::parse_cme_error(&line) == Some(CmeError::NoFix) {
            // the engine is running but has no solution yet
            point.fix = 0;
        }

        if variant.supports_estimation_error() {
            let raw = shared.port.send_command(modem::CMD_ESTIMATION_ERROR_QUERY);
            if let Some(estimate) = parse::parse_estimation_error(&parse::strip_cr_lf(&raw)) {
                point.horizontal_accuracy = estimate.h_acc;
                point.vertical_accuracy = estimate.v_acc;
            }
        }

        if gate.accepts(fixed_this_poll, point, &config) {
            response = LocationResult::Fixed;
            break;
        }
        thread::sleep(config.poll_interval());
    }

    shared.port.send_command(modem::CMD_SESSION_END);

    // modem-off takes precedence over the timeout outcome
    if !power && response != LocationResult::Fixed {
        response = LocationResult::Unavailable;
    }
    if let Some(ttff) = gate.time_to_first_fix() {
        point.time_to_first_fix = ttff;
    }

    let AcquireRequest {
        point,
        delivery,
        publish,
    } = request;

    match delivery {
        Delivery::SyncReply => {
            trace!("sending synchronous completion");
            // a full reply slot means the caller already gave up
            let _ = replies.send_within((response, point), Duration::ZERO);
        }
        Delivery::Callback(callback) => {
            if publish && response == LocationResult::Fixed && shared.port.is_connected() {
                shared.publish_point(&point);
            }
            trace!("sending asynchronous completion");
            callback(response, point);
        }
    }
}
