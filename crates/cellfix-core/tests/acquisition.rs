//! End-to-end acquisition scenarios over a scripted modem.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc, Mutex};
use std::time::Duration;

use cellfix_core::{
    AntennaPower, CellularPort, Constellation, EventPublisher, LocationConfig, LocationPoint,
    LocationResult, LocationSession,
};

const GOOD_FIX: &str =
    "+QGPSLOC: 120000.00,37.12345678,-122.98765432,1.0,12.5,1,070.30,3.6,1.9,070825,07\r\n";
const NO_FIX: &str = "+CME ERROR: 516\r\n";
const EPE: &str = "+QGPSCFG: \"estimation_error\",2.000,3.000,0.10,0.50\r\n";
/// Scripted entry that powers the modem off when reached.
const POWER_OFF: &str = "<power-off>";

fn init_tracing() {
    use tracing_subscriber::EnvFilter;
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .try_init();
}

/// Answers the fix query from a script, everything else with OK, and
/// records every command issued.
struct ScriptedModem {
    on: AtomicBool,
    connected: AtomicBool,
    model: Option<&'static str>,
    fix_responses: Mutex<VecDeque<&'static str>>,
    commands: Mutex<Vec<String>>,
}

impl ScriptedModem {
    fn new(model: Option<&'static str>, fixes: &[&'static str]) -> Arc<Self> {
        Arc::new(Self {
            on: AtomicBool::new(true),
            connected: AtomicBool::new(true),
            model,
            fix_responses: Mutex::new(fixes.iter().copied().collect()),
            commands: Mutex::new(Vec::new()),
        })
    }

    fn commands(&self) -> Vec<String> {
        self.commands.lock().unwrap().clone()
    }

    fn count_of(&self, command: &str) -> usize {
        self.commands().iter().filter(|c| *c == command).count()
    }
}

impl CellularPort for ScriptedModem {
    fn is_on(&self) -> bool {
        self.on.load(Ordering::SeqCst)
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    fn device_model(&self) -> Option<String> {
        self.model.map(str::to_owned)
    }

    fn send_command(&self, command: &str) -> String {
        self.commands.lock().unwrap().push(command.to_owned());
        match command {
            "AT+QGPSLOC=2" => {
                let next = self.fix_responses.lock().unwrap().pop_front().unwrap_or(NO_FIX);
                if next == POWER_OFF {
                    self.on.store(false, Ordering::SeqCst);
                    return NO_FIX.to_owned();
                }
                next.to_owned()
            }
            "AT+QGPSCFG=\"estimation_error\"" => EPE.to_owned(),
            _ => "OK\r\n".to_owned(),
        }
    }
}

#[derive(Default)]
struct RecordingAntenna {
    events: Mutex<Vec<&'static str>>,
}

impl AntennaPower for RecordingAntenna {
    fn configure(&self) {
        self.events.lock().unwrap().push("configure");
    }
    fn power_on(&self) {
        self.events.lock().unwrap().push("on");
    }
    fn power_off(&self) {
        self.events.lock().unwrap().push("off");
    }
}

#[derive(Default)]
struct RecordingPublisher {
    payloads: Mutex<Vec<(String, String)>>,
}

impl EventPublisher for RecordingPublisher {
    fn publish(&self, topic: &str, payload: &str) -> bool {
        self.payloads
            .lock()
            .unwrap()
            .push((topic.to_owned(), payload.to_owned()));
        true
    }
}

fn fast_config() -> LocationConfig {
    LocationConfig::default()
        .with_max_fix_wait(Duration::from_millis(400))
        .with_poll_interval(Duration::from_millis(20))
}

#[test]
fn modem_off_rejects_without_commands() {
    init_tracing();
    let modem = ScriptedModem::new(Some("BG95-M5"), &[]);
    modem.on.store(false, Ordering::SeqCst);
    let session = LocationSession::new(modem.clone(), None, None).unwrap();
    session.begin(fast_config());

    let (result, _point) = session.get_location(false);
    assert_eq!(result, LocationResult::Unavailable);
    assert!(modem.commands().is_empty());
}

#[test]
fn unsupported_modem_rejects() {
    init_tracing();
    let modem = ScriptedModem::new(Some("SARA-R510"), &[]);
    let session = LocationSession::new(modem.clone(), None, None).unwrap();
    session.begin(fast_config());

    let (result, _point) = session.get_location(false);
    assert_eq!(result, LocationResult::Unsupported);
    assert_eq!(modem.count_of("AT+QGPS=1"), 0);
}

#[test]
fn unresolved_model_rejects_but_retries_later() {
    init_tracing();
    // device info never becomes available on this modem
    let modem = ScriptedModem::new(None, &[]);
    let session = LocationSession::new(modem.clone(), None, None).unwrap();
    session.begin(fast_config());

    let (result, _point) = session.get_location(false);
    assert_eq!(result, LocationResult::Unsupported);
    // a second call still probes rather than treating Unknown as final
    let (result, _point) = session.get_location(false);
    assert_eq!(result, LocationResult::Unsupported);
}

#[test]
fn two_settled_polls_produce_a_fix() {
    init_tracing();
    let modem = ScriptedModem::new(Some("BG95-M5"), &[NO_FIX, GOOD_FIX, GOOD_FIX]);
    let antenna = Arc::new(RecordingAntenna::default());
    let session = LocationSession::new(modem.clone(), Some(antenna.clone()), None).unwrap();
    session.begin(fast_config());

    let (result, point) = session.get_location(false);
    assert_eq!(result, LocationResult::Fixed);
    assert_eq!(point.fix, 1);
    assert_eq!(point.latitude, 37.12345678);
    assert_eq!(point.longitude, -122.98765432);
    assert_eq!(point.sats_in_use, 7);
    // estimation error merged from the variant-gated query
    assert_eq!(point.horizontal_accuracy, 2.0);
    assert_eq!(point.vertical_accuracy, 3.0);
    assert!(point.system_time.is_some());
    assert!(point.time_to_first_fix >= 0.0);
    assert!(point.time_to_first_fix < 1.0);

    let commands = modem.commands();
    assert_eq!(modem.count_of("AT+QGPS=1"), 1);
    assert_eq!(modem.count_of("AT+QGPSEND"), 1);
    assert_eq!(modem.count_of("AT+QGPSCFG=\"nmea_epe\",1"), 1);
    // constellation applied at begin() and again at session start
    assert_eq!(modem.count_of("AT+QGPSCFG=\"gnssconfig\",1"), 2);
    assert_eq!(
        commands.iter().filter(|c| *c == "AT+QGPSLOC=2").count(),
        3
    );
    // antenna power cycled around the attempt
    assert_eq!(*antenna.events.lock().unwrap(), vec!["configure", "on", "off"]);
}

#[test]
fn reduced_variant_skips_optional_commands() {
    init_tracing();
    let modem = ScriptedModem::new(Some("EG91"), &[GOOD_FIX, GOOD_FIX]);
    let session = LocationSession::new(modem.clone(), None, None).unwrap();
    session.begin(fast_config());

    let (result, point) = session.get_location(false);
    assert_eq!(result, LocationResult::Fixed);
    // no estimation-error query ran, so accuracy stays unpopulated
    assert_eq!(point.horizontal_accuracy, 0.0);
    assert_eq!(modem.count_of("AT+QGPSCFG=\"nmea_epe\",1"), 0);
    assert_eq!(modem.count_of("AT+QGPSCFG=\"estimation_error\""), 0);
    assert_eq!(modem.count_of("AT+QGPSCFG=\"gnssconfig\",1"), 0);
    assert_eq!(modem.count_of("AT+QGPSEND"), 1);
}

#[test]
fn never_fixing_times_out() {
    init_tracing();
    let modem = ScriptedModem::new(Some("BG95-M5"), &[]);
    let session = LocationSession::new(modem.clone(), None, None).unwrap();
    session.begin(
        LocationConfig::default()
            .with_max_fix_wait(Duration::from_millis(200))
            .with_poll_interval(Duration::from_millis(100)),
    );

    let (result, point) = session.get_location(false);
    assert_eq!(result, LocationResult::TimedOut);
    assert_eq!(point.fix, 0);
    assert_eq!(modem.count_of("AT+QGPSEND"), 1);
}

#[test]
fn modem_off_during_attempt_overrides_timeout() {
    init_tracing();
    let modem = ScriptedModem::new(Some("BG95-M5"), &[NO_FIX, POWER_OFF]);
    let (done_tx, done_rx) = mpsc::channel();
    let session = LocationSession::new(modem.clone(), None, None).unwrap();
    // the power-off lands before the wait expires; the loop then notices
    // the dead modem after the wait has also been exceeded
    session.begin(
        LocationConfig::default()
            .with_max_fix_wait(Duration::from_millis(60))
            .with_poll_interval(Duration::from_millis(40)),
    );

    let started = session.get_location_async(
        move |result, _point| {
            done_tx.send(result).unwrap();
        },
        false,
    );
    assert_eq!(started, LocationResult::Acquiring);

    let result = done_rx.recv_timeout(Duration::from_secs(2)).unwrap();
    assert_eq!(result, LocationResult::Unavailable);
    assert_eq!(modem.count_of("AT+QGPSEND"), 1);
}

#[test]
fn second_request_is_rejected_pending() {
    init_tracing();
    let modem = ScriptedModem::new(Some("BG95-M5"), &[]);
    let (done_tx, done_rx) = mpsc::channel();
    let session = LocationSession::new(modem.clone(), None, None).unwrap();
    session.begin(
        LocationConfig::default()
            .with_max_fix_wait(Duration::from_millis(500))
            .with_poll_interval(Duration::from_millis(20)),
    );

    let started = session.get_location_async(
        move |result, point| {
            done_tx.send((result, point)).unwrap();
        },
        false,
    );
    assert_eq!(started, LocationResult::Acquiring);
    std::thread::sleep(Duration::from_millis(100));
    assert_eq!(session.get_status(), LocationResult::Acquiring);

    let (second, second_point) = session.get_location(false);
    assert_eq!(second, LocationResult::Pending);
    // the rejected call's point was never touched
    assert_eq!(second_point.fix, 0);
    assert_eq!(second_point.latitude, 0.0);

    let (result, _point) = done_rx.recv_timeout(Duration::from_secs(2)).unwrap();
    assert_eq!(result, LocationResult::TimedOut);
    std::thread::sleep(Duration::from_millis(50));
    assert_eq!(session.get_status(), LocationResult::Idle);
}

#[test]
fn async_fix_publishes_before_callback() {
    init_tracing();
    let modem = ScriptedModem::new(Some("BG95-M5"), &[GOOD_FIX, GOOD_FIX]);
    let publisher = Arc::new(RecordingPublisher::default());
    let (done_tx, done_rx) = mpsc::channel();
    let session =
        LocationSession::new(modem.clone(), None, Some(publisher.clone())).unwrap();
    session.begin(fast_config());

    let publisher_at_callback = publisher.clone();
    let started = session.get_location_async(
        move |result, point| {
            // the publish already happened when the callback runs
            let published = publisher_at_callback.payloads.lock().unwrap().len();
            done_tx.send((result, point, published)).unwrap();
        },
        true,
    );
    assert_eq!(started, LocationResult::Acquiring);

    let (result, point, published_before_callback) =
        done_rx.recv_timeout(Duration::from_secs(2)).unwrap();
    assert_eq!(result, LocationResult::Fixed);
    assert_eq!(point.fix, 1);
    assert_eq!(published_before_callback, 1);

    let payloads = publisher.payloads.lock().unwrap();
    let (topic, payload) = &payloads[0];
    assert_eq!(topic, "loc");
    assert!(payload.contains("\"lat\":37.12345678"));
    assert!(payload.contains("\"lon\":-122.98765432"));
    assert!(payload.contains("\"req_id\":1"));
    let value: serde_json::Value = serde_json::from_str(payload).unwrap();
    assert_eq!(value["loc"]["lck"], 1);
}

#[test]
fn sync_fix_publishes_at_the_facade_with_sequence() {
    init_tracing();
    let modem = ScriptedModem::new(
        Some("BG95-M5"),
        &[GOOD_FIX, GOOD_FIX, GOOD_FIX, GOOD_FIX],
    );
    let publisher = Arc::new(RecordingPublisher::default());
    let session =
        LocationSession::new(modem.clone(), None, Some(publisher.clone())).unwrap();
    session.begin(fast_config());

    let (result, _point) = session.get_location(true);
    assert_eq!(result, LocationResult::Fixed);
    // let the worker finish clearing the acquiring flag
    std::thread::sleep(Duration::from_millis(50));
    let (result, _point) = session.get_location(true);
    assert_eq!(result, LocationResult::Fixed);

    let payloads = publisher.payloads.lock().unwrap();
    assert_eq!(payloads.len(), 2);
    assert!(payloads[0].1.contains("\"req_id\":1"));
    assert!(payloads[1].1.contains("\"req_id\":2"));
}

#[test]
fn publish_skipped_without_connectivity() {
    init_tracing();
    let modem = ScriptedModem::new(Some("BG95-M5"), &[GOOD_FIX, GOOD_FIX]);
    modem.connected.store(false, Ordering::SeqCst);
    let publisher = Arc::new(RecordingPublisher::default());
    let session =
        LocationSession::new(modem.clone(), None, Some(publisher.clone())).unwrap();
    session.begin(fast_config());

    let (result, _point) = session.get_location(true);
    assert_eq!(result, LocationResult::Fixed);
    assert!(publisher.payloads.lock().unwrap().is_empty());
}

#[test]
fn begin_applies_constellation_for_capable_modem() {
    init_tracing();
    let modem = ScriptedModem::new(Some("BG95-M5"), &[]);
    let session = LocationSession::new(modem.clone(), None, None).unwrap();
    session.begin(fast_config().with_constellations(Constellation::GPS_BEIDOU));

    assert_eq!(modem.count_of("AT+QGPSCFG=\"gnssconfig\",2"), 1);
    assert_eq!(modem.count_of("AT+QGPS=1"), 0);
}

#[test]
fn antenna_power_cleared_after_timeout() {
    init_tracing();
    let modem = ScriptedModem::new(Some("BG95-M5"), &[]);
    let antenna = Arc::new(RecordingAntenna::default());
    let (done_tx, done_rx) = mpsc::channel();
    let session = LocationSession::new(modem.clone(), Some(antenna.clone()), None).unwrap();
    session.begin(
        LocationConfig::default()
            .with_max_fix_wait(Duration::from_millis(100))
            .with_poll_interval(Duration::from_millis(50)),
    );

    session.get_location_async(
        move |result, _point| {
            done_tx.send(result).unwrap();
        },
        false,
    );
    let result = done_rx.recv_timeout(Duration::from_secs(2)).unwrap();
    assert_eq!(result, LocationResult::TimedOut);
    // power-off runs as the attempt's cleanup, just after the callback
    std::thread::sleep(Duration::from_millis(50));
    let events = antenna.events.lock().unwrap();
    assert_eq!(events.last(), Some(&"off"));
    assert!(events.contains(&"on"));
}

#[test]
fn point_moves_back_to_async_caller() {
    init_tracing();
    let modem = ScriptedModem::new(Some("BG95-M5"), &[GOOD_FIX, GOOD_FIX]);
    let (done_tx, done_rx) = mpsc::channel::<(LocationResult, LocationPoint)>();
    let session = LocationSession::new(modem, None, None).unwrap();
    session.begin(fast_config());

    session.get_location_async(
        move |result, point| {
            done_tx.send((result, point)).unwrap();
        },
        false,
    );
    let (result, point) = done_rx.recv_timeout(Duration::from_secs(2)).unwrap();
    assert_eq!(result, LocationResult::Fixed);
    assert_eq!(point.heading, 70.0 + 30.0 / 60.0);
    assert_eq!(point.speed, 3600.0);
}
