//! Simulated capabilities for local runs without modem hardware.

use std::sync::atomic::{AtomicU32, Ordering};

use chrono::Utc;
use rand::Rng;
use tracing::info;

use cellfix_core::modem::{CMD_ESTIMATION_ERROR_QUERY, CMD_FIX_QUERY};
use cellfix_core::{AntennaPower, CellularPort, EventPublisher};

/// Base position the simulated fixes jitter around.
const BASE_LATITUDE: f64 = 37.40212418;
const BASE_LONGITUDE: f64 = -122.10993614;

/// Fake BG95-M5 that reports "no fix" for a configurable number of polls
/// and then produces jittered positions around a base coordinate.
pub struct SimulatedModem {
    polls: AtomicU32,
    fix_after: u32,
}

impl SimulatedModem {
    pub fn new(fix_after: u32) -> Self {
        Self {
            polls: AtomicU32::new(0),
            fix_after,
        }
    }

    fn fix_line(&self) -> String {
        let mut rng = rand::rng();
        let latitude = BASE_LATITUDE + rng.random_range(-0.00005..0.00005);
        let longitude = BASE_LONGITUDE + rng.random_range(-0.00005..0.00005);
        let altitude: f32 = rng.random_range(18.0..24.0);
        let now = Utc::now();
        format!(
            "+QGPSLOC: {},{:.8},{:.8},0.9,{:.1},1,{:03}.{:02},{:.1},{:.1},{},{:02}\r\n",
            now.format("%H%M%S.00"),
            latitude,
            longitude,
            altitude,
            rng.random_range(0..360),
            rng.random_range(0..60),
            0.0,
            0.0,
            now.format("%d%m%y"),
            rng.random_range(5..12),
        )
    }
}

impl CellularPort for SimulatedModem {
    fn is_on(&self) -> bool {
        true
    }

    fn is_connected(&self) -> bool {
        true
    }

    fn device_model(&self) -> Option<String> {
        Some("BG95-M5".to_owned())
    }

    fn send_command(&self, command: &str) -> String {
        match command {
            CMD_FIX_QUERY => {
                let poll = self.polls.fetch_add(1, Ordering::Relaxed);
                if poll < self.fix_after {
                    "+CME ERROR: 516\r\n".to_owned()
                } else {
                    self.fix_line()
                }
            }
            CMD_ESTIMATION_ERROR_QUERY => {
                "+QGPSCFG: \"estimation_error\",1.500,2.250,0.10,0.50\r\n".to_owned()
            }
            _ => "OK\r\n".to_owned(),
        }
    }
}

/// Logs power transitions instead of driving a GPIO pin.
pub struct LoggedAntenna;

impl AntennaPower for LoggedAntenna {
    fn configure(&self) {
        info!("antenna pin configured");
    }

    fn power_on(&self) {
        info!("antenna power on");
    }

    fn power_off(&self) {
        info!("antenna power off");
    }
}

/// Prints published events to stdout.
pub struct StdoutPublisher;

impl EventPublisher for StdoutPublisher {
    fn publish(&self, topic: &str, payload: &str) -> bool {
        println!("{topic}: {payload}");
        true
    }
}
