//! Integration tests: full session against the simulated stage
//!
//! These tests drive `Smc100` end to end through `MockStage`, so every
//! exchange goes through the real encoder, line accumulator, decoder and
//! chaining logic. Time comes from a local clock that advances a fixed step
//! on every read, which makes settle and reply timeouts deterministic.
//!
//! Run with: cargo test --test stage_integration

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use smc100_lib::adapters::{MockStage, MockStageHandle};
use smc100_lib::domain::{Configuration, Fault, Status};
use smc100_lib::ports::{Clock, DiagnosticSink};
use smc100_lib::smc::{Mode, Smc100};

// ---------------------------------------------------------------------------
// Local clock and sink
// ---------------------------------------------------------------------------

/// Advances one millisecond per reading.
struct SteppingClock(AtomicU64);

impl Clock for SteppingClock {
    fn now_micros(&self) -> u64 {
        self.0.fetch_add(1_000, Ordering::SeqCst)
    }
}

#[derive(Clone, Default)]
struct RecordingSink(Arc<Mutex<Vec<Fault>>>);

impl RecordingSink {
    fn faults(&self) -> Vec<Fault> {
        self.0.lock().unwrap().clone()
    }
}

impl DiagnosticSink for RecordingSink {
    fn report(&mut self, fault: &Fault) {
        self.0.lock().unwrap().push(fault.clone());
    }
}

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

const MAX_TICKS: usize = 20_000;

#[derive(Clone, Default)]
struct Flags {
    all: Arc<AtomicBool>,
    moved: Arc<AtomicBool>,
    homed: Arc<AtomicBool>,
    gpio: Arc<AtomicBool>,
}

impl Flags {
    fn take(flag: &AtomicBool) -> bool {
        flag.swap(false, Ordering::SeqCst)
    }
}

struct Bench {
    session: Smc100,
    stage: MockStageHandle,
    sink: RecordingSink,
    flags: Flags,
}

impl Bench {
    fn new(session_address: u8, stage_address: u8) -> Self {
        let stage = MockStage::new(stage_address);
        let handle = stage.handle();
        let sink = RecordingSink::default();
        let config = Configuration {
            address: session_address,
            ..Configuration::default()
        };
        let mut session = Smc100::new(
            Box::new(stage),
            Box::new(SteppingClock(AtomicU64::new(0))),
            Box::new(sink.clone()),
            config,
        )
        .unwrap();

        let flags = Flags::default();
        let f = Arc::clone(&flags.all);
        session.on_all_complete(move || f.store(true, Ordering::SeqCst));
        let f = Arc::clone(&flags.moved);
        session.on_move_complete(move || f.store(true, Ordering::SeqCst));
        let f = Arc::clone(&flags.homed);
        session.on_home_complete(move || f.store(true, Ordering::SeqCst));
        let f = Arc::clone(&flags.gpio);
        session.on_gpio_read(move || f.store(true, Ordering::SeqCst));

        Self {
            session,
            stage: handle,
            sink,
            flags,
        }
    }

    /// Started and primed against a stage at the same address.
    fn primed() -> Self {
        let mut bench = Self::new(1, 1);
        bench.session.start();
        bench.settle();
        bench
    }

    /// Tick until all-complete fires.
    fn settle(&mut self) {
        for _ in 0..MAX_TICKS {
            self.session.tick();
            if Flags::take(&self.flags.all) {
                return;
            }
        }
        panic!("session never went idle: mode {:?}", self.session.mode());
    }

    fn home(&mut self) {
        self.session.home();
        self.settle();
        assert!(Flags::take(&self.flags.homed), "home did not complete");
    }
}

// ---------------------------------------------------------------------------
// Startup
// ---------------------------------------------------------------------------

#[test]
fn priming_reads_status_limits_and_inputs() {
    let bench = Bench::primed();
    let received = bench.stage.model().received.clone();
    assert_eq!(&received[..2], ["1TS", "1SR?"]);
    assert!(received.contains(&"1SL?".to_string()));
    assert!(received.contains(&"1RB".to_string()));

    let limits = bench.session.limits();
    assert_eq!(limits.negative, -25.0);
    assert_eq!(limits.positive, 25.0);
    assert_eq!(bench.session.status(), Status::NoReference);
    assert!(!bench.session.is_homed());
    assert_eq!(bench.session.mode(), Mode::Idle);
    assert!(bench.sink.faults().is_empty());
}

#[test]
fn user_request_before_start_runs_after_priming() {
    let mut bench = Bench::new(1, 1);
    bench.session.request_analogue();
    bench.stage.model().analogue = 2.5;
    bench.session.start();
    bench.settle();

    let received = bench.stage.model().received.clone();
    let analogue_at = received.iter().position(|l| l == "1RA").unwrap();
    let gpio_at = received.iter().position(|l| l == "1RB").unwrap();
    assert!(analogue_at > gpio_at);
    assert_eq!(bench.session.analogue_reading(), 2.5);
}

#[test]
fn crowded_queue_before_start_still_reads_limits() {
    let mut bench = Bench::new(1, 1);
    for _ in 0..8 {
        bench.session.request_analogue();
    }
    bench.session.start();
    bench.settle();

    let received = bench.stage.model().received.clone();
    assert_eq!(&received[..2], ["1TS", "1SR?"]);
    assert!(received.contains(&"1SL?".to_string()));
    assert_eq!(bench.session.limits().negative, -25.0);
    assert_eq!(bench.session.limits().positive, 25.0);
    assert_eq!(received.iter().filter(|l| *l == "1RA").count(), 4);
    assert!(bench.sink.faults().is_empty());
}

// ---------------------------------------------------------------------------
// Motion
// ---------------------------------------------------------------------------

#[test]
fn home_then_move_fires_each_completion_once() {
    let mut bench = Bench::primed();
    bench.home();
    assert!(bench.session.is_homed());
    assert!(bench.session.is_ready());
    assert!(!Flags::take(&bench.flags.moved));

    bench.session.move_absolute(12.5);
    bench.settle();
    assert!(Flags::take(&bench.flags.moved));
    assert!(!Flags::take(&bench.flags.homed));
    assert_eq!(bench.session.position(), 12.5);
    assert_eq!(bench.stage.model().position, 12.5);
    assert!(bench.sink.faults().is_empty());
}

#[test]
fn targets_outside_limits_are_clamped_before_sending() {
    let mut bench = Bench::primed();
    bench.home();
    bench.session.move_absolute(40.0);
    bench.settle();

    assert!(bench
        .stage
        .model()
        .received
        .contains(&"1PA25.000000".to_string()));
    assert_eq!(bench.session.position(), 25.0);
}

#[test]
fn relative_move_lands_on_limit() {
    let mut bench = Bench::primed();
    bench.home();
    bench.session.move_absolute(20.0);
    bench.settle();
    bench.session.move_relative(10.0);
    bench.settle();

    assert!(Flags::take(&bench.flags.moved));
    assert_eq!(bench.session.position(), 25.0);
}

#[test]
fn move_before_home_reports_command_error() {
    let mut bench = Bench::primed();
    bench.session.move_absolute(5.0);
    bench.settle();

    assert!(!Flags::take(&bench.flags.moved));
    assert_eq!(bench.session.position(), 0.0);
    assert_eq!(bench.sink.faults(), vec![Fault::CommandError { code: 'H' }]);
}

// ---------------------------------------------------------------------------
// I/O and settings
// ---------------------------------------------------------------------------

#[test]
fn gpio_read_reaches_callback_and_accessors() {
    let mut bench = Bench::primed();
    bench.stage.model().gpio_input = 0b1010;
    bench.session.request_gpio_input();
    bench.settle();

    assert!(Flags::take(&bench.flags.gpio));
    assert!(!bench.session.gpio_input(0));
    assert!(bench.session.gpio_input(1));
    assert!(bench.session.gpio_input(3));
}

#[test]
fn gpio_write_updates_stage_outputs() {
    let mut bench = Bench::primed();
    bench.session.set_gpio_output(2, true);
    bench.session.set_gpio_output(0, true);
    bench.settle();
    assert_eq!(bench.stage.model().gpio_output, 0b0101);
    assert!(bench.sink.faults().is_empty());
}

#[test]
fn limit_write_is_read_back() {
    let mut bench = Bench::primed();
    bench.session.set_limit_positive(15.0);
    bench.settle();
    assert_eq!(bench.session.limits().positive, 15.0);
    assert_eq!(bench.stage.model().limit_positive, 15.0);
}

#[test]
fn disabling_after_home_is_reported() {
    let mut bench = Bench::primed();
    bench.home();
    bench.session.enable(false);
    bench.session.request_status();
    bench.settle();
    assert_eq!(bench.session.status(), Status::Disabled);
    assert!(!bench.session.is_enabled());
}

// ---------------------------------------------------------------------------
// Faults
// ---------------------------------------------------------------------------

#[test]
fn hardware_error_is_reported_with_status() {
    let mut bench = Bench::primed();
    bench.stage.model().hardware_error = 0x0020;
    bench.session.request_status();
    bench.settle();

    assert_eq!(bench.session.status(), Status::NoReference);
    assert_eq!(
        bench.sink.faults(),
        vec![Fault::HardwareError {
            code: "0020".into()
        }]
    );
}

#[test]
fn stage_on_other_address_times_out_and_recovers() {
    let mut bench = Bench::new(1, 2);
    bench.session.start();
    bench.settle();

    let faults = bench.sink.faults();
    assert_eq!(faults.len(), 4);
    assert!(faults
        .iter()
        .all(|f| matches!(f, Fault::ReplyTimeout { .. })));
    assert_eq!(bench.session.limits().positive, 0.0);
    assert_eq!(bench.session.mode(), Mode::Idle);
}
