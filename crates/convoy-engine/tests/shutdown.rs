//! Integration test: Close semantics, grace-bounded joins, and failure
//! reporting through `Controller::run`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use convoy_core::{Event, Role, RunState, ScheduleError, SubsystemError, ThreadFailure};
use convoy_engine::{
    Controller, ControllerConfig, RunError, StepContext, StepOutcome, Subsystem, Subsystems,
};
use convoy_test_utils::{
    counting_trio, CountingSubsystem, FailingSubsystem, HangingSubsystem, PanickingSubsystem,
    TickTimer,
};

fn wait_until(what: &str, cond: impl Fn() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while !cond() {
        assert!(Instant::now() < deadline, "timed out waiting for {what}");
        thread::sleep(Duration::from_millis(1));
    }
}

#[test]
fn close_joins_every_thread() {
    let (subsystems, tallies) = counting_trio();
    let controller = Controller::new(ControllerConfig::default(), subsystems).unwrap();
    let sender = controller.sender();

    let runner = thread::spawn(move || controller.run());
    sender.schedule(Event::Start).unwrap();
    wait_until("model steps", || tallies.model.steps() > 0);
    sender.schedule(Event::Close).unwrap();

    let report = runner.join().unwrap().unwrap();
    assert_eq!(report.final_state, RunState::Closing);
    assert!(report.shutdown.is_clean());
    assert_eq!(report.shutdown.joined.as_slice(), &Role::SHUTDOWN_ORDER);
    assert!(tallies.model.stopped());
    assert!(tallies.view.stopped());
    assert!(tallies.timer.stopped());

    assert_eq!(sender.schedule(Event::Start), Err(ScheduleError::Closed));
    assert!(sender.is_closed());
}

#[test]
fn timer_events_reach_the_controller() {
    let subsystems = Subsystems::new(
        CountingSubsystem::new("model"),
        CountingSubsystem::new("view"),
        TickTimer::new(Duration::from_millis(2), Event::Start),
    );
    let mut c = Controller::new(ControllerConfig::default(), subsystems).unwrap();

    c.dispatch(Event::Stop).unwrap();
    c.dispatch(Event::Restart).unwrap();
    let t = c.step().unwrap().unwrap();
    assert_eq!(t.event, Event::Start);
    assert!(t.is_ignored());

    c.schedule_event(Event::Close).unwrap();
    let report = c.run().unwrap();
    assert!(report.metrics.count(Event::Start) >= 1);
    assert_eq!(report.metrics.count(Event::Close), 1);
}

#[test]
fn hung_thread_is_reported_after_grace() {
    let hanging = HangingSubsystem::new();
    let release = hanging.release_handle();
    let subsystems = Subsystems::new(
        CountingSubsystem::new("model"),
        CountingSubsystem::new("view"),
        hanging,
    );
    let cfg = ControllerConfig {
        shutdown_grace_ms: 100,
        ..Default::default()
    };
    let c = Controller::new(cfg, subsystems).unwrap();
    c.schedule_event(Event::Start).unwrap();
    c.schedule_event(Event::Close).unwrap();

    let start = Instant::now();
    let err = c.run().unwrap_err();
    assert!(start.elapsed() < Duration::from_secs(3));

    let RunError::ShutdownFailed(report) = &err else {
        panic!("expected ShutdownFailed, got {err:?}");
    };
    assert_eq!(report.final_state, RunState::Closing);
    assert_eq!(
        report.shutdown.failures.as_slice(),
        &[ThreadFailure::Timeout {
            role: Role::Timer,
            grace_ms: 100
        }]
    );
    assert_eq!(report.shutdown.joined.as_slice(), &[Role::Model, Role::View]);
    assert!(err.to_string().contains("timer"));

    release.store(true, Ordering::Release);
}

/// Steps normally, but its destructor blocks until released (or 3s pass).
struct StuckTeardown {
    release: Arc<AtomicBool>,
}

impl Subsystem for StuckTeardown {
    fn name(&self) -> &str {
        "stuck-teardown"
    }

    fn step(&mut self, ctx: &StepContext<'_>) -> Result<StepOutcome, SubsystemError> {
        ctx.sleep(Duration::from_millis(1));
        Ok(StepOutcome::Continue)
    }
}

impl Drop for StuckTeardown {
    fn drop(&mut self) {
        let deadline = Instant::now() + Duration::from_secs(3);
        while !self.release.load(Ordering::Acquire) && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(2));
        }
    }
}

#[test]
fn blocking_drop_counts_against_grace() {
    let release = Arc::new(AtomicBool::new(false));
    let subsystems = Subsystems::new(
        CountingSubsystem::new("model"),
        CountingSubsystem::new("view"),
        StuckTeardown {
            release: Arc::clone(&release),
        },
    );
    let cfg = ControllerConfig {
        shutdown_grace_ms: 100,
        ..Default::default()
    };
    let c = Controller::new(cfg, subsystems).unwrap();
    c.schedule_event(Event::Start).unwrap();
    c.schedule_event(Event::Close).unwrap();

    let start = Instant::now();
    let err = c.run().unwrap_err();
    assert!(start.elapsed() < Duration::from_secs(1), "took {:?}", start.elapsed());

    let RunError::ShutdownFailed(report) = &err else {
        panic!("expected ShutdownFailed, got {err:?}");
    };
    assert_eq!(
        report.shutdown.failures.as_slice(),
        &[ThreadFailure::Timeout {
            role: Role::Timer,
            grace_ms: 100
        }]
    );
    assert_eq!(report.shutdown.joined.as_slice(), &[Role::Model, Role::View]);

    release.store(true, Ordering::Release);
}

#[test]
fn panicking_view_is_reported() {
    let subsystems = Subsystems::new(
        CountingSubsystem::new("model"),
        PanickingSubsystem::new("view exploded", 3),
        TickTimer::silent(Duration::from_millis(2)),
    );
    let mut c = Controller::new(ControllerConfig::default(), subsystems).unwrap();

    c.dispatch(Event::Start).unwrap();
    wait_until("view thread dies", || {
        !c.orchestrator().live_workers().contains(&Role::View)
    });
    c.dispatch(Event::Close).unwrap();

    let report = c.shutdown_report().unwrap().clone();
    assert_eq!(report.joined.len(), 3);
    assert_eq!(
        report.failures.as_slice(),
        &[ThreadFailure::Panicked {
            role: Role::View,
            message: "view exploded".into()
        }]
    );

    let err = c.run().unwrap_err();
    assert!(matches!(err, RunError::ShutdownFailed(_)));
}

#[test]
fn faulting_model_is_reported() {
    let subsystems = Subsystems::new(
        FailingSubsystem::new("bad map", 2),
        CountingSubsystem::new("view"),
        TickTimer::silent(Duration::from_millis(2)),
    );
    let mut c = Controller::new(ControllerConfig::default(), subsystems).unwrap();

    c.dispatch(Event::Start).unwrap();
    wait_until("model thread exits", || {
        !c.orchestrator().live_workers().contains(&Role::Model)
    });
    c.schedule_event(Event::Close).unwrap();

    let err = c.run().unwrap_err();
    let report = err.report();
    assert_eq!(
        report.shutdown.failures.as_slice(),
        &[ThreadFailure::Faulted {
            role: Role::Model,
            error: SubsystemError::step("bad map"),
        }]
    );
}

#[test]
fn bounded_queue_rejects_when_full() {
    let (subsystems, _tallies) = counting_trio();
    let cfg = ControllerConfig {
        queue_capacity: Some(2),
        ..Default::default()
    };
    let mut c = Controller::new(cfg, subsystems).unwrap();

    c.schedule_event(Event::Start).unwrap();
    c.schedule_event(Event::Stop).unwrap();
    assert_eq!(c.schedule_event(Event::Loop), Err(ScheduleError::Full));

    c.step().unwrap();
    c.schedule_event(Event::Close).unwrap();

    let report = c.run().unwrap();
    assert_eq!(report.metrics.events_dispatched, 3);
    assert_eq!(report.metrics.count(Event::Loop), 0);
}

#[test]
fn dropping_an_unrun_controller_stops_its_threads() {
    let (subsystems, tallies) = counting_trio();
    let mut c = Controller::new(ControllerConfig::default(), subsystems).unwrap();
    let sender = c.sender();
    c.dispatch(Event::Start).unwrap();
    wait_until("model steps", || tallies.model.steps() > 0);

    drop(c);
    assert!(tallies.model.stopped());
    assert!(tallies.timer.stopped());
    assert_eq!(sender.schedule(Event::Start), Err(ScheduleError::Closed));
}
