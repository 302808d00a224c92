//! End-to-end tests for the engine lifecycle and background work.

use anyhow::anyhow;
use parking_lot::Mutex;
use statefold::engine::{Engine, EngineConfig, EngineError, Inbox, RunState, Scheduler};
use statefold::observe::{log_rejected, log_task_finished, EngineObserver, LoopFault};
use statefold::{input_enum, status_enum, ShutdownReport, State, TaskMeta, TaskOutcome, TransitionError};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

status_enum! {
    enum Light {
        On,
        Off,
        Jammed,
    }
}

input_enum! {
    enum Command {
        Toggle,
        Jam,
        Later,
        Slow,
        Peek,
        Stash,
        Explode,
        FailLater,
        PanicLater,
        Named,
        Blocking,
        Guarded,
    }
}

type LampState = State<Light, u32>;
type LampScheduler = Scheduler<Light, u32, Command>;
type LampError = TransitionError<Light, Command>;

/// Side channels the background work reports through.
#[derive(Clone, Default)]
struct Taps {
    slow_finished: Arc<AtomicBool>,
    snapshots: Arc<Mutex<Vec<LampState>>>,
    stashed: Arc<Mutex<Option<LampScheduler>>>,
}

#[derive(Clone, Debug, PartialEq)]
enum Recorded {
    Rejected(String),
    Fault(LoopFault),
    Finished(Option<String>, TaskOutcome),
    Stopped(ShutdownReport),
}

#[derive(Clone, Default)]
struct Recorder {
    events: Arc<Mutex<Vec<Recorded>>>,
}

impl Recorder {
    fn events(&self) -> Vec<Recorded> {
        self.events.lock().clone()
    }

    fn rejections(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                Recorded::Rejected(message) => Some(message),
                _ => None,
            })
            .collect()
    }

    fn finished(&self) -> Vec<TaskOutcome> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                Recorded::Finished(_, outcome) => Some(outcome),
                _ => None,
            })
            .collect()
    }
}

impl EngineObserver<Light, Command> for Recorder {
    fn transition_rejected(&self, error: &LampError) {
        log_rejected(error);
        self.events.lock().push(Recorded::Rejected(error.to_string()));
    }

    fn loop_fault(&self, fault: &LoopFault) {
        self.events.lock().push(Recorded::Fault(fault.clone()));
    }

    fn task_finished(&self, task: &TaskMeta, outcome: &TaskOutcome) {
        log_task_finished(task, outcome);
        self.events
            .lock()
            .push(Recorded::Finished(task.name.clone(), outcome.clone()));
    }

    fn loop_stopped(&self, report: &ShutdownReport) {
        self.events.lock().push(Recorded::Stopped(*report));
    }
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

fn scheduled(state: &LampState, result: Result<(), EngineError>) -> Result<(), LampError> {
    result.map_err(|err| TransitionError::failed(*state.status(), err.to_string()))
}

fn lamp(
    taps: &Taps,
    state: &LampState,
    schedule: &LampScheduler,
    input: Command,
) -> Result<LampState, LampError> {
    let flipped = match state.status() {
        Light::On => Light::Off,
        Light::Off => Light::On,
        Light::Jammed => Light::Jammed,
    };

    match input {
        Command::Toggle => Ok(state.with_both(flipped, state.context() + 1)),
        Command::Jam => Ok(state.with_status(Light::Jammed)),
        Command::Later => {
            scheduled(
                state,
                schedule.schedule(|_, dispatch| async move {
                    tokio::time::sleep(Duration::from_millis(200)).await;
                    dispatch.dispatch(Command::Toggle)?;
                    Ok(())
                }),
            )?;
            Ok(state.with_context(state.context() + 10))
        }
        Command::Slow => {
            let finished = Arc::clone(&taps.slow_finished);
            scheduled(
                state,
                schedule.schedule(|_, _| async move {
                    tokio::time::sleep(Duration::from_millis(200)).await;
                    finished.store(true, Ordering::SeqCst);
                    Ok(())
                }),
            )?;
            Ok(state.clone())
        }
        Command::Peek => {
            let snapshots = Arc::clone(&taps.snapshots);
            scheduled(
                state,
                schedule.schedule(|snapshot, _| async move {
                    snapshots.lock().push(snapshot);
                    Ok(())
                }),
            )?;
            Ok(state.with_context(state.context() + 100))
        }
        Command::Stash => {
            *taps.stashed.lock() = Some(schedule.clone());
            Ok(state.clone())
        }
        Command::Explode => panic!("lamp wiring fault"),
        Command::FailLater => {
            scheduled(
                state,
                schedule.schedule(|_, _| async { Err(anyhow!("sensor offline")) }),
            )?;
            Ok(state.clone())
        }
        Command::PanicLater => {
            scheduled(
                state,
                schedule.schedule(|_, _| async { panic!("bulb shattered") }),
            )?;
            Ok(state.clone())
        }
        Command::Named => {
            scheduled(
                state,
                schedule.schedule_named("poll", |_, _| async {
                    tokio::time::sleep(Duration::from_millis(200)).await;
                    Ok(())
                }),
            )?;
            Ok(state.clone())
        }
        Command::Guarded => {
            scheduled(
                state,
                schedule.schedule(|snapshot, _| {
                    assert!(*snapshot.context() > 1000, "lamp not warmed up");
                    async { Ok(()) }
                }),
            )?;
            Ok(state.clone())
        }
        Command::Blocking => {
            scheduled(
                state,
                schedule.schedule_blocking(|_, dispatch| {
                    std::thread::sleep(Duration::from_millis(20));
                    dispatch.dispatch(Command::Toggle)?;
                    Ok(())
                }),
            )?;
            Ok(state.clone())
        }
    }
}

fn lamp_engine(taps: &Taps, recorder: &Recorder) -> Engine<Light, u32, Command> {
    let on = taps.clone();
    let off = taps.clone();
    Engine::builder()
        .register(Light::On, move |state, schedule, input| {
            lamp(&on, state, schedule, input)
        })
        .register(Light::Off, move |state, schedule, input| {
            lamp(&off, state, schedule, input)
        })
        .config(EngineConfig::default().with_name("lamp"))
        .observer(recorder.clone())
        .build()
        .unwrap()
}

async fn settle<F>(states: &mut watch::Receiver<LampState>, done: F) -> LampState
where
    F: FnMut(&LampState) -> bool,
{
    let state = tokio::time::timeout(Duration::from_secs(5), states.wait_for(done))
        .await
        .expect("state never settled")
        .expect("engine loop ended");
    state.clone()
}

async fn eventually<F: Fn() -> bool>(condition: F) {
    for _ in 0..500 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not reached within 5s");
}

#[tokio::test]
async fn toggle_flips_status_and_counts() {
    init_tracing();
    let recorder = Recorder::default();
    let mut engine = lamp_engine(&Taps::default(), &recorder);

    let lamp = engine.start(Light::Off, 0).unwrap();
    let mut states = engine.subscribe().unwrap();

    lamp.dispatch(Command::Toggle).unwrap();
    let state = settle(&mut states, |state| *state.context() == 1).await;
    assert_eq!(state, State::new(Light::On, 1));

    lamp.dispatch(Command::Toggle).unwrap();
    let state = settle(&mut states, |state| *state.context() == 2).await;
    assert_eq!(state, State::new(Light::Off, 2));

    let report = engine.stop().await.unwrap();
    assert_eq!(report, ShutdownReport::default());
    assert_eq!(engine.run_state(), RunState::Stopped);
    assert_eq!(engine.state(), Some(State::new(Light::Off, 2)));
    assert_eq!(recorder.events(), vec![Recorded::Stopped(report)]);
}

#[tokio::test]
async fn background_work_dispatches_back_into_the_loop() {
    init_tracing();
    let mut engine = lamp_engine(&Taps::default(), &Recorder::default());
    let lamp = engine.start(Light::Off, 0).unwrap();
    let mut states = engine.subscribe().unwrap();

    lamp.dispatch(Command::Later).unwrap();
    let state = settle(&mut states, |state| *state.context() == 10).await;
    assert_eq!(state.status(), &Light::Off);

    let state = settle(&mut states, |state| *state.context() == 11).await;
    assert_eq!(state.status(), &Light::On);

    engine.stop().await.unwrap();
}

#[tokio::test]
async fn work_sees_the_state_its_transition_produced() {
    init_tracing();
    let taps = Taps::default();
    let mut engine = lamp_engine(&taps, &Recorder::default());
    let lamp = engine.start(Light::Off, 0).unwrap();
    let mut states = engine.subscribe().unwrap();

    lamp.dispatch(Command::Peek).unwrap();
    lamp.dispatch(Command::Toggle).unwrap();
    settle(&mut states, |state| *state.context() == 101).await;
    eventually(|| !taps.snapshots.lock().is_empty()).await;

    assert_eq!(*taps.snapshots.lock(), vec![State::new(Light::Off, 100)]);
    engine.stop().await.unwrap();
}

#[tokio::test]
async fn stop_joins_in_flight_work() {
    init_tracing();
    let taps = Taps::default();
    let mut engine = lamp_engine(&taps, &Recorder::default());
    let lamp = engine.start(Light::Off, 0).unwrap();

    lamp.dispatch(Command::Slow).unwrap();
    lamp.dispatch(Command::Toggle).unwrap();
    settle(&mut engine.subscribe().unwrap(), |state| *state.context() == 1).await;
    assert!(!taps.slow_finished.load(Ordering::SeqCst));

    let report = engine.stop().await.unwrap();
    assert!(taps.slow_finished.load(Ordering::SeqCst));
    assert_eq!(report.tasks_joined, 1);
    assert_eq!(report.tasks_failed, 0);
}

#[tokio::test]
async fn start_twice_fails() {
    init_tracing();
    let mut engine = lamp_engine(&Taps::default(), &Recorder::default());
    engine.start(Light::Off, 0).unwrap();

    assert_eq!(
        engine.start(Light::On, 5).err(),
        Some(EngineError::AlreadyRunning)
    );
    assert!(engine.is_running());
    assert_eq!(engine.state(), Some(State::new(Light::Off, 0)));
    engine.stop().await.unwrap();
}

#[tokio::test]
async fn capabilities_fail_outside_a_run() {
    init_tracing();
    let mut engine = lamp_engine(&Taps::default(), &Recorder::default());
    assert_eq!(engine.dispatch(Command::Toggle), Err(EngineError::NotRunning));
    assert_eq!(engine.stop().await, Err(EngineError::NotRunning));

    let lamp = engine.start(Light::Off, 0).unwrap();
    engine.stop().await.unwrap();

    assert!(!lamp.is_running());
    assert_eq!(lamp.dispatch(Command::Toggle), Err(EngineError::NotRunning));
    assert_eq!(engine.dispatch(Command::Toggle), Err(EngineError::NotRunning));
    assert!(engine.dispatcher().is_err());
}

#[tokio::test]
async fn stashed_scheduler_fails_after_stop() {
    init_tracing();
    let taps = Taps::default();
    let mut engine = lamp_engine(&taps, &Recorder::default());
    let lamp = engine.start(Light::Off, 0).unwrap();

    lamp.dispatch(Command::Stash).unwrap();
    eventually(|| taps.stashed.lock().is_some()).await;
    engine.stop().await.unwrap();

    let stashed = taps.stashed.lock().take().unwrap();
    assert!(!stashed.is_running());
    assert_eq!(
        stashed.schedule(|_, _| async { Ok(()) }),
        Err(EngineError::NotRunning)
    );
}

#[tokio::test]
async fn unregistered_status_rejects_and_keeps_state() {
    init_tracing();
    let recorder = Recorder::default();
    let mut engine = lamp_engine(&Taps::default(), &recorder);
    let lamp = engine.start(Light::Off, 3).unwrap();
    let mut states = engine.subscribe().unwrap();

    lamp.dispatch(Command::Jam).unwrap();
    settle(&mut states, |state| state.status() == &Light::Jammed).await;

    lamp.dispatch(Command::Toggle).unwrap();
    eventually(|| !recorder.rejections().is_empty()).await;

    assert_eq!(
        recorder.rejections(),
        vec!["No transition registered for status \"Jammed\"; input Toggle dropped".to_string()]
    );
    assert_eq!(engine.state(), Some(State::new(Light::Jammed, 3)));
    engine.stop().await.unwrap();
}

#[tokio::test]
async fn panicking_transition_is_reported_and_dropped() {
    init_tracing();
    let recorder = Recorder::default();
    let mut engine = lamp_engine(&Taps::default(), &recorder);
    let lamp = engine.start(Light::Off, 0).unwrap();
    let mut states = engine.subscribe().unwrap();

    lamp.dispatch(Command::Explode).unwrap();
    lamp.dispatch(Command::Toggle).unwrap();
    let state = settle(&mut states, |state| *state.context() == 1).await;

    assert_eq!(state, State::new(Light::On, 1));
    assert!(recorder.events().contains(&Recorded::Fault(LoopFault::TransitionPanicked {
        status: "Off".to_string(),
        input_kind: "Explode".to_string(),
        message: "lamp wiring fault".to_string(),
    })));
    engine.stop().await.unwrap();
}

#[tokio::test]
async fn background_failures_are_reported_not_raised() {
    init_tracing();
    let recorder = Recorder::default();
    let mut engine = lamp_engine(&Taps::default(), &recorder);
    let lamp = engine.start(Light::Off, 0).unwrap();
    let mut states = engine.subscribe().unwrap();

    lamp.dispatch(Command::FailLater).unwrap();
    lamp.dispatch(Command::PanicLater).unwrap();
    eventually(|| recorder.finished().len() == 2).await;

    let finished = recorder.finished();
    assert!(finished.contains(&TaskOutcome::Failed("sensor offline".to_string())));
    assert!(finished.contains(&TaskOutcome::Panicked("bulb shattered".to_string())));

    lamp.dispatch(Command::Toggle).unwrap();
    settle(&mut states, |state| *state.context() == 1).await;
    assert!(engine.is_running());
    engine.stop().await.unwrap();
}

#[tokio::test]
async fn duplicate_named_task_is_refused() {
    init_tracing();
    let recorder = Recorder::default();
    let mut engine = lamp_engine(&Taps::default(), &recorder);
    let lamp = engine.start(Light::Off, 0).unwrap();

    lamp.dispatch(Command::Named).unwrap();
    lamp.dispatch(Command::Named).unwrap();
    eventually(|| !recorder.rejections().is_empty()).await;

    assert_eq!(
        recorder.rejections(),
        vec!["Transition from status \"Off\" failed: Task \"poll\" is already running".to_string()]
    );
    let report = engine.stop().await.unwrap();
    assert_eq!(report.tasks_joined, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn blocking_work_runs_off_the_loop() {
    init_tracing();
    let mut engine = lamp_engine(&Taps::default(), &Recorder::default());
    let lamp = engine.start(Light::Off, 0).unwrap();
    let mut states = engine.subscribe().unwrap();

    lamp.dispatch(Command::Blocking).unwrap();
    let state = settle(&mut states, |state| *state.context() == 1).await;
    assert_eq!(state.status(), &Light::On);
    engine.stop().await.unwrap();
}

#[tokio::test]
async fn preloaded_inbox_is_applied_in_order() {
    init_tracing();
    let inbox = Inbox::new();
    let early = inbox.dispatcher();
    early.dispatch(Command::Toggle).unwrap();
    early.dispatch(Command::Toggle).unwrap();
    early.dispatch(Command::Toggle).unwrap();

    let mut engine = lamp_engine(&Taps::default(), &Recorder::default());
    engine.start_with_inbox(inbox, Light::Off, 0).unwrap();
    let state = settle(&mut engine.subscribe().unwrap(), |state| *state.context() == 3).await;

    assert_eq!(state.status(), &Light::On);
    engine.stop().await.unwrap();
    assert_eq!(early.dispatch(Command::Toggle), Err(EngineError::NotRunning));
}

#[tokio::test]
async fn register_is_refused_while_running() {
    init_tracing();
    let mut engine = lamp_engine(&Taps::default(), &Recorder::default());
    engine.start(Light::Off, 0).unwrap();

    let result = engine.register(Light::Jammed, |state, _, _| Ok(state.with_status(Light::Off)));
    assert_eq!(result, Err(EngineError::AlreadyRunning));
    engine.stop().await.unwrap();

    engine
        .register(Light::Jammed, |state, _, _| Ok(state.with_status(Light::Off)))
        .unwrap();
    let lamp = engine.start(Light::Jammed, 0).unwrap();
    lamp.dispatch(Command::Toggle).unwrap();
    settle(&mut engine.subscribe().unwrap(), |state| state.status() == &Light::Off).await;
    engine.stop().await.unwrap();
}

#[tokio::test]
async fn work_panicking_before_its_future_is_contained() {
    init_tracing();
    let taps = Taps::default();
    let recorder = Recorder::default();
    let mut engine = lamp_engine(&taps, &recorder);
    let lamp = engine.start(Light::Off, 0).unwrap();
    let mut states = engine.subscribe().unwrap();

    lamp.dispatch(Command::Slow).unwrap();
    lamp.dispatch(Command::Guarded).unwrap();
    eventually(|| !recorder.finished().is_empty()).await;
    assert_eq!(
        recorder.finished(),
        vec![TaskOutcome::Panicked("lamp not warmed up".to_string())]
    );

    lamp.dispatch(Command::Toggle).unwrap();
    settle(&mut states, |state| *state.context() == 1).await;

    let report = engine.stop().await.unwrap();
    assert!(taps.slow_finished.load(Ordering::SeqCst));
    assert_eq!(report.tasks_joined, 1);
    assert_eq!(report.tasks_failed, 0);
}

/// Observer whose `transition_applied` panics the first time it runs.
#[derive(Clone, Default)]
struct Clumsy {
    tripped: Arc<AtomicBool>,
    faults: Arc<Mutex<Vec<LoopFault>>>,
}

impl EngineObserver<Light, Command> for Clumsy {
    fn transition_applied(&self, _from: &Light, _to: &Light, _input_kind: &'static str) {
        if !self.tripped.swap(true, Ordering::SeqCst) {
            panic!("observer bug");
        }
    }

    fn loop_fault(&self, fault: &LoopFault) {
        self.faults.lock().push(fault.clone());
    }
}

#[tokio::test]
async fn panicking_observer_keeps_the_loop_and_the_transition() {
    init_tracing();
    let clumsy = Clumsy::default();
    let on = Taps::default();
    let off = on.clone();
    let mut engine = Engine::builder()
        .register(Light::On, move |state, schedule, input| {
            lamp(&on, state, schedule, input)
        })
        .register(Light::Off, move |state, schedule, input| {
            lamp(&off, state, schedule, input)
        })
        .observer(clumsy.clone())
        .build()
        .unwrap();
    let lamp = engine.start(Light::Off, 0).unwrap();
    let mut states = engine.subscribe().unwrap();

    lamp.dispatch(Command::Toggle).unwrap();
    let state = settle(&mut states, |state| *state.context() == 1).await;
    assert_eq!(state, State::new(Light::On, 1));

    lamp.dispatch(Command::Toggle).unwrap();
    settle(&mut states, |state| *state.context() == 2).await;

    engine.stop().await.unwrap();
    assert_eq!(engine.state(), Some(State::new(Light::Off, 2)));
    assert_eq!(
        *clumsy.faults.lock(),
        vec![LoopFault::ObserverPanicked {
            hook: "transition_applied".to_string(),
            message: "observer bug".to_string(),
        }]
    );
}

#[tokio::test]
async fn dropping_a_running_engine_lets_work_finish() {
    init_tracing();
    let taps = Taps::default();
    let mut engine = lamp_engine(&taps, &Recorder::default());
    let lamp = engine.start(Light::Off, 0).unwrap();

    lamp.dispatch(Command::Slow).unwrap();
    lamp.dispatch(Command::Toggle).unwrap();
    settle(&mut engine.subscribe().unwrap(), |state| *state.context() == 1).await;
    drop(engine);

    eventually(|| taps.slow_finished.load(Ordering::SeqCst)).await;
    eventually(|| !lamp.is_running()).await;
}
