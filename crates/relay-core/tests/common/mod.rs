use std::{
    io,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    time::Duration,
};

use relay_core::{
    process::{ProcessEvent, ProcessHandle, ProcessSpawner, SpawnRequest, SpawnedProcess},
    Plan, PlanEngine, PlanEngineBuilder, PlanStatus,
};
use tempfile::TempDir;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

/// A process started by [`FakeSpawner`], driven by the test.
pub struct FakeProcess {
    pub request: SpawnRequest,
    events: UnboundedSender<ProcessEvent>,
    kills: Arc<AtomicUsize>,
}

impl FakeProcess {
    pub fn stdout(&self, text: &str) {
        let _ = self.events.send(ProcessEvent::Stdout(text.as_bytes().to_vec()));
    }

    pub fn stderr(&self, text: &str) {
        let _ = self.events.send(ProcessEvent::Stderr(text.as_bytes().to_vec()));
    }

    pub fn exit(&self, code: i32) {
        let _ = self.events.send(ProcessEvent::Exited(code));
    }

    pub fn was_killed(&self) -> bool {
        self.kills.load(Ordering::SeqCst) > 0
    }
}

struct FakeHandle {
    events: UnboundedSender<ProcessEvent>,
    kills: Arc<AtomicUsize>,
}

impl ProcessHandle for FakeHandle {
    fn kill(&mut self) {
        self.kills.fetch_add(1, Ordering::SeqCst);
        let _ = self.events.send(ProcessEvent::Exited(-1));
    }
}

/// Spawner that hands every started process to the test instead of running
/// anything.
pub struct FakeSpawner {
    started: UnboundedSender<FakeProcess>,
    fail_with: Option<String>,
}

impl FakeSpawner {
    pub fn new() -> (Self, UnboundedReceiver<FakeProcess>) {
        let (started, receiver) = mpsc::unbounded_channel();
        (
            Self {
                started,
                fail_with: None,
            },
            receiver,
        )
    }

    /// A spawner whose every spawn fails with `message`.
    pub fn failing(message: &str) -> Self {
        let (started, _) = mpsc::unbounded_channel();
        Self {
            started,
            fail_with: Some(message.to_string()),
        }
    }
}

impl ProcessSpawner for FakeSpawner {
    fn spawn(&self, request: &SpawnRequest) -> io::Result<SpawnedProcess> {
        if let Some(message) = &self.fail_with {
            return Err(io::Error::new(io::ErrorKind::NotFound, message.clone()));
        }

        let (events, receiver) = mpsc::unbounded_channel();
        let kills = Arc::new(AtomicUsize::new(0));
        let _ = self.started.send(FakeProcess {
            request: request.clone(),
            events: events.clone(),
            kills: kills.clone(),
        });

        Ok(SpawnedProcess {
            handle: Box::new(FakeHandle { events, kills }),
            events: receiver,
        })
    }
}

/// Builder with a temporary data directory, the temp dir as the only
/// allowed root, and a short placeholder delay.
pub fn test_builder(temp_dir: &TempDir) -> PlanEngineBuilder {
    PlanEngineBuilder::new()
        .with_data_dir(Some(temp_dir.path().join("data")))
        .with_allowed_roots([temp_dir.path()])
        .with_placeholder_delay(Duration::from_millis(10))
}

/// Helper function to create a test engine backed by a fake spawner
pub async fn create_fake_engine() -> (TempDir, PlanEngine, UnboundedReceiver<FakeProcess>) {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let (spawner, started) = FakeSpawner::new();
    let engine = test_builder(&temp_dir)
        .with_spawner(Arc::new(spawner))
        .build()
        .await
        .expect("Failed to create engine");
    (temp_dir, engine, started)
}

/// The project directory used by test plans; inside the allowed root.
pub fn project_dir(temp_dir: &TempDir) -> String {
    let dir = temp_dir.path().join("project");
    std::fs::create_dir_all(&dir).expect("Failed to create project dir");
    dir.to_string_lossy().into_owned()
}

pub async fn next_process(started: &mut UnboundedReceiver<FakeProcess>) -> FakeProcess {
    tokio::time::timeout(Duration::from_secs(5), started.recv())
        .await
        .expect("Timed out waiting for a spawn")
        .expect("Spawner dropped")
}

/// Poll until `check` holds for the plan.
pub async fn wait_for(engine: &PlanEngine, plan_id: &str, check: impl Fn(&Plan) -> bool) -> Plan {
    for _ in 0..500 {
        if let Some(plan) = engine.get(plan_id) {
            if check(&plan) {
                return plan;
            }
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("Plan {plan_id} never reached the expected state");
}

pub async fn wait_for_status(engine: &PlanEngine, plan_id: &str, status: PlanStatus) -> Plan {
    wait_for(engine, plan_id, |p| p.status == status).await
}
