//! Supervision of shell steps.
//!
//! A shell step runs in its own task: the command is validated and split
//! into an argument vector, the project path is checked against the allowed
//! roots, and the process is spawned directly (never through a shell). Its
//! stdout is appended to the step as it arrives. The result is reported only
//! if this run is still the step's live run in the process table.

use std::path::Path;

use log::{debug, warn};

use super::PlanEngine;
use crate::{
    error::StepFailure,
    models::{PlanStatus, StepStatus},
    notify::PlanEvent,
    process::{ProcessEvent, ProcessKey, RunToken, SpawnRequest},
};

enum ShellOutcome {
    Succeeded(String),
    Failed(StepFailure),
    /// Killed, paused, or replaced by a newer run; the result is dropped.
    Superseded,
}

impl PlanEngine {
    pub(super) async fn supervise_shell(
        self,
        key: ProcessKey,
        run: RunToken,
        command: Option<String>,
        project_path: String,
    ) {
        let outcome = self.run_shell(&key, run, command, &project_path).await;

        match outcome {
            ShellOutcome::Superseded => {
                debug!("Dropping result of superseded run of step {}", key.step_id);
            }
            ShellOutcome::Succeeded(stdout) => {
                if self.inner.processes.finish(&key, run) {
                    self.step_complete(&key.plan_id, &key.step_id, Some(stdout));
                }
            }
            ShellOutcome::Failed(failure) => {
                if self.inner.processes.finish(&key, run) {
                    self.step_fail(&key.plan_id, &key.step_id, &failure.to_string());
                }
            }
        }
    }

    async fn run_shell(
        &self,
        key: &ProcessKey,
        run: RunToken,
        command: Option<String>,
        project_path: &str,
    ) -> ShellOutcome {
        let Some(command) = command.filter(|c| !c.trim().is_empty()) else {
            return ShellOutcome::Failed(StepFailure::CommandRejected(
                "Command is required for shell steps".to_string(),
            ));
        };

        let verdict = self.inner.command_validator.validate_command_string(&command);
        if !verdict.valid {
            return ShellOutcome::Failed(StepFailure::CommandRejected(
                verdict.error.unwrap_or_else(|| "Command rejected".to_string()),
            ));
        }

        let path_verdict = self
            .inner
            .path_validator
            .validate_path(Path::new(project_path), &self.inner.config.allowed_roots)
            .await;
        if !path_verdict.valid {
            return ShellOutcome::Failed(StepFailure::PathRejected(
                path_verdict.error.unwrap_or_else(|| "Path rejected".to_string()),
            ));
        }

        let Some(request) = SpawnRequest::from_parts(&verdict.parts, project_path) else {
            return ShellOutcome::Failed(StepFailure::CommandRejected("Command is empty".to_string()));
        };

        // Spawn under the plan lock so a pause or cancel cannot slip in
        // between the liveness check and the attach.
        let mut events = {
            let plans = self.lock_plans();
            let live = plans.get(&key.plan_id).is_some_and(|plan| {
                plan.status == PlanStatus::Executing
                    && plan
                        .step(&key.step_id)
                        .is_some_and(|s| s.status == StepStatus::Running)
            });
            if !live || !self.inner.processes.is_current(key, run) {
                return ShellOutcome::Superseded;
            }

            match self.inner.spawner.spawn(&request) {
                Ok(spawned) => {
                    if !self.inner.processes.attach(key, run, spawned.handle) {
                        return ShellOutcome::Superseded;
                    }
                    spawned.events
                }
                Err(e) => {
                    warn!("Failed to spawn '{}': {e}", request.program);
                    return ShellOutcome::Failed(StepFailure::Process(format!(
                        "Failed to start '{}': {e}",
                        request.program
                    )));
                }
            }
        };
        debug!("Step {} running {command}", key.step_id);

        let mut stdout = Vec::new();
        let mut stderr = Vec::new();
        while let Some(event) = events.recv().await {
            match event {
                ProcessEvent::Stdout(chunk) => {
                    self.append_output(key, run, &String::from_utf8_lossy(&chunk));
                    stdout.extend(chunk);
                }
                ProcessEvent::Stderr(chunk) => stderr.extend(chunk),
                ProcessEvent::Exited(0) => {
                    return ShellOutcome::Succeeded(String::from_utf8_lossy(&stdout).into_owned());
                }
                ProcessEvent::Exited(code) => {
                    return ShellOutcome::Failed(StepFailure::exit(
                        code,
                        &String::from_utf8_lossy(&stderr),
                    ));
                }
                ProcessEvent::Error(message) => {
                    return ShellOutcome::Failed(StepFailure::Process(message));
                }
            }
        }

        ShellOutcome::Failed(StepFailure::Process(
            "Process ended without an exit status".to_string(),
        ))
    }

    /// Append a chunk of live output to the step, unless the run is stale.
    fn append_output(&self, key: &ProcessKey, run: RunToken, chunk: &str) {
        let mut plans = self.lock_plans();
        if !self.inner.processes.is_current(key, run) {
            return;
        }
        let Some(plan) = plans.get_mut(&key.plan_id) else {
            return;
        };
        let Some(index) = plan.step_index(&key.step_id) else {
            return;
        };
        plan.steps[index].append_output(chunk);
        plan.touch();
        self.commit(plan, PlanEvent::StepOutput);
    }
}
