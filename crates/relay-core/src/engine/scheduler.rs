//! Plan lifecycle and step scheduling.
//!
//! Every function here runs with the plan-map lock held and decides the next
//! state in one go. Dispatching a step only spawns a task; the task reports
//! back through [`PlanEngine::step_complete`] and [`PlanEngine::step_fail`].
//!
//! Plan states move along:
//!
//! ```text
//! draft ──execute──▶ executing ──pause──▶ paused
//!                      │   ▲               │
//!                      │   └────resume─────┘
//!                      ├──▶ completed
//!                      └──▶ failed ◀── cancel (executing or paused)
//! ```

use jiff::Timestamp;
use log::{debug, info, warn};

use super::PlanEngine;
use crate::{
    error::{StepFailure, CANCELLED_BY_USER},
    models::{Plan, PlanStatus, StepStatus, StepType},
    notify::PlanEvent,
    process::ProcessKey,
};

impl PlanEngine {
    /// Starts a draft plan. Returns `false` if the plan does not exist or is
    /// not a draft; a paused plan is continued with [`PlanEngine::resume`].
    pub fn execute(&self, plan_id: &str) -> bool {
        let mut plans = self.lock_plans();
        let Some(plan) = plans.get_mut(plan_id) else {
            debug!("execute: plan {plan_id} not found");
            return false;
        };
        if plan.status != PlanStatus::Draft {
            debug!("execute: plan {plan_id} is {}, not draft", plan.status);
            return false;
        }

        let now = Timestamp::now();
        plan.status = PlanStatus::Executing;
        plan.started_at = Some(now);
        plan.completed_at = None;
        plan.total_duration_ms = None;
        plan.error = None;
        plan.current_step_index = plan
            .steps
            .iter()
            .position(|s| s.status == StepStatus::Pending)
            .unwrap_or(plan.steps.len());
        plan.updated_at = now;

        info!("Executing plan {plan_id}");
        self.commit(plan, PlanEvent::Started);
        self.advance(plan);
        true
    }

    /// Marks a step completed, recording `output` if given.
    ///
    /// If the plan is executing and the step is the current one, the plan
    /// advances to the next eligible step. Returns `false` for an unknown
    /// plan or step, a terminal plan, or a step that already finished.
    pub fn step_complete(&self, plan_id: &str, step_id: &str, output: Option<String>) -> bool {
        debug!("step_complete: step {step_id} of plan {plan_id}");
        let mut plans = self.lock_plans();
        let Some(plan) = plans.get_mut(plan_id) else {
            return false;
        };
        if plan.status.is_terminal() {
            return false;
        }
        let Some(index) = plan.step_index(step_id) else {
            return false;
        };

        let step = &mut plan.steps[index];
        if step.status.is_terminal() {
            debug!("step_complete: step {step_id} already {}", step.status);
            return false;
        }
        step.status = StepStatus::Completed;
        if output.is_some() {
            step.output = output;
        }
        step.error = None;
        step.completed_at = Some(Timestamp::now());
        plan.touch();

        // A shell step completed from outside must not keep its process.
        let key = ProcessKey::new(plan_id, step_id);
        self.inner.processes.kill(&key);
        self.inner.timers.kill(&key);
        self.inner.stats.record_step_executed();
        info!("Step {step_id} of plan {plan_id} completed");
        self.commit(plan, PlanEvent::StepCompleted);

        if plan.status == PlanStatus::Executing && index == plan.current_step_index {
            plan.current_step_index = index + 1;
            self.advance(plan);
        }
        true
    }

    /// Marks a step failed with `error` and fails the whole plan. Any live
    /// process of the plan is killed. Returns `false` under the same
    /// conditions as [`PlanEngine::step_complete`].
    pub fn step_fail(&self, plan_id: &str, step_id: &str, error: &str) -> bool {
        debug!("step_fail: step {step_id} of plan {plan_id}");
        let mut plans = self.lock_plans();
        let Some(plan) = plans.get_mut(plan_id) else {
            return false;
        };
        if plan.status.is_terminal() {
            return false;
        }
        let Some(index) = plan.step_index(step_id) else {
            return false;
        };

        let step = &mut plan.steps[index];
        if step.status.is_terminal() {
            debug!("step_fail: step {step_id} already {}", step.status);
            return false;
        }
        step.status = StepStatus::Failed;
        step.error = Some(error.to_string());
        step.completed_at = Some(Timestamp::now());
        plan.touch();

        self.inner.processes.kill_plan(plan_id);
        self.inner.timers.kill_plan(plan_id);
        warn!("Step {step_id} of plan {plan_id} failed: {error}");
        self.commit(plan, PlanEvent::StepFailed);
        self.fail_plan(plan, error.to_string());
        true
    }

    /// Pauses an executing plan, killing the current step's process. The
    /// step stays `running` until the plan is resumed.
    pub fn pause(&self, plan_id: &str) -> bool {
        debug!("pause: plan {plan_id}");
        let mut plans = self.lock_plans();
        let Some(plan) = plans.get_mut(plan_id) else {
            return false;
        };
        if plan.status != PlanStatus::Executing {
            return false;
        }

        plan.status = PlanStatus::Paused;
        plan.touch();
        if let Some(step) = plan.current_step() {
            self.inner
                .processes
                .kill(&ProcessKey::new(plan_id, step.id.as_str()));
        }

        info!("Paused plan {plan_id}");
        self.commit(plan, PlanEvent::Paused);
        true
    }

    /// Continues a paused plan.
    ///
    /// A shell step whose process was killed by the pause, or a placeholder
    /// step whose timer is gone (the engine was restarted), is run again from
    /// the start. A manual step, or a placeholder step with a live timer,
    /// keeps waiting for its completion signal. Otherwise scheduling resumes
    /// at the current step.
    pub fn resume(&self, plan_id: &str) -> bool {
        debug!("resume: plan {plan_id}");
        let mut plans = self.lock_plans();
        let Some(plan) = plans.get_mut(plan_id) else {
            return false;
        };
        if plan.status != PlanStatus::Paused {
            return false;
        }

        plan.status = PlanStatus::Executing;
        plan.touch();
        info!("Resumed plan {plan_id}");
        self.commit(plan, PlanEvent::Resumed);

        let running = plan
            .current_step()
            .filter(|s| s.status == StepStatus::Running)
            .map(|s| (s.id.clone(), s.step_type));
        let Some((step_id, step_type)) = running else {
            self.advance(plan);
            return true;
        };
        let key = ProcessKey::new(plan_id, step_id.as_str());
        let interrupted = match step_type {
            StepType::Shell => !self.inner.processes.contains(&key),
            StepType::Manual => false,
            _ => !self.inner.timers.contains(&key),
        };
        if interrupted {
            debug!("Restarting interrupted step {step_id} of plan {plan_id}");
            let index = plan.current_step_index;
            plan.steps[index].status = StepStatus::Pending;
            self.advance(plan);
        }
        true
    }

    /// Cancels an executing or paused plan: kills its processes, fails its
    /// running steps with "Cancelled" and the plan with "Cancelled by user".
    pub fn cancel(&self, plan_id: &str) -> bool {
        debug!("cancel: plan {plan_id}");
        let mut plans = self.lock_plans();
        let Some(plan) = plans.get_mut(plan_id) else {
            return false;
        };
        if !matches!(plan.status, PlanStatus::Executing | PlanStatus::Paused) {
            return false;
        }
        self.cancel_locked(plan);
        true
    }

    pub(super) fn cancel_locked(&self, plan: &mut Plan) {
        self.inner.processes.kill_plan(&plan.id);
        self.inner.timers.kill_plan(&plan.id);

        let now = Timestamp::now();
        for step in plan
            .steps
            .iter_mut()
            .filter(|s| s.status == StepStatus::Running)
        {
            step.status = StepStatus::Failed;
            step.error = Some(StepFailure::Cancelled.to_string());
            step.completed_at = Some(now);
        }

        info!("Cancelled plan {}", plan.id);
        self.fail_plan(plan, CANCELLED_BY_USER.to_string());
    }

    /// Finds the next step to run, starting at the current index.
    ///
    /// The scan only moves forward: if the first pending step has unmet
    /// dependencies, later pending steps are tried; if none is eligible the
    /// plan fails. Running off the end completes the plan, unless a pending
    /// step was left behind, which can never run.
    fn advance(&self, plan: &mut Plan) {
        if plan.status != PlanStatus::Executing {
            return;
        }

        let start = plan.current_step_index.min(plan.steps.len());
        let mut pending = (start..plan.steps.len()).filter(|&i| plan.steps[i].status == StepStatus::Pending);

        let Some(first) = pending.next() else {
            if plan.steps[..start]
                .iter()
                .any(|s| s.status == StepStatus::Pending)
            {
                self.fail_plan(plan, StepFailure::Scheduling.to_string());
            } else {
                self.complete_plan(plan);
            }
            return;
        };

        let eligible = std::iter::once(first)
            .chain(pending)
            .find(|&i| plan.dependencies_met(&plan.steps[i]));
        match eligible {
            Some(index) => self.start_step(plan, index),
            None => self.fail_plan(plan, StepFailure::Scheduling.to_string()),
        }
    }

    fn start_step(&self, plan: &mut Plan, index: usize) {
        plan.current_step_index = index;
        let step = &mut plan.steps[index];
        step.status = StepStatus::Running;
        step.started_at = Some(Timestamp::now());
        step.completed_at = None;
        step.output = None;
        step.error = None;
        let (step_id, step_type, command) = (step.id.clone(), step.step_type, step.command.clone());
        plan.touch();

        info!("Starting step {step_id} ({step_type}) of plan {}", plan.id);
        self.commit(plan, PlanEvent::StepStarted);

        match step_type {
            StepType::Shell => {
                let key = ProcessKey::new(plan.id.as_str(), step_id);
                let run = self.inner.processes.reserve(key.clone());
                let engine = self.clone();
                let project_path = plan.project_path.clone();
                tokio::spawn(async move {
                    engine.supervise_shell(key, run, command, project_path).await;
                });
            }
            StepType::Manual => {
                debug!("Step {step_id} waits for an external completion signal");
            }
            placeholder => {
                let key = ProcessKey::new(plan.id.as_str(), step_id);
                let run = self.inner.timers.reserve(key.clone());
                let engine = self.clone();
                let delay = self.inner.config.placeholder_delay;
                tokio::spawn(async move {
                    tokio::time::sleep(delay).await;
                    if engine.inner.timers.finish(&key, run) {
                        let output = format!("{placeholder} step completed (placeholder)");
                        engine.step_complete(&key.plan_id, &key.step_id, Some(output));
                    }
                });
            }
        }
    }

    fn complete_plan(&self, plan: &mut Plan) {
        plan.finish(PlanStatus::Completed, None);
        self.inner
            .stats
            .record_completed(plan.total_duration_ms.unwrap_or_default());
        info!("Plan {} completed", plan.id);
        self.commit(plan, PlanEvent::Completed);
    }

    fn fail_plan(&self, plan: &mut Plan, error: String) {
        warn!("Plan {} failed: {error}", plan.id);
        plan.finish(PlanStatus::Failed, Some(error));
        self.inner.stats.record_failed();
        self.commit(plan, PlanEvent::Failed);
    }
}
