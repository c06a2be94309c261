//! Plan repository operations for the PlanEngine.

use std::{
    env::current_dir,
    path::{Component, Path, PathBuf},
};

use jiff::Timestamp;
use log::{debug, error, info};
use uuid::Uuid;

use super::PlanEngine;
use crate::{
    error::{EngineError, Result},
    models::{Plan, PlanExecutionStats, PlanStatus, PlanStep, StepStatus, StepType},
    notify::PlanEvent,
    params::{CreatePlan, ListPlans, StepCreate, UpdatePlan},
};

impl PlanEngine {
    /// Creates a new draft plan.
    ///
    /// Steps receive fresh ids and `order` equal to their position; each
    /// `depends_on` position is resolved to the id of the step at that
    /// position. The project path is always stored as an absolute path,
    /// defaulting to the current working directory.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::InvalidInput` for an empty title or step name, a
    /// shell step without a command, or a dependency position that is out of
    /// range or names the step itself.
    pub fn create(&self, params: &CreatePlan) -> Result<Plan> {
        debug!("Creating plan '{}' with {} steps", params.title, params.steps.len());
        let title = non_empty("title", &params.title)?;
        let project_path = absolute_project_path(params.project_path.as_deref())?;
        let steps = build_steps(&params.steps)?;

        let now = Timestamp::now();
        let plan = Plan {
            id: Uuid::new_v4().to_string(),
            title,
            description: params.description.clone().filter(|d| !d.trim().is_empty()),
            project_path,
            status: PlanStatus::Draft,
            steps,
            current_step_index: 0,
            created_at: now,
            updated_at: now,
            started_at: None,
            completed_at: None,
            total_duration_ms: None,
            error: None,
        };

        {
            let mut plans = self.lock_plans();
            plans.insert(plan.id.clone(), plan.clone());
            self.commit(&plan, PlanEvent::Created);
        }
        self.inner.stats.record_created();

        info!("Created plan {} with {} steps", plan.id, plan.steps.len());
        Ok(plan)
    }

    /// Snapshot of a plan by id.
    pub fn get(&self, plan_id: &str) -> Option<Plan> {
        self.lock_plans().get(plan_id).cloned()
    }

    /// All plans, most recently updated first, optionally restricted to one
    /// project path.
    pub fn list(&self, params: &ListPlans) -> Vec<Plan> {
        let project_path = params
            .project_path
            .as_deref()
            .and_then(|p| absolute_project_path(Some(p)).ok());

        let mut plans: Vec<Plan> = self
            .lock_plans()
            .values()
            .filter(|p| {
                project_path
                    .as_deref()
                    .is_none_or(|path| p.project_path == path)
            })
            .cloned()
            .collect();
        plans.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        plans
    }

    /// Applies a partial update. Returns `Ok(false)` if the plan does not
    /// exist.
    ///
    /// An empty description clears it. A replacement step list is only
    /// accepted while the plan is a draft.
    pub fn update(&self, plan_id: &str, params: &UpdatePlan) -> Result<bool> {
        debug!("Updating plan {plan_id}");
        let title = params
            .title
            .as_deref()
            .map(|t| non_empty("title", t))
            .transpose()?;
        let project_path = params
            .project_path
            .as_deref()
            .map(|p| absolute_project_path(Some(p)))
            .transpose()?;
        let steps = params.steps.as_deref().map(build_steps).transpose()?;

        let mut plans = self.lock_plans();
        let Some(plan) = plans.get_mut(plan_id) else {
            return Ok(false);
        };

        if steps.is_some() && plan.status != PlanStatus::Draft {
            return Err(EngineError::invalid_input("steps")
                .with_reason(format!("Steps can only be replaced while the plan is a draft, not {}", plan.status)));
        }

        if let Some(title) = title {
            plan.title = title;
        }
        if let Some(description) = &params.description {
            plan.description = Some(description.clone()).filter(|d| !d.trim().is_empty());
        }
        if let Some(project_path) = project_path {
            plan.project_path = project_path;
        }
        if let Some(steps) = steps {
            plan.steps = steps;
            plan.current_step_index = 0;
        }
        plan.touch();
        self.commit(plan, PlanEvent::Updated);

        info!("Updated plan {plan_id}");
        Ok(true)
    }

    /// Removes a plan, cancelling it first if it is executing or paused.
    /// Returns `false` if the plan does not exist.
    pub fn delete(&self, plan_id: &str) -> bool {
        debug!("Deleting plan {plan_id}");
        let removed = {
            let mut plans = self.lock_plans();
            let Some(plan) = plans.get_mut(plan_id) else {
                return false;
            };
            if matches!(plan.status, PlanStatus::Executing | PlanStatus::Paused) {
                self.cancel_locked(plan);
            }
            self.inner.processes.kill_plan(plan_id);
            self.inner.timers.kill_plan(plan_id);
            plans.remove(plan_id)
        };

        if let Err(e) = self.inner.store.delete_plan(plan_id) {
            error!("Failed to delete stored plan {plan_id}: {e}");
        }
        if let Some(plan) = removed {
            self.notify(PlanEvent::Deleted, &plan);
        }

        info!("Deleted plan {plan_id}");
        true
    }

    /// Current execution statistics.
    pub fn stats(&self) -> PlanExecutionStats {
        self.inner.stats.snapshot()
    }
}

fn non_empty(field: &str, value: &str) -> Result<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(EngineError::invalid_input(field).with_reason("must not be empty"));
    }
    Ok(value.to_string())
}

/// Turns step parameters into pending steps, resolving dependency positions
/// to step ids.
fn build_steps(params: &[StepCreate]) -> Result<Vec<PlanStep>> {
    let ids: Vec<String> = params.iter().map(|_| Uuid::new_v4().to_string()).collect();

    params
        .iter()
        .enumerate()
        .map(|(index, step)| {
            let field = format!("steps[{index}]");
            let name = non_empty(&format!("{field}.name"), &step.name)?;

            let command = step.command.clone().filter(|c| !c.trim().is_empty());
            if step.step_type == StepType::Shell && command.is_none() {
                return Err(EngineError::invalid_input(format!("{field}.command"))
                    .with_reason("Command is required for shell steps"));
            }

            let mut dependencies: Vec<String> = Vec::with_capacity(step.depends_on.len());
            for &position in &step.depends_on {
                if position == index {
                    return Err(EngineError::invalid_input(format!("{field}.depends_on"))
                        .with_reason("A step cannot depend on itself"));
                }
                let Some(id) = ids.get(position) else {
                    return Err(EngineError::invalid_input(format!("{field}.depends_on"))
                        .with_reason(format!(
                            "Position {position} is out of range for {} steps",
                            params.len()
                        )));
                };
                if !dependencies.contains(id) {
                    dependencies.push(id.clone());
                }
            }

            Ok(PlanStep {
                id: ids[index].clone(),
                name,
                description: step.description.clone().filter(|d| !d.trim().is_empty()),
                order: u32::try_from(index).map_err(|_| {
                    EngineError::invalid_input("steps").with_reason("Too many steps")
                })?,
                step_type: step.step_type,
                status: StepStatus::Pending,
                command,
                dependencies,
                estimated_duration_secs: step.estimated_duration_secs,
                output: None,
                error: None,
                started_at: None,
                completed_at: None,
            })
        })
        .collect()
}

/// Resolves ".." and "." components without requiring the path to exist.
fn normalize_path(path: &Path) -> PathBuf {
    path.components().fold(PathBuf::new(), |mut acc, component| {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                acc.pop();
            }
            _ => acc.push(component),
        }
        acc
    })
}

/// Makes a project path absolute against the current working directory,
/// which is also the default when no path is given.
fn absolute_project_path(path: Option<&str>) -> Result<String> {
    let path = path.map(str::trim).filter(|p| !p.is_empty());
    let absolute = match path {
        Some(p) if Path::new(p).is_absolute() => PathBuf::from(p),
        _ => {
            let cwd = current_dir().map_err(|_| {
                EngineError::invalid_input("project_path")
                    .with_reason("Cannot determine current working directory")
            })?;
            match path {
                Some(p) => cwd.join(p),
                None => cwd,
            }
        }
    };

    normalize_path(&absolute)
        .to_str()
        .map(String::from)
        .ok_or_else(|| EngineError::invalid_input("project_path").with_reason("Path is not valid UTF-8"))
}
