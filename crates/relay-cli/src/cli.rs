//! Command handlers for the Relay CLI.
//!
//! Each handler calls one [`PlanEngine`] operation and renders the result as
//! markdown. Commands that set a plan in motion (`plan run`, `plan resume`,
//! `step complete`) then follow the plan until it settles: it leaves
//! `executing`, or its current step is a manual step waiting for a signal.

use std::{collections::HashMap, fs, path::Path};

use anyhow::{bail, Context, Result};
use log::{debug, warn};
use relay_core::{
    params::{CreatePlan, ListPlans, UpdatePlan},
    CreateResult, DeleteResult, EngineError, OperationStatus, Plan, PlanEngine, PlanEvent,
    PlanStatus, Plans, StepStatus, StepType,
};
use tokio::sync::mpsc::UnboundedReceiver;

use crate::{
    args::{PlanCommands, StepCommands},
    renderer::TerminalRenderer,
};

pub struct Cli {
    engine: PlanEngine,
    events: UnboundedReceiver<(PlanEvent, Plan)>,
    renderer: TerminalRenderer,
}

impl Cli {
    pub fn new(
        engine: PlanEngine,
        events: UnboundedReceiver<(PlanEvent, Plan)>,
        renderer: TerminalRenderer,
    ) -> Self {
        Self {
            engine,
            events,
            renderer,
        }
    }

    pub async fn handle_plan_command(mut self, command: PlanCommands) -> Result<()> {
        match command {
            PlanCommands::Create(args) => self.create_plan(&args.file),
            PlanCommands::List(args) => self.list_plans(&args.into()),
            PlanCommands::Show(args) => self.show_plan(&args.id),
            PlanCommands::Update(args) => {
                let id = args.id.clone();
                self.update_plan(&id, &args.into())
            }
            PlanCommands::Delete(args) => self.delete_plan(&args.id, args.confirm),
            PlanCommands::Run(args) => {
                let progress = Progress::new(&self.plan(&args.id)?);
                self.report(OperationStatus::from_outcome(
                    self.engine.execute(&args.id),
                    "Plan started",
                    "Plan is not a draft; only draft plans can be run",
                ))?;
                self.follow(&args.id, progress).await
            }
            PlanCommands::Pause(args) => {
                self.plan(&args.id)?;
                self.report(OperationStatus::from_outcome(
                    self.engine.pause(&args.id),
                    "Plan paused",
                    "Plan is not executing",
                ))
            }
            PlanCommands::Resume(args) => {
                let progress = Progress::new(&self.plan(&args.id)?);
                self.report(OperationStatus::from_outcome(
                    self.engine.resume(&args.id),
                    "Plan resumed",
                    "Plan is not paused",
                ))?;
                self.follow(&args.id, progress).await
            }
            PlanCommands::Cancel(args) => {
                self.plan(&args.id)?;
                self.report(OperationStatus::from_outcome(
                    self.engine.cancel(&args.id),
                    "Plan cancelled",
                    "Plan is not executing or paused",
                ))
            }
        }
    }

    pub async fn handle_step_command(mut self, command: StepCommands) -> Result<()> {
        match command {
            StepCommands::Complete(args) => {
                let plan = self.step_plan(&args.plan_id, &args.step_id)?;
                let progress = Progress::new(&plan);
                self.report(OperationStatus::from_outcome(
                    self.engine
                        .step_complete(&args.plan_id, &args.step_id, args.output),
                    "Step completed",
                    "Step already finished, or its plan has finished",
                ))?;
                self.follow(&args.plan_id, progress).await
            }
            StepCommands::Fail(args) => {
                self.step_plan(&args.plan_id, &args.step_id)?;
                self.report(OperationStatus::from_outcome(
                    self.engine
                        .step_fail(&args.plan_id, &args.step_id, &args.error),
                    "Step failed; plan failed",
                    "Step already finished, or its plan has finished",
                ))
            }
        }
    }

    pub fn list_plans(&self, params: &ListPlans) -> Result<()> {
        let plans = Plans(self.engine.list(params));
        self.renderer.render(&plans.to_string())
    }

    pub fn show_stats(&self) -> Result<()> {
        self.renderer.render(&self.engine.stats().to_string())
    }

    fn create_plan(&self, file: &Path) -> Result<()> {
        let contents = fs::read_to_string(file)
            .with_context(|| format!("Failed to read plan document {}", file.display()))?;
        let params: CreatePlan = serde_json::from_str(&contents)
            .with_context(|| format!("Invalid plan document {}", file.display()))?;

        let plan = self
            .engine
            .create(&params)
            .context("Failed to create plan")?;
        self.renderer.render(&CreateResult::new(plan).to_string())
    }

    fn show_plan(&self, id: &str) -> Result<()> {
        let plan = self.plan(id)?;
        self.renderer.render(&plan.to_string())
    }

    fn update_plan(&self, id: &str, params: &UpdatePlan) -> Result<()> {
        if params.is_empty() {
            bail!("Nothing to update; pass --title, --description, or --project-path");
        }
        if !self
            .engine
            .update(id, params)
            .context("Failed to update plan")?
        {
            return Err(EngineError::PlanNotFound { id: id.to_string() }.into());
        }
        self.show_plan(id)
    }

    fn delete_plan(&self, id: &str, confirm: bool) -> Result<()> {
        let plan = self.plan(id)?;
        if !confirm {
            bail!(
                "Refusing to delete plan '{}' without --confirm",
                plan.title
            );
        }
        if !self.engine.delete(id) {
            return Err(EngineError::PlanNotFound { id: id.to_string() }.into());
        }
        self.renderer.render(&DeleteResult::new(plan).to_string())
    }

    fn plan(&self, id: &str) -> Result<Plan> {
        self.engine
            .get(id)
            .ok_or_else(|| EngineError::PlanNotFound { id: id.to_string() }.into())
    }

    /// The plan owning `step_id`, or a not-found error for either id.
    fn step_plan(&self, plan_id: &str, step_id: &str) -> Result<Plan> {
        let plan = self.plan(plan_id)?;
        if plan.step_index(step_id).is_none() {
            return Err(EngineError::StepNotFound {
                plan_id: plan_id.to_string(),
                step_id: step_id.to_string(),
            }
            .into());
        }
        Ok(plan)
    }

    fn report(&self, status: OperationStatus) -> Result<()> {
        if !status.success {
            bail!(status.message);
        }
        self.renderer.render(&status.to_string())
    }

    /// Print the plan's progress until it settles. Ctrl-C cancels the plan.
    async fn follow(&mut self, plan_id: &str, mut progress: Progress) -> Result<()> {
        loop {
            while let Ok((event, plan)) = self.events.try_recv() {
                self.print_progress(event, &plan, &mut progress)?;
            }

            let plan = self.plan(plan_id)?;
            if let Some(note) = settled(&plan) {
                debug!("Stopped following plan {plan_id}: {note}");
                self.renderer.render(&format!("\n{note}\n\n"))?;
                return self.renderer.render(&plan.to_string());
            }

            tokio::select! {
                received = self.events.recv() => {
                    let Some((event, plan)) = received else {
                        bail!("Notification channel closed");
                    };
                    self.print_progress(event, &plan, &mut progress)?;
                }
                signal = tokio::signal::ctrl_c() => {
                    signal.context("Failed to listen for Ctrl-C")?;
                    warn!("Interrupted; cancelling plan {plan_id}");
                    self.report(OperationStatus::from_outcome(
                        self.engine.cancel(plan_id),
                        "Plan cancelled",
                        "Plan could not be cancelled",
                    ))?;
                }
            }
        }
    }

    fn print_progress(&self, event: PlanEvent, plan: &Plan, progress: &mut Progress) -> Result<()> {
        if plan.id != progress.plan_id {
            return Ok(());
        }
        debug!("{event} for plan {}", plan.id);

        for step in &plan.steps {
            let printed = progress.printed.entry(step.id.clone()).or_default();
            let output = step.output.as_deref().unwrap_or_default();
            if output.len() < *printed || !output.is_char_boundary(*printed) {
                // Output was reset by a restart.
                *printed = 0;
            }
            if step.status == StepStatus::Running && output.len() > *printed {
                print!("{}", &output[*printed..]);
                *printed = output.len();
            }

            let previous = progress.statuses.insert(step.id.clone(), step.status);
            if previous == Some(step.status) {
                continue;
            }
            let mut line = format!(
                "{} {}. {} [{}]",
                step.status.with_icon(),
                step.order,
                step.name,
                step.step_type
            );
            if let Some(error) = step.error.as_deref() {
                line.push_str(&format!(": {}", error.trim_end()));
            }
            self.renderer.render(&format!("{line}\n"))?;
        }
        Ok(())
    }
}

/// What has already been printed for a followed plan.
struct Progress {
    plan_id: String,
    statuses: HashMap<String, StepStatus>,
    printed: HashMap<String, usize>,
}

impl Progress {
    fn new(plan: &Plan) -> Self {
        Self {
            plan_id: plan.id.clone(),
            statuses: plan.steps.iter().map(|s| (s.id.clone(), s.status)).collect(),
            printed: plan
                .steps
                .iter()
                .map(|s| (s.id.clone(), s.output.as_ref().map_or(0, String::len)))
                .collect(),
        }
    }
}

/// Why following a plan can stop, or `None` while it is still making
/// progress on its own.
fn settled(plan: &Plan) -> Option<String> {
    match plan.status {
        PlanStatus::Executing => plan
            .current_step()
            .filter(|s| s.status == StepStatus::Running && s.step_type == StepType::Manual)
            .map(|s| {
                format!(
                    "Waiting on manual step '{}'. Finish it with: relay step complete {} {}",
                    s.name, plan.id, s.id
                )
            }),
        status => Some(format!("Plan is {status}")),
    }
}
