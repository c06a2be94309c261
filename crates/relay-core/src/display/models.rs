//! Display implementations for domain models.
//!
//! Plans and steps render as markdown: a header, a metadata list, then
//! optional sections. Output and error sections only appear when present.

use std::fmt;

use super::datetime::{FormatDuration, LocalDateTime};
use crate::models::{PlanExecutionStats, Plan, PlanStatus, PlanStep, StepStatus, StepType};

impl fmt::Display for PlanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl fmt::Display for StepStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl fmt::Display for StepType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl fmt::Display for Plan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "# {}", self.title)?;
        writeln!(f)?;

        writeln!(f, "- ID: {}", self.id)?;
        writeln!(f, "- Status: {}", self.status)?;
        writeln!(f, "- Project: {}", self.project_path)?;
        writeln!(
            f,
            "- Progress: {}/{}",
            self.count_steps(StepStatus::Completed),
            self.steps.len()
        )?;
        writeln!(f, "- Created: {}", LocalDateTime(&self.created_at))?;
        writeln!(f, "- Updated: {}", LocalDateTime(&self.updated_at))?;
        if let Some(started) = &self.started_at {
            writeln!(f, "- Started: {}", LocalDateTime(started))?;
        }
        if let Some(duration) = self.total_duration_ms {
            writeln!(f, "- Duration: {}", FormatDuration(duration))?;
        }
        if let Some(error) = &self.error {
            writeln!(f, "- Error: {error}")?;
        }

        if let Some(desc) = &self.description {
            writeln!(f)?;
            writeln!(f, "{desc}")?;
        }

        if self.steps.is_empty() {
            writeln!(f, "\nNo steps in this plan.")?;
        } else {
            writeln!(f, "\n## Steps")?;
            writeln!(f)?;
            for step in &self.steps {
                write!(f, "{step}")?;
            }
        }

        Ok(())
    }
}

impl fmt::Display for PlanStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "### {}. {} [{}] ({})",
            self.order,
            self.name,
            self.step_type,
            self.status.with_icon()
        )?;
        writeln!(f)?;
        writeln!(f, "- ID: {}", self.id)?;
        if let Some(command) = &self.command {
            writeln!(f, "- Command: `{command}`")?;
        }
        if !self.dependencies.is_empty() {
            writeln!(f, "- Depends on: {}", self.dependencies.join(", "))?;
        }
        writeln!(f)?;

        if let Some(desc) = &self.description {
            writeln!(f, "{desc}")?;
            writeln!(f)?;
        }

        if let Some(output) = self.output.as_deref().filter(|o| !o.is_empty()) {
            writeln!(f, "#### Output")?;
            writeln!(f)?;
            writeln!(f, "```")?;
            writeln!(f, "{}", output.trim_end())?;
            writeln!(f, "```")?;
            writeln!(f)?;
        }

        if let Some(error) = &self.error {
            writeln!(f, "#### Error")?;
            writeln!(f)?;
            writeln!(f, "{error}")?;
            writeln!(f)?;
        }

        Ok(())
    }
}

impl fmt::Display for PlanExecutionStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "# Execution Statistics")?;
        writeln!(f)?;
        writeln!(f, "- Total plans: {}", self.total_plans)?;
        writeln!(f, "- Completed: {}", self.completed_plans)?;
        writeln!(f, "- Failed: {}", self.failed_plans)?;
        writeln!(f, "- Success rate: {:.1}%", self.success_rate * 100.0)?;
        writeln!(
            f,
            "- Average duration: {}",
            FormatDuration(self.avg_duration_ms.round() as u64)
        )?;
        writeln!(f, "- Steps executed: {}", self.total_steps_executed)
    }
}
