//! Collection wrapper types for displaying groups of plans.

use std::fmt;

use super::datetime::LocalDateTime;
use crate::models::{Plan, StepStatus};

/// Newtype wrapper for displaying a plan listing.
///
/// Each plan renders as a compact entry rather than the full [`Plan`]
/// display. Empty listings render a placeholder line.
///
/// # Examples
///
/// ```rust
/// use relay_core::display::Plans;
///
/// assert_eq!(Plans(vec![]).to_string(), "No plans found.\n");
/// ```
pub struct Plans(pub Vec<Plan>);

impl Plans {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Plan> {
        self.0.iter()
    }
}

impl IntoIterator for Plans {
    type Item = Plan;
    type IntoIter = std::vec::IntoIter<Self::Item>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl fmt::Display for Plans {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return writeln!(f, "No plans found.");
        }
        for plan in &self.0 {
            let progress = if plan.steps.is_empty() {
                String::new()
            } else {
                format!(
                    " ({}/{})",
                    plan.count_steps(StepStatus::Completed),
                    plan.steps.len()
                )
            };
            writeln!(f, "## {} [{}]{progress}", plan.title, plan.status)?;
            writeln!(f)?;
            writeln!(f, "- **ID**: {}", plan.id)?;
            writeln!(f, "- **Project**: {}", plan.project_path)?;
            writeln!(f, "- **Updated**: {}", LocalDateTime(&plan.updated_at))?;
            writeln!(f)?;
        }
        Ok(())
    }
}
