//! Change notifications for a UI or other observer.
//!
//! After every state mutation the engine pushes the event name and a snapshot
//! of the affected plan to its [`Notifier`], if one is configured.

use std::fmt;

use tokio::sync::mpsc;

use crate::models::Plan;

/// Kind of mutation a notification reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlanEvent {
    Created,
    Updated,
    Deleted,
    Started,
    Paused,
    Resumed,
    Completed,
    Failed,
    StepStarted,
    StepOutput,
    StepCompleted,
    StepFailed,
}

impl PlanEvent {
    /// Wire name of the event, e.g. `plan:updated` or `step:output`.
    pub fn as_str(&self) -> &'static str {
        match self {
            PlanEvent::Created => "plan:created",
            PlanEvent::Updated => "plan:updated",
            PlanEvent::Deleted => "plan:deleted",
            PlanEvent::Started => "plan:started",
            PlanEvent::Paused => "plan:paused",
            PlanEvent::Resumed => "plan:resumed",
            PlanEvent::Completed => "plan:completed",
            PlanEvent::Failed => "plan:failed",
            PlanEvent::StepStarted => "step:started",
            PlanEvent::StepOutput => "step:output",
            PlanEvent::StepCompleted => "step:completed",
            PlanEvent::StepFailed => "step:failed",
        }
    }
}

impl fmt::Display for PlanEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Passive sink for plan snapshots. Implementations must not block and must
/// not panic.
pub trait Notifier: Send + Sync {
    fn notify(&self, event: PlanEvent, plan: &Plan);
}

/// Forwards every notification over an unbounded channel.
///
/// Once the receiver is dropped notifications are silently discarded.
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
    sender: mpsc::UnboundedSender<(PlanEvent, Plan)>,
}

impl ChannelNotifier {
    /// Create a notifier and the receiver its notifications arrive on.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<(PlanEvent, Plan)>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

impl Notifier for ChannelNotifier {
    fn notify(&self, event: PlanEvent, plan: &Plan) {
        let _ = self.sender.send((event, plan.clone()));
    }
}
