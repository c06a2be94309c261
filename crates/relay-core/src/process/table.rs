//! Live-process table keyed by plan and step.

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicU64, Ordering},
        Mutex, MutexGuard,
    },
};

use log::debug;

use super::ProcessHandle;

/// Identifies the step a process runs for.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProcessKey {
    pub plan_id: String,
    pub step_id: String,
}

impl ProcessKey {
    pub fn new(plan_id: impl Into<String>, step_id: impl Into<String>) -> Self {
        Self {
            plan_id: plan_id.into(),
            step_id: step_id.into(),
        }
    }
}

/// Identifies one dispatch of a step.
///
/// A step can be dispatched more than once (resume re-runs an interrupted
/// shell step); only the latest run may report completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RunToken(u64);

struct Entry {
    run: RunToken,
    handle: Option<Box<dyn ProcessHandle>>,
}

/// One entry per step run that has been dispatched and not yet finished.
///
/// An entry is reserved when the step is dispatched. A shell run receives
/// its handle once the process has spawned; a timer run never has one. Killing or finishing removes it, which is
/// how late events from a killed process are recognized and dropped.
#[derive(Default)]
pub struct ProcessTable {
    entries: Mutex<HashMap<ProcessKey, Entry>>,
    next_run: AtomicU64,
}

impl ProcessTable {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<ProcessKey, Entry>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Reserve the slot for a new run of `key`, killing any process of an
    /// earlier run still registered there.
    pub fn reserve(&self, key: ProcessKey) -> RunToken {
        let run = RunToken(self.next_run.fetch_add(1, Ordering::Relaxed));
        let previous = self.lock().insert(key, Entry { run, handle: None });
        if let Some(mut handle) = previous.and_then(|e| e.handle) {
            handle.kill();
        }
        run
    }

    /// True while `run` is the live run of `key`.
    pub fn is_current(&self, key: &ProcessKey, run: RunToken) -> bool {
        self.lock().get(key).is_some_and(|e| e.run == run)
    }

    /// Attach the spawned process to its reservation. If the reservation is
    /// gone (killed in the meantime) the process is killed immediately and
    /// `false` is returned.
    pub fn attach(&self, key: &ProcessKey, run: RunToken, mut handle: Box<dyn ProcessHandle>) -> bool {
        let mut entries = self.lock();
        match entries.get_mut(key) {
            Some(entry) if entry.run == run => {
                entry.handle = Some(handle);
                true
            }
            _ => {
                drop(entries);
                handle.kill();
                false
            }
        }
    }

    /// Remove the entry for a run that finished on its own. Returns `false`
    /// if the run was already killed or superseded, in which case its result
    /// must be discarded.
    pub fn finish(&self, key: &ProcessKey, run: RunToken) -> bool {
        let mut entries = self.lock();
        match entries.get(key) {
            Some(entry) if entry.run == run => {
                entries.remove(key);
                true
            }
            _ => false,
        }
    }

    /// True if `key` has a reservation or a running process.
    pub fn contains(&self, key: &ProcessKey) -> bool {
        self.lock().contains_key(key)
    }

    /// Kill and remove the process for `key`. Returns whether an entry
    /// existed.
    pub fn kill(&self, key: &ProcessKey) -> bool {
        let removed = self.lock().remove(key);
        match removed {
            Some(entry) => {
                if let Some(mut handle) = entry.handle {
                    debug!("Killing process for step {} of plan {}", key.step_id, key.plan_id);
                    handle.kill();
                }
                true
            }
            None => false,
        }
    }

    /// Kill and remove every process belonging to `plan_id`. Returns how many
    /// entries were removed.
    pub fn kill_plan(&self, plan_id: &str) -> usize {
        let removed: Vec<(ProcessKey, Entry)> = {
            let mut entries = self.lock();
            let keys: Vec<ProcessKey> = entries
                .keys()
                .filter(|k| k.plan_id == plan_id)
                .cloned()
                .collect();
            keys.into_iter()
                .filter_map(|k| entries.remove(&k).map(|e| (k, e)))
                .collect()
        };

        let count = removed.len();
        for (key, entry) in removed {
            if let Some(mut handle) = entry.handle {
                debug!("Killing process for step {} of plan {}", key.step_id, key.plan_id);
                handle.kill();
            }
        }
        count
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}
