//! One-JSON-document-per-plan store.
//!
//! Layout under the data directory:
//!
//! ```text
//! <data_dir>/
//! ├── plans/
//! │   └── <plan id>.json
//! └── stats.json
//! ```

use std::{
    fs,
    io::{ErrorKind, Write},
    path::{Path, PathBuf},
};

use log::{debug, warn};

use super::PlanStore;
use crate::{
    error::{EngineError, IoResultExt, Result},
    models::{Plan, PlanExecutionStats},
};

const PLANS_DIR: &str = "plans";
const STATS_FILE: &str = "stats.json";

/// File-system store writing pretty-printed JSON documents.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    root: PathBuf,
}

impl JsonFileStore {
    /// Opens (and creates if needed) a store rooted at `root`.
    pub fn new<P: AsRef<Path>>(root: P) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        let plans_dir = root.join(PLANS_DIR);
        fs::create_dir_all(&plans_dir).at_path(&plans_dir)?;
        Ok(Self { root })
    }

    fn plan_path(&self, plan_id: &str) -> Result<PathBuf> {
        // Ids become file names; refuse anything that could escape the dir.
        if plan_id.is_empty()
            || plan_id
                .chars()
                .any(|c| !(c.is_ascii_alphanumeric() || c == '-' || c == '_'))
        {
            return Err(EngineError::invalid_input("plan_id")
                .with_reason(format!("'{plan_id}' is not a valid plan id")));
        }
        Ok(self.root.join(PLANS_DIR).join(format!("{plan_id}.json")))
    }

    fn stats_path(&self) -> PathBuf {
        self.root.join(STATS_FILE)
    }

    fn read_plan(path: &Path) -> Result<Plan> {
        let contents = fs::read_to_string(path).at_path(path)?;
        Ok(serde_json::from_str(&contents)?)
    }
}

impl PlanStore for JsonFileStore {
    fn load_plans(&self) -> Result<Vec<Plan>> {
        let dir = self.root.join(PLANS_DIR);
        let mut plans = Vec::new();

        for entry in fs::read_dir(&dir).at_path(&dir)? {
            let path = entry.at_path(&dir)?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            match Self::read_plan(&path) {
                Ok(plan) => plans.push(plan),
                Err(e) => warn!("Skipping unreadable plan file {}: {e}", path.display()),
            }
        }

        debug!("Loaded {} plans from {}", plans.len(), dir.display());
        Ok(plans)
    }

    fn save_plan(&self, plan: &Plan) -> Result<()> {
        let path = self.plan_path(&plan.id)?;
        let json = serde_json::to_string_pretty(plan)?;
        write_replacing(&path, &json)
    }

    fn delete_plan(&self, plan_id: &str) -> Result<()> {
        let path = self.plan_path(plan_id)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(EngineError::file_system(path, e)),
        }
    }

    fn load_stats(&self) -> Result<Option<PlanExecutionStats>> {
        let path = self.stats_path();
        match fs::read_to_string(&path) {
            Ok(contents) => Ok(Some(serde_json::from_str(&contents)?)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(EngineError::file_system(path, e)),
        }
    }

    fn save_stats(&self, stats: &PlanExecutionStats) -> Result<()> {
        let path = self.stats_path();
        let json = serde_json::to_string_pretty(stats)?;
        write_replacing(&path, &json)
    }
}

/// Writes to a uniquely named temporary file beside `path` and renames it
/// over `path`, so readers never see a half-written document and concurrent
/// writers never share a temporary file.
fn write_replacing(path: &Path, contents: &str) -> Result<()> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut tmp = tempfile::Builder::new()
        .prefix(".")
        .suffix(".tmp")
        .tempfile_in(dir)
        .at_path(dir)?;
    tmp.write_all(contents.as_bytes()).at_path(tmp.path())?;
    tmp.persist(path).map_err(|e| e.error).at_path(path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use jiff::Timestamp;
    use tempfile::TempDir;

    use super::*;
    use crate::models::PlanStatus;

    fn sample_plan(id: &str) -> Plan {
        Plan {
            id: id.to_string(),
            title: format!("Plan {id}"),
            description: None,
            project_path: "/tmp".to_string(),
            status: PlanStatus::Draft,
            steps: vec![],
            current_step_index: 0,
            created_at: Timestamp::now(),
            updated_at: Timestamp::now(),
            started_at: None,
            completed_at: None,
            total_duration_ms: None,
            error: None,
        }
    }

    #[test]
    fn test_save_load_delete_plan() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let store = JsonFileStore::new(temp_dir.path()).expect("Failed to open store");

        store.save_plan(&sample_plan("a1")).unwrap();
        store.save_plan(&sample_plan("b2")).unwrap();
        assert!(temp_dir.path().join("plans/a1.json").exists());

        let mut plans = store.load_plans().unwrap();
        plans.sort_by(|a, b| a.id.cmp(&b.id));
        assert_eq!(plans.len(), 2);
        assert_eq!(plans[0].title, "Plan a1");

        store.delete_plan("a1").unwrap();
        store.delete_plan("a1").expect("Deleting twice is not an error");
        assert_eq!(store.load_plans().unwrap().len(), 1);
    }

    #[test]
    fn test_unreadable_plan_is_skipped() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let store = JsonFileStore::new(temp_dir.path()).unwrap();
        store.save_plan(&sample_plan("good")).unwrap();
        fs::write(temp_dir.path().join("plans/bad.json"), "{ not json").unwrap();
        fs::write(temp_dir.path().join("plans/notes.txt"), "ignored").unwrap();

        let plans = store.load_plans().unwrap();
        assert_eq!(plans.len(), 1);
        assert_eq!(plans[0].id, "good");
    }

    #[test]
    fn test_stats_round_trip() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let store = JsonFileStore::new(temp_dir.path()).unwrap();
        assert!(store.load_stats().unwrap().is_none());

        let stats = PlanExecutionStats {
            total_plans: 3,
            completed_plans: 2,
            ..Default::default()
        };
        store.save_stats(&stats).unwrap();
        assert_eq!(store.load_stats().unwrap(), Some(stats));
    }

    #[test]
    fn test_concurrent_saves_leave_readable_document() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let store = JsonFileStore::new(temp_dir.path()).unwrap();

        std::thread::scope(|scope| {
            for n in 0..8u64 {
                let store = &store;
                scope.spawn(move || {
                    for i in 0..20 {
                        let stats = PlanExecutionStats {
                            total_plans: n * 100 + i,
                            ..Default::default()
                        };
                        store.save_stats(&stats).expect("Concurrent save failed");
                        store.save_plan(&sample_plan("shared")).expect("Concurrent save failed");
                    }
                });
            }
        });

        assert!(store.load_stats().unwrap().is_some());
        assert_eq!(store.load_plans().unwrap().len(), 1);
        let leftovers: Vec<_> = fs::read_dir(temp_dir.path())
            .unwrap()
            .chain(fs::read_dir(temp_dir.path().join("plans")).unwrap())
            .map(|entry| entry.unwrap().file_name())
            .filter(|name| name.to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty(), "Temporary files left behind: {leftovers:?}");
    }

    #[test]
    fn test_rejects_path_like_ids() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let store = JsonFileStore::new(temp_dir.path()).unwrap();
        let result = store.save_plan(&sample_plan("../escape"));
        assert!(matches!(result, Err(EngineError::InvalidInput { .. })));
    }
}
