//! Builder for creating and configuring PlanEngine instances.

use std::{
    collections::HashMap,
    env,
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
    time::Duration,
};

use log::{info, warn};
use tokio::task;

use super::{EngineConfig, EngineInner, PlanEngine};
use crate::{
    error::{EngineError, Result},
    models::PlanStatus,
    notify::Notifier,
    process::{ProcessSpawner, ProcessTable, TokioSpawner},
    stats::StatsAggregator,
    store::{JsonFileStore, PlanStore},
    validation::{AllowlistCommandValidator, CommandValidator, PathValidator, RootPathValidator},
};

/// Auto-completion delay of placeholder step types.
pub const DEFAULT_PLACEHOLDER_DELAY: Duration = Duration::from_secs(2);

/// Builder for creating and configuring PlanEngine instances.
pub struct PlanEngineBuilder {
    data_dir: Option<PathBuf>,
    allowed_roots: Option<Vec<PathBuf>>,
    placeholder_delay: Duration,
    store: Option<Arc<dyn PlanStore>>,
    notifier: Option<Arc<dyn Notifier>>,
    command_validator: Option<Arc<dyn CommandValidator>>,
    path_validator: Option<Arc<dyn PathValidator>>,
    spawner: Option<Arc<dyn ProcessSpawner>>,
}

impl PlanEngineBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            data_dir: None,
            allowed_roots: None,
            placeholder_delay: DEFAULT_PLACEHOLDER_DELAY,
            store: None,
            notifier: None,
            command_validator: None,
            path_validator: None,
            spawner: None,
        }
    }

    /// Sets a custom data directory for the JSON store.
    ///
    /// If not specified, uses XDG Base Directory specification:
    /// `$XDG_DATA_HOME/relay` or `~/.local/share/relay`
    pub fn with_data_dir<P: AsRef<Path>>(mut self, path: Option<P>) -> Self {
        if let Some(path) = path {
            self.data_dir = Some(path.as_ref().to_path_buf());
        }
        self
    }

    /// Directories project paths must lie within. Defaults to the user's
    /// home directory, or the current directory when no home is known.
    pub fn with_allowed_roots<I, P>(mut self, roots: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        let roots: Vec<PathBuf> = roots.into_iter().map(Into::into).collect();
        if !roots.is_empty() {
            self.allowed_roots = Some(roots);
        }
        self
    }

    pub fn with_placeholder_delay(mut self, delay: Duration) -> Self {
        self.placeholder_delay = delay;
        self
    }

    /// Use `store` instead of a JSON store in the data directory.
    pub fn with_store(mut self, store: Arc<dyn PlanStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub fn with_command_validator(mut self, validator: Arc<dyn CommandValidator>) -> Self {
        self.command_validator = Some(validator);
        self
    }

    pub fn with_path_validator(mut self, validator: Arc<dyn PathValidator>) -> Self {
        self.path_validator = Some(validator);
        self
    }

    pub fn with_spawner(mut self, spawner: Arc<dyn ProcessSpawner>) -> Self {
        self.spawner = Some(spawner);
        self
    }

    /// Builds the configured engine, loading any previously stored plans and
    /// stats.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::XdgDirectory` if no default data directory can
    /// be determined
    /// Returns `EngineError::FileSystem` if the data directory cannot be
    /// created or read
    pub async fn build(self) -> Result<PlanEngine> {
        let store: Arc<dyn PlanStore> = match self.store {
            Some(store) => store,
            None => {
                let data_dir = match self.data_dir {
                    Some(dir) => dir,
                    None => Self::default_data_dir()?,
                };
                Arc::new(JsonFileStore::new(data_dir)?)
            }
        };

        let loader = store.clone();
        let (plans, stats) = task::spawn_blocking(move || {
            let plans = loader.load_plans()?;
            let stats = loader.load_stats().unwrap_or_else(|e| {
                warn!("Ignoring unreadable execution stats, starting from zero: {e}");
                None
            });
            Ok::<_, EngineError>((plans, stats.unwrap_or_default()))
        })
        .await
        .map_err(|e| EngineError::Configuration {
            message: format!("Task join error: {e}"),
        })??;

        for plan in &plans {
            if matches!(plan.status, PlanStatus::Executing) {
                warn!(
                    "Plan {} was executing when last saved; no process is attached to it now",
                    plan.id
                );
            }
        }
        info!("Loaded {} plans", plans.len());

        let allowed_roots = match self.allowed_roots {
            Some(roots) => roots,
            None => Self::default_allowed_roots()?,
        };

        let plans = plans.into_iter().map(|p| (p.id.clone(), p)).collect::<HashMap<_, _>>();

        Ok(PlanEngine {
            inner: Arc::new(EngineInner {
                plans: Mutex::new(plans),
                processes: ProcessTable::new(),
                timers: ProcessTable::new(),
                stats: StatsAggregator::new(stats, store.clone()),
                store,
                notifier: self.notifier,
                command_validator: self
                    .command_validator
                    .unwrap_or_else(|| Arc::new(AllowlistCommandValidator::default())),
                path_validator: self.path_validator.unwrap_or_else(|| Arc::new(RootPathValidator)),
                spawner: self.spawner.unwrap_or_else(|| Arc::new(TokioSpawner)),
                config: EngineConfig {
                    allowed_roots,
                    placeholder_delay: self.placeholder_delay,
                },
            }),
        })
    }

    /// Returns the default data directory following XDG Base Directory
    /// specification.
    fn default_data_dir() -> Result<PathBuf> {
        let stats_file = xdg::BaseDirectories::with_prefix("relay")
            .place_data_file("stats.json")
            .map_err(|e| EngineError::XdgDirectory(e.to_string()))?;
        stats_file
            .parent()
            .map(Path::to_path_buf)
            .ok_or_else(|| EngineError::XdgDirectory("data directory has no parent".to_string()))
    }

    fn default_allowed_roots() -> Result<Vec<PathBuf>> {
        if let Some(home) = env::var_os("HOME").or_else(|| env::var_os("USERPROFILE")) {
            return Ok(vec![PathBuf::from(home)]);
        }
        let cwd = env::current_dir().map_err(|e| EngineError::Configuration {
            message: format!("Cannot determine an allowed root: {e}"),
        })?;
        Ok(vec![cwd])
    }
}

impl Default for PlanEngineBuilder {
    fn default() -> Self {
        Self::new()
    }
}
