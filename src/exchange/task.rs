//! Background execution of export and import passes.
//!
//! Each direction runs at most one pass at a time. Starting a new pass
//! cancels and joins the previous one of the same direction first.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};

use log::{debug, info};

use crate::config::ExchangeSettings;
use crate::error::{Result, TagCsvError};
use crate::tree::ProjectTree;

use super::export::{ExportStats, flatten, resolve_root, write_flattened};
use super::import::{ImportStats, import_from_csv};

/// Cooperative cancellation flag shared between a pass and its owner.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// A unit of work running on its own thread.
///
/// Dropping the task cancels it and waits for the thread to exit.
pub struct BackgroundTask<T> {
    name: String,
    cancel: CancelToken,
    handle: Option<JoinHandle<Result<T>>>,
}

impl<T: Send + 'static> BackgroundTask<T> {
    pub fn spawn<F>(name: &str, work: F) -> Result<Self>
    where
        F: FnOnce(CancelToken) -> Result<T> + Send + 'static,
    {
        let cancel = CancelToken::new();
        let token = cancel.clone();
        let handle = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || work(token))?;
        debug!("Started background task {}", name);
        Ok(BackgroundTask {
            name: name.to_string(),
            cancel,
            handle: Some(handle),
        })
    }
}

impl<T> BackgroundTask<T> {
    /// Block until the task ends and return its result.
    pub fn wait(mut self) -> Result<T> {
        let handle = self
            .handle
            .take()
            .ok_or_else(|| TagCsvError::TaskPanicked(format!("{} already joined", self.name)))?;
        join(handle, &self.name)
    }
}

impl<T> Drop for BackgroundTask<T> {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            self.cancel.cancel();
            let _ = join(handle, &self.name);
            debug!("Disposed background task {}", self.name);
        }
    }
}

fn join<T>(handle: JoinHandle<Result<T>>, name: &str) -> Result<T> {
    handle.join().map_err(|panic| {
        let message = panic
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| panic.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic".to_string());
        TagCsvError::TaskPanicked(format!("{}: {}", name, message))
    })?
}

fn lock(tree: &Mutex<ProjectTree>) -> Result<MutexGuard<'_, ProjectTree>> {
    tree.lock().map_err(|_| TagCsvError::LockPoisoned)
}

/// Owns the project tree and the in-flight export/import passes.
pub struct Exchange {
    tree: Arc<Mutex<ProjectTree>>,
    export_task: Option<BackgroundTask<ExportStats>>,
    import_task: Option<BackgroundTask<ImportStats>>,
}

impl Exchange {
    pub fn new(tree: ProjectTree) -> Self {
        Exchange::with_shared(Arc::new(Mutex::new(tree)))
    }

    pub fn with_shared(tree: Arc<Mutex<ProjectTree>>) -> Self {
        Exchange {
            tree,
            export_task: None,
            import_task: None,
        }
    }

    pub fn tree(&self) -> Arc<Mutex<ProjectTree>> {
        Arc::clone(&self.tree)
    }

    /// Start an export pass, replacing any export still in flight.
    ///
    /// The driver reference is checked before the pass starts; the tree is
    /// locked only while it is walked, not while the file is written.
    pub fn start_export(&mut self, settings: &ExchangeSettings) -> Result<()> {
        let reference = settings.driver_reference()?.to_string();
        let root = resolve_root(&*lock(&self.tree)?, &reference)?;

        // Dispose of the previous pass before starting a new one.
        self.export_task = None;

        let tree = Arc::clone(&self.tree);
        let csv_path = settings.csv_path.clone();
        let dialect = settings.dialect;
        let task = BackgroundTask::spawn("tag-export", move |cancel| {
            info!("Exporting tags below \"{}\" to {}", root, csv_path.display());
            let flattened = {
                let tree = lock(&tree)?;
                flatten(&*tree, &root, &dialect, &cancel)?
            };
            write_flattened(&csv_path, dialect, flattened)
        })?;
        self.export_task = Some(task);
        Ok(())
    }

    /// Start an import pass, replacing any import still in flight.
    pub fn start_import(&mut self, settings: &ExchangeSettings) -> Result<()> {
        self.import_task = None;

        let tree = Arc::clone(&self.tree);
        let csv_path = settings.csv_path.clone();
        let delimiter = settings.dialect.delimiter();
        let task = BackgroundTask::spawn("tag-import", move |cancel| {
            let mut tree = lock(&tree)?;
            import_from_csv(&mut *tree, &csv_path, delimiter, &cancel)
        })?;
        self.import_task = Some(task);
        Ok(())
    }

    /// Wait for the current export; None when no export was started.
    pub fn wait_export(&mut self) -> Option<Result<ExportStats>> {
        self.export_task.take().map(BackgroundTask::wait)
    }

    /// Wait for the current import; None when no import was started.
    pub fn wait_import(&mut self) -> Option<Result<ImportStats>> {
        self.import_task.take().map(BackgroundTask::wait)
    }
}
