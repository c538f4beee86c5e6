// Index scheduler
// Walks the originals tree, groups related files and hands one job per
// asset group to the worker pool. One run at a time per RunController.

pub mod controller;
pub mod done;
pub mod ignore;
pub mod job;
pub mod worker;

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::UNIX_EPOCH;

use serde::Serialize;
use walkdir::WalkDir;

use crate::catalog::Catalog;
use crate::config::{Config, Root, Roots};
use crate::error::{CatalogError, Result};
use crate::events::{self, EventSink};
use crate::media::{related_files, MediaFile, RelatedFiles};

pub use controller::{RunController, RunGuard};
pub use done::{DoneSet, FileStatus};
pub use ignore::IgnoreList;
pub use job::{index_related, IndexAction, IndexJob, IndexResult};
pub use worker::{WorkerPool, WorkerStats};

#[derive(Debug, Clone, Default, Serialize)]
pub struct IndexOptions {
    /// Subfolder of originals to index; empty for all
    pub path: String,
    /// Index files even if stored at the same modification time
    pub rescan: bool,
    /// Group "name (1).jpg" and "name copy.jpg" with "name.jpg"
    pub stack_sequences: bool,
}

impl IndexOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            path: String::new(),
            rescan: config.rescan,
            stack_sequences: config.stack_sequences,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexStatus {
    Completed,
    Canceled,
    Failed,
}

impl IndexStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            IndexStatus::Completed => "completed",
            IndexStatus::Canceled => "canceled",
            IndexStatus::Failed => "failed",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct IndexSummary {
    pub status: IndexStatus,
    /// Jobs handed to workers
    pub dispatched: usize,
    /// Groups written to the catalog
    pub indexed: usize,
    /// Files in those groups
    pub files_indexed: usize,
    pub failed: usize,
}

#[derive(Debug, Default)]
struct WalkState {
    dispatched: usize,
    folders: usize,
}

pub struct Indexer {
    config: Config,
    roots: Arc<Roots>,
    catalog: Arc<dyn Catalog>,
    events: Arc<dyn EventSink>,
    controller: Arc<RunController>,
}

impl Indexer {
    pub fn new(config: Config, catalog: Arc<dyn Catalog>, events: Arc<dyn EventSink>) -> Self {
        let roots = config.roots();
        Self {
            config,
            roots,
            catalog,
            events,
            controller: RunController::new(),
        }
    }

    /// Share a run-lock with other holders, e.g. a signal handler
    pub fn with_controller(mut self, controller: Arc<RunController>) -> Self {
        self.controller = controller;
        self
    }

    pub fn controller(&self) -> &Arc<RunController> {
        &self.controller
    }

    pub fn cancel(&self) {
        self.controller.cancel();
    }

    /// Index the originals tree, or the subfolder in `opts.path`
    pub fn start(&self, opts: IndexOptions) -> Result<IndexSummary> {
        let originals = self.config.originals_path.clone();
        let target = if opts.path.trim_matches('/').is_empty() {
            originals.clone()
        } else {
            originals.join(opts.path.trim_matches('/'))
        };

        if !target.is_dir() {
            return Err(CatalogError::PathNotFound(target.display().to_string()));
        }

        let _guard = self.controller.start()?;

        let ignore = match IgnoreList::load(&originals) {
            Ok(list) => list,
            Err(e) => {
                self.events
                    .publish(events::INDEX_FAILED, events::data([("error", e.to_string())]));
                return Err(e);
            }
        };

        let pool = WorkerPool::spawn(self.config.workers, Arc::clone(&self.catalog))?;
        log::info!("Indexer: indexing {}", target.display());

        let mut done = DoneSet::new();
        let mut state = WalkState::default();
        let walked = self.walk(&target, &opts, &ignore, &mut done, &mut state, &pool);

        // Queued jobs always run to completion, canceled or not
        let stats = pool.finish();

        let status = match &walked {
            Ok(()) => IndexStatus::Completed,
            Err(CatalogError::Canceled) => IndexStatus::Canceled,
            Err(_) => IndexStatus::Failed,
        };

        if stats.indexed > 0 {
            self.events
                .publish(events::INDEX_UPDATING, events::data([("step", "counts")]));
            if let Err(e) = self.catalog.update_counts() {
                log::error!("Indexer: {} (update counts)", e);
            }
        } else {
            log::info!("Indexer: no new or modified files");
        }

        log::debug!(
            "Indexer: {} folders visited, {} paths in done set",
            state.folders,
            done.len()
        );
        drop(done);
        if let Err(e) = self.catalog.release_memory() {
            log::warn!("Indexer: {} (release memory)", e);
        }

        let summary = IndexSummary {
            status,
            dispatched: state.dispatched,
            indexed: stats.indexed,
            files_indexed: stats.files,
            failed: stats.failed,
        };

        match walked {
            Ok(()) => {
                log::info!(
                    "Indexer: indexed {} files in {} groups, {} failed",
                    summary.files_indexed,
                    summary.indexed,
                    summary.failed
                );
                self.events.publish(
                    events::INDEX_COMPLETED,
                    events::data([
                        ("status", serde_json::Value::from(status.as_str())),
                        ("indexed", summary.indexed.into()),
                        ("failed", summary.failed.into()),
                        ("dispatched", summary.dispatched.into()),
                    ]),
                );
                Ok(summary)
            }
            Err(CatalogError::Canceled) => {
                log::info!("Indexer: canceled after {} jobs", summary.dispatched);
                self.events.publish(
                    events::INDEX_CANCELED,
                    events::data([("dispatched", summary.dispatched)]),
                );
                Ok(summary)
            }
            Err(e) => {
                log::error!("Indexer: {}", e);
                self.events
                    .publish(events::INDEX_FAILED, events::data([("error", e.to_string())]));
                Err(e)
            }
        }
    }

    fn walk(
        &self,
        target: &Path,
        opts: &IndexOptions,
        ignore: &IgnoreList,
        done: &mut DoneSet,
        state: &mut WalkState,
        pool: &WorkerPool,
    ) -> Result<()> {
        let mut entries = WalkDir::new(target)
            .follow_links(self.config.follow_symlinks)
            .sort_by_file_name()
            .into_iter();

        while let Some(entry) = entries.next() {
            if self.controller.is_canceled() {
                return Err(CatalogError::Canceled);
            }

            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    log::warn!("Indexer: {}", e);
                    continue;
                }
            };

            let path = entry.path();
            let name = entry.file_name().to_string_lossy();
            let rel = self.roots.rel_name(path, Root::Originals);

            if entry.file_type().is_dir() {
                if entry.depth() > 0 && (ignore::is_hidden(&name) || ignore.ignored(&rel)) {
                    log::debug!("Indexer: skipping folder {}", rel);
                    entries.skip_current_dir();
                    continue;
                }

                let canonical = fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
                let seen = done.contains(&canonical);
                done.mark_processed(&canonical);

                self.folder_found(path, &rel);
                state.folders += 1;

                if seen {
                    log::debug!("Indexer: {} visited before", rel);
                    entries.skip_current_dir();
                }
                continue;
            }

            if !entry.file_type().is_file() {
                continue;
            }

            if ignore::is_hidden(&name) || ignore.ignored(&rel) {
                done.mark_found(path);
                continue;
            }

            if done.processed(path) {
                continue;
            }

            let Some(group) = self.group_for(path, &rel, opts, done) else {
                continue;
            };

            if self.controller.is_canceled() {
                return Err(CatalogError::Canceled);
            }

            state.dispatched += 1;
            pool.dispatch(IndexJob {
                file_name: rel,
                related: group,
                opts: opts.clone(),
            })?;
        }

        Ok(())
    }

    fn folder_found(&self, path: &Path, rel: &str) {
        let mod_time = fs::metadata(path)
            .and_then(|m| m.modified())
            .ok()
            .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
            .map(|d| d.as_secs() as i64)
            .unwrap_or(0);

        match self.catalog.create_folder(Root::Originals, rel, mod_time) {
            Ok(true) => log::debug!("Indexer: new folder {}", rel),
            Ok(false) => {}
            Err(e) => log::warn!("Indexer: {} (folder {})", e, rel),
        }

        self.events.publish(
            events::INDEX_FOLDER,
            events::data([("root", Root::Originals.as_str()), ("path", rel)]),
        );
    }

    /// Asset group for a file, minus members already seen this run or
    /// already stored at the same modification time
    fn group_for(
        &self,
        path: &Path,
        rel: &str,
        opts: &IndexOptions,
        done: &mut DoneSet,
    ) -> Option<RelatedFiles> {
        let file = match MediaFile::new(path, Arc::clone(&self.roots)) {
            Ok(file) => file,
            Err(e) => {
                log::warn!("Indexer: {}", e);
                done.mark_found(path);
                return None;
            }
        };

        if !file.is_media() {
            log::debug!("Indexer: skipping {} ({})", rel, file.mime());
            done.mark_found(path);
            return None;
        }

        if file.is_empty() {
            log::info!("Indexer: skipped empty file {}", rel);
            done.mark_found(path);
            return None;
        }

        if self.already_indexed(&file, opts) {
            done.mark_found(path);
            return None;
        }

        let related = match related_files(&Arc::new(file), opts.stack_sequences) {
            Ok(related) => related,
            Err(e) => {
                log::info!("Indexer: {}", e);
                done.mark_found(path);
                return None;
            }
        };

        let mut group = RelatedFiles {
            files: Vec::with_capacity(related.len()),
            main: related.main.clone(),
        };

        for member in related.files {
            let member_path: PathBuf = member.path().to_path_buf();
            if done.processed(&member_path) {
                continue;
            }
            if member.is_empty() || self.already_indexed(&member, opts) {
                done.mark_found(&member_path);
                continue;
            }
            done.mark_processed(&member_path);
            group.files.push(member);
        }
        done.mark_processed(path);

        if group.files.is_empty() || group.main.is_none() {
            return None;
        }
        Some(group)
    }

    fn already_indexed(&self, file: &MediaFile, opts: &IndexOptions) -> bool {
        match self
            .catalog
            .indexed(file.root(), &file.rel_name(), file.mod_time(), opts.rescan)
        {
            Ok(indexed) => indexed,
            Err(e) => {
                log::warn!("Indexer: {} ({})", e, file.rel_name());
                false
            }
        }
    }
}
