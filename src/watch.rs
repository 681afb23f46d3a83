use crate::common::{ERROR, strip_prefix};
use crate::config::rt::RtcWatch;
use crate::debouncer::BusyDebouncer;
use crate::generate::{Generator, Mode};
use crate::process::{ProcessHandle, ProcessRunner};
use anyhow::{Context, Result};
use futures_util::StreamExt;
use globset::GlobSet;
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher, recommended_watcher};
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{Mutex, broadcast, mpsc};
use tokio_stream::wrappers::BroadcastStream;

/// Blacklisted path segments which are ignored by the watcher by default.
const BLACKLIST: [&str; 1] = [".git"];

/// The kind of a file system change.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChangeKind {
    Created,
    Modified,
    Removed,
    /// Access and unknown events, which never trigger a run.
    Other,
}

impl Display for ChangeKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Created => "created",
            Self::Modified => "modified",
            Self::Removed => "removed",
            Self::Other => "changed",
        })
    }
}

impl From<&EventKind> for ChangeKind {
    fn from(kind: &EventKind) -> Self {
        match kind {
            EventKind::Create(_) => Self::Created,
            EventKind::Modify(_) => Self::Modified,
            EventKind::Remove(_) => Self::Removed,
            EventKind::Access(_) | EventKind::Any | EventKind::Other => Self::Other,
        }
    }
}

/// A change of one or more paths.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChangeEvent {
    pub kind: ChangeKind,
    pub paths: Vec<PathBuf>,
}

impl From<Event> for ChangeEvent {
    fn from(event: Event) -> Self {
        Self {
            kind: ChangeKind::from(&event.kind),
            paths: event.paths,
        }
    }
}

/// What triggered a generation run.
#[derive(Clone, Debug)]
enum Trigger {
    Startup,
    Change(ChangeKind, PathBuf),
}

/// The dependent process, shared between the runs and the shutdown.
#[derive(Default)]
struct ProcessSlot {
    handle: Option<ProcessHandle>,
    stopped: bool,
}

/// Runs generations, and restarts the dependent process after successful ones.
struct Runner {
    generator: Generator,
    process: Option<ProcessRunner>,
    slot: Arc<Mutex<ProcessSlot>>,
    generation: usize,
}

impl Runner {
    async fn run(&mut self, trigger: Trigger) {
        match trigger {
            Trigger::Startup => tracing::debug!("starting initial generation"),
            Trigger::Change(kind, path) => {
                tracing::info!("{} {}, regenerating", strip_prefix(&path).display(), kind)
            }
        }

        match self.generator.run(Mode::Watch).await {
            Ok(summary) if summary.is_success() => self.restart().await,
            Ok(_) => {
                if self.process.is_some() {
                    tracing::warn!("generation failed, keeping the current process");
                }
            }
            Err(err) => tracing::error!("{}error generating: {:#}", ERROR, err),
        }
    }

    async fn restart(&mut self) {
        let Some(process) = &self.process else {
            return;
        };

        let mut slot = self.slot.lock().await;
        if slot.stopped {
            return;
        }

        if let Some(handle) = slot.handle.take()
            && let Err(err) = handle.terminate().await
        {
            tracing::error!("{}error stopping process: {:#}", ERROR, err);
        }

        self.generation += 1;
        match process.spawn(self.generation) {
            Ok(handle) => slot.handle = Some(handle),
            Err(err) => tracing::error!("{}{:#}", ERROR, err),
        }
    }
}

/// A watch system wrapping a generator and a watcher.
pub struct WatchSystem {
    /// The generate root, which the exclude patterns are relative to.
    root: PathBuf,
    /// Files the scanner skips.
    exclude: GlobSet,
    /// The current vector of paths to be ignored.
    ignored_paths: Vec<PathBuf>,
    /// A channel of FS watch events.
    watch_rx: mpsc::Receiver<Event>,
    /// A channel of new paths to ignore from the generator.
    ignore_rx: mpsc::Receiver<PathBuf>,
    /// The watch system used for watching the filesystem.
    _watcher: RecommendedWatcher,
    /// The application shutdown channel.
    shutdown: BroadcastStream<()>,
    /// Runs generations, one at a time.
    debouncer: BusyDebouncer<Trigger>,
    /// The dependent process.
    slot: Arc<Mutex<ProcessSlot>>,
}

impl WatchSystem {
    /// Create a new instance.
    pub async fn new(cfg: Arc<RtcWatch>, shutdown: broadcast::Sender<()>) -> Result<Self> {
        // Create a channel for being able to listen for new paths to ignore while running.
        let (watch_tx, watch_rx) = mpsc::channel(1);
        let (ignore_tx, ignore_rx) = mpsc::channel(16);

        // Build the watcher.
        let _watcher = build_watcher(watch_tx, &cfg.paths)?;

        let slot = Arc::new(Mutex::new(ProcessSlot::default()));
        let runner = Runner {
            generator: Generator::new(cfg.generate.clone(), Some(ignore_tx)),
            process: cfg.run.clone().map(ProcessRunner::new),
            slot: slot.clone(),
            generation: 0,
        };
        let debouncer = BusyDebouncer::new(runner, |runner, trigger| Box::pin(runner.run(trigger)));

        Ok(Self {
            root: cfg.root.clone(),
            exclude: cfg.exclude.clone(),
            ignored_paths: cfg.ignored_paths.clone(),
            watch_rx,
            ignore_rx,
            _watcher,
            shutdown: BroadcastStream::new(shutdown.subscribe()),
            debouncer,
            slot,
        })
    }

    /// Trigger the initial generation.
    pub async fn generate(&self) {
        self.debouncer.push(Trigger::Startup).await;
    }

    /// Run the watch system, responding to events and triggering generations.
    #[tracing::instrument(level = "trace", skip(self))]
    pub async fn run(mut self) {
        loop {
            tokio::select! {
                // outputs need to be ignored before their change events are handled
                biased;
                Some(ign) = self.ignore_rx.recv() => self.update_ignore_list(ign),
                Some(ev) = self.watch_rx.recv() => self.handle_watch_event(ev.into()).await,
                _ = self.shutdown.next() => break, // Any event, even a drop, will trigger shutdown.
            }
        }

        let mut slot = self.slot.lock().await;
        slot.stopped = true;
        if let Some(handle) = slot.handle.take()
            && let Err(err) = handle.terminate().await
        {
            tracing::error!("{}error stopping process: {:#}", ERROR, err);
        }

        tracing::debug!("watcher system has shut down");
    }

    #[tracing::instrument(level = "trace", skip(self, event))]
    async fn handle_watch_event(&mut self, event: ChangeEvent) {
        if event.kind == ChangeKind::Other {
            return; // Nothing to do with these.
        }

        for ev_path in event.paths {
            let Some(ev_path) = canonical(&ev_path) else {
                continue;
            };

            if !self.is_relevant(&ev_path) {
                continue;
            }

            // The generator creates the parent directories of its outputs.
            if event.kind == ChangeKind::Created
                && ev_path.is_dir()
                && self.holds_ignored(&ev_path)
            {
                tracing::trace!("skipping created output directory {:?}", ev_path);
                continue;
            }

            tracing::debug!("change detected in {:?} ({:?})", ev_path, event.kind);
            self.debouncer
                .push(Trigger::Change(event.kind, ev_path))
                .await;

            return; // If one of the paths triggers a run, then we're done.
        }
    }

    /// Check if a change of a (canonical) path should trigger a run.
    fn is_relevant(&self, path: &Path) -> bool {
        // Check ignored paths.
        if path
            .ancestors()
            .any(|path| self.ignored_paths.iter().any(|ignored_path| ignored_path == path))
        {
            return false;
        }

        // Check the exclude patterns. A trailing separator lets `dir/**` patterns match `dir`.
        if let Ok(relative) = path.strip_prefix(&self.root)
            && !relative.as_os_str().is_empty()
            && (self.exclude.is_match(relative) || self.exclude.is_match(relative.join("")))
        {
            return false;
        }

        // Check blacklisted paths.
        !path
            .components()
            .filter_map(|segment| segment.as_os_str().to_str())
            .any(|segment| BLACKLIST.contains(&segment))
    }

    /// Check if a directory contains any ignored path.
    fn holds_ignored(&self, dir: &Path) -> bool {
        self.ignored_paths
            .iter()
            .any(|ignored| ignored != dir && ignored.starts_with(dir))
    }

    fn update_ignore_list(&mut self, arg_path: PathBuf) {
        let path = canonical(&arg_path).unwrap_or(arg_path);

        if !self.ignored_paths.contains(&path) {
            self.ignored_paths.push(path);
        }
    }
}

/// Take the canonical form of a path, which might not exist (anymore).
fn canonical(path: &Path) -> Option<PathBuf> {
    if let Ok(path) = path.canonicalize() {
        return Some(path);
    }
    let parent = path.parent()?.canonicalize().ok()?;
    Some(parent.join(path.file_name()?))
}

/// Build a FS watcher, when the watcher is dropped, it will stop watching for events.
fn build_watcher(watch_tx: mpsc::Sender<Event>, paths: &[PathBuf]) -> Result<RecommendedWatcher> {
    let event_handler = move |event_res: notify::Result<Event>| match event_res {
        Ok(event) => {
            let _res = watch_tx.try_send(event);
        }
        Err(err) => {
            tracing::error!(error = ?err, "error from FS watcher");
        }
    };
    let mut watcher =
        recommended_watcher(event_handler).context("failed to build file system watcher")?;

    // All given paths are expected to be canonical, which the runtime config ensures.
    for path in paths {
        watcher
            .watch(path, RecursiveMode::Recursive)
            .with_context(|| format!("failed to watch {:?} for file system changes", path))?;
    }

    Ok(watcher)
}
