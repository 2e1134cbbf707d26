//! Watch sessions
//!
//! A [`WatchSession`] keeps re-running a detector whenever its search roots
//! change on disk. Filesystem notifications come from a debounced `notify`
//! watcher; a tokio task turns each debounced batch into a forced detection
//! and emits the outcome when it differs from the last one emitted.
//!
//! Roots that do not exist yet are watched through their nearest existing
//! ancestor and re-armed once they appear (or vanish again).

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use notify::event::ModifyKind;
use notify::{EventKind, RecommendedWatcher, RecursiveMode};
use notify_debouncer_full::{new_debouncer, DebounceEventResult, Debouncer, RecommendedCache};
use tokio::sync::{mpsc, oneshot};

use toolprobe_core::paths::{self, is_dir};
use toolprobe_core::prelude::*;
use toolprobe_core::Detection;

use crate::engine::{DetectionRequest, Detector};
use crate::validator::Validator;

/// Events emitted by a watch session, in order
#[derive(Debug, Clone, PartialEq)]
pub enum WatchEvent {
    /// Initial detection finished and subscriptions are armed. Sent once.
    Ready(Detection),
    /// Detection changed after a filesystem change
    Results(Detection),
    /// The watcher failed; the session is over
    Error(String),
}

/// Lifecycle of a watch session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchState {
    /// Arming subscriptions and running the initial detection
    Created,
    Watching,
    /// Stopped by the caller
    Stopped,
    /// Ended by a watcher failure
    Errored,
}

/// Internal signal from the debouncer thread
#[derive(Debug)]
enum FsSignal {
    /// Something relevant changed; `removed` lists paths that went away
    Changed { removed: Vec<PathBuf> },
    Failed(String),
}

type WatchTarget = (PathBuf, RecursiveMode);

/// The debouncer plus the targets it currently watches
struct Subscriptions {
    debouncer: Debouncer<RecommendedWatcher, RecommendedCache>,
    active: Vec<WatchTarget>,
}

impl Subscriptions {
    /// Move the subscription set to `desired`
    ///
    /// Targets in `removed` are re-armed even when unchanged, since the OS
    /// drops a watch whose directory was deleted.
    fn apply(&mut self, desired: Vec<WatchTarget>, removed: &[PathBuf]) -> Result<()> {
        let (keep, stale): (Vec<_>, Vec<_>) = std::mem::take(&mut self.active)
            .into_iter()
            .partition(|target| desired.contains(target) && !removed.contains(&target.0));

        for (path, _) in &stale {
            if let Err(e) = self.debouncer.unwatch(path) {
                debug!("unwatch {}: {}", path.display(), e);
            }
        }
        self.active = keep;

        for (path, mode) in desired {
            if self.active.iter().any(|(p, m)| *p == path && *m == mode) {
                continue;
            }
            match self.debouncer.watch(&path, mode) {
                Ok(()) => {
                    debug!("Watching {} ({:?})", path.display(), mode);
                    self.active.push((path, mode));
                }
                Err(e) if is_not_found(&e) => {
                    debug!("{} vanished before it could be watched", path.display());
                }
                Err(e) => {
                    return Err(Error::watch(format!(
                        "cannot watch {}: {}",
                        path.display(),
                        e
                    )));
                }
            }
        }

        Ok(())
    }
}

#[derive(Default)]
struct Shared {
    stopped: AtomicBool,
    errored: AtomicBool,
    ready: AtomicBool,
    subscriptions: Mutex<Option<Subscriptions>>,
}

impl Shared {
    fn subscriptions(&self) -> MutexGuard<'_, Option<Subscriptions>> {
        self.subscriptions.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn release(&self) {
        self.subscriptions().take();
    }
}

/// Sends events unless the session has been stopped
struct Emitter {
    detector: &'static str,
    tx: mpsc::UnboundedSender<WatchEvent>,
    shared: Arc<Shared>,
}

impl Emitter {
    fn emit(&self, event: WatchEvent) -> bool {
        if self.shared.stopped.load(Ordering::SeqCst) {
            return false;
        }
        self.tx.send(event).is_ok()
    }

    fn fail(&self, message: String) {
        error!("{} watch failed: {}", self.detector, message);
        self.emit(WatchEvent::Error(message));
        self.shared.errored.store(true, Ordering::SeqCst);
        self.shared.stopped.store(true, Ordering::SeqCst);
        self.shared.release();
    }
}

/// A running watch on one detector
///
/// Must be stopped explicitly (or dropped) to release the OS watch handles.
pub struct WatchSession {
    detector: &'static str,
    roots: Vec<PathBuf>,
    events: mpsc::UnboundedReceiver<WatchEvent>,
    shared: Arc<Shared>,
    stop_tx: Option<oneshot::Sender<()>>,
}

impl std::fmt::Debug for WatchSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatchSession")
            .field("detector", &self.detector)
            .field("roots", &self.roots)
            .field("state", &self.state())
            .finish()
    }
}

impl WatchSession {
    /// Next event, or `None` once the session has ended
    pub async fn recv(&mut self) -> Option<WatchEvent> {
        self.events.recv().await
    }

    /// Next already-queued event, if any
    pub fn try_recv(&mut self) -> Option<WatchEvent> {
        self.events.try_recv().ok()
    }

    /// Stop watching. Safe to call more than once.
    ///
    /// Releases every subscription and drops events that are still queued.
    pub fn stop(&mut self) {
        self.shared.stopped.store(true, Ordering::SeqCst);

        if let Some(tx) = self.stop_tx.take() {
            info!("{} watch stopping", self.detector);
            let _ = tx.send(());
        }

        self.shared.release();
        self.events.close();
        while self.events.try_recv().is_ok() {}
    }

    pub fn state(&self) -> WatchState {
        if self.shared.errored.load(Ordering::SeqCst) {
            WatchState::Errored
        } else if self.shared.stopped.load(Ordering::SeqCst) {
            WatchState::Stopped
        } else if self.shared.ready.load(Ordering::SeqCst) {
            WatchState::Watching
        } else {
            WatchState::Created
        }
    }

    pub fn is_running(&self) -> bool {
        matches!(self.state(), WatchState::Created | WatchState::Watching)
    }

    /// Expanded search roots this session re-detects against
    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    /// Directories currently subscribed to
    pub fn watched_paths(&self) -> Vec<PathBuf> {
        self.shared
            .subscriptions()
            .as_ref()
            .map(|subs| subs.active.iter().map(|(path, _)| path.clone()).collect())
            .unwrap_or_default()
    }
}

impl Drop for WatchSession {
    fn drop(&mut self) {
        self.stop();
    }
}

impl<V: Validator + Send + Sync + 'static> Detector<V> {
    /// Start watching the roots `request` resolves to
    ///
    /// Must be called within a tokio runtime. Fails only if the OS watcher
    /// cannot be created; everything after that is reported as events.
    pub fn watch(self: &Arc<Self>, request: DetectionRequest) -> Result<WatchSession> {
        let roots: Vec<PathBuf> = self
            .search_roots(&request)
            .iter()
            .filter_map(|raw| paths::expand(raw))
            .collect();

        let (fs_tx, fs_rx) = mpsc::unbounded_channel();
        let debouncer = new_debouncer(self.debounce(), None, move |result: DebounceEventResult| {
            forward(result, &fs_tx)
        })
        .map_err(|e| Error::watch(format!("failed to create watcher: {}", e)))?;

        let shared = Arc::new(Shared::default());
        *shared.subscriptions() = Some(Subscriptions {
            debouncer,
            active: Vec::new(),
        });

        let (event_tx, events) = mpsc::unbounded_channel();
        let (stop_tx, stop_rx) = oneshot::channel();

        info!(
            "{} watch starting on {} root(s), debounce {:?}",
            self.id(),
            roots.len(),
            self.debounce()
        );

        let emitter = Emitter {
            detector: self.id(),
            tx: event_tx,
            shared: Arc::clone(&shared),
        };
        tokio::spawn(run_session(
            Arc::clone(self),
            request,
            roots.clone(),
            emitter,
            fs_rx,
            stop_rx,
        ));

        Ok(WatchSession {
            detector: self.id(),
            roots,
            events,
            shared,
            stop_tx: Some(stop_tx),
        })
    }
}

async fn run_session<V: Validator + Send + Sync + 'static>(
    detector: Arc<Detector<V>>,
    request: DetectionRequest,
    roots: Vec<PathBuf>,
    emitter: Emitter,
    mut fs_rx: mpsc::UnboundedReceiver<FsSignal>,
    mut stop_rx: oneshot::Receiver<()>,
) {
    let shared = Arc::clone(&emitter.shared);

    if let Err(e) = rearm(&shared, &roots, &[]).await {
        emitter.fail(e.to_string());
        return;
    }

    // The cache may predate the session; the first answer is always fresh.
    let forced = request.forced();
    let mut last = match detector.detect(&forced).await {
        Ok(detection) => detection,
        Err(e) => {
            emitter.fail(format!("initial detection failed: {}", e));
            return;
        }
    };

    shared.ready.store(true, Ordering::SeqCst);
    if !emitter.emit(WatchEvent::Ready(last.clone())) {
        return;
    }

    loop {
        let signal = tokio::select! {
            _ = &mut stop_rx => break,
            signal = fs_rx.recv() => match signal {
                Some(signal) => signal,
                None => break,
            },
        };

        let mut removed = Vec::new();
        let mut failure = None;
        absorb(signal, &mut removed, &mut failure);
        while let Ok(signal) = fs_rx.try_recv() {
            absorb(signal, &mut removed, &mut failure);
        }

        if let Some(message) = failure {
            emitter.fail(message);
            break;
        }
        if shared.stopped.load(Ordering::SeqCst) {
            break;
        }

        match rearm(&shared, &roots, &removed).await {
            Ok(()) => {}
            Err(e) if e.is_fatal() => {
                emitter.fail(e.to_string());
                break;
            }
            Err(e) => warn!("{} re-arming failed: {}", detector.id(), e),
        }

        match detector.detect(&forced).await {
            Ok(detection) if detection == last => {
                trace!("{} detection unchanged", detector.id());
            }
            Ok(detection) => {
                debug!(
                    "{} detection changed: {} installation(s)",
                    detector.id(),
                    detection.len()
                );
                if !emitter.emit(WatchEvent::Results(detection.clone())) {
                    break;
                }
                last = detection;
            }
            Err(e) => warn!("{} re-detection failed: {}", detector.id(), e),
        }
    }

    debug!("{} watch task finished", detector.id());
}

fn absorb(signal: FsSignal, removed: &mut Vec<PathBuf>, failure: &mut Option<String>) {
    match signal {
        FsSignal::Changed { removed: paths } => removed.extend(paths),
        FsSignal::Failed(message) => {
            failure.get_or_insert(message);
        }
    }
}

async fn rearm(shared: &Shared, roots: &[PathBuf], removed: &[PathBuf]) -> Result<()> {
    let desired = watch_targets(roots).await;
    match shared.subscriptions().as_mut() {
        Some(subs) => subs.apply(desired, removed),
        None => Ok(()),
    }
}

/// Existing roots recursively, missing ones through their nearest existing
/// ancestor. One entry per directory; recursive wins over non-recursive.
async fn watch_targets(roots: &[PathBuf]) -> Vec<WatchTarget> {
    let mut targets: Vec<WatchTarget> = Vec::new();

    for root in roots {
        let target = if is_dir(root).await {
            Some((root.clone(), RecursiveMode::Recursive))
        } else {
            nearest_existing_ancestor(root)
                .await
                .map(|dir| (dir, RecursiveMode::NonRecursive))
        };

        let Some((path, mode)) = target else {
            continue;
        };
        match targets.iter_mut().find(|(p, _)| *p == path) {
            Some(existing) => {
                if mode == RecursiveMode::Recursive {
                    existing.1 = mode;
                }
            }
            None => targets.push((path, mode)),
        }
    }

    targets
}

async fn nearest_existing_ancestor(path: &Path) -> Option<PathBuf> {
    let mut current = path.parent();
    while let Some(dir) = current {
        if is_dir(dir).await {
            return Some(dir.to_path_buf());
        }
        current = dir.parent();
    }
    None
}

/// Runs on the debouncer thread
fn forward(result: DebounceEventResult, tx: &mpsc::UnboundedSender<FsSignal>) {
    match result {
        Ok(events) => {
            let mut relevant = false;
            let mut removed = Vec::new();

            for event in &events {
                if event.need_rescan() {
                    relevant = true;
                    continue;
                }
                match event.kind {
                    EventKind::Access(_) | EventKind::Other => continue,
                    EventKind::Remove(_) | EventKind::Modify(ModifyKind::Name(_)) => {
                        removed.extend(event.paths.iter().cloned());
                    }
                    _ => {}
                }
                relevant = true;
            }

            if relevant {
                trace!("{} relevant event(s) in batch", events.len());
                let _ = tx.send(FsSignal::Changed { removed });
            }
        }
        Err(errors) => {
            for error in errors {
                if is_not_found(&error) {
                    debug!("Watched path disappeared: {:?}", error.paths);
                    let _ = tx.send(FsSignal::Changed {
                        removed: error.paths.clone(),
                    });
                } else if matches!(error.kind, notify::ErrorKind::WatchNotFound) {
                    debug!("Stale watch: {:?}", error.paths);
                } else {
                    warn!("File watcher error: {}", error);
                    let _ = tx.send(FsSignal::Failed(error.to_string()));
                }
            }
        }
    }
}

fn is_not_found(error: &notify::Error) -> bool {
    match &error.kind {
        notify::ErrorKind::PathNotFound => true,
        notify::ErrorKind::Io(io) => io.kind() == std::io::ErrorKind::NotFound,
        _ => false,
    }
}
