use std::{
    collections::HashMap,
    fmt,
    sync::{
        Arc, Mutex, MutexGuard, Weak,
        atomic::{AtomicBool, Ordering},
    },
    time::{Duration, Instant},
};

use chrono::{DateTime, Utc};
use tokio::{sync::RwLock, task::JoinHandle};
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::comments::{Comment, CommentDraft, CommentNode, ResourceKey},
    repositories::CommentStore,
    telemetry::BusinessEvent,
    usecases::comment_tree::{self, DEFAULT_DEPTH_CAP},
};

const DEFAULT_RECONCILE_DELAY_MS: u64 = 3000;
const MAX_COMPOSER_ID_LEN: usize = 64;
/// Reply targets kept per thread; the least recently chosen one is dropped
/// beyond this.
const MAX_REPLY_TARGETS: usize = 1024;

/// Identifies one open comment composer (a browser tab, usually). Reply
/// targets belong to a composer, never to the whole resource.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ComposerId(String);

impl ComposerId {
    /// Accepts 1-64 ASCII letters, digits, `-` or `_`.
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        let valid = !value.is_empty()
            && value.len() <= MAX_COMPOSER_ID_LEN
            && value
                .bytes()
                .all(|byte| byte.is_ascii_alphanumeric() || byte == b'-' || byte == b'_');
        valid.then(|| Self(value.to_string()))
    }
}

impl fmt::Display for ComposerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ThreadSettings {
    /// Wait between a submission and the re-read that follows it. Chosen to
    /// outlast the store's write propagation.
    pub reconcile_delay: Duration,
    pub depth_cap: usize,
}

impl Default for ThreadSettings {
    fn default() -> Self {
        Self {
            reconcile_delay: Duration::from_millis(DEFAULT_RECONCILE_DELAY_MS),
            depth_cap: DEFAULT_DEPTH_CAP,
        }
    }
}

#[derive(Debug, Default)]
struct ThreadView {
    comments: Vec<Comment>,
    generation: u64,
    warning: Option<String>,
    reconciled_at: Option<DateTime<Utc>>,
}

impl ThreadView {
    fn replace(&mut self, comments: Vec<Comment>) -> u64 {
        self.comments = comments;
        self.generation += 1;
        self.warning = None;
        self.reconciled_at = Some(Utc::now());
        self.generation
    }
}

/// Render-ready state of a thread.
#[derive(Debug, Clone)]
pub struct ThreadRender {
    pub forest: Vec<CommentNode>,
    pub total: usize,
    pub generation: u64,
    pub warning: Option<String>,
    pub reconciled_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy)]
struct ReplyTarget {
    comment_id: Uuid,
    chosen_at: Instant,
}

/// Owns the visible comment set of one resource. Starts from a snapshot of
/// approved comments and replaces it with a fresh read some time after each
/// submission. Only approved comments of this resource are ever kept.
pub struct ThreadController {
    resource: ResourceKey,
    store: Arc<dyn CommentStore>,
    settings: ThreadSettings,
    view: Arc<RwLock<ThreadView>>,
    reply_targets: RwLock<HashMap<ComposerId, ReplyTarget>>,
    scheduled: Mutex<Vec<JoinHandle<()>>>,
    last_active: Mutex<Instant>,
    closed: AtomicBool,
}

impl ThreadController {
    pub fn new(
        resource: ResourceKey,
        snapshot: Vec<Comment>,
        store: Arc<dyn CommentStore>,
        settings: ThreadSettings,
    ) -> Self {
        let view = ThreadView {
            comments: visible_comments(snapshot, &resource),
            ..ThreadView::default()
        };
        Self {
            resource,
            store,
            settings,
            view: Arc::new(RwLock::new(view)),
            reply_targets: RwLock::new(HashMap::new()),
            scheduled: Mutex::new(Vec::new()),
            last_active: Mutex::new(Instant::now()),
            closed: AtomicBool::new(false),
        }
    }

    pub fn resource(&self) -> &ResourceKey {
        &self.resource
    }

    pub async fn render(&self) -> ThreadRender {
        self.touch();
        let view = self.view.read().await;
        let forest = comment_tree::build_tree_with_cap(&view.comments, self.settings.depth_cap);
        ThreadRender {
            total: comment_tree::count_nodes(&forest),
            forest,
            generation: view.generation,
            warning: view.warning.clone(),
            reconciled_at: view.reconciled_at,
        }
    }

    /// Stores the draft as a pending comment, then schedules a reconcile.
    /// The returned comment is not part of the rendered thread. Only the
    /// submitting composer's reply target is cleared.
    pub async fn submit(
        &self,
        draft: CommentDraft,
        composer: Option<&ComposerId>,
    ) -> AppResult<Comment> {
        if self.is_closed() {
            return Err(AppError::ServiceUnavailable(
                "Comment thread is closed".to_string(),
            ));
        }
        self.touch();

        let comment = self.store.create_comment(&self.resource, draft).await?;
        BusinessEvent::CommentSubmitted {
            comment_id: comment.id,
            resource: self.resource.to_string(),
            parent_id: comment.parent_id,
            is_reply: comment.parent_id.is_some(),
        }
        .log();

        if let Some(composer) = composer {
            self.reply_targets.write().await.remove(composer);
        }
        self.schedule_reconcile();
        Ok(comment)
    }

    /// Re-reads the approved set after the configured delay. Each call gets
    /// its own task; whichever finishes last decides the rendered set.
    pub fn schedule_reconcile(&self) {
        if self.is_closed() {
            return;
        }
        let view = Arc::downgrade(&self.view);
        let store = self.store.clone();
        let resource = self.resource.clone();
        let delay = self.settings.reconcile_delay;
        let handle = tokio::spawn(run_scheduled_reconcile(view, store, resource, delay));

        let mut scheduled = self.lock_scheduled();
        scheduled.retain(|task| !task.is_finished());
        scheduled.push(handle);
    }

    /// Re-reads the approved set now. On failure the current set is kept and
    /// a warning is recorded for the next render.
    pub async fn reconcile(&self) -> AppResult<u64> {
        let result = fetch_visible(self.store.as_ref(), &self.resource).await;
        apply_fetch(&self.view, &self.resource, result).await
    }

    pub async fn reply_target(&self, composer: &ComposerId) -> Option<Uuid> {
        self.reply_targets
            .read()
            .await
            .get(composer)
            .map(|target| target.comment_id)
    }

    /// Sets or clears (`None`) the comment this composer is replying to.
    pub async fn select_reply_target(&self, composer: ComposerId, comment_id: Option<Uuid>) {
        self.touch();
        let mut targets = self.reply_targets.write().await;
        let Some(comment_id) = comment_id else {
            targets.remove(&composer);
            return;
        };
        if !targets.contains_key(&composer) && targets.len() >= MAX_REPLY_TARGETS {
            let oldest = targets
                .iter()
                .min_by_key(|(_, target)| target.chosen_at)
                .map(|(key, _)| key.clone());
            if let Some(oldest) = oldest {
                targets.remove(&oldest);
            }
        }
        targets.insert(
            composer,
            ReplyTarget {
                comment_id,
                chosen_at: Instant::now(),
            },
        );
    }

    /// Scheduled reconciles that have not finished yet.
    pub fn pending_reconciles(&self) -> usize {
        self.lock_scheduled()
            .iter()
            .filter(|task| !task.is_finished())
            .count()
    }

    pub fn idle_for(&self) -> Duration {
        self.last_active
            .lock()
            .map(|last| last.elapsed())
            .unwrap_or_default()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Cancels scheduled reconciles. Safe to call more than once.
    pub fn shutdown(&self) {
        self.closed.store(true, Ordering::SeqCst);
        for task in self.lock_scheduled().drain(..) {
            task.abort();
        }
    }

    fn touch(&self) {
        if let Ok(mut last) = self.last_active.lock() {
            *last = Instant::now();
        }
    }

    fn lock_scheduled(&self) -> MutexGuard<'_, Vec<JoinHandle<()>>> {
        self.scheduled
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Drop for ThreadController {
    fn drop(&mut self) {
        self.shutdown();
    }
}

async fn run_scheduled_reconcile(
    view: Weak<RwLock<ThreadView>>,
    store: Arc<dyn CommentStore>,
    resource: ResourceKey,
    delay: Duration,
) {
    tokio::time::sleep(delay).await;
    if view.strong_count() == 0 {
        return;
    }
    let result = fetch_visible(store.as_ref(), &resource).await;
    // The owner may have gone away while the read was in flight.
    let Some(view) = view.upgrade() else {
        return;
    };
    let _ = apply_fetch(&view, &resource, result).await;
}

async fn fetch_visible(store: &dyn CommentStore, resource: &ResourceKey) -> AppResult<Vec<Comment>> {
    let rows = store.list_comments(resource, false).await?;
    Ok(visible_comments(rows, resource))
}

async fn apply_fetch(
    view: &RwLock<ThreadView>,
    resource: &ResourceKey,
    result: AppResult<Vec<Comment>>,
) -> AppResult<u64> {
    match result {
        Ok(comments) => {
            let approved_count = comments.len();
            let generation = view.write().await.replace(comments);
            BusinessEvent::ThreadReconciled {
                resource: resource.to_string(),
                approved_count,
                generation,
            }
            .log();
            Ok(generation)
        }
        Err(error) => {
            tracing::warn!(%resource, error = %error, "Comment reconcile failed, keeping last known set");
            view.write().await.warning =
                Some("Comments could not be refreshed; showing the last known set".to_string());
            BusinessEvent::ThreadReconcileFailed {
                resource: resource.to_string(),
                error: error.to_string(),
            }
            .log();
            Err(error)
        }
    }
}

/// Approved comments of the resource, oldest first.
fn visible_comments(comments: Vec<Comment>, resource: &ResourceKey) -> Vec<Comment> {
    let mut visible: Vec<Comment> = comments
        .into_iter()
        .filter(|comment| comment.status.is_public() && comment.belongs_to(resource))
        .collect();
    visible.sort_by_key(|comment| comment.created_at);
    visible
}
