//! Application state: editor session registry, course API client, configuration.
//!
//! A session owns one `CourseDraftEditor` plus the abort handles of its background work (preview
//! rendering, submission). Closing or dropping a session aborts that work, and a closed session
//! refuses late results. Sessions left idle longer than the configured TTL are closed by a sweep.

use std::{collections::HashMap, sync::Arc, time::Duration};

use tokio::sync::{Mutex, RwLock};
use tokio::task::{AbortHandle, JoinHandle};
use tokio::time::Instant;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::client::CourseApi;
use crate::config::{load_editor_config_from_env, EditorConfig};
use crate::editor::CourseDraftEditor;
use crate::error::SubmitError;

pub struct Session {
    pub id: Uuid,
    pub editor: CourseDraftEditor,
    closed: bool,
    tasks: Vec<AbortHandle>,
    last_touched: Instant,
}

pub type SessionHandle = Arc<Mutex<Session>>;

impl Session {
    fn new(id: Uuid, editor: CourseDraftEditor) -> Self {
        Self { id, editor, closed: false, tasks: Vec::new(), last_touched: Instant::now() }
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Mark the session as used now; resets its idle clock.
    pub fn touch(&mut self) {
        self.last_touched = Instant::now();
    }

    pub fn idle_for(&self) -> Duration {
        self.last_touched.elapsed()
    }

    /// Register background work so it dies with the session.
    pub fn track(&mut self, task: AbortHandle) {
        self.tasks.retain(|t| !t.is_finished());
        self.tasks.push(task);
    }

    fn close(&mut self) {
        self.closed = true;
        for t in self.tasks.drain(..) {
            t.abort();
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.close();
    }
}

#[derive(Clone)]
pub struct AppState {
    pub sessions: Arc<RwLock<HashMap<Uuid, SessionHandle>>>,
    pub api: CourseApi,
    pub config: EditorConfig,
}

impl AppState {
    /// Build state from env: load config, init the course API client.
    #[instrument(level = "info", skip_all)]
    pub fn new() -> Result<Self, SubmitError> {
        Self::with_config(load_editor_config_from_env())
    }

    pub fn with_config(config: EditorConfig) -> Result<Self, SubmitError> {
        let api = CourseApi::new(&config.api.base_url, config.timeout())?;
        info!(
            target: "course_editor",
            base_url = %api.base_url,
            max_image_bytes = config.image.max_bytes,
            "Course API client ready"
        );
        Ok(Self { sessions: Arc::new(RwLock::new(HashMap::new())), api, config })
    }

    #[instrument(level = "debug", skip(self))]
    pub async fn open_session(&self) -> (Uuid, SessionHandle) {
        let id = Uuid::new_v4();
        let editor = CourseDraftEditor::new(self.config.editor_settings());
        let handle = Arc::new(Mutex::new(Session::new(id, editor)));
        self.sessions.write().await.insert(id, handle.clone());
        info!(target: "draft", session = %id, "Editor session opened");
        (id, handle)
    }

    pub async fn session(&self, id: Uuid) -> Option<SessionHandle> {
        self.sessions.read().await.get(&id).cloned()
    }

    /// Remove the session and abort its in-flight work. Returns false for unknown ids.
    #[instrument(level = "debug", skip(self))]
    pub async fn close_session(&self, id: Uuid) -> bool {
        let removed = { self.sessions.write().await.remove(&id) };
        match removed {
            Some(handle) => {
                handle.lock().await.close();
                let open = self.session_count().await;
                info!(target: "draft", session = %id, open, "Editor session closed");
                true
            }
            None => false,
        }
    }

    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Close every session idle for at least `ttl`. Sessions that are locked or submitting are
    /// in use and left alone. Returns how many were closed.
    pub async fn sweep_idle(&self, ttl: Duration) -> usize {
        let handles: Vec<(Uuid, SessionHandle)> =
            self.sessions.read().await.iter().map(|(id, h)| (*id, h.clone())).collect();

        let mut expired = Vec::new();
        for (id, handle) in handles {
            let Ok(session) = handle.try_lock() else { continue };
            if !session.editor.is_submitting() && session.idle_for() >= ttl {
                expired.push(id);
            }
        }

        let mut closed = 0;
        for id in expired {
            if self.close_session(id).await {
                closed += 1;
            }
        }
        if closed > 0 {
            info!(target: "draft", closed, ttl_secs = ttl.as_secs(), "Idle editor sessions expired");
        }
        closed
    }
}

/// Periodically expire idle sessions for the lifetime of the server.
pub fn spawn_session_sweeper(state: Arc<AppState>) -> JoinHandle<()> {
    let ttl = state.config.sessions.idle_ttl();
    let every = state.config.sessions.sweep_interval();
    debug!(target: "draft", ttl_secs = ttl.as_secs(), every_secs = every.as_secs(), "Session sweeper started");
    tokio::spawn(async move {
        let mut tick = tokio::time::interval(every);
        // The first tick completes immediately.
        tick.tick().await;
        loop {
            tick.tick().await;
            state.sweep_idle(ttl).await;
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state() -> AppState {
        AppState::with_config(EditorConfig::default()).unwrap()
    }

    #[tokio::test]
    async fn sessions_open_and_close() {
        let st = state();
        let (id, _handle) = st.open_session().await;
        assert!(st.session(id).await.is_some());
        assert!(st.close_session(id).await);
        assert!(st.session(id).await.is_none());
        assert!(!st.close_session(id).await);
    }

    #[tokio::test]
    async fn closing_aborts_tracked_work() {
        let st = state();
        let (id, handle) = st.open_session().await;
        let task = tokio::spawn(async { tokio::time::sleep(Duration::from_secs(60)).await });
        handle.lock().await.track(task.abort_handle());

        st.close_session(id).await;
        let joined = task.await;
        assert!(joined.unwrap_err().is_cancelled());
        assert!(handle.lock().await.is_closed());
    }

    #[tokio::test]
    async fn idle_sessions_expire_and_abort_their_work() {
        let st = state();
        let (id, handle) = st.open_session().await;
        let task = tokio::spawn(async { tokio::time::sleep(Duration::from_secs(60)).await });
        handle.lock().await.track(task.abort_handle());

        assert_eq!(st.sweep_idle(Duration::from_secs(3600)).await, 0);
        assert!(st.session(id).await.is_some());

        assert_eq!(st.sweep_idle(Duration::ZERO).await, 1);
        assert!(st.session(id).await.is_none());
        assert!(handle.lock().await.is_closed());
        assert!(task.await.unwrap_err().is_cancelled());
    }

    #[tokio::test]
    async fn sweep_skips_sessions_in_use() {
        let st = state();
        let (busy, busy_handle) = st.open_session().await;
        let (submitting, submitting_handle) = st.open_session().await;
        {
            let mut s = submitting_handle.lock().await;
            s.editor.set_field_at("title", "T".into()).unwrap();
            s.editor.set_field_at("description", "D".into()).unwrap();
            s.editor.set_field_at("language", "L".into()).unwrap();
            s.editor.set_field_at("duration", "1h".into()).unwrap();
            s.editor.select_image(crate::image::ImageFile::new("c.png", "image/png", vec![1u8])).unwrap();
            s.editor.begin_submit().unwrap();
        }

        let guard = busy_handle.lock().await;
        assert_eq!(st.sweep_idle(Duration::ZERO).await, 0);
        drop(guard);
        assert!(st.session(busy).await.is_some());
        assert!(st.session(submitting).await.is_some());
    }
}
