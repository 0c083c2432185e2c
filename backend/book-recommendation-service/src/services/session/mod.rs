// ============================================
// Session State Machine
// ============================================
//
// Per-visitor UI state, passed explicitly through every handler:
//
//   Idle ──generate──▶ Recommending ──open_detail──▶ DetailOpen
//                        ▲    │ ▲                        │
//                        │    └─┘ generate               │
//                        └───────── close_detail ────────┤
//                        └───────── generate ────────────┘
//
// Transitions are pure: they take `&self` and return a new state, so a
// failed action leaves the stored state untouched.
//
// The store keeps states in memory only, keyed by session id, and forgets
// sessions idle longer than the TTL.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

#[derive(Debug, Error, PartialEq)]
pub enum SessionError {
    #[error("Session not found: {0}")]
    SessionNotFound(Uuid),

    #[error("{0}")]
    InvalidTransition(String),

    #[error("Book {0} is not among the current recommendations")]
    NotRecommended(String),
}

pub type Result<T> = std::result::Result<T, SessionError>;

/// What the page is currently showing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SessionView {
    Idle,
    Recommending {
        recommendations: Vec<String>,
    },
    DetailOpen {
        recommendations: Vec<String>,
        item: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionState {
    selection: BTreeSet<String>,
    view: SessionView,
    feedback_submitted: bool,
    updated_at: DateTime<Utc>,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            selection: BTreeSet::new(),
            view: SessionView::Idle,
            feedback_submitted: false,
            updated_at: Utc::now(),
        }
    }
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn selection(&self) -> &BTreeSet<String> {
        &self.selection
    }

    pub fn view(&self) -> &SessionView {
        &self.view
    }

    pub fn feedback_submitted(&self) -> bool {
        self.feedback_submitted
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn recommendations(&self) -> &[String] {
        match &self.view {
            SessionView::Idle => &[],
            SessionView::Recommending { recommendations }
            | SessionView::DetailOpen {
                recommendations, ..
            } => recommendations,
        }
    }

    pub fn open_item(&self) -> Option<&str> {
        match &self.view {
            SessionView::DetailOpen { item, .. } => Some(item),
            _ => None,
        }
    }

    /// Replace the saved author selection. Names are trimmed; blanks and
    /// duplicates collapse. The view is left as is.
    pub fn with_selection<I, S>(&self, authors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let selection = authors
            .into_iter()
            .map(|a| a.as_ref().trim().to_string())
            .filter(|a| !a.is_empty())
            .collect();

        Self {
            selection,
            updated_at: Utc::now(),
            ..self.clone()
        }
    }

    /// Result of a successful `generate`: any state becomes Recommending,
    /// closing an open detail.
    pub fn with_recommendations(&self, recommendations: Vec<String>) -> Self {
        Self {
            view: SessionView::Recommending { recommendations },
            updated_at: Utc::now(),
            ..self.clone()
        }
    }

    /// Recommending → DetailOpen. The item must be one of the current
    /// recommendations; switching from one open item to another is allowed.
    pub fn open_detail(&self, isbn: &str) -> Result<Self> {
        let recommendations = match &self.view {
            SessionView::Idle => {
                return Err(SessionError::InvalidTransition(
                    "no recommendations to inspect yet".to_string(),
                ))
            }
            SessionView::Recommending { recommendations }
            | SessionView::DetailOpen {
                recommendations, ..
            } => recommendations,
        };

        if !recommendations.iter().any(|r| r == isbn) {
            return Err(SessionError::NotRecommended(isbn.to_string()));
        }

        Ok(Self {
            view: SessionView::DetailOpen {
                recommendations: recommendations.clone(),
                item: isbn.to_string(),
            },
            updated_at: Utc::now(),
            ..self.clone()
        })
    }

    /// DetailOpen → Recommending
    pub fn close_detail(&self) -> Result<Self> {
        match &self.view {
            SessionView::DetailOpen {
                recommendations, ..
            } => Ok(Self {
                view: SessionView::Recommending {
                    recommendations: recommendations.clone(),
                },
                updated_at: Utc::now(),
                ..self.clone()
            }),
            _ => Err(SessionError::InvalidTransition(
                "no book detail is open".to_string(),
            )),
        }
    }

    pub fn with_feedback_submitted(&self) -> Self {
        Self {
            feedback_submitted: true,
            updated_at: Utc::now(),
            ..self.clone()
        }
    }
}

struct SessionEntry {
    state: SessionState,
    last_activity: Instant,
}

/// In-memory session states keyed by session id
pub struct SessionStore {
    sessions: DashMap<Uuid, SessionEntry>,
    ttl: Duration,
}

impl SessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            sessions: DashMap::new(),
            ttl,
        }
    }

    pub fn create(&self) -> (Uuid, SessionState) {
        let id = Uuid::new_v4();
        let state = SessionState::new();
        self.sessions.insert(
            id,
            SessionEntry {
                state: state.clone(),
                last_activity: Instant::now(),
            },
        );
        debug!(session_id = %id, "Session created");
        (id, state)
    }

    /// Snapshot of a live session; refreshes its activity time.
    pub fn get(&self, id: Uuid) -> Result<SessionState> {
        if let Some(mut entry) = self.sessions.get_mut(&id) {
            if entry.last_activity.elapsed() < self.ttl {
                entry.last_activity = Instant::now();
                return Ok(entry.state.clone());
            }
        } else {
            return Err(SessionError::SessionNotFound(id));
        }

        self.sessions.remove(&id);
        debug!(session_id = %id, "Session expired");
        Err(SessionError::SessionNotFound(id))
    }

    /// Run a transition against a snapshot and store the new state only if
    /// it succeeds.
    pub fn apply<T, E, F>(&self, id: Uuid, transition: F) -> std::result::Result<T, E>
    where
        F: FnOnce(&SessionState) -> std::result::Result<(SessionState, T), E>,
        E: From<SessionError>,
    {
        let snapshot = self.get(id)?;
        let (next, output) = transition(&snapshot)?;

        match self.sessions.get_mut(&id) {
            Some(mut entry) => {
                entry.state = next;
                entry.last_activity = Instant::now();
                Ok(output)
            }
            // purged while the transition ran
            None => Err(SessionError::SessionNotFound(id).into()),
        }
    }

    /// Drop sessions idle longer than the TTL; returns how many went.
    pub fn purge_expired(&self) -> usize {
        let before = self.sessions.len();
        let ttl = self.ttl;
        self.sessions
            .retain(|_, entry| entry.last_activity.elapsed() < ttl);
        before.saturating_sub(self.sessions.len())
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recommending(keys: &[&str]) -> SessionState {
        SessionState::new().with_recommendations(keys.iter().map(|k| k.to_string()).collect())
    }

    #[test]
    fn test_new_session_is_idle() {
        let state = SessionState::new();
        assert_eq!(state.view(), &SessionView::Idle);
        assert!(state.recommendations().is_empty());
        assert!(state.selection().is_empty());
        assert!(!state.feedback_submitted());
    }

    #[test]
    fn test_selection_is_trimmed_and_deduplicated() {
        let state = SessionState::new().with_selection([
            "Agatha Christie",
            " Agatha Christie ",
            "",
            "  ",
            "Stephen King",
        ]);
        let names: Vec<&str> = state.selection().iter().map(String::as_str).collect();
        assert_eq!(names, vec!["Agatha Christie", "Stephen King"]);
    }

    #[test]
    fn test_selection_survives_generation() {
        let state = SessionState::new()
            .with_selection(["John Grisham"])
            .with_recommendations(vec!["a".to_string()]);
        assert!(state.selection().contains("John Grisham"));
    }

    #[test]
    fn test_open_and_close_detail() {
        let state = recommending(&["a", "b"]);
        let open = state.open_detail("b").unwrap();
        assert_eq!(open.open_item(), Some("b"));
        assert_eq!(open.recommendations(), ["a", "b"]);

        let closed = open.close_detail().unwrap();
        assert_eq!(closed.view(), state.view());
    }

    #[test]
    fn test_open_detail_requires_recommendations() {
        let err = SessionState::new().open_detail("a").unwrap_err();
        assert!(matches!(err, SessionError::InvalidTransition(_)));
    }

    #[test]
    fn test_open_detail_rejects_items_outside_list() {
        let state = recommending(&["a", "b"]);
        assert_eq!(
            state.open_detail("z").unwrap_err(),
            SessionError::NotRecommended("z".to_string())
        );
    }

    #[test]
    fn test_switch_between_open_items() {
        let open = recommending(&["a", "b"]).open_detail("a").unwrap();
        assert_eq!(open.open_detail("b").unwrap().open_item(), Some("b"));
    }

    #[test]
    fn test_close_without_open_detail_fails() {
        assert!(recommending(&["a"]).close_detail().is_err());
        assert!(SessionState::new().close_detail().is_err());
    }

    #[test]
    fn test_generate_from_detail_closes_it() {
        let open = recommending(&["a", "b"]).open_detail("a").unwrap();
        let regenerated = open.with_recommendations(vec!["c".to_string()]);
        assert_eq!(
            regenerated.view(),
            &SessionView::Recommending {
                recommendations: vec!["c".to_string()]
            }
        );
    }

    #[test]
    fn test_state_serializes_with_tag() {
        let state = recommending(&["a"]).open_detail("a").unwrap();
        let json = serde_json::to_value(&state).unwrap();
        assert_eq!(json["view"]["state"], "detail_open");
        assert_eq!(json["view"]["item"], "a");
        let back: SessionState = serde_json::from_value(json).unwrap();
        assert_eq!(back, state);
    }

    #[test]
    fn test_store_apply_commits_on_success() {
        let store = SessionStore::new(Duration::from_secs(60));
        let (id, _) = store.create();

        let count: Result<usize> = store.apply(id, |s| {
            let next = s.with_recommendations(vec!["x".to_string(), "y".to_string()]);
            Ok((next, 2))
        });
        assert_eq!(count.unwrap(), 2);
        assert_eq!(store.get(id).unwrap().recommendations(), ["x", "y"]);
    }

    #[test]
    fn test_store_apply_keeps_state_on_failure() {
        let store = SessionStore::new(Duration::from_secs(60));
        let (id, _) = store.create();
        store
            .apply(id, |s| Ok::<_, SessionError>((s.with_recommendations(vec!["x".into()]), ())))
            .unwrap();

        let result: Result<()> = store.apply(id, |s| {
            let _ = s.with_recommendations(Vec::new());
            Err(SessionError::InvalidTransition("scoring failed".to_string()))
        });
        assert!(result.is_err());
        assert_eq!(store.get(id).unwrap().recommendations(), ["x"]);
    }

    #[test]
    fn test_unknown_session() {
        let store = SessionStore::new(Duration::from_secs(60));
        let id = Uuid::new_v4();
        assert_eq!(store.get(id), Err(SessionError::SessionNotFound(id)));
    }

    #[test]
    fn test_expired_sessions_are_gone() {
        let store = SessionStore::new(Duration::ZERO);
        let (id, _) = store.create();
        assert!(store.get(id).is_err());
        assert!(store.is_empty());
    }

    #[test]
    fn test_purge_expired() {
        let store = SessionStore::new(Duration::ZERO);
        store.create();
        store.create();
        assert_eq!(store.purge_expired(), 2);
        assert_eq!(store.len(), 0);

        let live = SessionStore::new(Duration::from_secs(60));
        live.create();
        assert_eq!(live.purge_expired(), 0);
        assert_eq!(live.len(), 1);
    }
}
