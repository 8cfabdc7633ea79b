//! Chat turn orchestration.
//!
//! A [`ChatView`] holds what the user sees and edits: the visible transcript,
//! the input buffer and the staged images. Each submission runs
//! `Idle -> Submitting -> (committed | failed) -> Idle`:
//!
//! 1. [`ChatView::begin`] checks the guard, appends the user message
//!    optimistically and clears the buffers. The returned [`PendingTurn`]
//!    carries the single request for this turn.
//! 2. [`ChatView::complete`] appends the reply and upserts the session, or
//!    appends a fixed failure message without persisting anything.
//!
//! [`ChatView::submit`] runs both phases around one client call. Failed
//! calls are never retried.

use crate::analysis::{analyze, AnalysisClient, AnalysisRequest};
use crate::error::Result;
use crate::prompt::QuickAction;
use crate::session::{default_title, SessionManager};
use crate::types::{AnalysisSession, AppSettings, Message, SessionTemplate};
use base64::{engine::general_purpose::STANDARD, Engine};
use chrono::Utc;
use std::path::Path;

/// Reply shown when the analysis call fails
pub const ANALYSIS_FAILED: &str =
    "Analysis failed. Please check your API configuration or network connection.";

/// Header title shown before a chat has been saved
pub const PLACEHOLDER_TITLE: &str = "TradeCore AI";

/// Submission state of a view
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnState {
    Idle,
    Submitting,
}

/// How a submission ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnOutcome {
    /// The reply was appended and the session saved
    Committed { session_id: String },
    /// The call failed; a failure message was appended to the transcript only
    Failed,
}

/// A submission that has been appended optimistically but not yet answered.
#[derive(Debug)]
#[must_use = "a pending turn must be completed to return the view to idle"]
pub struct PendingTurn {
    message: Message,
    request: AnalysisRequest,
}

impl PendingTurn {
    /// The user message appended by `begin`
    pub fn message(&self) -> &Message {
        &self.message
    }

    /// The one request to send for this turn
    pub fn request(&self) -> &AnalysisRequest {
        &self.request
    }
}

/// Visible chat state for the active (or pending) session.
pub struct ChatView {
    input: String,
    staged_images: Vec<String>,
    messages: Vec<Message>,
    title: String,
    state: TurnState,
    search_domains: Vec<String>,
}

impl ChatView {
    pub fn new(search_domains: Vec<String>) -> Self {
        Self {
            input: String::new(),
            staged_images: Vec::new(),
            messages: Vec::new(),
            title: PLACEHOLDER_TITLE.to_string(),
            state: TurnState::Idle,
            search_domains,
        }
    }

    /// Show the manager's active session, or an empty chat if there is none.
    pub fn sync_with(&mut self, manager: &SessionManager) {
        match manager.active_session() {
            Some(session) => {
                self.messages = session.messages.clone();
                self.title = session.title.clone();
            }
            None => {
                self.messages.clear();
                self.title = PLACEHOLDER_TITLE.to_string();
            }
        }
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn state(&self) -> TurnState {
        self.state
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn set_input(&mut self, text: impl Into<String>) {
        self.input = text.into();
    }

    pub fn staged_images(&self) -> &[String] {
        &self.staged_images
    }

    /// Stage an image given as a `data:` URL
    pub fn stage_image(&mut self, data_url: String) {
        self.staged_images.push(data_url);
    }

    /// Read an image file into a `data:` URL and stage it
    pub fn stage_image_file(&mut self, path: &Path) -> Result<()> {
        let data_url = image_data_url(path)?;
        tracing::debug!(path = %path.display(), bytes = data_url.len(), "Staged image");
        self.stage_image(data_url);
        Ok(())
    }

    /// Unstage the image at `index`
    pub fn remove_image(&mut self, index: usize) -> Option<String> {
        if index < self.staged_images.len() {
            Some(self.staged_images.remove(index))
        } else {
            None
        }
    }

    /// Phase one of a submission.
    ///
    /// Uses `override_input` when it is non-empty, else the input buffer.
    /// Returns `None` without side effects when there is nothing to send or a
    /// submission is already in flight.
    pub fn begin(
        &mut self,
        override_input: Option<&str>,
        settings: &AppSettings,
    ) -> Option<PendingTurn> {
        let text = override_input
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| self.input.clone());

        if self.state == TurnState::Submitting {
            tracing::debug!("Submission rejected: already in flight");
            return None;
        }
        if text.trim().is_empty() && self.staged_images.is_empty() {
            return None;
        }

        let images = std::mem::take(&mut self.staged_images);
        let request =
            AnalysisRequest::build(&text, !images.is_empty(), settings, &self.search_domains);
        let message = Message::user(text, images, Utc::now());

        self.messages.push(message.clone());
        self.input.clear();
        self.state = TurnState::Submitting;

        Some(PendingTurn { message, request })
    }

    /// Phase two: record the collaborator's result and return to idle.
    pub fn complete(
        &mut self,
        pending: PendingTurn,
        result: Result<String>,
        manager: &mut SessionManager,
    ) -> TurnOutcome {
        self.state = TurnState::Idle;

        let reply = match result {
            Ok(reply) => reply,
            Err(e) => {
                tracing::warn!(error = %e, "Analysis request failed");
                self.messages.push(Message::model(ANALYSIS_FAILED, Utc::now()));
                return TurnOutcome::Failed;
            }
        };

        self.messages.push(Message::model(reply, Utc::now()));

        let session = match manager.active_session() {
            Some(active) => AnalysisSession {
                id: active.id.clone(),
                title: active.title.clone(),
                messages: self.messages.clone(),
                created_at: active.created_at,
            },
            None => AnalysisSession::new(
                default_title(&pending.message.content),
                self.messages.clone(),
                Utc::now(),
            ),
        };

        let session_id = session.id.clone();
        self.title = session.title.clone();
        manager.upsert(session);
        tracing::info!(session_id = %session_id, messages = self.messages.len(), "Turn committed");

        TurnOutcome::Committed { session_id }
    }

    /// Run a whole submission with exactly one call to `client`.
    ///
    /// Returns `None` when the guard rejected the submission.
    pub fn submit(
        &mut self,
        override_input: Option<&str>,
        client: &dyn AnalysisClient,
        manager: &mut SessionManager,
    ) -> Option<TurnOutcome> {
        let pending = self.begin(override_input, &manager.settings())?;
        let result = analyze(client, pending.request());
        Some(self.complete(pending, result, manager))
    }

    /// Submit the canned prompt for a quick action.
    pub fn quick_action(
        &mut self,
        action: QuickAction,
        client: &dyn AnalysisClient,
        manager: &mut SessionManager,
    ) -> Option<TurnOutcome> {
        self.submit(Some(action.prompt()), client, manager)
    }

    /// Rename the active session. Returns whether anything changed.
    pub fn rename(&mut self, title: &str, manager: &mut SessionManager) -> Result<bool> {
        let Some(id) = manager.active_id().map(str::to_string) else {
            return Ok(false);
        };
        let changed = manager.rename(&id, title)?;
        if changed {
            self.title = title.trim().to_string();
        }
        Ok(changed)
    }

    /// Save the visible transcript as a template. No-op for an empty chat.
    pub fn save_as_template(&self, name: &str, manager: &mut SessionManager) -> Option<String> {
        let name = name.trim();
        if self.messages.is_empty() || name.is_empty() {
            return None;
        }
        let template = SessionTemplate::snapshot(name, &self.messages, Utc::now());
        let id = template.id.clone();
        manager.save_template(template);
        Some(id)
    }

    /// Start a new chat (optionally from a template) and show it.
    pub fn new_chat(&mut self, template: Option<&SessionTemplate>, manager: &mut SessionManager) {
        manager.new_chat(template);
        self.input.clear();
        self.staged_images.clear();
        self.sync_with(manager);
    }
}

/// Encode an image file as a `data:` URL.
pub fn image_data_url(path: &Path) -> Result<String> {
    let bytes = std::fs::read(path)?;
    Ok(format!(
        "data:{};base64,{}",
        image_mime_type(path),
        STANDARD.encode(bytes)
    ))
}

fn image_mime_type(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        _ => "application/octet-stream",
    }
}
