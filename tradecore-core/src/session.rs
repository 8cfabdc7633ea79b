//! Session lifecycle management.
//!
//! [`SessionManager`] owns the application state (settings, sessions,
//! templates and the active-session pointer). It is loaded once from the
//! [`SecureStore`] and writes the affected collection back after every change.

use crate::error::{Error, Result};
use crate::storage::{keys, SecureStore, StoredForm};
use crate::types::{AnalysisSession, AppSettings, SessionTemplate};
use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Title used when the first message of a session is empty (image-only turn)
pub const DEFAULT_TITLE: &str = "Market Analysis";

/// Characters of the first prompt kept in a derived title
pub const TITLE_MAX_CHARS: usize = 30;

/// Minimum length of an id prefix accepted by the `resolve_*` lookups
const MIN_PREFIX_LEN: usize = 4;

/// Derive a session title from the first user message.
pub fn default_title(first_message: &str) -> String {
    if first_message.is_empty() {
        return DEFAULT_TITLE.to_string();
    }

    let mut chars = first_message.chars();
    let head: String = chars.by_ref().take(TITLE_MAX_CHARS).collect();
    if chars.next().is_some() {
        format!("{}...", head)
    } else {
        head
    }
}

/// Owner of all persisted chat state.
pub struct SessionManager {
    store: SecureStore,
    settings: AppSettings,
    sessions: Vec<AnalysisSession>,
    templates: Vec<SessionTemplate>,
    active_id: Option<String>,
}

impl SessionManager {
    /// Load state from `store`, falling back to empty defaults.
    ///
    /// Values still in the legacy plain layout are rewritten obfuscated.
    pub fn load(store: SecureStore) -> Self {
        let settings = load_key(&store, keys::SETTINGS).unwrap_or_default();
        let sessions: Vec<AnalysisSession> = load_key(&store, keys::SESSIONS).unwrap_or_default();
        let templates: Vec<SessionTemplate> =
            load_key(&store, keys::TEMPLATES).unwrap_or_default();

        tracing::info!(
            sessions = sessions.len(),
            templates = templates.len(),
            "Loaded application state"
        );

        Self {
            store,
            settings,
            sessions,
            templates,
            active_id: None,
        }
    }

    /// The backing store
    pub fn store(&self) -> &SecureStore {
        &self.store
    }

    // ============================================
    // Settings
    // ============================================

    pub fn settings(&self) -> AppSettings {
        self.settings
    }

    pub fn save_settings(&mut self, settings: AppSettings) {
        self.settings = settings;
        self.store.put(keys::SETTINGS, &self.settings);
    }

    /// Forget stored settings and fall back to defaults.
    pub fn reset_settings(&mut self) {
        self.settings = AppSettings::default();
        self.store.remove(keys::SETTINGS);
        tracing::info!("Settings reset to defaults");
    }

    // ============================================
    // Sessions
    // ============================================

    /// Sessions in insertion order
    pub fn sessions(&self) -> &[AnalysisSession] {
        &self.sessions
    }

    /// Sessions newest first, as shown in the history list
    pub fn history(&self) -> impl Iterator<Item = &AnalysisSession> {
        self.sessions.iter().rev()
    }

    pub fn find(&self, id: &str) -> Option<&AnalysisSession> {
        self.sessions.iter().find(|s| s.id == id)
    }

    /// Look a session up by full id or by a unique id prefix.
    pub fn resolve_session(&self, key: &str) -> Result<&AnalysisSession> {
        if let Some(session) = self.find(key) {
            return Ok(session);
        }
        unique_prefix_match(self.sessions.iter(), key, |s| s.id.as_str())
            .ok_or_else(|| Error::SessionNotFound(key.to_string()))
    }

    pub fn active_id(&self) -> Option<&str> {
        self.active_id.as_deref()
    }

    /// The active session, if it has been saved
    pub fn active_session(&self) -> Option<&AnalysisSession> {
        self.active_id.as_deref().and_then(|id| self.find(id))
    }

    /// Replace the session with the same id in place, or append it.
    ///
    /// Persists the whole collection and makes `session` the active one.
    pub fn upsert(&mut self, session: AnalysisSession) {
        let id = session.id.clone();
        match self.sessions.iter_mut().find(|s| s.id == session.id) {
            Some(existing) => *existing = session,
            None => self.sessions.push(session),
        }
        self.store.put(keys::SESSIONS, &self.sessions);

        if self.active_id.as_deref() != Some(id.as_str()) {
            tracing::debug!(session_id = %id, "Active session changed");
            self.active_id = Some(id);
        }
    }

    /// Point the active session at `id`. The collection is not touched.
    pub fn select_active(&mut self, id: &str) -> Result<()> {
        if self.find(id).is_none() {
            return Err(Error::SessionNotFound(id.to_string()));
        }
        self.active_id = Some(id.to_string());
        Ok(())
    }

    /// Rename a session. Blank or unchanged titles are ignored.
    ///
    /// Returns whether the title changed.
    pub fn rename(&mut self, id: &str, title: &str) -> Result<bool> {
        let title = title.trim();
        let session = self
            .find(id)
            .ok_or_else(|| Error::SessionNotFound(id.to_string()))?;
        if title.is_empty() || title == session.title {
            return Ok(false);
        }

        let mut renamed = session.clone();
        renamed.title = title.to_string();
        self.upsert(renamed);
        Ok(true)
    }

    /// Drop every session and clear the active pointer.
    pub fn clear_all(&mut self) {
        self.sessions.clear();
        self.active_id = None;
        self.store.put(keys::SESSIONS, &self.sessions);
        tracing::info!("Cleared session history");
    }

    /// Start a new chat, optionally seeded from a template.
    ///
    /// Returns the id of the seeded session; without a template the new chat
    /// stays pending until its first successful turn.
    pub fn new_chat(&mut self, template: Option<&SessionTemplate>) -> Option<String> {
        self.active_id = None;
        let template = template?;

        let session =
            AnalysisSession::new(template.name.clone(), template.messages.clone(), Utc::now());
        let id = session.id.clone();
        self.upsert(session);
        Some(id)
    }

    // ============================================
    // Templates
    // ============================================

    pub fn templates(&self) -> &[SessionTemplate] {
        &self.templates
    }

    pub fn find_template(&self, id: &str) -> Option<&SessionTemplate> {
        self.templates.iter().find(|t| t.id == id)
    }

    /// Look a template up by full id or by a unique id prefix.
    pub fn resolve_template(&self, key: &str) -> Result<&SessionTemplate> {
        if let Some(template) = self.find_template(key) {
            return Ok(template);
        }
        unique_prefix_match(self.templates.iter(), key, |t| t.id.as_str())
            .ok_or_else(|| Error::TemplateNotFound(key.to_string()))
    }

    pub fn save_template(&mut self, template: SessionTemplate) {
        tracing::info!(template_id = %template.id, name = %template.name, "Saved template");
        self.templates.push(template);
        self.store.put(keys::TEMPLATES, &self.templates);
    }
}

fn load_key<T: DeserializeOwned + Serialize>(store: &SecureStore, key: &str) -> Option<T> {
    let (value, form) = store.get_with_form::<T>(key)?;
    if form == StoredForm::Legacy {
        tracing::info!(key, "Migrating legacy plain-text value");
        store.put(key, &value);
    }
    Some(value)
}

fn unique_prefix_match<'a, T>(
    items: impl Iterator<Item = &'a T>,
    prefix: &str,
    id: impl Fn(&T) -> &str,
) -> Option<&'a T> {
    if prefix.len() < MIN_PREFIX_LEN {
        return None;
    }
    let mut matches = items.filter(|item| id(item).starts_with(prefix));
    let first = matches.next()?;
    if matches.next().is_some() {
        return None;
    }
    Some(first)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Message;

    fn manager() -> SessionManager {
        SessionManager::load(SecureStore::open_in_memory().unwrap())
    }

    fn session(title: &str) -> AnalysisSession {
        AnalysisSession::new(
            title,
            vec![Message::user(title, vec![], Utc::now())],
            Utc::now(),
        )
    }

    #[test]
    fn title_truncates_long_prompt() {
        let title = default_title("Show me BTC levels for the next 24 hours and explain why");
        assert_eq!(title, "Show me BTC levels for the nex...");
    }

    #[test]
    fn title_keeps_short_prompt() {
        assert_eq!(default_title("Gold outlook"), "Gold outlook");
        let exactly_30 = "a".repeat(30);
        assert_eq!(default_title(&exactly_30), exactly_30);
    }

    #[test]
    fn title_falls_back_for_empty_prompt() {
        assert_eq!(default_title(""), DEFAULT_TITLE);
    }

    #[test]
    fn title_counts_characters_not_bytes() {
        let prompt = "é".repeat(31);
        assert_eq!(default_title(&prompt), format!("{}...", "é".repeat(30)));
    }

    #[test]
    fn upsert_appends_and_activates() {
        let mut manager = manager();
        let s = session("first");
        let id = s.id.clone();
        manager.upsert(s);

        assert_eq!(manager.sessions().len(), 1);
        assert_eq!(manager.active_id(), Some(id.as_str()));
    }

    #[test]
    fn upsert_is_idempotent() {
        let mut manager = manager();
        let s = session("first");
        manager.upsert(s.clone());
        manager.upsert(s.clone());

        assert_eq!(manager.sessions(), &[s]);
    }

    #[test]
    fn upsert_replaces_in_place() {
        let mut manager = manager();
        let a = session("a");
        let b = session("b");
        manager.upsert(a.clone());
        manager.upsert(b.clone());

        let mut updated = a.clone();
        updated.messages.push(Message::model("reply", Utc::now()));
        manager.upsert(updated.clone());

        assert_eq!(manager.sessions().len(), 2);
        assert_eq!(manager.sessions()[0], updated);
        assert_eq!(manager.sessions()[1], b);
        assert_eq!(manager.active_id(), Some(a.id.as_str()));
    }

    #[test]
    fn select_active_requires_known_id() {
        let mut manager = manager();
        let s = session("x");
        let id = s.id.clone();
        manager.upsert(s);
        manager.new_chat(None);
        assert_eq!(manager.active_id(), None);

        manager.select_active(&id).unwrap();
        assert_eq!(manager.active_session().map(|s| s.id.as_str()), Some(id.as_str()));
        assert!(matches!(
            manager.select_active("missing"),
            Err(Error::SessionNotFound(_))
        ));
        assert_eq!(manager.active_id(), Some(id.as_str()));
    }

    #[test]
    fn clear_all_empties_everything() {
        let mut manager = manager();
        manager.upsert(session("a"));
        manager.upsert(session("b"));
        manager.clear_all();

        assert!(manager.sessions().is_empty());
        assert_eq!(manager.active_id(), None);

        assert_eq!(
            manager.store().get::<Vec<AnalysisSession>>(keys::SESSIONS),
            Some(vec![])
        );
    }

    #[test]
    fn rename_trims_and_ignores_noops() {
        let mut manager = manager();
        let s = session("old");
        let id = s.id.clone();
        manager.upsert(s);

        assert!(manager.rename(&id, "  New title ").unwrap());
        assert_eq!(manager.find(&id).unwrap().title, "New title");
        assert!(!manager.rename(&id, "New title").unwrap());
        assert!(!manager.rename(&id, "   ").unwrap());
        assert!(manager.rename("missing", "x").is_err());
    }

    #[test]
    fn new_chat_from_template_copies_messages() {
        let mut manager = manager();
        let source = session("source");
        let template = SessionTemplate::snapshot("Morning Brief", &source.messages, Utc::now());
        manager.save_template(template.clone());

        let id = manager.new_chat(Some(&template)).unwrap();
        let created = manager.find(&id).unwrap();
        assert_eq!(created.title, "Morning Brief");
        assert_eq!(created.messages, template.messages);
        assert_ne!(created.id, template.id);
        assert_eq!(manager.active_id(), Some(id.as_str()));
    }

    #[test]
    fn new_chat_without_template_only_clears_pointer() {
        let mut manager = manager();
        manager.upsert(session("a"));
        assert_eq!(manager.new_chat(None), None);
        assert_eq!(manager.active_id(), None);
        assert_eq!(manager.sessions().len(), 1);
    }

    #[test]
    fn history_is_newest_first() {
        let mut manager = manager();
        manager.upsert(session("a"));
        manager.upsert(session("b"));
        let titles: Vec<_> = manager.history().map(|s| s.title.as_str()).collect();
        assert_eq!(titles, vec!["b", "a"]);
    }

    #[test]
    fn resolve_by_unique_prefix() {
        let mut manager = manager();
        let s = session("a");
        let id = s.id.clone();
        manager.upsert(s);

        assert_eq!(manager.resolve_session(&id[..8]).unwrap().id, id);
        assert!(manager.resolve_session(&id[..2]).is_err());
        assert!(manager.resolve_session("zzzzzzzz").is_err());
    }

    #[test]
    fn settings_persist() {
        let mut manager = manager();
        let settings = AppSettings {
            use_pro_model: true,
            thinking_budget: 2048,
        };
        manager.save_settings(settings);
        assert_eq!(manager.store().get::<AppSettings>(keys::SETTINGS), Some(settings));
    }

    #[test]
    fn reset_settings_removes_stored_value() {
        let mut manager = manager();
        manager.save_settings(AppSettings {
            use_pro_model: true,
            thinking_budget: 512,
        });

        manager.reset_settings();
        assert_eq!(manager.settings(), AppSettings::default());
        assert_eq!(manager.store().database().get_value(keys::SETTINGS).unwrap(), None);
    }

    #[test]
    fn load_migrates_legacy_values() {
        let store = SecureStore::open_in_memory().unwrap();
        store
            .database()
            .set_value(keys::SETTINGS, r#"{"useProModel":true}"#)
            .unwrap();

        let manager = SessionManager::load(store);
        assert!(manager.settings().use_pro_model);
        assert_eq!(manager.settings().thinking_budget, 0);
        assert_eq!(
            manager.store().get_with_form::<AppSettings>(keys::SETTINGS).map(|(_, f)| f),
            Some(StoredForm::Obfuscated)
        );
    }
}
