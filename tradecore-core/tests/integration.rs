//! Integration tests for the tradecore chat flow
//!
//! These tests drive the public API end to end against a file-backed store
//! and a scripted analysis client, then reopen the store to verify what was
//! persisted.

use chrono::{TimeZone, Utc};
use std::path::PathBuf;
use std::sync::Mutex;

use tradecore_core::analysis::{AnalysisClient, AnalysisRequest};
use tradecore_core::chat::ANALYSIS_FAILED;
use tradecore_core::export::{export_json, write_export};
use tradecore_core::storage::{keys, obfuscate, StoredForm};
use tradecore_core::{
    AnalysisSession, AppSettings, ChatView, Error, Message, Result, Role, SecureStore,
    SessionManager, TurnOutcome,
};
use tempfile::TempDir;

/// Replies with the scripted answers in order, then fails
struct ScriptedClient {
    replies: Mutex<Vec<Result<Option<String>>>>,
    requests: Mutex<Vec<AnalysisRequest>>,
}

impl ScriptedClient {
    fn new(replies: Vec<Result<Option<String>>>) -> Self {
        Self {
            replies: Mutex::new(replies.into_iter().rev().collect()),
            requests: Mutex::new(Vec::new()),
        }
    }

    fn requests(&self) -> Vec<AnalysisRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl AnalysisClient for ScriptedClient {
    fn complete(&self, request: &AnalysisRequest) -> Result<Option<String>> {
        self.requests.lock().unwrap().push(request.clone());
        self.replies
            .lock()
            .unwrap()
            .pop()
            .unwrap_or_else(|| Err(Error::Analysis("script exhausted".to_string())))
    }
}

fn db_path(dir: &TempDir) -> PathBuf {
    dir.path().join("data.db")
}

fn open_manager(dir: &TempDir) -> SessionManager {
    SessionManager::load(SecureStore::open(&db_path(dir)).unwrap())
}

fn domains() -> Vec<String> {
    vec!["tradingview.com".to_string(), "reuters.com".to_string()]
}

// ============================================
// Chat Flow Tests
// ============================================

#[test]
fn test_conversation_persists_across_reopen() {
    tradecore_core::logging::init_test();
    let dir = TempDir::new().unwrap();
    let client = ScriptedClient::new(vec![
        Ok(Some("BTC holds 64k support".to_string())),
        Ok(Some("Resistance at 68k".to_string())),
    ]);

    let session_id = {
        let mut manager = open_manager(&dir);
        let mut view = ChatView::new(domains());

        view.set_input("BTC levels today");
        let first = view.submit(None, &client, &mut manager).unwrap();
        view.set_input("And resistance?");
        let second = view.submit(None, &client, &mut manager).unwrap();
        assert_eq!(first, second);

        match first {
            TurnOutcome::Committed { session_id } => session_id,
            TurnOutcome::Failed => panic!("first turn should commit"),
        }
    };

    let manager = open_manager(&dir);
    assert_eq!(manager.sessions().len(), 1);
    let session = manager.find(&session_id).unwrap();
    assert_eq!(session.title, "BTC levels today");
    assert_eq!(session.messages.len(), 4);
    assert_eq!(session.messages[3].role, Role::Model);
    assert_eq!(session.messages[3].content, "Resistance at 68k");

    // active pointer is not persisted
    assert!(manager.active_id().is_none());

    let requests = client.requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0].search_domain_filter, domains());
    assert_eq!(requests[1].user_content(), "And resistance?");
}

#[test]
fn test_failed_turn_is_not_saved_until_next_success() {
    tradecore_core::logging::init_test();
    let dir = TempDir::new().unwrap();
    let client = ScriptedClient::new(vec![
        Err(Error::Analysis("timeout".to_string())),
        Ok(None),
    ]);

    let mut manager = open_manager(&dir);
    let mut view = ChatView::new(domains());

    let outcome = view.submit(Some("Gold?"), &client, &mut manager);
    assert_eq!(outcome, Some(TurnOutcome::Failed));
    assert!(open_manager(&dir).sessions().is_empty());

    view.submit(Some("Gold again"), &client, &mut manager);
    let reopened = open_manager(&dir);
    let session = &reopened.sessions()[0];
    assert_eq!(session.title, "Gold again");
    let contents: Vec<&str> = session.messages.iter().map(|m| m.content.as_str()).collect();
    assert_eq!(
        contents,
        vec!["Gold?", ANALYSIS_FAILED, "Gold again", "No analysis generated."]
    );
}

#[test]
fn test_switching_sessions_continues_the_selected_one() {
    let dir = TempDir::new().unwrap();
    let client = ScriptedClient::new(vec![
        Ok(Some("a1".to_string())),
        Ok(Some("b1".to_string())),
        Ok(Some("a2".to_string())),
    ]);
    let mut manager = open_manager(&dir);
    let mut view = ChatView::new(domains());

    view.submit(Some("Session A"), &client, &mut manager);
    let a_id = manager.active_id().unwrap().to_string();
    view.new_chat(None, &mut manager);
    view.submit(Some("Session B"), &client, &mut manager);

    manager.select_active(&a_id).unwrap();
    view.sync_with(&manager);
    assert_eq!(view.title(), "Session A");
    view.submit(Some("More on A"), &client, &mut manager);

    let history: Vec<&str> = manager.history().map(|s| s.title.as_str()).collect();
    assert_eq!(history, vec!["Session B", "Session A"]);
    assert_eq!(manager.find(&a_id).unwrap().messages.len(), 4);
}

#[test]
fn test_pro_setting_selects_reasoning_model() {
    let dir = TempDir::new().unwrap();
    let client = ScriptedClient::new(vec![Ok(Some("deep".to_string()))]);
    let mut manager = open_manager(&dir);
    manager.save_settings(AppSettings {
        use_pro_model: true,
        thinking_budget: 4096,
    });

    let mut view = ChatView::new(domains());
    view.submit(Some("ETH"), &client, &mut manager);
    assert_eq!(client.requests()[0].model, "sonar-reasoning");

    let reopened = open_manager(&dir);
    assert_eq!(reopened.settings().thinking_budget, 4096);
}

// ============================================
// Storage Layout Tests
// ============================================

#[test]
fn test_legacy_plain_values_are_migrated() {
    let dir = TempDir::new().unwrap();
    let at = Utc.timestamp_millis_opt(1_717_000_000_000).unwrap();
    let legacy = vec![AnalysisSession::new(
        "Legacy chat",
        vec![Message::user("hi", vec![], at), Message::model("hello", at)],
        at,
    )];

    {
        let store = SecureStore::open(&db_path(&dir)).unwrap();
        store
            .database()
            .set_value(keys::SESSIONS, &serde_json::to_string(&legacy).unwrap())
            .unwrap();
    }

    let manager = open_manager(&dir);
    assert_eq!(manager.sessions(), legacy.as_slice());

    let raw = manager.store().database().get_value(keys::SESSIONS).unwrap().unwrap();
    assert_eq!(raw, obfuscate(&serde_json::to_string(&legacy).unwrap()));
    let (_, form) = manager
        .store()
        .get_with_form::<Vec<AnalysisSession>>(keys::SESSIONS)
        .unwrap();
    assert_eq!(form, StoredForm::Obfuscated);
}

#[test]
fn test_corrupt_values_fall_back_to_defaults() {
    let dir = TempDir::new().unwrap();
    {
        let store = SecureStore::open(&db_path(&dir)).unwrap();
        store.database().set_value(keys::SESSIONS, "%%%not data").unwrap();
        store.database().set_value(keys::SETTINGS, "@@").unwrap();
    }

    let manager = open_manager(&dir);
    assert!(manager.sessions().is_empty());
    assert_eq!(manager.settings(), AppSettings::default());
}

// ============================================
// Export Tests
// ============================================

#[test]
fn test_export_of_saved_session_is_stable() {
    let dir = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    let client = ScriptedClient::new(vec![Ok(Some("Levels: 100 / 105".to_string()))]);
    let mut manager = open_manager(&dir);
    let mut view = ChatView::new(domains());
    view.submit(Some("SOL/USD: levels?"), &client, &mut manager);

    let session = manager.active_session().unwrap().clone();
    let path = write_export(out.path(), &session).unwrap();
    assert_eq!(path.file_name().unwrap(), "sol_usd__levels_.json");

    let written = std::fs::read_to_string(&path).unwrap();
    assert_eq!(written, export_json(&session).unwrap());

    let reloaded = open_manager(&dir);
    assert_eq!(export_json(reloaded.find(&session.id).unwrap()).unwrap(), written);
}
