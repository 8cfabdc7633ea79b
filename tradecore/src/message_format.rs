//! Shared message formatting helpers for terminal output.

use tradecore_core::chart::{render_reply, ChartKind};
use tradecore_core::format::format_relative_time;
use tradecore_core::{AnalysisSession, Message, Role, SessionTemplate};

const ID_PREFIX_CHARS: usize = 8;
const TITLE_COLUMN_CHARS: usize = 40;

/// Role prefix for transcript rows.
pub fn role_prefix(role: Role) -> &'static str {
    match role {
        Role::User => "[you]",
        Role::Model => "[tradecore]",
    }
}

/// Displayable body of a message. Model replies get their chart blocks rendered.
pub fn message_body(msg: &Message, chart_preference: Option<ChartKind>) -> String {
    match msg.role {
        Role::User => {
            let mut body = msg.content.clone();
            let images = msg.image_count();
            if images > 0 {
                if !body.is_empty() {
                    body.push('\n');
                }
                body.push_str(&format!("({} image{} attached)", images, plural(images)));
            }
            body
        }
        Role::Model => render_reply(&msg.content, chart_preference),
    }
}

/// Full transcript, one block per message.
pub fn transcript(messages: &[Message], chart_preference: Option<ChartKind>) -> String {
    let mut out = String::new();
    for msg in messages {
        out.push_str(role_prefix(msg.role));
        out.push('\n');
        let body = message_body(msg, chart_preference);
        out.push_str(body.trim_end());
        out.push_str("\n\n");
    }
    out
}

/// One row of the history listing.
pub fn session_row(session: &AnalysisSession) -> String {
    format!(
        "{}  {:<width$}  {:>3} msgs  {}",
        short_id(&session.id),
        truncate(&session.title, TITLE_COLUMN_CHARS),
        session.messages.len(),
        format_relative_time(session.last_activity_at()),
        width = TITLE_COLUMN_CHARS
    )
}

/// One row of the template listing.
pub fn template_row(template: &SessionTemplate) -> String {
    format!(
        "{}  {:<width$}  {:>3} msgs  {}",
        short_id(&template.id),
        truncate(&template.name, TITLE_COLUMN_CHARS),
        template.messages.len(),
        format_relative_time(template.created_at),
        width = TITLE_COLUMN_CHARS
    )
}

/// Leading characters of an id, enough to resolve it again.
pub fn short_id(id: &str) -> &str {
    truncate(id, ID_PREFIX_CHARS)
}

fn truncate(input: &str, max_chars: usize) -> &str {
    input
        .char_indices()
        .nth(max_chars)
        .map(|(idx, _)| &input[..idx])
        .unwrap_or(input)
}

fn plural(n: usize) -> &'static str {
    if n == 1 {
        ""
    } else {
        "s"
    }
}
