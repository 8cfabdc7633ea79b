//! Running analysis turns from the terminal.

use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use tradecore_core::analysis::{
    analyze, create_analysis_client, AnalysisClient, AnalysisRequest, EngineTier,
};
use tradecore_core::chart::ChartKind;
use tradecore_core::config::AnalysisConfig;
use tradecore_core::{ChatView, Error, SessionManager, TurnOutcome};

use crate::message_format::message_body;

/// Stand-in used when the HTTP client could not be configured.
///
/// Every turn fails, so the user sees the regular failure reply.
struct UnconfiguredClient {
    reason: String,
}

impl AnalysisClient for UnconfiguredClient {
    fn complete(&self, _request: &AnalysisRequest) -> tradecore_core::Result<Option<String>> {
        Err(Error::MissingCredential(self.reason.clone()))
    }
}

/// Build the analysis client, degrading to one that always fails.
pub fn analysis_client(config: &AnalysisConfig) -> Box<dyn AnalysisClient> {
    match create_analysis_client(config) {
        Ok(client) => client,
        Err(e) => {
            tracing::warn!(error = %e, "Analysis client unavailable");
            eprintln!("warning: {}", e);
            Box::new(UnconfiguredClient {
                reason: e.to_string(),
            })
        }
    }
}

/// Submit the view's input (or `override_input`) and print the reply.
///
/// Returns `None` when there was nothing to send.
pub fn run_turn(
    view: &mut ChatView,
    override_input: Option<&str>,
    client: &dyn AnalysisClient,
    manager: &mut SessionManager,
    chart_preference: Option<ChartKind>,
) -> Option<TurnOutcome> {
    let settings = manager.settings();
    let pending = view.begin(override_input, &settings)?;

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::with_template("{spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.set_message(format!(
        "Analyzing with {}...",
        EngineTier::from_settings(&settings).display_name()
    ));
    spinner.enable_steady_tick(Duration::from_millis(100));

    let result = analyze(client, pending.request());
    spinner.finish_and_clear();

    let outcome = view.complete(pending, result, manager);
    if let Some(reply) = view.messages().last() {
        println!("{}", message_body(reply, chart_preference).trim_end());
    }
    Some(outcome)
}
