//! Fixed prompt material sent with every analysis request.

/// Persona and response contract for the search engine.
const ANALYST_PROMPT: &str = r#"You are TradeCore, a real-time market intelligence assistant backed by live web search.

For every request:
1. Identify the asset ticker (e.g. BTC, XAUUSD, NVDA), the requested timeframe (e.g. 4H, 15m) and the kind of analysis asked for (fair value gaps, liquidity, trend, news sentiment).
2. Search the web for the current price of the asset before answering. Never invent price levels; cite the sources you used (TradingView, Bloomberg, Reuters, CoinDesk).
3. Search for today's high-impact economic calendar events that affect the asset.
4. If the user mentions an uploaded image, say that you cannot see local image files and that the analysis is based on live web data instead.

Structure the answer in markdown with these sections:
- Engine status: asset, live price, market sentiment, timestamp.
- Live market analysis: current price with source, 24h change, key support and resistance levels with rationale, trend, volume anomalies, fair value gaps estimated from recent price action.
- Execution parameters: direction, entry zone, invalidation (stop loss), conservative and structural targets.
- Fundamental catalysts: the top three recent headlines affecting the asset."#;

/// Chart embedding contract consumed by [`crate::chart`].
const CHART_PROMPT: &str = r##"[SYSTEM INSTRUCTION FOR CHARTS]:
If the user asks for a graph, chart, projection, or visualization of data, you MUST include a JSON code block in your response using the tag 'json-chart'.
The JSON must follow this schema exactly:
```json-chart
{
  "type": "area" | "line" | "bar",
  "title": "Short descriptive title of the chart",
  "description": "Optional subtitle",
  "xAxisKey": "time",
  "dataKey": "price",
  "color": "#10b981",
  "data": [
    { "time": "09:00", "price": 100, "vol": 50 },
    { "time": "09:05", "price": 105, "vol": 60 }
  ]
}
```
Do not just output ASCII art. Use the json-chart block for high quality rendering."##;

/// Appended to the prompt when the user attached images, which the engine cannot receive.
pub const IMAGE_NOTE: &str = "\n\n[SYSTEM NOTE]: The user uploaded an image reference locally, but I cannot see it. I must use my online search capabilities to find the live chart/data for the asset mentioned in the text instead.";

/// Full system instruction: persona followed by the chart contract.
pub fn system_prompt() -> String {
    format!("{ANALYST_PROMPT}\n\n{CHART_PROMPT}\n")
}

/// One-click follow-ups offered after a model reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuickAction {
    AnalyzeFvg,
    ShowLevels,
    CheckVolume,
    TrendCheck,
    RefreshMarketData,
}

impl QuickAction {
    /// Actions shown under the latest reply, in display order
    pub const FOLLOW_UPS: [QuickAction; 4] = [
        QuickAction::AnalyzeFvg,
        QuickAction::ShowLevels,
        QuickAction::CheckVolume,
        QuickAction::TrendCheck,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            QuickAction::AnalyzeFvg => "Analyze FVG",
            QuickAction::ShowLevels => "Show Levels",
            QuickAction::CheckVolume => "Check Volume",
            QuickAction::TrendCheck => "Trend Check",
            QuickAction::RefreshMarketData => "Refresh market data analysis",
        }
    }

    /// Prompt text submitted for this action
    pub fn prompt(&self) -> &'static str {
        match self {
            QuickAction::AnalyzeFvg => "Analyze the Fair Value Gaps (FVG) in the current context. Identify any unmitigated imbalances, categorize them as Bullish or Bearish, and suggest potential entry zones if price returns to these levels. Provide a chart if possible.",
            QuickAction::RefreshMarketData => {
                "Refresh market analysis based on the latest data. Re-evaluate structure."
            }
            other => other.label(),
        }
    }
}

impl std::str::FromStr for QuickAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace(['-', '_'], " ");
        match normalized.as_str() {
            "analyze fvg" | "fvg" => Ok(QuickAction::AnalyzeFvg),
            "show levels" | "levels" => Ok(QuickAction::ShowLevels),
            "check volume" | "volume" => Ok(QuickAction::CheckVolume),
            "trend check" | "trend" => Ok(QuickAction::TrendCheck),
            "refresh market data analysis" | "refresh" => Ok(QuickAction::RefreshMarketData),
            _ => Err(format!("unknown quick action: {}", s)),
        }
    }
}
