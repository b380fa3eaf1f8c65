//! Prompt construction and reply parsing for the LLM path.

use super::Suggestions;
use crate::analysis::Analysis;
use crate::utils::{format_currency, format_percentage};
use anyhow::{Context, Result};
use rust_decimal::prelude::ToPrimitive;
use serde_json::json;

/// Number of positions included in the prompt.
const TOP_POSITIONS: usize = 5;

pub const SYSTEM_PROMPT: &str = "You are an expert cryptocurrency futures trading risk analyst. \
Analyze the provided portfolio data and provide specific, actionable suggestions.
Focus on: liquidation risks, over-leverage, concentration risk, and hedging opportunities.
Be concise and specific. Provide 2-4 suggestions per category.";

/// Describe the portfolio, its risk metrics and the first positions for the model.
pub fn build_user_prompt(analysis: &Analysis) -> Result<String> {
    let portfolio = &analysis.portfolio;
    let risks = &analysis.risks;

    let top_positions: Vec<serde_json::Value> = analysis
        .positions
        .iter()
        .take(TOP_POSITIONS)
        .map(|p| {
            json!({
                "symbol": p.symbol,
                "side": p.side.as_str(),
                "leverage": p.leverage.to_f64(),
                "liq_distance": format_percentage(p.liquidation_distance_pct),
                "pnl": p.unrealized_pnl.to_f64(),
            })
        })
        .collect();
    let positions_json =
        serde_json::to_string_pretty(&top_positions).context("Failed to encode positions")?;

    Ok(format!(
        "Analyze this futures portfolio and provide actionable suggestions:

Portfolio Summary:
- Long Exposure: ${long}
- Short Exposure: ${short}
- Bias: {bias}
- Total Positions: {count}
- Total PnL: ${pnl}

Risk Metrics:
- High Leverage Positions: {high_lev}
- Close to Liquidation: {close_liq}

Top Positions:
{positions_json}

Provide suggestions in JSON format:
{{
    \"urgent\": [\"suggestion 1\", \"suggestion 2\"],
    \"recommended\": [\"suggestion 1\", \"suggestion 2\"],
    \"optional\": [\"suggestion 1\", \"suggestion 2\"]
}}",
        long = format_currency(portfolio.total_long_exposure),
        short = format_currency(portfolio.total_short_exposure),
        bias = portfolio.bias,
        count = portfolio.total_positions,
        pnl = format_currency(portfolio.total_unrealized_pnl),
        high_lev = risks.high_leverage_count,
        close_liq = risks.close_liquidation_count,
    ))
}

/// Strip a Markdown code fence around the reply, if any.
pub fn extract_json(content: &str) -> &str {
    let inner = if let Some((_, rest)) = content.split_once("```json") {
        rest.split("```").next().unwrap_or(rest)
    } else {
        let mut parts = content.split("```");
        match (parts.next(), parts.next()) {
            (Some(_), Some(fenced)) => fenced,
            _ => content,
        }
    };
    inner.trim()
}

/// Parse a model reply into capped suggestion lists.
pub fn parse_suggestions(content: &str) -> Result<Suggestions> {
    let suggestions: Suggestions = serde_json::from_str(extract_json(content))
        .context("Model reply is not valid suggestion JSON")?;
    Ok(suggestions.capped())
}
