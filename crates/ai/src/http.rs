//! HTTP-backed reorder advisor.
//!
//! Talks to an OpenAI-compatible chat-completion endpoint, asks for a strict
//! JSON answer, and validates it before handing a suggestion back. A request
//! timeout keeps a slow service from blocking the caller indefinitely.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value as JsonValue};

use crate::advisor::{AdvisorError, ProductActivity, ReorderAdvisor, ReorderSuggestion};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(20);
const FALLBACK_REASONING: &str = "No specific reasoning provided.";

#[derive(Debug, Clone)]
pub struct HttpReorderAdvisorConfig {
    /// Chat-completions endpoint, e.g. `https://api.together.xyz/v1/chat/completions`.
    pub api_url: String,
    pub api_key: String,
    pub model: String,
    pub timeout: Duration,
}

impl HttpReorderAdvisorConfig {
    pub fn new(api_url: impl Into<String>, api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_url: api_url.into(),
            api_key: api_key.into(),
            model: model.into(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

pub struct HttpReorderAdvisor {
    config: HttpReorderAdvisorConfig,
    client: reqwest::Client,
}

impl HttpReorderAdvisor {
    pub fn new(config: HttpReorderAdvisorConfig) -> Result<Self, AdvisorError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| AdvisorError::Unavailable(e.to_string()))?;
        Ok(Self { config, client })
    }
}

/// Prompt asking for a reorder quantity, assuming a 7-day lead time and a
/// 30-day stock target.
fn build_prompt(activity: &ProductActivity) -> String {
    format!(
        "Suggest an optimal reorder quantity for {name} (SKU: {sku}). \
         Current stock: {stock} units. \
         Transaction history for the last 30 days: {sold} units sold, {purchased} units purchased. \
         Consider a typical lead time of 7 days and aim to maintain stock for approximately 30 days of sales. \
         Output your suggestion strictly as a JSON object with two keys: \
         'reorder_quantity' (integer) and 'reasoning' (string).",
        name = activity.name,
        sku = activity.sku,
        stock = activity.stock_quantity,
        sold = activity.sold_30d,
        purchased = activity.purchased_30d,
    )
}

/// Validate the model's JSON answer into a suggestion.
fn parse_suggestion(content: &str) -> Result<ReorderSuggestion, AdvisorError> {
    if content.trim().is_empty() {
        return Err(AdvisorError::InvalidResponse("empty response body".to_string()));
    }

    let value: JsonValue = serde_json::from_str(content)
        .map_err(|e| AdvisorError::InvalidResponse(format!("not valid JSON: {e}")))?;

    let reorder_quantity = value
        .get("reorder_quantity")
        .and_then(JsonValue::as_u64)
        .ok_or_else(|| {
            AdvisorError::InvalidResponse(
                "reorder_quantity missing or not a non-negative integer".to_string(),
            )
        })?;
    let reorder_quantity = u32::try_from(reorder_quantity).map_err(|_| {
        AdvisorError::InvalidResponse("reorder_quantity out of range".to_string())
    })?;

    let reasoning = value
        .get("reasoning")
        .and_then(JsonValue::as_str)
        .unwrap_or(FALLBACK_REASONING)
        .to_string();

    Ok(ReorderSuggestion {
        reorder_quantity,
        reasoning,
    })
}

#[async_trait]
impl ReorderAdvisor for HttpReorderAdvisor {
    async fn suggest(&self, activity: &ProductActivity) -> Result<ReorderSuggestion, AdvisorError> {
        if activity.sold_30d < 0 || activity.purchased_30d < 0 {
            return Err(AdvisorError::InvalidInput(
                "30-day totals cannot be negative".to_string(),
            ));
        }

        let body = json!({
            "model": self.config.model,
            "messages": [{"role": "user", "content": build_prompt(activity)}],
            "response_format": {"type": "json_object"},
        });

        let response = self
            .client
            .post(&self.config.api_url)
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| AdvisorError::Unavailable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AdvisorError::Unavailable(format!(
                "service answered with status {status}"
            )));
        }

        let payload: JsonValue = response
            .json()
            .await
            .map_err(|e| AdvisorError::InvalidResponse(e.to_string()))?;

        let content = payload
            .pointer("/choices/0/message/content")
            .and_then(JsonValue::as_str)
            .ok_or_else(|| {
                AdvisorError::InvalidResponse("missing choices[0].message.content".to_string())
            })?;

        parse_suggestion(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stockforge_core::ProductId;

    fn activity() -> ProductActivity {
        ProductActivity {
            product_id: ProductId::new(),
            name: "Widget".to_string(),
            sku: "SKU-001".to_string(),
            stock_quantity: 12,
            sold_30d: 40,
            purchased_30d: 35,
        }
    }

    #[test]
    fn prompt_mentions_stock_and_window_totals() {
        let prompt = build_prompt(&activity());
        assert!(prompt.contains("SKU-001"));
        assert!(prompt.contains("12 units"));
        assert!(prompt.contains("40 units sold"));
        assert!(prompt.contains("35 units purchased"));
    }

    #[test]
    fn parses_well_formed_suggestion() {
        let s = parse_suggestion(r#"{"reorder_quantity": 100, "reasoning": "Covers 30 days."}"#)
            .unwrap();
        assert_eq!(s.reorder_quantity, 100);
        assert_eq!(s.reasoning, "Covers 30 days.");
    }

    #[test]
    fn reasoning_falls_back_when_missing() {
        let s = parse_suggestion(r#"{"reorder_quantity": 0}"#).unwrap();
        assert_eq!(s.reorder_quantity, 0);
        assert_eq!(s.reasoning, FALLBACK_REASONING);
    }

    #[test]
    fn rejects_negative_or_missing_quantity() {
        assert!(matches!(
            parse_suggestion(r#"{"reorder_quantity": -5, "reasoning": "x"}"#),
            Err(AdvisorError::InvalidResponse(_))
        ));
        assert!(matches!(
            parse_suggestion(r#"{"reasoning": "x"}"#),
            Err(AdvisorError::InvalidResponse(_))
        ));
    }

    #[test]
    fn rejects_non_json_and_empty_content() {
        assert!(matches!(
            parse_suggestion("not json at all"),
            Err(AdvisorError::InvalidResponse(_))
        ));
        assert!(matches!(
            parse_suggestion("   "),
            Err(AdvisorError::InvalidResponse(_))
        ));
    }
}
