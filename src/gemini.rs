use crate::bot::command::RecommendQuery;
use crate::config::GeminiConfig;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;
use tracing::log::debug;

/// One venue as returned by the model. Every field is optional, the card
/// renderer substitutes placeholders for anything missing.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Recommendation {
    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub rating: Option<f64>,

    #[serde(default)]
    pub address: Option<String>,

    #[serde(default)]
    pub description: Option<String>,
}

/// The fetch outcome is an explicit result so callers cannot confuse
/// "the model found nothing" (`Ok` with an empty list) with "the call
/// itself failed" (`Err`). No retries are performed on failure.
#[derive(Debug, Error)]
pub enum RecommendError {
    #[error("Gemini request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Gemini API error: HTTP {status}: {body}")]
    Api { status: StatusCode, body: String },

    #[error("Gemini response contained no candidate text")]
    MissingCandidate,

    #[error("Gemini returned malformed recommendation JSON: {0}")]
    Malformed(#[from] serde_json::Error),
}

pub struct GeminiClient {
    client: Client,
    api_key: String,
    api_base: String,
    model: String,
}
impl GeminiClient {
    /// Returns `None` when no API key is configured, which disables the
    /// recommendation path entirely rather than failing per-request.
    pub fn new(config: &GeminiConfig) -> anyhow::Result<Option<Self>> {
        let api_key = match &config.api_key {
            Some(key) => key.clone(),
            None => return Ok(None),
        };

        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Some(Self {
            client,
            api_key,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            model: config.model.clone(),
        }))
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Asks the model for exactly 3 venues, constrained to JSON output.
    /// A timeout counts as a failed fetch like any other request error.
    pub async fn recommend(
        &self,
        query: &RecommendQuery,
    ) -> Result<Vec<Recommendation>, RecommendError> {
        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.api_base, self.model, self.api_key
        );
        let body = json!({
            "contents": [{
                "parts": [{ "text": build_prompt(query) }]
            }],
            "generationConfig": { "responseMimeType": "application/json" }
        });

        let response = self.client.post(&url).json(&body).send().await?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(RecommendError::Api { status, body });
        }

        let response: GenerateContentResponse = response.json().await?;
        let text = candidate_text(response).ok_or(RecommendError::MissingCandidate)?;
        debug!("Gemini candidate text: {text}");

        Ok(parse_recommendations(&text)?)
    }
}

fn build_prompt(query: &RecommendQuery) -> String {
    format!(
        "請推薦 3 間位於「{}」的「{}」，預算約「{}」。\n\
         請嚴格遵守以下規則：\n\
         1. 回傳純 JSON 格式 List。\n\
         2. 不要包含 Markdown (如 ```json)。\n\
         3. 欄位包含: name, rating(數值), address, description(簡短評價)。\n\
         \n\
         範例格式:\n\
         [\n\
             {{\"name\": \"店家名\", \"rating\": 4.5, \"address\": \"地址\", \"description\": \"評價\"}}\n\
         ]",
        query.location, query.category, query.budget
    )
}

fn candidate_text(response: GenerateContentResponse) -> Option<String> {
    response
        .candidates
        .into_iter()
        .next()?
        .content
        .parts
        .into_iter()
        .next()
        .map(|part| part.text)
}

fn parse_recommendations(text: &str) -> Result<Vec<Recommendation>, serde_json::Error> {
    serde_json::from_str(text.trim())
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: String,
}

#[cfg(test)]
mod gemini_tests {
    use super::*;
    use crate::bot::command::RecommendQuery;

    fn query() -> RecommendQuery {
        RecommendQuery {
            location: "台中".to_string(),
            category: "火鍋".to_string(),
            budget: "500".to_string(),
        }
    }

    #[test]
    fn test_prompt_contains_query_and_rules() {
        let prompt = build_prompt(&query());
        assert!(prompt.contains("「台中」"));
        assert!(prompt.contains("「火鍋」"));
        assert!(prompt.contains("「500」"));
        assert!(prompt.contains("推薦 3 間"));
        assert!(prompt.contains("純 JSON"));
        assert!(prompt.contains("name, rating(數值), address, description"));
    }

    #[test]
    fn test_parse_full_recommendations() {
        let text = r#"
        [
            {"name": "老王火鍋", "rating": 4.5, "address": "台中市北區一中街1號", "description": "湯頭濃郁"},
            {"name": "小張麻辣", "rating": 4, "address": "台中市西區", "description": "CP值高"}
        ]
        "#;

        let recommendations = parse_recommendations(text).expect("valid list should parse");
        assert_eq!(recommendations.len(), 2);
        assert_eq!(recommendations[0].name.as_deref(), Some("老王火鍋"));
        assert_eq!(recommendations[0].rating, Some(4.5));
        assert_eq!(recommendations[1].rating, Some(4.0));
    }

    #[test]
    fn test_parse_tolerates_missing_fields() {
        let recommendations =
            parse_recommendations(r#"[{"name": "無名小店"}]"#).expect("partial record is fine");
        assert_eq!(recommendations.len(), 1);
        assert_eq!(recommendations[0].name.as_deref(), Some("無名小店"));
        assert!(recommendations[0].rating.is_none());
        assert!(recommendations[0].address.is_none());
        assert!(recommendations[0].description.is_none());
    }

    #[test]
    fn test_parse_rejects_markdown_wrapped_output() {
        assert!(parse_recommendations("```json\n[]\n```").is_err());
    }

    #[test]
    fn test_candidate_text_extraction() {
        let response: GenerateContentResponse = serde_json::from_value(serde_json::json!({
            "candidates": [
                { "content": { "parts": [{ "text": "[]" }] } }
            ]
        }))
        .expect("response should deserialize");
        assert_eq!(candidate_text(response).as_deref(), Some("[]"));

        let empty: GenerateContentResponse =
            serde_json::from_value(serde_json::json!({})).expect("empty response deserializes");
        assert!(candidate_text(empty).is_none());
    }

    #[test]
    fn test_disabled_without_api_key() {
        let config = crate::config::GeminiConfig::default();
        assert!(GeminiClient::new(&config)
            .expect("construction should not fail")
            .is_none());
    }
}
