use reqwest::blocking::Client;
use serde::Deserialize;
use serde_json::{json, Value};

use super::{Assessment, ReportError, ReportGenerator};

/// Blocking client for the hosted `generateContent` endpoint
pub struct GeminiClient {
    http: Client,
    endpoint: String,
    model: String,
    api_key: Option<String>,
}

impl GeminiClient {
    pub fn new(
        endpoint: impl Into<String>,
        model: impl Into<String>,
        api_key: Option<String>,
    ) -> Result<Self, ReportError> {
        Ok(Self {
            http: Client::builder().build()?,
            endpoint: endpoint.into(),
            model: model.into(),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
        })
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    fn url(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.endpoint.trim_end_matches('/'),
            self.model
        )
    }
}

impl ReportGenerator for GeminiClient {
    fn generate(&self, location: &str) -> Result<Assessment, ReportError> {
        let api_key = self.api_key.as_deref().ok_or(ReportError::MissingApiKey)?;

        log::debug!("Requesting assessment for {} from {}", location, self.model);
        let response = self
            .http
            .post(self.url())
            .header("x-goog-api-key", api_key)
            .json(&request_body(location))
            .send()?;

        let status = response.status();
        if !status.is_success() {
            return Err(ReportError::Status(status));
        }

        let body: GenerateResponse = response.json()?;
        parse_response(body)
    }
}

/// Prompt sent for one sector
pub fn prompt(location: &str) -> String {
    format!(
        "Generate a fictional, sci-fi style 'Kinetic Impact Assessment Report' for a simulated \
         missile strike on {location}.\n\
         The tone should be clinical, military, and strategic.\n\
         Do not mention real-world political conflicts. Treat this as a physics/strategy simulation.\n\n\
         Provide the output in strict JSON format."
    )
}

/// Structured-output schema: six required strings
fn response_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "location": { "type": "STRING" },
            "impactRadius": { "type": "STRING", "description": "e.g., '15.4 km'" },
            "casualtyEstimate": {
                "type": "STRING",
                "description": "Simulation estimate, e.g., 'High probability of civilian displacement'"
            },
            "infrastructureDamage": { "type": "STRING", "description": "Critical systems affected" },
            "environmentalImpact": { "type": "STRING" },
            "summary": { "type": "STRING", "description": "A brief tactical summary of the event." }
        },
        "required": [
            "location",
            "impactRadius",
            "casualtyEstimate",
            "infrastructureDamage",
            "environmentalImpact",
            "summary"
        ]
    })
}

fn request_body(location: &str) -> Value {
    json!({
        "contents": [{ "role": "user", "parts": [{ "text": prompt(location) }] }],
        "generationConfig": {
            "responseMimeType": "application/json",
            "responseSchema": response_schema()
        }
    })
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    text: Option<String>,
}

/// Pull the JSON text out of the first candidate and decode it
fn parse_response(body: GenerateResponse) -> Result<Assessment, ReportError> {
    let text: String = body
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();

    if text.trim().is_empty() {
        return Err(ReportError::EmptyResponse);
    }
    Ok(serde_json::from_str(&text)?)
}
