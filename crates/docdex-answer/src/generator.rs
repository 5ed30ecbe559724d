use std::time::Duration;

use serde::{Deserialize, Serialize};

use docdex_core::config::GeneratorConfig;
use docdex_core::traits::AnswerGenerator;
use docdex_core::types::SearchContext;

/// HTTP language-generation collaborator.
///
/// Posts the query plus the top hits' display text to a completion-style
/// endpoint and returns the prose. Strictly best-effort: the request is
/// bounded by a timeout and every failure is surfaced as an error for the
/// synthesizer to swallow.
pub struct HttpGenerator {
    client: reqwest::blocking::Client,
    endpoint: String,
    model: String,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: String,
}

#[derive(Deserialize)]
struct GenerateResponse {
    text: String,
}

impl HttpGenerator {
    pub fn new(cfg: &GeneratorConfig) -> anyhow::Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .build()?;
        Ok(HttpGenerator {
            client,
            endpoint: cfg.endpoint.clone(),
            model: cfg.model.clone(),
        })
    }

    fn prompt(context: &SearchContext) -> String {
        let mut prompt =
            String::from("You are a documentation search assistant. Relevant documents:\n");
        for (i, hit) in context.hits.iter().take(3).enumerate() {
            prompt.push_str(&format!("\n--- Document {}: {} ---\n", i + 1, hit.filename));
            let excerpt = hit
                .highlights
                .values()
                .flatten()
                .next()
                .map(String::as_str)
                .unwrap_or(hit.summary.as_str());
            prompt.push_str(excerpt);
            prompt.push('\n');
        }
        prompt.push_str(&format!(
            "\nUser question: {}\n\nAnswer the question directly, citing the documents used.",
            context.query
        ));
        prompt
    }
}

impl AnswerGenerator for HttpGenerator {
    fn generate(&self, context: &SearchContext) -> anyhow::Result<String> {
        let body = GenerateRequest {
            model: &self.model,
            prompt: Self::prompt(context),
        };
        let response = self
            .client
            .post(&self.endpoint)
            .json(&body)
            .send()?
            .error_for_status()?;
        let parsed: GenerateResponse = response.json()?;
        Ok(parsed.text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::{BTreeMap, BTreeSet};
    use docdex_core::types::SearchHit;

    #[test]
    fn prompt_includes_query_and_top_documents() {
        let context = SearchContext {
            query: "how do I request vacation".to_string(),
            hits: vec![SearchHit {
                id: "a".to_string(),
                score: 3.0,
                filename: "handbook.md".to_string(),
                doc_type: "Markdown Document".to_string(),
                summary: "vacation requests go through the portal".to_string(),
                keywords: vec![],
                tags: BTreeSet::new(),
                highlights: BTreeMap::new(),
            }],
            size: 10,
        };
        let prompt = HttpGenerator::prompt(&context);
        assert!(prompt.contains("handbook.md"));
        assert!(prompt.contains("vacation requests go through the portal"));
        assert!(prompt.contains("how do I request vacation"));
    }
}
