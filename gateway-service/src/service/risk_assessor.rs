//! Risk Assessor (C6): blends a method prior with an external Judge
//! oracle's opinion, failing closed whenever the Judge can't be reached.
//!
//! The Judge is a collaborator, not a dependency we control. Any
//! unavailability (timeout, non-2xx, malformed body, missing fields) must
//! never surface as an error to the agent; instead the heuristic score is
//! bumped by a fixed penalty.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use shared::config::{JudgeConfig, RiskConfig};
use tracing::warn;

/// Fixed bump applied to the method heuristic when the Judge is
/// unreachable. Chosen so that any method's fail-closed score clears a
/// default 0.5 threshold unless the heuristic is already near zero.
const FAIL_CLOSED_PENALTY: f64 = 0.3;
const JUDGE_WEIGHT: f64 = 0.7;
const HEURISTIC_WEIGHT: f64 = 0.3;

/// Instructs the Judge to return strict JSON, sent verbatim so the
/// oracle's own prompt construction can rely on it.
const JUDGE_SYSTEM_PROMPT: &str = "Evaluate the described HTTP action for risk. \
Respond with a single JSON object of the exact shape {\"score\": <0..1 float>, \"explanation\": <string>}. \
Do not include any other text.";

#[derive(Debug, Clone, Serialize)]
struct JudgeRequest<'a> {
    model: &'a str,
    system_prompt: &'a str,
    method: &'a str,
    target_url: &'a str,
    intent: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
struct JudgeResponse {
    score: f64,
    explanation: String,
}

/// `{score, explanation, blocked}`, as returned to the orchestrator.
#[derive(Debug, Clone, PartialEq)]
pub struct RiskAssessment {
    pub score: f64,
    pub explanation: String,
    pub blocked: bool,
}

pub struct RiskAssessor {
    http: reqwest::Client,
    judge: JudgeConfig,
    threshold: f64,
}

impl RiskAssessor {
    pub fn new(http: reqwest::Client, judge: JudgeConfig, risk: RiskConfig) -> Self {
        Self { http, judge, threshold: risk.threshold }
    }

    /// Method prior: `HEAD/OPTIONS=0.05, GET=0.10, POST=0.30, PATCH=0.40,
    /// PUT=0.50, DELETE=0.70`, anything else `0.20`.
    pub fn heuristic(method: &str) -> f64 {
        match method.to_ascii_uppercase().as_str() {
            "HEAD" | "OPTIONS" => 0.05,
            "GET" => 0.10,
            "POST" => 0.30,
            "PATCH" => 0.40,
            "PUT" => 0.50,
            "DELETE" => 0.70,
            _ => 0.20,
        }
    }

    pub async fn assess(&self, method: &str, target_url: &str, intent: &str) -> RiskAssessment {
        let heuristic = Self::heuristic(method);

        if self.judge.base_url.is_empty() {
            return self.fail_closed(heuristic, "no judge configured");
        }

        let request = JudgeRequest {
            model: &self.judge.model,
            system_prompt: JUDGE_SYSTEM_PROMPT,
            method,
            target_url,
            intent,
        };
        let deadline = Duration::from_millis(self.judge.timeout_ms);

        match tokio::time::timeout(deadline, self.call_judge(&request)).await {
            Ok(Ok(response)) => {
                let judge_score = response.score.clamp(0.0, 1.0);
                let score = (JUDGE_WEIGHT * judge_score + HEURISTIC_WEIGHT * heuristic).clamp(0.0, 1.0);
                RiskAssessment { blocked: score >= self.threshold, score, explanation: response.explanation }
            }
            Ok(Err(err)) => {
                warn!(error = %err, "judge call failed, failing closed");
                self.fail_closed(heuristic, "judge request failed")
            }
            Err(_) => {
                warn!(timeout_ms = self.judge.timeout_ms, "judge call timed out, failing closed");
                self.fail_closed(heuristic, "judge timed out")
            }
        }
    }

    fn fail_closed(&self, heuristic: f64, reason: &str) -> RiskAssessment {
        let score = (heuristic + FAIL_CLOSED_PENALTY).min(1.0);
        RiskAssessment {
            score,
            blocked: score >= self.threshold,
            explanation: format!("judge unavailable ({reason}); scored via method heuristic"),
        }
    }

    async fn call_judge(&self, request: &JudgeRequest<'_>) -> Result<JudgeResponse, String> {
        let url = format!("{}/judge", self.judge.base_url.trim_end_matches('/'));
        let mut builder = self.http.post(url).json(request);
        if !self.judge.api_key.is_empty() {
            builder = builder.bearer_auth(&self.judge.api_key);
        }

        let response = builder.send().await.map_err(|e| e.to_string())?;
        if !response.status().is_success() {
            return Err(format!("judge returned status {}", response.status()));
        }
        response.json::<JudgeResponse>().await.map_err(|e| e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn judge_config(base_url: String) -> JudgeConfig {
        JudgeConfig { base_url, api_key: String::new(), model: "default".to_string(), timeout_ms: 200 }
    }

    fn risk_config() -> RiskConfig {
        RiskConfig { threshold: 0.5 }
    }

    #[test]
    fn heuristic_matches_method_priors() {
        assert_eq!(RiskAssessor::heuristic("GET"), 0.10);
        assert_eq!(RiskAssessor::heuristic("get"), 0.10);
        assert_eq!(RiskAssessor::heuristic("DELETE"), 0.70);
        assert_eq!(RiskAssessor::heuristic("PURGE"), 0.20);
    }

    #[tokio::test]
    async fn blends_judge_score_with_heuristic_on_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/judge"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "score": 0.9,
                "explanation": "deletes a production resource"
            })))
            .mount(&server)
            .await;

        let assessor =
            RiskAssessor::new(reqwest::Client::new(), judge_config(server.uri()), risk_config());
        let result = assessor.assess("DELETE", "https://api.example.com/x", "cleanup").await;

        // 0.7*0.9 + 0.3*0.70 = 0.84
        assert!((result.score - 0.84).abs() < 1e-9);
        assert!(result.blocked);
        assert_eq!(result.explanation, "deletes a production resource");
    }

    #[tokio::test]
    async fn fails_closed_when_judge_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/judge"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(500)))
            .mount(&server)
            .await;

        let assessor =
            RiskAssessor::new(reqwest::Client::new(), judge_config(server.uri()), risk_config());
        let result = assessor.assess("GET", "https://api.example.com/x", "read").await;

        // heuristic(GET)=0.10 + 0.3 penalty = 0.40
        assert!((result.score - 0.40).abs() < 1e-9);
        assert!(!result.blocked);
    }

    #[tokio::test]
    async fn fails_closed_when_judge_returns_non_2xx() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/judge"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let assessor =
            RiskAssessor::new(reqwest::Client::new(), judge_config(server.uri()), risk_config());
        let result = assessor.assess("DELETE", "https://api.example.com/x", "cleanup").await;

        // heuristic(DELETE)=0.70 + 0.3 penalty, clamped to 1.0
        assert!((result.score - 1.0).abs() < 1e-9);
        assert!(result.blocked);
    }

    #[tokio::test]
    async fn disabled_judge_always_fails_closed() {
        let assessor = RiskAssessor::new(reqwest::Client::new(), judge_config(String::new()), risk_config());
        let result = assessor.assess("HEAD", "https://api.example.com/x", "ping").await;

        // heuristic(HEAD)=0.05 + 0.3 = 0.35, below 0.5 threshold
        assert!((result.score - 0.35).abs() < 1e-9);
        assert!(!result.blocked);
    }
}
