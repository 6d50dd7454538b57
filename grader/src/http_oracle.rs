//! HTTP implementation of [`GradingOracle`].
//!
//! Speaks the JSON contract of the hosted grading endpoint: the request
//! carries the rubric and the raw submission text, the response carries
//! per-criterion scores, a total and feedback. Missing or malformed fields
//! are errors, never defaulted.

use crate::error::OracleError;
use crate::oracle::{GradingOracle, OracleResponse};
use async_trait::async_trait;
use common::Config;
use serde::Serialize;
use store::RubricCriterion;

#[derive(Serialize)]
struct OracleRequest<'a> {
    rubric: Vec<RubricItem<'a>>,
    #[serde(rename = "submissionContent")]
    submission_content: &'a str,
}

#[derive(Serialize)]
struct RubricItem<'a> {
    id: &'a str,
    description: &'a str,
    points: f64,
}

pub struct HttpGradingOracle {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
}

impl HttpGradingOracle {
    pub fn new(endpoint: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
            api_key: api_key.into(),
        }
    }

    /// Build an oracle client from the process-wide [`Config`].
    pub fn from_config(config: &Config) -> Self {
        Self::new(&config.oracle_endpoint, &config.oracle_api_key)
    }
}

/// Strict parse of the oracle reply body.
pub(crate) fn parse_response(body: &str) -> Result<OracleResponse, OracleError> {
    serde_json::from_str::<OracleResponse>(body).map_err(|e| {
        OracleError::MalformedResponse(format!(
            "error decoding response body: {}. Full response: {}",
            e, body
        ))
    })
}

#[async_trait]
impl GradingOracle for HttpGradingOracle {
    async fn grade(
        &self,
        rubric: &[RubricCriterion],
        submission_content: &str,
    ) -> Result<OracleResponse, OracleError> {
        let request_body = OracleRequest {
            rubric: rubric
                .iter()
                .map(|c| RubricItem {
                    id: &c.id,
                    description: &c.description,
                    points: c.max_points,
                })
                .collect(),
            submission_content,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request_body)
            .send()
            .await
            .map_err(|e| OracleError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(OracleError::Transport(format!(
                "oracle returned HTTP {status}"
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| OracleError::Transport(e.to_string()))?;

        parse_response(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn well_formed_response_parses() {
        let body = r#"{
            "score_details": {"a": 50.0, "b": 30.0},
            "total_score": 80.0,
            "feedback": "ok"
        }"#;
        let response = parse_response(body).unwrap();
        assert_eq!(response.total_score, 80.0);
        assert_eq!(response.score_details["a"], 50.0);
        assert_eq!(response.feedback, "ok");
    }

    #[test]
    fn missing_fields_are_malformed_not_defaulted() {
        let missing_feedback = r#"{"score_details": {}, "total_score": 80.0}"#;
        assert!(matches!(
            parse_response(missing_feedback),
            Err(OracleError::MalformedResponse(_))
        ));

        let missing_total = r#"{"score_details": {"a": 1.0}, "feedback": "ok"}"#;
        assert!(matches!(
            parse_response(missing_total),
            Err(OracleError::MalformedResponse(_))
        ));

        assert!(matches!(
            parse_response("not json"),
            Err(OracleError::MalformedResponse(_))
        ));
    }
}
