use serde::de::DeserializeOwned;

use super::transport::ApiResponse;
use crate::error::{ClientError, Result};

/// Outcome of a call that did not fail outright.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classified {
    Success(String),
    /// 404: the record does not exist (or a patch `test` op did not hold).
    Absent,
}

impl Classified {
    pub fn into_body(self) -> Option<String> {
        match self {
            Classified::Success(body) => Some(body),
            Classified::Absent => None,
        }
    }
}

pub fn classify(response: ApiResponse) -> Result<Classified> {
    match response.status {
        200 | 201 => Ok(Classified::Success(response.body)),
        404 => Ok(Classified::Absent),
        status => {
            tracing::debug!(status, "unexpected azure devops status");
            Err(ClientError::UnexpectedStatus {
                status,
                reason: response.body,
            })
        }
    }
}

pub fn parse_json<T: DeserializeOwned>(body: &str, context: &'static str) -> Result<T> {
    serde_json::from_str(body).map_err(|source| ClientError::Decode { context, source })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ok_and_created_are_success() {
        assert_eq!(
            classify(ApiResponse::new(200, "a")).unwrap(),
            Classified::Success("a".into())
        );
        assert_eq!(
            classify(ApiResponse::new(201, "b")).unwrap(),
            Classified::Success("b".into())
        );
    }

    #[test]
    fn not_found_is_absence() {
        assert_eq!(classify(ApiResponse::new(404, "gone")).unwrap(), Classified::Absent);
    }

    #[test]
    fn other_statuses_carry_raw_body() {
        let body = r#"{"message":"TF400813: not authorized"}"#;
        for status in [204, 401, 412, 500] {
            let err = classify(ApiResponse::new(status, body)).unwrap_err();
            assert_eq!(err.reason(), Some(body));
            assert!(err.to_string().contains(&status.to_string()));
        }
    }

    #[test]
    fn parse_errors_name_the_document() {
        let err = parse_json::<serde_json::Value>("{not json", "work item").unwrap_err();
        assert!(err.to_string().starts_with("Failed to parse work item"));
    }
}
