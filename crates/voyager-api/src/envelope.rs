// `{code, message, data}` response envelope
//
// Decoded in two steps: the outer envelope first (with `data` kept as raw
// JSON), so a failure code is reported even when the failure body's `data`
// would not match the success schema.

use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::codes::{CodeTranslator, is_success};
use crate::error::{Error, preview};

/// Uniform wrapper returned by every non-streaming endpoint.
///
/// Missing fields take their defaults; the billing backend spells
/// `message` as `msg` and adds a `timestamp`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResponseEnvelope {
    #[serde(default)]
    pub code: i32,
    #[serde(default, alias = "msg")]
    pub message: String,
    #[serde(default)]
    pub data: Option<Value>,
    #[serde(default)]
    pub timestamp: Option<i64>,
}

impl ResponseEnvelope {
    /// Parse the outer envelope from a response body.
    pub fn parse(body: &str) -> Result<Self, Error> {
        serde_json::from_str(body).map_err(|e| Error::Parse {
            message: e.to_string(),
            body: preview(body).to_owned(),
        })
    }

    pub fn is_success(&self) -> bool {
        is_success(self.code)
    }

    /// Translate a failure code, or decode the payload on success.
    ///
    /// A JSON `null` or absent `data` yields `Ok(None)`.
    pub fn into_result<T: DeserializeOwned>(
        self,
        operation: &str,
        translator: &dyn CodeTranslator,
    ) -> Result<Option<T>, Error> {
        if !self.is_success() {
            return Err(translator.translate(self.code, &self.message, operation));
        }

        match self.data {
            None | Some(Value::Null) => Ok(None),
            Some(data) => {
                let text = data.to_string();
                serde_json::from_value(data)
                    .map(Some)
                    .map_err(|e| Error::Parse {
                        message: format!("{operation}: {e}"),
                        body: preview(&text).to_owned(),
                    })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde::Deserialize;

    use super::*;
    use crate::codes::{OperationCodes, ServerCodes};

    #[derive(Debug, Deserialize, PartialEq)]
    struct Token {
        token: String,
    }

    #[test]
    fn success_envelope_yields_payload() {
        let env = ResponseEnvelope::parse(r#"{"code":0,"message":"ok","data":{"token":"t1"}}"#)
            .expect("parse");
        let token: Option<Token> = env.into_result("login", &OperationCodes).expect("ok");
        assert_eq!(token, Some(Token { token: "t1".into() }));
    }

    #[test]
    fn missing_code_means_success() {
        let env = ResponseEnvelope::parse(r#"{"data":null}"#).expect("parse");
        let out: Option<Token> = env.into_result("health", &OperationCodes).expect("ok");
        assert_eq!(out, None);
    }

    #[test]
    fn failure_code_wins_over_mismatched_data() {
        let env = ResponseEnvelope::parse(r#"{"code":3,"message":"no","data":"oops"}"#)
            .expect("parse");
        let err = env
            .into_result::<Token>("login", &OperationCodes)
            .expect_err("code 3");
        assert!(matches!(err, Error::Authentication { .. }));
    }

    #[test]
    fn billing_msg_alias_feeds_server_codes() {
        let env = ResponseEnvelope::parse(
            r#"{"code":40001,"msg":"receipt invalid","data":null,"timestamp":1700000000}"#,
        )
        .expect("parse");
        assert_eq!(env.timestamp, Some(1_700_000_000));
        let err = env
            .into_result::<Token>("verifyAppleReceipt", &ServerCodes)
            .expect_err("non-zero");
        assert_eq!(err.to_string(), "server error [40001]: receipt invalid");
    }

    #[test]
    fn malformed_body_is_parse_error() {
        let err = ResponseEnvelope::parse("<html>bad gateway</html>").expect_err("not json");
        assert!(matches!(err, Error::Parse { ref body, .. } if body.starts_with("<html>")));
    }

    #[test]
    fn schema_mismatch_in_data_is_parse_error() {
        let env = ResponseEnvelope::parse(r#"{"code":0,"data":{"token":7}}"#).expect("parse");
        let err = env
            .into_result::<Token>("login", &OperationCodes)
            .expect_err("wrong type");
        assert!(matches!(err, Error::Parse { ref message, .. } if message.starts_with("login")));
    }
}
