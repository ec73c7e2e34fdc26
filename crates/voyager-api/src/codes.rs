// Application status codes
//
// Every non-streaming endpoint wraps its payload in `{code, message, data}`;
// `code == 0` is the only success value. Translation of the remaining codes
// depends on the backend (auth/chat share one table, billing reports raw
// server errors) and on the operation that produced them.

use std::fmt;

use crate::error::Error;

/// The canonical code set shared by the auth and chat backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseCode {
    Success,
    Error,
    InvalidParams,
    Unauthorized,
    Forbidden,
    NotFound,
    InternalError,
}

impl ResponseCode {
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(Self::Success),
            1 => Some(Self::Error),
            2 => Some(Self::InvalidParams),
            3 => Some(Self::Unauthorized),
            4 => Some(Self::Forbidden),
            5 => Some(Self::NotFound),
            6 => Some(Self::InternalError),
            _ => None,
        }
    }

    pub fn value(self) -> i32 {
        match self {
            Self::Success => 0,
            Self::Error => 1,
            Self::InvalidParams => 2,
            Self::Unauthorized => 3,
            Self::Forbidden => 4,
            Self::NotFound => 5,
            Self::InternalError => 6,
        }
    }
}

/// Returns `true` for the success sentinel.
pub fn is_success(code: i32) -> bool {
    code == ResponseCode::Success.value()
}

// ── Operation-aware translation ─────────────────────────────────────

/// Human label and per-code reason text for one operation.
fn describe(code: i32, operation: &str) -> String {
    let known = ResponseCode::from_code(code);
    let (label, reason) = match operation {
        "login" => (
            "login",
            match known {
                Some(ResponseCode::InvalidParams) => Some("invalid parameters"),
                Some(ResponseCode::Unauthorized) => Some("invalid credentials"),
                Some(ResponseCode::Forbidden) => Some("account disabled"),
                Some(ResponseCode::NotFound) => Some("user does not exist"),
                Some(ResponseCode::InternalError) => Some("internal server error"),
                _ => None,
            },
        ),
        "register" => (
            "register",
            match known {
                Some(ResponseCode::InvalidParams) => Some("invalid parameters"),
                Some(ResponseCode::Error) => Some("account already exists"),
                Some(ResponseCode::Forbidden) => Some("invalid account format"),
                Some(ResponseCode::InternalError) => Some("internal server error"),
                _ => None,
            },
        ),
        "userInfo" => (
            "fetching user info",
            match known {
                Some(ResponseCode::InvalidParams) => Some("invalid parameters"),
                Some(ResponseCode::Unauthorized) => Some("unauthorized"),
                Some(ResponseCode::NotFound) => Some("user does not exist"),
                Some(ResponseCode::InternalError) => Some("internal server error"),
                _ => None,
            },
        ),
        "refreshToken" => (
            "token refresh",
            match known {
                Some(ResponseCode::InvalidParams) => Some("invalid token"),
                Some(ResponseCode::Unauthorized) => Some("token expired"),
                Some(ResponseCode::InternalError) => Some("internal server error"),
                _ => None,
            },
        ),
        "logout" => (
            "logout",
            match known {
                Some(ResponseCode::InvalidParams) => Some("invalid parameters"),
                Some(ResponseCode::Unauthorized) => Some("unauthorized"),
                Some(ResponseCode::InternalError) => Some("internal server error"),
                _ => None,
            },
        ),
        "resetPassword" => (
            "password reset",
            match known {
                Some(ResponseCode::InvalidParams) => Some("invalid parameters"),
                Some(ResponseCode::Unauthorized) => Some("old password incorrect"),
                Some(ResponseCode::NotFound) => Some("user does not exist"),
                Some(ResponseCode::InternalError) => Some("internal server error"),
                _ => None,
            },
        ),
        other => (
            other,
            match known {
                Some(ResponseCode::Success) => Some("unexpected success code"),
                Some(ResponseCode::Error) => Some("operation failed"),
                Some(ResponseCode::InvalidParams) => Some("invalid parameters"),
                Some(ResponseCode::Unauthorized) => Some("unauthorized"),
                Some(ResponseCode::Forbidden) => Some("forbidden"),
                Some(ResponseCode::NotFound) => Some("resource not found"),
                Some(ResponseCode::InternalError) => Some("internal server error"),
                None => None,
            },
        ),
    };

    match reason {
        Some(reason) => format!("{label} failed: {reason}"),
        None => format!("{label} failed: unknown error (code: {code})"),
    }
}

/// Classify an application status code for `operation`.
///
/// Total over `i32`: unknown codes (and a stray `0`) become
/// [`Error::Business`] carrying the raw code.
pub fn classify(code: i32, operation: &str) -> Error {
    let message = describe(code, operation);
    match ResponseCode::from_code(code) {
        Some(ResponseCode::Unauthorized) => Error::Authentication {
            message,
            expired: operation == "refreshToken",
        },
        Some(ResponseCode::InvalidParams) => Error::Validation {
            field: "params".into(),
            message,
        },
        Some(ResponseCode::Forbidden) => Error::Permission {
            message,
            required: None,
        },
        Some(ResponseCode::NotFound) => Error::NotFound { message },
        Some(ResponseCode::InternalError) => Error::Server {
            status: code,
            message,
            details: Some("internal processing error".into()),
        },
        Some(ResponseCode::Error | ResponseCode::Success) | None => Error::Business {
            code: code.to_string(),
            message,
        },
    }
}

/// `Ok(())` for the success sentinel, the classified error otherwise.
pub fn check(code: i32, operation: &str) -> Result<(), Error> {
    if is_success(code) {
        Ok(())
    } else {
        Err(classify(code, operation))
    }
}

// ── Per-backend strategies ──────────────────────────────────────────

/// Turns a non-zero envelope code into an [`Error`].
///
/// One implementation per backend convention; the generic client calls it
/// for every failed envelope so facades never duplicate the mapping.
pub trait CodeTranslator: fmt::Debug + Send + Sync {
    fn translate(&self, code: i32, message: &str, operation: &str) -> Error;
}

/// Canonical table with operation-templated messages (auth and chat).
#[derive(Debug, Clone, Copy, Default)]
pub struct OperationCodes;

impl CodeTranslator for OperationCodes {
    fn translate(&self, code: i32, _message: &str, operation: &str) -> Error {
        classify(code, operation)
    }
}

/// Billing convention: every non-zero code is a server error carrying the
/// backend's own message.
#[derive(Debug, Clone, Copy, Default)]
pub struct ServerCodes;

impl CodeTranslator for ServerCodes {
    fn translate(&self, code: i32, message: &str, operation: &str) -> Error {
        Error::Server {
            status: code,
            message: if message.is_empty() {
                format!("{operation} failed")
            } else {
                message.to_owned()
            },
            details: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCategory;

    #[test]
    fn classify_is_total() {
        let ops = ["login", "register", "refreshToken", "createSession", ""];
        for op in ops {
            for code in (-50..50).chain([i32::MIN, i32::MAX]) {
                let err = classify(code, op);
                assert!(!err.to_string().is_empty());
            }
        }
    }

    #[test]
    fn unauthorized_login_mentions_operation() {
        let err = classify(3, "login");
        assert!(matches!(
            err,
            Error::Authentication { ref message, expired: false } if message.contains("login")
        ));
    }

    #[test]
    fn unauthorized_refresh_marks_token_expired() {
        let err = classify(3, "refreshToken");
        assert!(err.is_auth_expired());
        assert_eq!(
            err.to_string(),
            "authentication failed: token refresh failed: token expired"
        );
    }

    #[test]
    fn canonical_codes_map_to_categories() {
        assert_eq!(classify(1, "x").category(), ErrorCategory::Business);
        assert_eq!(classify(2, "x").category(), ErrorCategory::Validation);
        assert_eq!(classify(4, "x").category(), ErrorCategory::Permission);
        assert_eq!(classify(5, "x").category(), ErrorCategory::NotFound);
        assert_eq!(classify(6, "x").category(), ErrorCategory::Server);
    }

    #[test]
    fn unknown_code_embeds_raw_value() {
        let err = classify(9001, "createSession");
        match err {
            Error::Business { code, message } => {
                assert_eq!(code, "9001");
                assert_eq!(message, "createSession failed: unknown error (code: 9001)");
            }
            other => panic!("expected Business, got {other:?}"),
        }
    }

    #[test]
    fn check_passes_only_zero() {
        assert!(check(0, "login").is_ok());
        assert!(check(2, "login").is_err());
    }

    #[test]
    fn server_codes_keep_backend_message() {
        let err = ServerCodes.translate(1002, "receipt invalid", "verifyAppleReceipt");
        assert!(matches!(
            err,
            Error::Server { status: 1002, ref message, .. } if message == "receipt invalid"
        ));

        let err = ServerCodes.translate(7, "", "getQuotaInfo");
        assert_eq!(err.to_string(), "server error [7]: getQuotaInfo failed");
    }
}
