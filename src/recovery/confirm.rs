//! Confirmation providers
//!
//! The recovery engine never talks to a terminal. It asks an injected
//! [`Confirmation`] for a token and proceeds only when that token is the
//! literal `yes`.

use std::io::{self, BufRead, Write};

use chrono::{DateTime, Utc};

use crate::environment::Environment;

/// The only token that authorizes a destructive restore
pub const CONFIRMATION_TOKEN: &str = "yes";

/// What the operator is being asked to approve
#[derive(Debug, Clone)]
pub struct ConfirmationRequest {
    pub environment: Environment,
    pub namespace: String,
    /// Backup key or safety snapshot key being restored
    pub source_key: String,
    pub source_taken_at: DateTime<Utc>,
}

impl ConfirmationRequest {
    /// Warning shown before asking
    pub fn warning(&self) -> String {
        format!(
            "WARNING: this will overwrite the live state of {} ({}) with {} taken {}.\n\
             A safety snapshot of the current state is taken first.",
            self.environment,
            self.namespace,
            self.source_key,
            self.source_taken_at.format("%Y-%m-%d %H:%M:%S UTC"),
        )
    }
}

/// Source of the confirmation token
pub trait Confirmation {
    /// The token supplied by the operator, `None` if none was given
    fn confirm(&self, request: &ConfirmationRequest) -> Option<String>;
}

/// Whether a supplied token authorizes the restore
pub fn is_confirmed(token: Option<&str>) -> bool {
    token == Some(CONFIRMATION_TOKEN)
}

/// Interactive prompt on stdin/stderr
#[derive(Debug, Default)]
pub struct TerminalPrompt;

impl Confirmation for TerminalPrompt {
    fn confirm(&self, request: &ConfirmationRequest) -> Option<String> {
        let mut stderr = io::stderr();
        let _ = writeln!(stderr, "{}", request.warning());
        let _ = write!(stderr, "Type '{}' to continue: ", CONFIRMATION_TOKEN);
        let _ = stderr.flush();

        let mut input = String::new();
        match io::stdin().lock().read_line(&mut input) {
            Ok(0) | Err(_) => None,
            Ok(_) => Some(input.trim_end_matches(['\r', '\n']).to_string()),
        }
    }
}

/// Token supplied up front, for automation
#[derive(Debug, Clone)]
pub struct PresuppliedToken(pub String);

impl Confirmation for PresuppliedToken {
    fn confirm(&self, _request: &ConfirmationRequest) -> Option<String> {
        Some(self.0.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn request() -> ConfirmationRequest {
        ConfirmationRequest {
            environment: Environment::Production,
            namespace: "shop/production".into(),
            source_key: "shop-production-20250101-120000".into(),
            source_taken_at: Utc.with_ymd_and_hms(2025, 1, 1, 12, 0, 0).unwrap(),
        }
    }

    #[test]
    fn test_only_literal_yes_confirms() {
        assert!(is_confirmed(Some("yes")));
        for token in [None, Some("y"), Some("YES"), Some("Yes"), Some(" yes"), Some("")] {
            assert!(!is_confirmed(token), "{:?} must not confirm", token);
        }
    }

    #[test]
    fn test_presupplied_token() {
        let provider = PresuppliedToken("yes".into());
        assert_eq!(provider.confirm(&request()).as_deref(), Some("yes"));
    }

    #[test]
    fn test_warning_names_source_and_namespace() {
        let warning = request().warning();
        assert!(warning.contains("shop/production"));
        assert!(warning.contains("shop-production-20250101-120000"));
    }
}
