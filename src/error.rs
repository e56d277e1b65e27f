//! Typed failures raised by the generation gateway and the workflow guards.
//!
//! The workflow state machine is the sole error handler: gateway operations
//! only propagate. Raw generator payloads are kept on the error for logging
//! but are never forwarded verbatim to the client; `user_message` is what the
//! presentation layer shows.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum GenerationError {
  /// The generator's response could not be parsed into the expected contract.
  /// `raw` is the original response text, preserved for diagnostics.
  #[error("invalid generator response format: {source}")]
  Format {
    source: serde_json::Error,
    raw: String,
  },

  /// Structurally valid but semantically empty result (e.g. zero questions).
  #[error("generator returned an empty {what}")]
  Empty { what: &'static str },

  /// Required prior-stage data was absent. An internal invariant violation,
  /// not a generator fault.
  #[error("missing prerequisite: {0}")]
  MissingPrerequisite(&'static str),

  /// Transport or upstream API failure (HTTP error, timeout, no client).
  #[error("{0}")]
  Upstream(String),
}

impl GenerationError {
  /// Message shown to the end user. Generic for format problems; specific for
  /// invariant violations so a control-flow bug is distinguishable.
  pub fn user_message(&self) -> String {
    match self {
      GenerationError::Format { .. } => {
        "The generator returned an invalid response format. Please try again.".into()
      }
      GenerationError::Empty { what } => format!("Could not generate {what}."),
      GenerationError::MissingPrerequisite(what) => {
        format!("{what} missing. Please start over.")
      }
      GenerationError::Upstream(msg) => {
        if msg.is_empty() {
          "An unknown error occurred. Please try again.".into()
        } else {
          msg.clone()
        }
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn format_error_hides_raw_payload_from_user() {
    let source = serde_json::from_str::<serde_json::Value>("not json").unwrap_err();
    let err = GenerationError::Format { source, raw: "secret raw body".into() };
    let msg = err.user_message();
    assert!(!msg.contains("secret"));
    assert!(msg.contains("invalid response format"));
  }

  #[test]
  fn upstream_error_passes_message_through() {
    assert_eq!(GenerationError::Upstream("HTTP 500".into()).user_message(), "HTTP 500");
    let generic = GenerationError::Upstream(String::new()).user_message();
    assert!(generic.contains("unknown error"));
  }

  #[test]
  fn missing_prerequisite_names_the_gap() {
    let msg = GenerationError::MissingPrerequisite("Course parameters").user_message();
    assert_eq!(msg, "Course parameters missing. Please start over.");
  }
}
