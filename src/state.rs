//! Shared application state: the prompt set and the optional generator client.
//!
//! Workflow runs themselves are per-connection (see `routes::ws`) and are
//! never stored here: nothing survives a disconnect or reset.

use tracing::{info, instrument};

use crate::config::{load_config_from_env, Prompts};
use crate::openai::OpenAI;

#[derive(Clone)]
pub struct AppState {
  pub openai: Option<OpenAI>,
  pub prompts: Prompts,
}

impl AppState {
  /// Build state from env: load prompt config, init the generator client.
  /// The server runs without OPENAI_API_KEY, but every generation intent will
  /// settle in the error stage; there is no offline fallback.
  #[instrument(level = "info", skip_all)]
  pub fn new() -> Self {
    let prompts = load_config_from_env().map(|c| c.prompts).unwrap_or_default();

    let openai = OpenAI::from_env();
    match &openai {
      Some(oa) => {
        info!(target: "courseloom", base_url = %oa.base_url, model = %oa.model, "Generator enabled")
      }
      None => {
        info!(target: "courseloom", "Generator disabled (no OPENAI_API_KEY); generation intents will fail")
      }
    }

    Self { openai, prompts }
  }
}
