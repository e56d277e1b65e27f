//! Loading prompt configuration from TOML.
//!
//! Compiled-in defaults cover all four generation calls; a TOML file named by
//! COURSE_CONFIG_PATH may override any of them for prompt tuning without a
//! rebuild. See `Prompts` for the expected schema.

use serde::Deserialize;
use tracing::{error, info};

#[derive(Clone, Debug, Deserialize, Default)]
pub struct AppConfig {
  #[serde(default)]
  pub prompts: Prompts,
}

/// Prompt templates used by the generation gateway. `{key}` placeholders are
/// substituted with `util::fill_template`; the structured calls additionally
/// get the JSON contract appended by the gateway (see `schema`).
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Prompts {
  // Assessment-question generation (structured)
  pub assessment_system: String,
  pub assessment_user_template: String,
  // Learning-style inference (free text)
  pub style_system: String,
  pub style_user_template: String,
  // Course synthesis (structured)
  pub course_system: String,
  pub course_user_template: String,
  // Session-detail expansion (structured)
  pub session_system: String,
  pub session_user_template: String,
}

impl Default for Prompts {
  fn default() -> Self {
    Self {
      assessment_system:
        "You are a course-design assistant. Respond ONLY with a strict JSON object matching the requested schema."
          .into(),
      assessment_user_template:
        "Generate 5 multiple-choice questions to determine a user's preferred learning style (Visual, Auditory, Kinesthetic, Reading/Writing) in the context of learning about \"{topic}\". Each question should have 4 options, each corresponding to one of the learning styles."
          .into(),
      style_system:
        "You classify learning-style questionnaires. Output ONLY the style label, nothing else."
          .into(),
      style_user_template:
        "Based on these answers to a learning style questionnaire, determine the user's primary learning style. The options were designed to correspond to Visual, Auditory, Kinesthetic, and Reading/Writing styles. Tally the answers and determine the dominant style. The answers are: {answers}. Return only one of these values: \"Visual\", \"Auditory\", \"Kinesthetic\", \"Reading/Writing\"."
          .into(),
      course_system:
        "You are a curriculum designer. Respond ONLY with a strict JSON object matching the requested schema."
          .into(),
      course_user_template:
        "Create a detailed course curriculum on the topic of \"{topic}\". The course should be {duration_in_weeks} weeks long and tailored for a {difficulty} level learner. The curriculum MUST be personalized for a \"{learning_style}\" learning style. The course structure should be: a main \"title\" for the course, the identified \"learningStyle\", and a list of \"modules\" where each module represents a week. Each module has a \"title\" and a list of \"lessons\"; each lesson has a \"title\" and a list of \"sessions\"; each session has a \"title\" and a brief \"content\" description (1-2 sentences) of what the session covers, tailored to the learning style."
          .into(),
      session_system:
        "You are a learning-content author. Respond ONLY with a strict JSON object matching the requested schema."
          .into(),
      session_user_template:
        "Generate the content for a single learning session.\nCourse: \"{course_title}\"\nModule: \"{module_title}\"\nLesson: \"{lesson_title}\"\nSession: \"{session_title}\"\nThe content MUST be tailored for a \"{learning_style}\" learner.\nProvide: \"keyConcepts\" (the most important concepts), \"learningObjective\" (what the learner should be able to do afterwards), \"sessionContent\" (a detailed, multi-paragraph markdown explanation written for the learning style), \"activity\" (a practical activity with a title and description, tailored to the learning style), and \"mindMap\" (a hierarchical mind map of the session's key concepts, rooted at the session title, with nested children)."
          .into(),
    }
  }
}

/// Attempt to load `AppConfig` from COURSE_CONFIG_PATH.
/// On any parsing/IO error, returns None and the defaults apply.
pub fn load_config_from_env() -> Option<AppConfig> {
  let path = std::env::var("COURSE_CONFIG_PATH").ok()?;
  match std::fs::read_to_string(&path) {
    Ok(s) => match toml::from_str::<AppConfig>(&s) {
      Ok(cfg) => {
        info!(target: "courseloom", %path, "Loaded prompt config (TOML)");
        Some(cfg)
      }
      Err(e) => {
        error!(target: "courseloom", %path, error = %e, "Failed to parse TOML config");
        None
      }
    },
    Err(e) => {
      error!(target: "courseloom", %path, error = %e, "Failed to read TOML config file");
      None
    }
  }
}
