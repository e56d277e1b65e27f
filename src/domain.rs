//! Domain models: course parameters, assessment questions, the course tree,
//! session detail, and the session addressing context.
//!
//! Everything here is an immutable value record produced by a generation call;
//! the workflow never mutates these in place, only replaces them wholesale on
//! a stage transition. Field names follow the generator wire contract
//! (camelCase), so these types double as the decode targets for raw model
//! output, which is why every nested list carries `#[serde(default)]`: an
//! absent array decodes as empty, never as a traversal hazard.

use serde::{Deserialize, Serialize};

/// Course difficulty requested by the user.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Difficulty {
  Beginner,
  Intermediate,
  Advanced,
  Expert,
}

impl Difficulty {
  pub fn label(self) -> &'static str {
    match self {
      Difficulty::Beginner => "Beginner",
      Difficulty::Intermediate => "Intermediate",
      Difficulty::Advanced => "Advanced",
      Difficulty::Expert => "Expert",
    }
  }
}

/// The four learning styles the assessment distinguishes.
/// Wire label for `ReadingWriting` keeps the slash: "Reading/Writing".
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum LearningStyle {
  Visual,
  Auditory,
  Kinesthetic,
  #[serde(rename = "Reading/Writing")]
  ReadingWriting,
}

pub const ALL_STYLES: [LearningStyle; 4] = [
  LearningStyle::Visual,
  LearningStyle::Auditory,
  LearningStyle::Kinesthetic,
  LearningStyle::ReadingWriting,
];

impl LearningStyle {
  pub fn label(self) -> &'static str {
    match self {
      LearningStyle::Visual => "Visual",
      LearningStyle::Auditory => "Auditory",
      LearningStyle::Kinesthetic => "Kinesthetic",
      LearningStyle::ReadingWriting => "Reading/Writing",
    }
  }

  /// Total matching policy for a free-text style-inference response.
  ///
  /// Applied in order: (1) exact label match; (2) case-insensitive substring
  /// match on the label text before any "/" (so "reading" matches
  /// "Reading/Writing"); (3) default to Visual. Never fails; the `defaulted`
  /// flag on the result makes the fallback path observable.
  pub fn from_response(text: &str) -> StyleInference {
    let trimmed = text.trim();
    for style in ALL_STYLES {
      if trimmed == style.label() {
        return StyleInference { style, defaulted: false };
      }
    }
    let lower = trimmed.to_lowercase();
    for style in ALL_STYLES {
      let key = style.label().split('/').next().unwrap_or_default().to_lowercase();
      if !key.is_empty() && lower.contains(&key) {
        return StyleInference { style, defaulted: false };
      }
    }
    StyleInference { style: LearningStyle::Visual, defaulted: true }
  }
}

/// Outcome of style inference: the style plus whether the Visual fallback was
/// taken because the response matched nothing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct StyleInference {
  pub style: LearningStyle,
  pub defaulted: bool,
}

/// User input that seeds a workflow run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseParams {
  pub topic: String,
  pub duration_in_weeks: u32,
  pub difficulty: Difficulty,
}

impl CourseParams {
  /// Topic must be non-empty and duration within one year of weeks.
  pub fn validate(&self) -> Result<(), String> {
    if self.topic.trim().is_empty() {
      return Err("Topic must not be empty.".into());
    }
    if !(1..=52).contains(&self.duration_in_weeks) {
      return Err("Duration must be between 1 and 52 weeks.".into());
    }
    Ok(())
  }
}

/// One multiple-choice question of the learning-style assessment.
/// Each of the 4 options corresponds to one learning style.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AssessmentQuestion {
  pub question: String,
  #[serde(default)]
  pub options: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Session {
  pub title: String,
  #[serde(default)]
  pub content: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Lesson {
  pub title: String,
  #[serde(default)]
  pub sessions: Vec<Session>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Module {
  pub title: String,
  #[serde(default)]
  pub lessons: Vec<Lesson>,
}

/// Root artifact of the main workflow. Immutable once generated; held until
/// reset. Module order reflects the week sequence and is preserved exactly as
/// generated.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Course {
  pub title: String,
  pub learning_style: LearningStyle,
  #[serde(default)]
  pub modules: Vec<Module>,
}

/// Fully-qualified pointer to one session, built from title strings at the
/// moment of selection. Re-generative addressing: the context is re-sent to
/// the generator, never used to look up a cached object, so identical title
/// paths are an accepted ambiguity.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveSessionContext {
  pub course_title: String,
  pub learning_style: LearningStyle,
  pub module_title: String,
  pub lesson_title: String,
  pub session_title: String,
}

impl ActiveSessionContext {
  /// Resolve a user's selection into a request context. Pure and infallible;
  /// titles are opaque text, not validated for uniqueness.
  pub fn for_selection(
    course: &Course,
    module_title: &str,
    lesson_title: &str,
    session_title: &str,
  ) -> Self {
    Self {
      course_title: course.title.clone(),
      learning_style: course.learning_style,
      module_title: module_title.to_string(),
      lesson_title: lesson_title.to_string(),
      session_title: session_title.to_string(),
    }
  }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Activity {
  pub title: String,
  #[serde(default)]
  pub description: String,
}

/// Recursive concept tree for one session. Generator output is untrusted:
/// consumers cap the depth via `pruned` before storing.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MindMapNode {
  pub name: String,
  #[serde(default)]
  pub children: Vec<MindMapNode>,
}

/// Maximum mind-map nesting we keep. The contract asks the generator for
/// shallow nesting but does not enforce a bound, so we enforce one here.
pub const MIND_MAP_DEPTH_CAP: usize = 6;

impl MindMapNode {
  /// Copy of the tree with everything below `depth_cap` levels dropped.
  /// A cap of 1 keeps only the root.
  pub fn pruned(&self, depth_cap: usize) -> MindMapNode {
    let children = if depth_cap <= 1 {
      Vec::new()
    } else {
      self.children.iter().map(|c| c.pruned(depth_cap - 1)).collect()
    };
    MindMapNode { name: self.name.clone(), children }
  }

  pub fn depth(&self) -> usize {
    1 + self.children.iter().map(MindMapNode::depth).max().unwrap_or(0)
  }
}

/// On-demand expansion of one session. Generated per visit, never cached;
/// re-selecting the same session issues a fresh generation call.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionDetails {
  #[serde(default)]
  pub key_concepts: Vec<String>,
  pub learning_objective: String,
  pub session_content: String,
  pub activity: Activity,
  pub mind_map: MindMapNode,
}
