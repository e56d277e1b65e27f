//! The workflow state machine: stages, events, and the pure transition
//! function.
//!
//! Each `Stage` variant carries exactly the data that stage owns, so the
//! "required prior-stage data is held" invariants are structural: there is no
//! way to sit in `CourseView` without a course. Prior values are dropped on
//! transition, never retained alongside the new stage.
//!
//! `apply` is total and pure. Unknown (stage, event) pairs are no-ops, which
//! is also how the concurrency guard works: the `Generating*` stages ignore
//! every user intent, so a trigger received while a call is in flight is
//! silently dropped (no queuing, no cancellation). The async driver in
//! `logic` is the only place that turns gateway outcomes into events, and it
//! runs one call at a time.

use uuid::Uuid;

use crate::domain::{
  ActiveSessionContext, AssessmentQuestion, Course, CourseParams, SessionDetails,
};
use crate::error::GenerationError;

#[derive(Clone, Debug, PartialEq)]
pub enum Stage {
  Input,
  GeneratingAssessment {
    params: CourseParams,
  },
  Assessment {
    params: CourseParams,
    questions: Vec<AssessmentQuestion>,
  },
  GeneratingCourse {
    params: CourseParams,
  },
  CourseView {
    course: Course,
  },
  GeneratingSession {
    course: Course,
    context: ActiveSessionContext,
  },
  SessionView {
    course: Course,
    context: ActiveSessionContext,
    details: SessionDetails,
  },
  /// Terminal until reset. `course` is retained only when the failure
  /// happened during session-detail generation; in that case `Back` recovers
  /// to `CourseView`, otherwise full reset is the only exit.
  Error {
    message: String,
    course: Option<Course>,
  },
}

impl Stage {
  pub fn name(&self) -> &'static str {
    match self {
      Stage::Input => "input",
      Stage::GeneratingAssessment { .. } => "generating_assessment",
      Stage::Assessment { .. } => "assessment",
      Stage::GeneratingCourse { .. } => "generating_course",
      Stage::CourseView { .. } => "course_view",
      Stage::GeneratingSession { .. } => "generating_session",
      Stage::SessionView { .. } => "session_view",
      Stage::Error { .. } => "error",
    }
  }

  /// True while a generation call is outstanding. At most one is ever in
  /// flight: the driver settles the current one before accepting anything.
  pub fn busy(&self) -> bool {
    matches!(
      self,
      Stage::GeneratingAssessment { .. }
        | Stage::GeneratingCourse { .. }
        | Stage::GeneratingSession { .. }
    )
  }
}

#[derive(Clone, Debug)]
pub enum Event {
  // User intents, forwarded by the presentation layer.
  ParamsSubmitted(CourseParams),
  AnswersSubmitted(Vec<String>),
  SessionSelected {
    module_title: String,
    lesson_title: String,
    session_title: String,
  },
  Back,
  Reset,
  // Gateway outcomes, produced by the async driver.
  QuestionsReady(Vec<AssessmentQuestion>),
  CourseReady(Course),
  DetailsReady(SessionDetails),
  GenerationFailed(String),
}

/// The pure transition function: `(stage, event) -> stage`.
pub fn apply(stage: Stage, event: Event) -> Stage {
  use Event::*;
  use Stage::*;

  match (stage, event) {
    // Reset clears everything from anywhere.
    (_, Reset) => Input,

    // Input → assessment generation.
    (Input, ParamsSubmitted(params)) => GeneratingAssessment { params },

    // Assessment generation settles.
    (GeneratingAssessment { params }, QuestionsReady(questions)) => {
      Assessment { params, questions }
    }
    (GeneratingAssessment { .. }, GenerationFailed(message)) => Error { message, course: None },

    // Answers submitted: exactly one answer per question, same order.
    // A mismatched count is an invariant violation, not a silent accept.
    (Assessment { params, questions }, AnswersSubmitted(answers)) => {
      if answers.len() != questions.len() {
        Error {
          message: format!(
            "Expected {} answers but received {}. Please start over.",
            questions.len(),
            answers.len()
          ),
          course: None,
        }
      } else {
        GeneratingCourse { params }
      }
    }
    // Stale trigger: answers without held parameters.
    (Input, AnswersSubmitted(_)) => Error {
      message: GenerationError::MissingPrerequisite("Course parameters").user_message(),
      course: None,
    },

    // Course generation settles.
    (GeneratingCourse { .. }, CourseReady(course)) => CourseView { course },
    (GeneratingCourse { .. }, GenerationFailed(message)) => Error { message, course: None },

    // Session selection: resolve the click into a fully-qualified context.
    (
      CourseView { course },
      SessionSelected { module_title, lesson_title, session_title },
    ) => {
      let context = ActiveSessionContext::for_selection(
        &course,
        &module_title,
        &lesson_title,
        &session_title,
      );
      GeneratingSession { course, context }
    }
    // Stale trigger: selection without a held course.
    (Input, SessionSelected { .. }) | (Assessment { .. }, SessionSelected { .. }) => Error {
      message: "Course data is missing. Please start over.".into(),
      course: None,
    },

    // Session generation settles. On failure the course survives so the user
    // can go back instead of losing the whole run.
    (GeneratingSession { course, context }, DetailsReady(details)) => {
      SessionView { course, context, details }
    }
    (GeneratingSession { course, .. }, GenerationFailed(message)) => {
      Error { message, course: Some(course) }
    }

    // Back: session view returns to the course; an error that still holds the
    // course may recover to it. Context and details are dropped either way.
    (SessionView { course, .. }, Back) => CourseView { course },
    (Error { course: Some(course), .. }, Back) => CourseView { course },

    // Everything else is a no-op: user intents during Generating* stages
    // (the busy guard), repeated triggers, and out-of-order gateway outcomes.
    (stage, _) => stage,
  }
}

/// One workflow run: current stage plus a run id for log correlation.
#[derive(Clone, Debug)]
pub struct Workflow {
  pub run_id: Uuid,
  pub stage: Stage,
}

impl Default for Workflow {
  fn default() -> Self {
    Self::new()
  }
}

impl Workflow {
  pub fn new() -> Self {
    Self { run_id: Uuid::new_v4(), stage: Stage::Input }
  }

  pub fn busy(&self) -> bool {
    self.stage.busy()
  }

  /// Advance the machine, logging the transition.
  pub fn dispatch(&mut self, event: Event) {
    let from = self.stage.name();
    let stage = std::mem::replace(&mut self.stage, Stage::Input);
    self.stage = apply(stage, event);
    let to = self.stage.name();
    if from == to {
      tracing::debug!(target: "workflow", run_id = %self.run_id, stage = from, "Event ignored");
    } else {
      tracing::info!(target: "workflow", run_id = %self.run_id, from, to, "Stage transition");
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::domain::{Activity, Difficulty, LearningStyle, Lesson, MindMapNode, Module, Session};

  fn params() -> CourseParams {
    CourseParams {
      topic: "Quantum Computing".into(),
      duration_in_weeks: 8,
      difficulty: Difficulty::Beginner,
    }
  }

  fn questions(n: usize) -> Vec<AssessmentQuestion> {
    (0..n)
      .map(|i| AssessmentQuestion {
        question: format!("Q{i}"),
        options: vec!["a".into(), "b".into(), "c".into(), "d".into()],
      })
      .collect()
  }

  fn course() -> Course {
    Course {
      title: "Quantum Computing Fundamentals".into(),
      learning_style: LearningStyle::Auditory,
      modules: vec![Module {
        title: "Week 1: Foundations".into(),
        lessons: vec![Lesson {
          title: "Qubits".into(),
          sessions: vec![Session {
            title: "Superposition".into(),
            content: "What superposition means.".into(),
          }],
        }],
      }],
    }
  }

  fn details() -> SessionDetails {
    SessionDetails {
      key_concepts: vec!["superposition".into()],
      learning_objective: "Explain superposition.".into(),
      session_content: "## Superposition\n...".into(),
      activity: Activity { title: "Coin demo".into(), description: "Flip it.".into() },
      mind_map: MindMapNode { name: "Superposition".into(), children: vec![] },
    }
  }

  fn select_first() -> Event {
    Event::SessionSelected {
      module_title: "Week 1: Foundations".into(),
      lesson_title: "Qubits".into(),
      session_title: "Superposition".into(),
    }
  }

  #[test]
  fn happy_path_end_to_end() {
    let mut s = Stage::Input;
    s = apply(s, Event::ParamsSubmitted(params()));
    assert!(matches!(s, Stage::GeneratingAssessment { .. }));
    assert!(s.busy());

    s = apply(s, Event::QuestionsReady(questions(5)));
    assert!(matches!(&s, Stage::Assessment { questions, .. } if questions.len() == 5));
    assert!(!s.busy());

    s = apply(s, Event::AnswersSubmitted(vec!["a".into(); 5]));
    assert!(matches!(s, Stage::GeneratingCourse { .. }));

    s = apply(s, Event::CourseReady(course()));
    assert!(matches!(&s, Stage::CourseView { course } if course.learning_style == LearningStyle::Auditory));

    s = apply(s, Event::SessionSelected {
      module_title: "Week 1: Foundations".into(),
      lesson_title: "Qubits".into(),
      session_title: "Superposition".into(),
    });
    match &s {
      Stage::GeneratingSession { context, .. } => {
        assert_eq!(context.course_title, "Quantum Computing Fundamentals");
        assert_eq!(context.learning_style, LearningStyle::Auditory);
        assert_eq!(context.module_title, "Week 1: Foundations");
        assert_eq!(context.lesson_title, "Qubits");
        assert_eq!(context.session_title, "Superposition");
      }
      other => panic!("expected GeneratingSession, got {}", other.name()),
    }

    s = apply(s, Event::DetailsReady(details()));
    assert!(matches!(&s, Stage::SessionView { details, .. } if !details.key_concepts.is_empty()));
    assert!(!s.busy());
  }

  #[test]
  fn user_intents_are_ignored_while_busy() {
    let busy = apply(Stage::Input, Event::ParamsSubmitted(params()));
    assert!(busy.busy());
    let after = apply(busy.clone(), Event::ParamsSubmitted(params()));
    assert_eq!(after, busy);
    let after = apply(busy.clone(), Event::AnswersSubmitted(vec!["a".into(); 5]));
    assert_eq!(after, busy);
    let after = apply(busy.clone(), Event::Back);
    assert_eq!(after, busy);
    let after = apply(busy.clone(), Event::SessionSelected {
      module_title: "m".into(),
      lesson_title: "l".into(),
      session_title: "s".into(),
    });
    assert_eq!(after, busy);
  }

  #[test]
  fn answer_count_mismatch_is_not_silently_accepted() {
    let s = Stage::Assessment { params: params(), questions: questions(5) };
    let s = apply(s, Event::AnswersSubmitted(vec!["a".into(); 3]));
    match s {
      Stage::Error { message, course } => {
        assert!(message.contains("Expected 5 answers but received 3"));
        assert!(course.is_none());
      }
      other => panic!("expected Error, got {}", other.name()),
    }
  }

  #[test]
  fn answers_without_parameters_is_a_prerequisite_error() {
    let s = apply(Stage::Input, Event::AnswersSubmitted(vec!["a".into()]));
    match s {
      Stage::Error { message, .. } => assert!(message.contains("Course parameters missing")),
      other => panic!("expected Error, got {}", other.name()),
    }
  }

  #[test]
  fn session_selection_without_a_course_is_a_data_missing_error() {
    let s = apply(Stage::Input, select_first());
    assert!(matches!(&s, Stage::Error { message, .. } if message.contains("Course data is missing")));
    let s = apply(
      Stage::Assessment { params: params(), questions: questions(5) },
      select_first(),
    );
    assert!(matches!(s, Stage::Error { .. }));
  }

  #[test]
  fn assessment_failure_loses_nothing_but_offers_only_reset() {
    let s = apply(Stage::GeneratingAssessment { params: params() }, Event::GenerationFailed(
      "The generator returned an invalid response format. Please try again.".into(),
    ));
    let Stage::Error { ref course, .. } = s else { panic!("expected Error") };
    assert!(course.is_none());
    // Back does nothing without a retained course.
    let s2 = apply(s.clone(), Event::Back);
    assert_eq!(s2, s);
    // Reset returns exactly to Input.
    assert_eq!(apply(s, Event::Reset), Stage::Input);
  }

  #[test]
  fn session_failure_retains_the_course_and_back_recovers() {
    let ctx = crate::domain::ActiveSessionContext::for_selection(
      &course(),
      "Week 1: Foundations",
      "Qubits",
      "Superposition",
    );
    let s = apply(
      Stage::GeneratingSession { course: course(), context: ctx },
      Event::GenerationFailed("boom".into()),
    );
    let Stage::Error { course: Some(_), ref message } = s else {
      panic!("expected Error holding the course")
    };
    assert_eq!(message, "boom");
    let s = apply(s, Event::Back);
    assert!(matches!(&s, Stage::CourseView { course } if course.title.starts_with("Quantum")));
  }

  #[test]
  fn back_from_session_view_drops_context_and_details() {
    let ctx = crate::domain::ActiveSessionContext::for_selection(
      &course(),
      "Week 1: Foundations",
      "Qubits",
      "Superposition",
    );
    let s = Stage::SessionView { course: course(), context: ctx, details: details() };
    let s = apply(s, Event::Back);
    assert_eq!(s, Stage::CourseView { course: course() });
  }

  #[test]
  fn reselecting_a_session_rebuilds_an_equal_context() {
    // Selecting, going back, and reselecting issues a fresh generation each
    // time (no caching); the two contexts are value-equal.
    let s = Stage::CourseView { course: course() };
    let first = apply(s, select_first());
    let Stage::GeneratingSession { context: ctx1, .. } = first.clone() else { panic!() };
    let s = apply(first, Event::DetailsReady(details()));
    let s = apply(s, Event::Back);
    let second = apply(s, select_first());
    let Stage::GeneratingSession { context: ctx2, .. } = second else { panic!() };
    assert_eq!(ctx1, ctx2);
  }

  #[test]
  fn reset_clears_every_stage() {
    let stages = vec![
      Stage::Input,
      Stage::GeneratingAssessment { params: params() },
      Stage::Assessment { params: params(), questions: questions(5) },
      Stage::GeneratingCourse { params: params() },
      Stage::CourseView { course: course() },
      Stage::SessionView {
        course: course(),
        context: crate::domain::ActiveSessionContext::for_selection(&course(), "m", "l", "s"),
        details: details(),
      },
      Stage::Error { message: "x".into(), course: Some(course()) },
    ];
    for s in stages {
      assert_eq!(apply(s, Event::Reset), Stage::Input);
    }
  }

  #[test]
  fn workflow_dispatch_tracks_the_stage() {
    let mut wf = Workflow::new();
    assert!(!wf.busy());
    wf.dispatch(Event::ParamsSubmitted(params()));
    assert!(wf.busy());
    assert_eq!(wf.stage.name(), "generating_assessment");
    wf.dispatch(Event::QuestionsReady(questions(5)));
    assert!(!wf.busy());
    assert_eq!(wf.stage.name(), "assessment");
    wf.dispatch(Event::Reset);
    assert_eq!(wf.stage, Stage::Input);
  }
}
