//! Public protocol structs for WebSocket and HTTP endpoints (serde ready).
//! Keep this small and stable to evolve backend and frontend independently.
//!
//! The WebSocket contract: the client sends user intents, the server answers
//! with stage snapshots. A snapshot is emitted when a generating stage is
//! entered and again when it settles, so the client can render its busy
//! indicator purely from the stage tag.

use serde::{Deserialize, Serialize};

use crate::domain::{
  ActiveSessionContext, AssessmentQuestion, Course, CourseParams, LearningStyle, SessionDetails,
};
use crate::workflow::Stage;

/// Messages the client can send over WebSocket.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientWsMessage {
  Ping,
  SubmitParams {
    params: CourseParams,
  },
  SubmitAnswers {
    answers: Vec<String>,
  },
  SelectSession {
    #[serde(rename = "moduleTitle")]
    module_title: String,
    #[serde(rename = "lessonTitle")]
    lesson_title: String,
    #[serde(rename = "sessionTitle")]
    session_title: String,
  },
  Back,
  Reset,
}

/// Messages the server sends back over WebSocket.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerWsMessage {
  Pong,
  Stage { stage: StageOut },
  /// Protocol-level rejection (invalid JSON, invalid params). Does not change
  /// the workflow stage.
  Error { message: String },
}

/// Wire snapshot of the current workflow stage. Generating stages carry just
/// enough for a progress message; data stages carry the stage's payload.
#[derive(Debug, Serialize)]
#[serde(tag = "stage", rename_all = "snake_case")]
pub enum StageOut {
  Input,
  GeneratingAssessment {
    topic: String,
  },
  Assessment {
    questions: Vec<AssessmentQuestion>,
  },
  GeneratingCourse {
    topic: String,
  },
  CourseView {
    course: Course,
  },
  GeneratingSession {
    #[serde(rename = "sessionTitle")]
    session_title: String,
  },
  SessionView {
    context: ActiveSessionContext,
    details: SessionDetails,
  },
  Error {
    message: String,
    #[serde(rename = "canGoBack")]
    can_go_back: bool,
  },
}

/// Convert the internal stage to its public snapshot.
pub fn stage_out(stage: &Stage) -> StageOut {
  match stage {
    Stage::Input => StageOut::Input,
    Stage::GeneratingAssessment { params } => {
      StageOut::GeneratingAssessment { topic: params.topic.clone() }
    }
    Stage::Assessment { questions, .. } => StageOut::Assessment { questions: questions.clone() },
    Stage::GeneratingCourse { params } => StageOut::GeneratingCourse { topic: params.topic.clone() },
    Stage::CourseView { course } => StageOut::CourseView { course: course.clone() },
    Stage::GeneratingSession { context, .. } => {
      StageOut::GeneratingSession { session_title: context.session_title.clone() }
    }
    Stage::SessionView { context, details, .. } => {
      StageOut::SessionView { context: context.clone(), details: details.clone() }
    }
    Stage::Error { message, course } => {
      StageOut::Error { message: message.clone(), can_go_back: course.is_some() }
    }
  }
}

//
// HTTP request/response DTOs (stateless gateway surface)
//

#[derive(Serialize)]
pub struct HealthOut {
  pub ok: bool,
}

#[derive(Debug, Deserialize)]
pub struct AssessmentIn {
  pub topic: String,
}
#[derive(Serialize)]
pub struct AssessmentOut {
  pub questions: Vec<AssessmentQuestion>,
}

#[derive(Debug, Deserialize)]
pub struct StyleIn {
  pub answers: Vec<String>,
}
#[derive(Serialize)]
pub struct StyleOut {
  pub style: LearningStyle,
  pub defaulted: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseIn {
  #[serde(flatten)]
  pub params: CourseParams,
  pub learning_style: LearningStyle,
}

#[derive(Serialize)]
pub struct ErrorOut {
  pub message: String,
}
