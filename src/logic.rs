//! The driver between transports and the state machine: turns user intents
//! into transitions and gateway calls.
//!
//! Intent handling is split into two phases so the transport can deliver the
//! busy snapshot while the call is still outstanding:
//!   1. `apply_intent` is synchronous: it validates the intent, advances the
//!      machine, and either replies immediately or hands back the busy
//!      snapshot plus a `GenerationCall` describing the single gateway call
//!      to issue.
//!   2. `run_generation` awaits that call and yields the settling event.
//! The WebSocket loop sends the busy snapshot between the two phases and
//! keeps draining its socket during the await, dropping intents that arrive
//! while busy (no queuing, no cancellation). Stages execute strictly
//! sequentially: style inference fully resolves before course generation is
//! issued, since the latter consumes the former's output.

use tracing::{info, instrument, warn};

use crate::domain::{ActiveSessionContext, CourseParams};
use crate::error::GenerationError;
use crate::protocol::{stage_out, ClientWsMessage, ServerWsMessage};
use crate::state::AppState;
use crate::workflow::{Event, Stage, Workflow};

fn unavailable() -> GenerationError {
  GenerationError::Upstream("The generation service is not configured. Please try again later.".into())
}

fn snapshot(wf: &Workflow) -> ServerWsMessage {
  ServerWsMessage::Stage { stage: stage_out(&wf.stage) }
}

/// The one gateway call an intent resolved to.
#[derive(Debug)]
pub enum GenerationCall {
  Assessment { topic: String },
  Course { params: CourseParams, answers: Vec<String> },
  Session { context: ActiveSessionContext },
}

/// Outcome of the synchronous intent phase.
pub enum Dispatch {
  /// Settled immediately: send these messages (possibly none, for a dropped
  /// or ignored intent).
  Reply(Vec<ServerWsMessage>),
  /// A generation call must be issued: send `busy` first, then await
  /// `run_generation(call)`, dispatch its event, and send the new snapshot.
  Generate {
    busy: ServerWsMessage,
    call: GenerationCall,
  },
}

/// Phase 1: advance the machine for one client intent, without touching the
/// network. Pure apart from transition logging.
#[instrument(level = "info", skip(wf, msg), fields(run_id = %wf.run_id, stage = wf.stage.name()))]
pub fn apply_intent(wf: &mut Workflow, msg: ClientWsMessage) -> Dispatch {
  if wf.busy() && !matches!(msg, ClientWsMessage::Ping) {
    // No queuing, no cancellation: a trigger during an in-flight call is a no-op.
    warn!(target: "workflow", run_id = %wf.run_id, "Intent dropped while generation in flight");
    return Dispatch::Reply(Vec::new());
  }

  match msg {
    ClientWsMessage::Ping => Dispatch::Reply(vec![ServerWsMessage::Pong]),

    ClientWsMessage::SubmitParams { params } => {
      if let Err(message) = params.validate() {
        // Input validation is a protocol rejection, not a workflow failure.
        return Dispatch::Reply(vec![ServerWsMessage::Error { message }]);
      }
      let topic = params.topic.clone();
      wf.dispatch(Event::ParamsSubmitted(params));
      if wf.busy() {
        Dispatch::Generate { busy: snapshot(wf), call: GenerationCall::Assessment { topic } }
      } else {
        Dispatch::Reply(vec![snapshot(wf)])
      }
    }

    ClientWsMessage::SubmitAnswers { answers } => {
      wf.dispatch(Event::AnswersSubmitted(answers.clone()));
      match &wf.stage {
        Stage::GeneratingCourse { params } => Dispatch::Generate {
          call: GenerationCall::Course { params: params.clone(), answers },
          busy: snapshot(wf),
        },
        // Guard violation (count mismatch, missing prerequisites).
        Stage::Error { .. } => Dispatch::Reply(vec![snapshot(wf)]),
        // Ignored intent (e.g. answers while already viewing a course).
        _ => Dispatch::Reply(Vec::new()),
      }
    }

    ClientWsMessage::SelectSession { module_title, lesson_title, session_title } => {
      wf.dispatch(Event::SessionSelected { module_title, lesson_title, session_title });
      match &wf.stage {
        Stage::GeneratingSession { context, .. } => Dispatch::Generate {
          call: GenerationCall::Session { context: context.clone() },
          busy: snapshot(wf),
        },
        Stage::Error { .. } => Dispatch::Reply(vec![snapshot(wf)]),
        _ => Dispatch::Reply(Vec::new()),
      }
    }

    ClientWsMessage::Back => {
      let before = wf.stage.name();
      wf.dispatch(Event::Back);
      if wf.stage.name() == before {
        Dispatch::Reply(Vec::new())
      } else {
        Dispatch::Reply(vec![snapshot(wf)])
      }
    }

    ClientWsMessage::Reset => {
      wf.dispatch(Event::Reset);
      Dispatch::Reply(vec![snapshot(wf)])
    }
  }
}

/// Phase 2: issue the single gateway call and map its outcome to the event
/// that settles the Generating* stage. Exactly one of these runs per
/// workflow at a time.
#[instrument(level = "info", skip(state, call))]
pub async fn run_generation(state: &AppState, call: GenerationCall) -> Event {
  let outcome = match (&state.openai, call) {
    (None, _) => Err(unavailable()),
    (Some(oa), GenerationCall::Assessment { topic }) => {
      oa.request_assessment_questions(&state.prompts, &topic).await.map(Event::QuestionsReady)
    }
    (Some(oa), GenerationCall::Course { params, answers }) => {
      // Style first, then the course; the second call needs the first's result.
      match oa.infer_learning_style(&state.prompts, &answers).await {
        Ok(inferred) => oa
          .generate_course(&state.prompts, &params, inferred.style)
          .await
          .map(Event::CourseReady),
        Err(e) => Err(e),
      }
    }
    (Some(oa), GenerationCall::Session { context }) => {
      oa.generate_session_details(&state.prompts, &context).await.map(Event::DetailsReady)
    }
  };

  match outcome {
    Ok(event) => {
      info!(target: "workflow", "Generation settled");
      event
    }
    Err(e) => Event::GenerationFailed(e.user_message()),
  }
}

/// Both phases back to back, for callers without a socket to drain (tests,
/// and any transport that only replies once the stage settles).
pub async fn dispatch_intent(
  state: &AppState,
  wf: &mut Workflow,
  msg: ClientWsMessage,
) -> Vec<ServerWsMessage> {
  match apply_intent(wf, msg) {
    Dispatch::Reply(replies) => replies,
    Dispatch::Generate { busy, call } => {
      let event = run_generation(state, call).await;
      wf.dispatch(event);
      vec![busy, snapshot(wf)]
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::domain::{CourseParams, Difficulty};
  use crate::protocol::StageOut;
  use crate::state::AppState;

  fn state_without_generator() -> AppState {
    AppState { openai: None, prompts: Default::default() }
  }

  fn params() -> CourseParams {
    CourseParams { topic: "Rust".into(), duration_in_weeks: 8, difficulty: Difficulty::Beginner }
  }

  #[test]
  fn busy_snapshot_is_produced_before_any_call_is_issued() {
    // The synchronous phase alone yields the generating-stage snapshot, so a
    // transport can deliver it while the gateway call is still outstanding.
    let mut wf = Workflow::new();
    let dispatch = apply_intent(&mut wf, ClientWsMessage::SubmitParams { params: params() });
    match dispatch {
      Dispatch::Generate { busy, call } => {
        assert!(matches!(
          busy,
          ServerWsMessage::Stage { stage: StageOut::GeneratingAssessment { .. } }
        ));
        assert!(matches!(call, GenerationCall::Assessment { ref topic } if topic == "Rust"));
      }
      Dispatch::Reply(_) => panic!("expected a generation call"),
    }
    assert!(wf.busy());
  }

  #[test]
  fn intents_during_an_in_flight_call_are_dropped_not_queued() {
    let mut wf = Workflow::new();
    wf.stage = Stage::GeneratingAssessment { params: params() };
    for msg in [
      ClientWsMessage::SubmitParams { params: params() },
      ClientWsMessage::SubmitAnswers { answers: vec!["a".into(); 5] },
      ClientWsMessage::Back,
      ClientWsMessage::Reset,
    ] {
      match apply_intent(&mut wf, msg) {
        Dispatch::Reply(replies) => assert!(replies.is_empty()),
        Dispatch::Generate { .. } => panic!("busy workflow must not start another call"),
      }
      assert_eq!(wf.stage, Stage::GeneratingAssessment { params: params() });
    }
    // Ping still answers while busy.
    match apply_intent(&mut wf, ClientWsMessage::Ping) {
      Dispatch::Reply(replies) => assert!(matches!(replies[0], ServerWsMessage::Pong)),
      Dispatch::Generate { .. } => panic!("ping must not generate"),
    }
  }

  #[tokio::test]
  async fn invalid_params_are_rejected_without_a_stage_change() {
    let state = state_without_generator();
    let mut wf = Workflow::new();
    let bad = CourseParams { topic: "".into(), ..params() };
    let out = dispatch_intent(&state, &mut wf, ClientWsMessage::SubmitParams { params: bad }).await;
    assert_eq!(out.len(), 1);
    assert!(matches!(out[0], ServerWsMessage::Error { .. }));
    assert_eq!(wf.stage, Stage::Input);
  }

  #[tokio::test]
  async fn missing_generator_settles_in_the_error_stage_and_clears_busy() {
    let state = state_without_generator();
    let mut wf = Workflow::new();
    let out =
      dispatch_intent(&state, &mut wf, ClientWsMessage::SubmitParams { params: params() }).await;
    // Busy snapshot first, then the settled error.
    assert_eq!(out.len(), 2);
    assert!(matches!(
      out[0],
      ServerWsMessage::Stage { stage: StageOut::GeneratingAssessment { .. } }
    ));
    assert!(matches!(out[1], ServerWsMessage::Stage { stage: StageOut::Error { .. } }));
    assert!(!wf.busy());
    // Reset is the only way forward, and returns exactly to Input.
    let out = dispatch_intent(&state, &mut wf, ClientWsMessage::Reset).await;
    assert!(matches!(out[0], ServerWsMessage::Stage { stage: StageOut::Input }));
    assert_eq!(wf.stage, Stage::Input);
  }

  #[tokio::test]
  async fn stale_answers_settle_in_error_without_a_gateway_call() {
    let state = state_without_generator();
    let mut wf = Workflow::new();
    let out = dispatch_intent(
      &state,
      &mut wf,
      ClientWsMessage::SubmitAnswers { answers: vec!["a".into(); 5] },
    )
    .await;
    assert_eq!(out.len(), 1);
    match &out[0] {
      ServerWsMessage::Stage { stage: StageOut::Error { message, can_go_back } } => {
        assert!(message.contains("Course parameters missing"));
        assert!(!can_go_back);
      }
      other => panic!("unexpected reply: {other:?}"),
    }
  }

  #[tokio::test]
  async fn back_in_input_is_a_silent_no_op() {
    let state = state_without_generator();
    let mut wf = Workflow::new();
    let out = dispatch_intent(&state, &mut wf, ClientWsMessage::Back).await;
    assert!(out.is_empty());
    assert_eq!(wf.stage, Stage::Input);
  }
}
