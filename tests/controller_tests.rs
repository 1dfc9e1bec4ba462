// State machine tests for the session turn controller, driven end-to-end
// against scripted capture and an in-process stand-in for the interview
// service.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Result;
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::post;
use axum::{Json, Router};
use base64::Engine;
use tempfile::TempDir;
use voice_interview::{
    CaptureConfig, FileCaptureGateway, InterviewError, RecordingStatus, ScriptedCaptureGateway,
    SessionOptions, TurnClient, TurnController, TurnOutcome, TurnPhase,
};

#[derive(Clone, Default)]
struct MockService {
    hits: Arc<AtomicUsize>,
    responses: Arc<Mutex<VecDeque<(StatusCode, String)>>>,
}

impl MockService {
    fn push_reply(&self, audio: &[u8], text: &str) {
        let body = serde_json::json!({
            "audio_output": base64::engine::general_purpose::STANDARD.encode(audio),
            "text_output": text,
        })
        .to_string();
        self.push_raw(StatusCode::OK, body);
    }

    fn push_raw(&self, status: StatusCode, body: impl Into<String>) {
        self.responses
            .lock()
            .unwrap()
            .push_back((status, body.into()));
    }

    fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }
}

async fn interview_loop(
    State(state): State<MockService>,
    Json(_body): Json<serde_json::Value>,
) -> impl IntoResponse {
    state.hits.fetch_add(1, Ordering::SeqCst);

    let (status, body) = state
        .responses
        .lock()
        .unwrap()
        .pop_front()
        .unwrap_or((StatusCode::INTERNAL_SERVER_ERROR, String::new()));

    (status, [(header::CONTENT_TYPE, "application/json")], body)
}

async fn spawn_service(state: MockService) -> Result<String> {
    let app = Router::new()
        .route("/interview_loop", post(interview_loop))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("mock service");
    });

    Ok(format!("http://{}/interview_loop", addr))
}

fn options(session_id: Option<&str>) -> SessionOptions {
    SessionOptions {
        session_id: session_id.map(|s| s.to_string()),
        question_count: None,
    }
}

async fn client_for(service: &MockService) -> Result<TurnClient> {
    let endpoint = spawn_service(service.clone()).await?;
    Ok(TurnClient::new(endpoint, Duration::from_secs(5)))
}

#[tokio::test]
async fn full_session_loops_through_two_turns() -> Result<()> {
    let service = MockService::default();
    service.push_reply(b"first reply", "Tell me more.");
    service.push_reply(b"second reply", "Thanks, we are done.");
    let client = client_for(&service).await?;

    let mut gateway =
        ScriptedCaptureGateway::new(vec![vec![b"one".to_vec()], vec![b"two".to_vec()]]);
    let mut controller = TurnController::new(options(Some("session-1")), client);

    assert_eq!(controller.phase(), TurnPhase::AwaitingPermission);
    controller.acquire(&mut gateway).await?;
    assert_eq!(controller.phase(), TurnPhase::Idle);

    controller.start_answer();
    assert_eq!(controller.phase(), TurnPhase::Recording);
    assert_eq!(controller.recording_status(), RecordingStatus::Recording);

    let outcome = controller.finish_answer().await?;
    assert_eq!(outcome, TurnOutcome::Replied);
    assert_eq!(controller.phase(), TurnPhase::Idle);
    assert_eq!(controller.reply_transcript(), Some("Tell me more."));
    let reply = controller.reply_audio().expect("reply audio published");
    assert_eq!(reply.bytes(), b"first reply".as_slice());
    assert_eq!(reply.mime(), "audio/webm");

    controller.start_answer();
    let outcome = controller.finish_answer().await?;
    assert_eq!(outcome, TurnOutcome::Replied);
    assert_eq!(controller.reply_transcript(), Some("Thanks, we are done."));
    assert_eq!(controller.turns_completed(), 2);
    assert_eq!(service.hits(), 2);

    let status = controller.status();
    assert_eq!(status.phase, TurnPhase::Idle);
    assert_eq!(status.recording, RecordingStatus::Inactive);
    assert!(!status.exchange_in_flight);
    assert_eq!(status.turns_completed, 2);

    Ok(())
}

#[tokio::test]
async fn service_error_discards_the_turn_and_returns_to_idle() -> Result<()> {
    let service = MockService::default();
    service.push_raw(StatusCode::INTERNAL_SERVER_ERROR, "");
    let client = client_for(&service).await?;

    let mut gateway = ScriptedCaptureGateway::new(vec![vec![b"answer".to_vec()]]);
    let mut controller = TurnController::new(options(Some("session-1")), client);
    controller.acquire(&mut gateway).await?;

    controller.start_answer();
    let err = controller
        .finish_answer()
        .await
        .expect_err("a 500 must surface as a turn failure");

    assert!(matches!(err, InterviewError::Service { status: 500 }));
    assert!(controller.last_reply().is_none(), "nothing may be published");
    assert_eq!(controller.phase(), TurnPhase::Idle);
    assert_eq!(controller.recording_status(), RecordingStatus::Inactive);
    assert_eq!(service.hits(), 1);

    Ok(())
}

#[tokio::test]
async fn one_exchange_per_start_stop_pair() -> Result<()> {
    let service = MockService::default();
    service.push_reply(b"reply", "Noted.");
    let client = client_for(&service).await?;

    let mut gateway = ScriptedCaptureGateway::new(vec![vec![b"answer".to_vec()]]);
    let mut controller = TurnController::new(options(Some("session-1")), client);
    controller.acquire(&mut gateway).await?;

    // Defensive double start: still one recording, one exchange.
    controller.start_answer();
    controller.start_answer();
    let outcome = controller.finish_answer().await?;
    assert_eq!(outcome, TurnOutcome::Replied);

    // A second finish with nothing recorded exchanges nothing.
    let outcome = controller.finish_answer().await?;
    assert_eq!(outcome, TurnOutcome::NotRecording);

    assert_eq!(service.hits(), 1, "exactly one reply per start/stop pair");
    assert_eq!(controller.turns_completed(), 1);

    Ok(())
}

#[tokio::test]
async fn missing_session_identifier_skips_the_exchange() -> Result<()> {
    let service = MockService::default();
    let client = client_for(&service).await?;

    let mut gateway = ScriptedCaptureGateway::new(vec![vec![b"answer".to_vec()]]);
    let mut controller = TurnController::new(options(None), client);
    controller.acquire(&mut gateway).await?;

    controller.start_answer();
    let outcome = controller.finish_answer().await?;

    assert_eq!(outcome, TurnOutcome::Skipped);
    assert_eq!(service.hits(), 0, "no exchange without a session identifier");
    assert!(controller.last_reply().is_none());
    assert_eq!(controller.phase(), TurnPhase::Idle);

    Ok(())
}

#[tokio::test]
async fn empty_recording_abandons_the_turn_without_exchange() -> Result<()> {
    let service = MockService::default();
    let client = client_for(&service).await?;

    let mut gateway = ScriptedCaptureGateway::new(vec![vec![]]);
    let mut controller = TurnController::new(options(Some("session-1")), client);
    controller.acquire(&mut gateway).await?;

    controller.start_answer();
    let err = controller
        .finish_answer()
        .await
        .expect_err("an empty recording must be reported");

    assert!(matches!(err, InterviewError::EmptyRecording));
    assert_eq!(service.hits(), 0, "no exchange for an empty recording");
    assert_eq!(controller.phase(), TurnPhase::Idle);

    Ok(())
}

#[tokio::test]
async fn malformed_reply_keeps_the_prior_output_visible() -> Result<()> {
    let service = MockService::default();
    service.push_reply(b"good reply", "First.");
    service.push_raw(
        StatusCode::OK,
        r#"{"audio_output": "!!!not base64!!!", "text_output": "Second."}"#,
    );
    let client = client_for(&service).await?;

    let mut gateway =
        ScriptedCaptureGateway::new(vec![vec![b"one".to_vec()], vec![b"two".to_vec()]]);
    let mut controller = TurnController::new(options(Some("session-1")), client);
    controller.acquire(&mut gateway).await?;

    controller.start_answer();
    controller.finish_answer().await?;
    assert_eq!(controller.reply_transcript(), Some("First."));

    controller.start_answer();
    let err = controller
        .finish_answer()
        .await
        .expect_err("an undecodable reply must fail the turn");

    assert!(matches!(err, InterviewError::MalformedPayload(_)));
    assert_eq!(
        controller.reply_transcript(),
        Some("First."),
        "the prior reply must stay visible"
    );
    assert_eq!(controller.turns_completed(), 1);
    assert_eq!(controller.phase(), TurnPhase::Idle);

    Ok(())
}

#[tokio::test]
async fn mark_done_freezes_the_session() -> Result<()> {
    let service = MockService::default();
    let client = client_for(&service).await?;

    let mut gateway = ScriptedCaptureGateway::new(vec![vec![b"answer".to_vec()]]);
    let mut controller = TurnController::new(options(Some("session-1")), client);
    controller.acquire(&mut gateway).await?;

    controller.mark_done();
    assert_eq!(controller.phase(), TurnPhase::Done);
    assert!(controller.is_done());

    // Further turns are no-ops.
    controller.start_answer();
    assert_eq!(controller.phase(), TurnPhase::Done);
    assert_eq!(controller.recording_status(), RecordingStatus::Inactive);

    let outcome = controller.finish_answer().await?;
    assert_eq!(outcome, TurnOutcome::NotRecording);
    assert_eq!(service.hits(), 0);

    Ok(())
}

#[tokio::test]
async fn mark_done_while_recording_abandons_the_recording() -> Result<()> {
    let service = MockService::default();
    let client = client_for(&service).await?;

    let mut gateway = ScriptedCaptureGateway::new(vec![vec![b"answer".to_vec()]]);
    let mut controller = TurnController::new(options(Some("session-1")), client);
    controller.acquire(&mut gateway).await?;

    controller.start_answer();
    controller.mark_done();

    assert_eq!(controller.phase(), TurnPhase::Done);
    assert_eq!(controller.recording_status(), RecordingStatus::Inactive);
    assert_eq!(service.hits(), 0, "an abandoned recording is never exchanged");

    Ok(())
}

#[tokio::test]
async fn dropping_the_controller_releases_the_stream_once() -> Result<()> {
    let service = MockService::default();
    let client = client_for(&service).await?;

    let mut gateway = ScriptedCaptureGateway::new(vec![vec![b"answer".to_vec()]]);
    let mut controller = TurnController::new(options(Some("session-1")), client);
    controller.acquire(&mut gateway).await?;

    controller.start_answer();
    assert_eq!(controller.recording_status(), RecordingStatus::Recording);

    drop(controller);
    assert_eq!(
        gateway.release_count(),
        1,
        "teardown must release the stream exactly once"
    );

    Ok(())
}

#[tokio::test]
async fn acquire_can_be_retried_after_a_denial() -> Result<()> {
    let service = MockService::default();
    let client = client_for(&service).await?;

    let mut gateway = ScriptedCaptureGateway::new(vec![vec![b"answer".to_vec()]]);
    gateway.deny_next_acquire();

    let mut controller = TurnController::new(options(Some("session-1")), client);

    let err = controller
        .acquire(&mut gateway)
        .await
        .expect_err("the scripted denial must surface");
    assert!(matches!(err, InterviewError::PermissionDenied(_)));
    assert_eq!(controller.phase(), TurnPhase::AwaitingPermission);

    // Starting is still locked without permission.
    controller.start_answer();
    assert_eq!(controller.phase(), TurnPhase::AwaitingPermission);

    // A manual retry succeeds and unlocks the session.
    controller.acquire(&mut gateway).await?;
    assert_eq!(controller.phase(), TurnPhase::Idle);

    Ok(())
}

#[tokio::test]
async fn unsupported_host_surfaces_as_fatal() -> Result<()> {
    let service = MockService::default();
    let client = client_for(&service).await?;

    let mut gateway = ScriptedCaptureGateway::new(vec![]);
    gateway.fail_next_acquire_unsupported();

    let mut controller = TurnController::new(options(Some("session-1")), client);
    let err = controller
        .acquire(&mut gateway)
        .await
        .expect_err("an incapable host must surface");

    assert!(matches!(err, InterviewError::DeviceUnsupported(_)));
    assert_eq!(controller.phase(), TurnPhase::AwaitingPermission);

    Ok(())
}

#[tokio::test]
async fn file_gateway_drives_a_turn_end_to_end() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let wav_path = temp_dir.path().join("answer.wav");

    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: 16000,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(&wav_path, spec)?;
    for i in 0..1600 {
        writer.write_sample((i % 100) as i16)?;
    }
    writer.finalize()?;

    let service = MockService::default();
    service.push_reply(b"wav reply", "Question two?");
    let client = client_for(&service).await?;

    let mut gateway = FileCaptureGateway::new(vec![wav_path], CaptureConfig::default());
    let mut controller = TurnController::new(options(Some("session-wav")), client);
    controller.acquire(&mut gateway).await?;

    controller.start_answer();
    let outcome = controller.finish_answer().await?;

    assert_eq!(outcome, TurnOutcome::Replied);
    assert_eq!(controller.reply_transcript(), Some("Question two?"));
    let reply = controller.reply_audio().expect("reply audio");
    assert_eq!(reply.mime(), "audio/wav");
    assert_eq!(reply.bytes(), b"wav reply".as_slice());

    Ok(())
}
