//! Candidate-side interview state machine.
//!
//! The machine performs no I/O. The driver feeds it [`Event`]s along with the
//! current instant and executes the [`Effect`]s it returns: device control,
//! rendering, timers and network calls. All submission triggers (manual,
//! countdown, anti-cheat) go through one guarded path, so at most one upload
//! is in flight at any time.

use std::fmt;
use std::time::{Duration, Instant};

use crate::models::{
    question::{PublicQuestion, QuestionType},
    result::CandidateResponse,
    telemetry::{TelemetryEvent, TelemetryKind},
};

/// Total interview duration before a forced submission.
pub const INTERVIEW_DURATION_SECS: u32 = 3600;

/// How long the candidate may stay hidden or unfocused before the interview ends.
pub const ANTI_CHEAT_GRACE: Duration = Duration::from_secs(5);

pub const FULLSCREEN_RETRY_DELAY: Duration = Duration::from_secs(1);

/// Fallback re-check of readiness after either input becomes ready.
pub const START_CHECK_DELAY: Duration = Duration::from_millis(500);

pub const NAVIGATE_AWAY_DELAY: Duration = Duration::from_millis(1500);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Phase {
    AwaitingMediaAndQuestions,
    /// Both inputs ready, waiting for an explicit start.
    Ready,
    Running,
    Submitting,
    Completed,
    Errored(String),
}

impl Phase {
    pub fn label(&self) -> &'static str {
        match self {
            Phase::AwaitingMediaAndQuestions => "awaiting-media-and-questions",
            Phase::Ready => "ready",
            Phase::Running => "running",
            Phase::Submitting => "submitting",
            Phase::Completed => "completed",
            Phase::Errored(_) => "errored",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Identity of the validated session the machine runs for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionInfo {
    pub session_id: String,
    pub token: String,
    pub candidate_name: String,
    pub role: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Timer {
    StartCheck,
    VisibilityGrace,
    FocusGrace,
    FullscreenRetry,
    NavigateAway,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitTrigger {
    Manual,
    Countdown,
    AntiCheat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shortcut {
    ContextMenu,
    DevTools,
}

/// Finished recording handed back by the recorder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recording {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// Everything one submission attempt sends to the server.
#[derive(Debug, Clone, PartialEq)]
pub struct SubmissionPayload {
    pub session_id: String,
    pub token: String,
    /// Index-aligned with the question set; `None` for unanswered questions.
    pub responses: Vec<Option<CandidateResponse>>,
    pub transcript: String,
    pub recording: Option<Recording>,
}

/// What the screen shows for the current question.
#[derive(Debug, Clone, PartialEq)]
pub struct QuestionView {
    pub index: usize,
    pub total: usize,
    pub question: PublicQuestion,
    /// Saved selection or text draft for this question.
    pub answer: Option<String>,
    pub has_previous: bool,
    pub is_last: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    QuestionsLoaded(Vec<PublicQuestion>),
    QuestionsFailed(String),
    MediaReady,
    MediaFailed(String),
    /// Candidate pressed start (only needed without auto-start).
    StartRequested,
    /// One second of wall time elapsed.
    Tick,
    Next,
    Previous,
    SelectOption(String),
    TextEdited(String),
    SubmitRequested,
    VisibilityChanged { hidden: bool },
    FocusChanged { focused: bool },
    FullscreenChanged { active: bool },
    StreamStatus { video: bool, audio: bool },
    BlockedShortcut(Shortcut),
    /// Final text from the speech-to-text engine.
    TranscriptFragment(String),
    RecorderStopped(Option<Recording>),
    TimerFired(Timer),
    UploadSucceeded,
    UploadFailed(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    PhaseChanged(Phase),
    StartRecording,
    /// The driver must answer with [`Event::RecorderStopped`].
    StopRecording,
    StartTranscription,
    StopTranscription,
    RequestFullscreen,
    ExitFullscreen,
    ReleaseMedia,
    RenderQuestion(QuestionView),
    CountdownUpdated(u32),
    ShowAlert(String),
    ShowError(String),
    ReportTelemetry(TelemetryEvent),
    Schedule { timer: Timer, after: Duration },
    /// Drop every scheduled timer.
    CancelTimers,
    /// The driver must answer with [`Event::UploadSucceeded`] or [`Event::UploadFailed`].
    Upload(SubmissionPayload),
    NavigateAway,
}

#[derive(Debug, Default, Clone, Copy)]
struct Counters {
    tab_switches: u32,
    window_blurs: u32,
    fullscreen_exits: u32,
    stream_disabled: u32,
}

pub struct InterviewMachine {
    session: SessionInfo,
    phase: Phase,
    auto_start: bool,

    media_ready: bool,
    questions_ready: bool,
    started: bool,
    media_released: bool,

    questions: Vec<PublicQuestion>,
    responses: Vec<Option<CandidateResponse>>,
    current: usize,
    shown_at: Option<Instant>,
    /// Text typed into the current text question.
    draft: Option<String>,

    remaining_secs: u32,

    hidden: bool,
    focused: bool,
    fullscreen_requested: bool,
    counters: Counters,

    transcript: String,
    /// Single in-flight submission guard.
    submitting: bool,
    /// Assembled payload kept after a failed upload for a manual retry.
    payload: Option<SubmissionPayload>,
}

impl InterviewMachine {
    pub fn new(session: SessionInfo) -> Self {
        Self {
            session,
            phase: Phase::AwaitingMediaAndQuestions,
            auto_start: true,
            media_ready: false,
            questions_ready: false,
            started: false,
            media_released: false,
            questions: Vec::new(),
            responses: Vec::new(),
            current: 0,
            shown_at: None,
            draft: None,
            remaining_secs: INTERVIEW_DURATION_SECS,
            hidden: false,
            focused: true,
            fullscreen_requested: false,
            counters: Counters::default(),
            transcript: String::new(),
            submitting: false,
            payload: None,
        }
    }

    /// Waits in [`Phase::Ready`] for [`Event::StartRequested`] instead of starting
    /// as soon as both inputs are ready.
    pub fn with_manual_start(mut self) -> Self {
        self.auto_start = false;
        self
    }

    pub fn with_duration(mut self, seconds: u32) -> Self {
        self.remaining_secs = seconds;
        self
    }

    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    pub fn session(&self) -> &SessionInfo {
        &self.session
    }

    pub fn responses(&self) -> &[Option<CandidateResponse>] {
        &self.responses
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    pub fn remaining_secs(&self) -> u32 {
        self.remaining_secs
    }

    pub fn is_submitting(&self) -> bool {
        self.submitting
    }

    pub fn handle(&mut self, event: Event, now: Instant) -> Vec<Effect> {
        let mut fx = Vec::new();

        match event {
            Event::QuestionsLoaded(questions) => self.on_questions(questions, now, &mut fx),
            Event::QuestionsFailed(reason) => {
                if !self.started {
                    self.fail(format!("Failed to load interview questions: {}", reason), &mut fx);
                }
            }
            Event::MediaReady => match self.phase {
                Phase::AwaitingMediaAndQuestions => {
                    self.media_ready = true;
                    self.readiness_changed(now, &mut fx);
                }
                // Devices granted after a fatal error still have to be let go.
                Phase::Errored(_) if !self.media_released => {
                    self.media_released = true;
                    fx.push(Effect::ReleaseMedia);
                }
                _ => {}
            },
            Event::MediaFailed(reason) => {
                if !self.started {
                    self.fail(
                        format!("Failed to access camera and microphone: {}", reason),
                        &mut fx,
                    );
                }
            }
            Event::StartRequested => {
                if self.phase == Phase::Ready {
                    self.start(now, &mut fx);
                }
            }
            Event::Tick => self.on_tick(now, &mut fx),
            Event::Next => self.on_next(now, &mut fx),
            Event::Previous => self.on_previous(now, &mut fx),
            Event::SelectOption(option) => self.on_select(option, now),
            Event::TextEdited(text) => self.on_text(text, now),
            Event::SubmitRequested => self.submit(SubmitTrigger::Manual, now, &mut fx),
            Event::VisibilityChanged { hidden } => {
                self.hidden = hidden;
                if hidden && self.phase == Phase::Running {
                    self.counters.tab_switches += 1;
                    fx.push(Effect::ShowAlert(
                        "Tab switching detected. Interview will end in 5 seconds.".to_string(),
                    ));
                    fx.push(self.telemetry(TelemetryKind::TabSwitch, self.counters.tab_switches, None));
                    fx.push(Effect::Schedule {
                        timer: Timer::VisibilityGrace,
                        after: ANTI_CHEAT_GRACE,
                    });
                }
            }
            Event::FocusChanged { focused } => {
                self.focused = focused;
                if !focused && self.phase == Phase::Running {
                    self.counters.window_blurs += 1;
                    fx.push(Effect::ShowAlert(
                        "Window focus lost. Interview will end in 5 seconds.".to_string(),
                    ));
                    fx.push(self.telemetry(TelemetryKind::WindowBlur, self.counters.window_blurs, None));
                    fx.push(Effect::Schedule {
                        timer: Timer::FocusGrace,
                        after: ANTI_CHEAT_GRACE,
                    });
                }
            }
            Event::FullscreenChanged { active } => {
                if !active && self.fullscreen_requested && self.phase == Phase::Running {
                    self.counters.fullscreen_exits += 1;
                    fx.push(Effect::ShowAlert(
                        "Please stay in fullscreen mode during the interview.".to_string(),
                    ));
                    fx.push(self.telemetry(
                        TelemetryKind::FullscreenExit,
                        self.counters.fullscreen_exits,
                        None,
                    ));
                    fx.push(Effect::Schedule {
                        timer: Timer::FullscreenRetry,
                        after: FULLSCREEN_RETRY_DELAY,
                    });
                }
            }
            Event::StreamStatus { video, audio } => {
                if (!video || !audio) && self.phase == Phase::Running {
                    self.counters.stream_disabled += 1;
                    fx.push(Effect::ShowAlert(
                        "Camera or microphone has been disabled! Please enable them to continue."
                            .to_string(),
                    ));
                    fx.push(self.telemetry(
                        TelemetryKind::StreamDisabled,
                        self.counters.stream_disabled,
                        Some(format!("video={} audio={}", video, audio)),
                    ));
                }
            }
            Event::BlockedShortcut(shortcut) => {
                if self.phase == Phase::Running {
                    let message = match shortcut {
                        Shortcut::ContextMenu => "Right-click is disabled during the interview.",
                        Shortcut::DevTools => "Developer tools are disabled during the interview.",
                    };
                    fx.push(Effect::ShowAlert(message.to_string()));
                }
            }
            Event::TranscriptFragment(text) => {
                if matches!(self.phase, Phase::Running | Phase::Submitting) && !text.trim().is_empty() {
                    self.transcript.push_str(text.trim());
                    self.transcript.push(' ');
                }
            }
            Event::RecorderStopped(recording) => self.on_recorder_stopped(recording, &mut fx),
            Event::TimerFired(timer) => self.on_timer(timer, now, &mut fx),
            Event::UploadSucceeded => {
                if self.phase == Phase::Submitting {
                    self.submitting = false;
                    self.payload = None;
                    self.set_phase(Phase::Completed, &mut fx);
                    self.media_released = true;
                    fx.push(Effect::ReleaseMedia);
                    fx.push(Effect::Schedule {
                        timer: Timer::NavigateAway,
                        after: NAVIGATE_AWAY_DELAY,
                    });
                }
            }
            Event::UploadFailed(reason) => {
                if self.phase == Phase::Submitting {
                    // No automatic retry: the guard is released and the payload
                    // waits for a manual submit.
                    self.submitting = false;
                    self.fail(reason, &mut fx);
                }
            }
        }

        fx
    }

    fn on_questions(&mut self, questions: Vec<PublicQuestion>, now: Instant, fx: &mut Vec<Effect>) {
        if self.phase != Phase::AwaitingMediaAndQuestions {
            return;
        }
        if questions.is_empty() {
            self.fail("No questions are available for this role.".to_string(), fx);
            return;
        }

        self.responses = vec![None; questions.len()];
        self.questions = questions;
        self.questions_ready = true;
        self.readiness_changed(now, fx);
    }

    fn readiness_changed(&mut self, now: Instant, fx: &mut Vec<Effect>) {
        fx.push(Effect::Schedule {
            timer: Timer::StartCheck,
            after: START_CHECK_DELAY,
        });
        self.try_start(now, fx);
    }

    /// Starts once both inputs are ready, whichever arrived second.
    fn try_start(&mut self, now: Instant, fx: &mut Vec<Effect>) {
        if self.started || !(self.media_ready && self.questions_ready) {
            return;
        }
        if self.phase == Phase::AwaitingMediaAndQuestions {
            self.set_phase(Phase::Ready, fx);
        }
        if self.auto_start && self.phase == Phase::Ready {
            self.start(now, fx);
        }
    }

    fn start(&mut self, now: Instant, fx: &mut Vec<Effect>) {
        if self.started {
            return;
        }
        self.started = true;

        self.set_phase(Phase::Running, fx);
        fx.push(Effect::StartRecording);
        fx.push(Effect::StartTranscription);
        fx.push(Effect::RequestFullscreen);
        self.fullscreen_requested = true;
        fx.push(self.telemetry(TelemetryKind::InterviewStarted, 1, None));
        fx.push(Effect::CountdownUpdated(self.remaining_secs));
        self.show(0, now, fx);

        tracing::info!(
            session_id = %self.session.session_id,
            questions = self.questions.len(),
            "Interview started"
        );
    }

    fn on_tick(&mut self, now: Instant, fx: &mut Vec<Effect>) {
        if self.phase != Phase::Running {
            return;
        }
        self.remaining_secs = self.remaining_secs.saturating_sub(1);
        fx.push(Effect::CountdownUpdated(self.remaining_secs));
        if self.remaining_secs == 0 {
            self.submit(SubmitTrigger::Countdown, now, fx);
        }
    }

    fn on_timer(&mut self, timer: Timer, now: Instant, fx: &mut Vec<Effect>) {
        match timer {
            Timer::StartCheck => self.try_start(now, fx),
            Timer::VisibilityGrace => {
                if self.hidden {
                    self.submit(SubmitTrigger::AntiCheat, now, fx);
                }
            }
            Timer::FocusGrace => {
                if !self.focused {
                    self.submit(SubmitTrigger::AntiCheat, now, fx);
                }
            }
            Timer::FullscreenRetry => {
                if self.phase == Phase::Running {
                    fx.push(Effect::RequestFullscreen);
                }
            }
            Timer::NavigateAway => {
                if self.phase == Phase::Completed {
                    fx.push(Effect::ExitFullscreen);
                    fx.push(Effect::NavigateAway);
                }
            }
        }
    }

    fn current_question(&self) -> Option<&PublicQuestion> {
        self.questions.get(self.current)
    }

    fn show(&mut self, index: usize, now: Instant, fx: &mut Vec<Effect>) {
        let Some(question) = self.questions.get(index).cloned() else {
            return;
        };
        self.current = index;
        self.shown_at = Some(now);

        let answer = self.responses[index].as_ref().and_then(|r| r.answer.clone());
        self.draft = match question.question_type {
            QuestionType::Text => answer.clone(),
            QuestionType::MultipleChoice => None,
        };

        fx.push(Effect::RenderQuestion(QuestionView {
            index,
            total: self.questions.len(),
            question,
            answer,
            has_previous: index > 0,
            is_last: index + 1 == self.questions.len(),
        }));
    }

    /// Records `answer` for the current question with time elapsed since it was shown.
    fn save(&mut self, answer: String, now: Instant) {
        let Some(question) = self.current_question() else {
            return;
        };
        let question_id = question.id.clone();
        let time_taken = self
            .shown_at
            .map(|shown| now.saturating_duration_since(shown).as_secs())
            .unwrap_or(0);

        self.responses[self.current] = Some(CandidateResponse {
            question_id: Some(question_id),
            answer: Some(answer),
            time_taken,
        });
    }

    /// Saves a non-blank text draft for the current question.
    fn capture_draft(&mut self, now: Instant) {
        let is_text = self
            .current_question()
            .is_some_and(|q| q.question_type == QuestionType::Text);
        if !is_text {
            return;
        }
        if let Some(draft) = self.draft.clone().filter(|d| !d.trim().is_empty()) {
            self.save(draft, now);
        }
    }

    fn on_select(&mut self, option: String, now: Instant) {
        if self.phase != Phase::Running {
            return;
        }
        let Some(question) = self.current_question() else {
            return;
        };
        let offered = question.question_type == QuestionType::MultipleChoice
            && question
                .options
                .as_ref()
                .is_some_and(|options| options.contains(&option));
        if offered {
            self.save(option, now);
        }
    }

    fn on_text(&mut self, text: String, now: Instant) {
        if self.phase != Phase::Running {
            return;
        }
        let is_text = self
            .current_question()
            .is_some_and(|q| q.question_type == QuestionType::Text);
        if is_text {
            self.draft = Some(text.clone());
            self.save(text, now);
        }
    }

    fn on_next(&mut self, now: Instant, fx: &mut Vec<Effect>) {
        if self.phase != Phase::Running {
            return;
        }
        self.capture_draft(now);
        if self.current + 1 < self.questions.len() {
            self.show(self.current + 1, now, fx);
        }
    }

    fn on_previous(&mut self, now: Instant, fx: &mut Vec<Effect>) {
        if self.phase != Phase::Running || self.current == 0 {
            return;
        }
        self.show(self.current - 1, now, fx);
    }

    /// The single submission path shared by every trigger.
    fn submit(&mut self, trigger: SubmitTrigger, now: Instant, fx: &mut Vec<Effect>) {
        if self.submitting {
            tracing::debug!(?trigger, "Submission already in flight");
            return;
        }

        match &self.phase {
            Phase::Running => {
                self.submitting = true;
                tracing::info!(session_id = %self.session.session_id, ?trigger, "Submitting interview");

                self.set_phase(Phase::Submitting, fx);
                fx.push(Effect::CancelTimers);
                fx.push(Effect::StopTranscription);
                self.capture_draft(now);
                fx.push(Effect::StopRecording);
            }
            Phase::Errored(_) if trigger == SubmitTrigger::Manual => {
                let Some(payload) = self.payload.clone() else {
                    return;
                };
                self.submitting = true;
                tracing::info!(session_id = %self.session.session_id, "Retrying submission");

                self.set_phase(Phase::Submitting, fx);
                fx.push(Effect::Upload(payload));
            }
            _ => {}
        }
    }

    fn on_recorder_stopped(&mut self, recording: Option<Recording>, fx: &mut Vec<Effect>) {
        if self.phase != Phase::Submitting || self.payload.is_some() {
            return;
        }

        let payload = SubmissionPayload {
            session_id: self.session.session_id.clone(),
            token: self.session.token.clone(),
            responses: self.responses.clone(),
            transcript: self.transcript.trim_end().to_string(),
            recording: recording.filter(|r| !r.bytes.is_empty()),
        };
        self.payload = Some(payload.clone());
        fx.push(Effect::Upload(payload));
    }

    fn fail(&mut self, message: String, fx: &mut Vec<Effect>) {
        tracing::warn!(session_id = %self.session.session_id, "Interview error: {}", message);

        self.set_phase(Phase::Errored(message.clone()), fx);
        fx.push(Effect::CancelTimers);
        fx.push(Effect::ShowError(message));
        if self.media_ready && !self.media_released {
            self.media_released = true;
            fx.push(Effect::ReleaseMedia);
        }
    }

    fn set_phase(&mut self, phase: Phase, fx: &mut Vec<Effect>) {
        if self.phase != phase {
            tracing::debug!(from = %self.phase, to = %phase, "Interview phase change");
            self.phase = phase.clone();
            fx.push(Effect::PhaseChanged(phase));
        }
    }

    fn telemetry(&self, kind: TelemetryKind, count: u32, detail: Option<String>) -> Effect {
        Effect::ReportTelemetry(TelemetryEvent {
            session_id: self.session.session_id.clone(),
            kind,
            count,
            detail,
        })
    }
}
