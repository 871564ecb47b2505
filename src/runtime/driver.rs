use std::collections::VecDeque;
use std::time::Duration;

use async_trait::async_trait;
use tokio::{
    sync::mpsc,
    task::JoinHandle,
    time::{Instant, MissedTickBehavior, interval_at},
};

use super::{
    client::{ClientError, InterviewApi},
    machine::{
        Effect, Event, InterviewMachine, Phase, QuestionView, Recording, SessionInfo, Timer,
    },
};

/// How often camera and microphone tracks are checked.
pub const STREAM_CHECK_INTERVAL: Duration = Duration::from_secs(5);

/// Camera, microphone, recorder and speech-to-text engine.
///
/// Transcript text is delivered as [`Event::TranscriptFragment`] through the
/// driver's input channel.
#[async_trait]
pub trait MediaDevices: Send {
    async fn acquire(&mut self) -> Result<(), String>;

    fn start_recording(&mut self);

    /// Stops the recorder and waits for the finished recording.
    async fn stop_recording(&mut self) -> Option<Recording>;

    fn start_transcription(&mut self) {}

    fn stop_transcription(&mut self) {}

    /// `(video_enabled, audio_enabled)`
    fn stream_status(&self) -> (bool, bool);

    fn release(&mut self);
}

/// Everything the candidate sees.
pub trait Screen: Send {
    fn phase_changed(&mut self, _phase: &Phase) {}

    fn render_question(&mut self, view: &QuestionView);

    fn countdown(&mut self, _remaining_secs: u32) {}

    fn alert(&mut self, message: &str);

    fn error(&mut self, message: &str);

    fn request_fullscreen(&mut self) {}

    fn exit_fullscreen(&mut self) {}

    fn navigate_away(&mut self);
}

enum Wake {
    Input(Option<Event>),
    Tick,
    StreamCheck,
    Timer(Timer),
}

/// Runs an [`InterviewMachine`] against real devices, a screen and the server.
pub struct InterviewDriver<M, S> {
    api: InterviewApi,
    media: M,
    screen: S,
    duration_secs: Option<u32>,
    timers: Vec<JoinHandle<()>>,
    timer_tx: mpsc::UnboundedSender<Timer>,
    timer_rx: Option<mpsc::UnboundedReceiver<Timer>>,
    navigated: bool,
}

impl<M: MediaDevices, S: Screen> InterviewDriver<M, S> {
    pub fn new(api: InterviewApi, media: M, screen: S) -> Self {
        let (timer_tx, timer_rx) = mpsc::unbounded_channel();
        Self {
            api,
            media,
            screen,
            duration_secs: None,
            timers: Vec::new(),
            timer_tx,
            timer_rx: Some(timer_rx),
            navigated: false,
        }
    }

    pub fn with_duration(mut self, seconds: u32) -> Self {
        self.duration_secs = Some(seconds);
        self
    }

    pub fn into_parts(self) -> (M, S) {
        (self.media, self.screen)
    }

    /// Validates `token`, then runs the interview until the candidate is
    /// navigated away, or until it errors and no more input can arrive.
    ///
    /// `inputs` carries candidate and browser events (navigation, answers,
    /// visibility, focus, fullscreen, shortcuts, transcript).
    pub async fn run(
        &mut self,
        token: &str,
        mut inputs: mpsc::Receiver<Event>,
    ) -> Result<Phase, ClientError> {
        let session = match self.api.validate_token(token).await {
            Ok(validated) => SessionInfo {
                session_id: validated.session_id,
                token: token.to_string(),
                candidate_name: validated.candidate_name,
                role: validated.role,
            },
            Err(e) => {
                let message = match &e {
                    ClientError::Api { message, .. } => message.clone(),
                    _ => "Failed to validate interview link. Please try again.".to_string(),
                };
                self.screen.error(&message);
                return Err(e);
            }
        };

        tracing::info!(session_id = %session.session_id, role = %session.role, "Interview session validated");

        let mut machine = InterviewMachine::new(session.clone());
        if let Some(seconds) = self.duration_secs {
            machine = machine.with_duration(seconds);
        }

        let Some(mut timer_rx) = self.timer_rx.take() else {
            return Ok(machine.phase().clone());
        };

        // Questions and devices load concurrently; the machine starts on whichever lands second.
        let (questions, media) = tokio::join!(
            self.api.fetch_questions(&session.role),
            self.media.acquire()
        );
        let questions = match questions {
            Ok(questions) => Event::QuestionsLoaded(questions),
            Err(e) => Event::QuestionsFailed(e.to_string()),
        };
        let media = match media {
            Ok(()) => Event::MediaReady,
            Err(reason) => Event::MediaFailed(reason),
        };
        self.dispatch(&mut machine, questions).await;
        self.dispatch(&mut machine, media).await;

        let start = Instant::now();
        let mut ticker = interval_at(start + Duration::from_secs(1), Duration::from_secs(1));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Burst);
        let mut stream_check = interval_at(start + STREAM_CHECK_INTERVAL, STREAM_CHECK_INTERVAL);
        stream_check.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut inputs_open = true;

        while !self.navigated {
            if !inputs_open && matches!(machine.phase(), Phase::Errored(_)) {
                break;
            }

            let wake = tokio::select! {
                event = inputs.recv(), if inputs_open => Wake::Input(event),
                _ = ticker.tick() => Wake::Tick,
                _ = stream_check.tick() => Wake::StreamCheck,
                Some(timer) = timer_rx.recv() => Wake::Timer(timer),
            };

            let event = match wake {
                Wake::Input(Some(event)) => event,
                Wake::Input(None) => {
                    inputs_open = false;
                    continue;
                }
                Wake::Tick => Event::Tick,
                Wake::StreamCheck => {
                    if machine.phase() != &Phase::Running {
                        continue;
                    }
                    let (video, audio) = self.media.stream_status();
                    Event::StreamStatus { video, audio }
                }
                Wake::Timer(timer) => Event::TimerFired(timer),
            };

            self.dispatch(&mut machine, event).await;
        }

        self.cancel_timers();
        self.timer_rx = Some(timer_rx);
        Ok(machine.phase().clone())
    }

    /// Feeds `event` and every follow-up event its effects produce.
    async fn dispatch(&mut self, machine: &mut InterviewMachine, event: Event) {
        let mut pending = VecDeque::from([event]);
        while let Some(event) = pending.pop_front() {
            let effects = machine.handle(event, Instant::now().into_std());
            for effect in effects {
                if let Some(follow_up) = self.execute(effect).await {
                    pending.push_back(follow_up);
                }
            }
        }
    }

    async fn execute(&mut self, effect: Effect) -> Option<Event> {
        match effect {
            Effect::PhaseChanged(phase) => self.screen.phase_changed(&phase),
            Effect::StartRecording => self.media.start_recording(),
            Effect::StopRecording => {
                return Some(Event::RecorderStopped(self.media.stop_recording().await));
            }
            Effect::StartTranscription => self.media.start_transcription(),
            Effect::StopTranscription => self.media.stop_transcription(),
            Effect::RequestFullscreen => self.screen.request_fullscreen(),
            Effect::ExitFullscreen => self.screen.exit_fullscreen(),
            Effect::ReleaseMedia => self.media.release(),
            Effect::RenderQuestion(view) => self.screen.render_question(&view),
            Effect::CountdownUpdated(remaining) => self.screen.countdown(remaining),
            Effect::ShowAlert(message) => self.screen.alert(&message),
            Effect::ShowError(message) => self.screen.error(&message),
            Effect::ReportTelemetry(event) => {
                let api = self.api.clone();
                tokio::spawn(async move {
                    if let Err(e) = api.report_telemetry(&event).await {
                        tracing::debug!("Telemetry report dropped: {}", e);
                    }
                });
            }
            Effect::Schedule { timer, after } => {
                let tx = self.timer_tx.clone();
                self.timers.retain(|handle| !handle.is_finished());
                self.timers.push(tokio::spawn(async move {
                    tokio::time::sleep(after).await;
                    let _ = tx.send(timer);
                }));
            }
            Effect::CancelTimers => self.cancel_timers(),
            Effect::Upload(payload) => {
                let outcome = match self.api.submit(&payload).await {
                    Ok(response) if response.success => Event::UploadSucceeded,
                    Ok(response) => Event::UploadFailed(response.message),
                    Err(ClientError::Api { message, .. }) => Event::UploadFailed(message),
                    Err(e) => {
                        tracing::warn!("Submission failed: {}", e);
                        Event::UploadFailed(
                            "Network error when submitting. Please try again.".to_string(),
                        )
                    }
                };
                return Some(outcome);
            }
            Effect::NavigateAway => {
                self.navigated = true;
                self.screen.navigate_away();
            }
        }
        None
    }

    fn cancel_timers(&mut self) {
        for handle in self.timers.drain(..) {
            handle.abort();
        }
    }
}
