// SPDX-License-Identifier: GPL-3.0-only

//! Scanner session lifecycle
//!
//! ```text
//!            start                 pause (retain)
//!   Idle ─────────────▶ Running ◀───────────────▶ PausedRetained
//!                        │  ▲
//!        pause (release) │  │ resume: reacquire device + reinit engine
//!                        ▼  │
//!                    PausedReleased
//!
//!   Running ──(first detection, stop-after-detection)──▶ StoppedAfterDetection
//!   StoppedAfterDetection ──restart──▶ Running
//! ```
//!
//! The controller owns the camera stream and the overlay surface; the
//! [`FrameScheduler`] it drives owns the detection engines.

use crate::app::frame_processor::{CancelToken, FrameScheduler, TickOutcome};
use crate::app::qr_overlay::OverlaySurface;
use crate::app::state::{EventSink, PlaybackCommand, PlaybackState, ScannerEvent};
use crate::backends::camera::{CameraFacing, CameraProvider, CameraStream};
use crate::backends::detection::selector::FallbackPolicy;
use crate::backends::detection::{DetectionBackend, DetectionEngineSelector, EngineKind};
use crate::config::ScannerConfig;
use crate::errors::{DeviceError, ScanError, ScanResult};
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tracing::{Instrument, debug, info, info_span, warn};
use uuid::Uuid;

/// Sends commands to a running [`PlaybackController::run`] loop
///
/// Commands that stop scanning invalidate the frame in flight right away,
/// before the loop gets around to applying them.
#[derive(Debug, Clone)]
pub struct PlaybackHandle {
    sender: mpsc::UnboundedSender<PlaybackCommand>,
    cancel: CancelToken,
}

impl PlaybackHandle {
    /// Queue a command; `false` if the controller is gone
    pub fn send(&self, command: PlaybackCommand) -> bool {
        if matches!(
            command,
            PlaybackCommand::Pause
                | PlaybackCommand::SetPaused(true)
                | PlaybackCommand::SwitchCamera
                | PlaybackCommand::Restart
                | PlaybackCommand::Shutdown
        ) {
            self.cancel.cancel();
        }
        self.sender.send(command).is_ok()
    }

    pub fn pause(&self) -> bool {
        self.send(PlaybackCommand::Pause)
    }

    pub fn resume(&self) -> bool {
        self.send(PlaybackCommand::Resume)
    }

    pub fn switch_camera(&self) -> bool {
        self.send(PlaybackCommand::SwitchCamera)
    }

    pub fn restart(&self) -> bool {
        self.send(PlaybackCommand::Restart)
    }

    pub fn shutdown(&self) -> bool {
        self.send(PlaybackCommand::Shutdown)
    }
}

/// Drives one scanner session
pub struct PlaybackController<S> {
    session: Uuid,
    provider: Box<dyn CameraProvider>,
    stream: Option<Box<dyn CameraStream>>,
    scheduler: FrameScheduler,
    surface: S,
    events: EventSink,
    state: PlaybackState,
    facing: CameraFacing,
    torch: bool,
}

impl<S: OverlaySurface> PlaybackController<S> {
    /// Create an idle controller
    ///
    /// `native` is the host detector, if there is one; `fallback` is always
    /// required.
    pub fn new(
        config: ScannerConfig,
        provider: Box<dyn CameraProvider>,
        native: Option<Box<dyn DetectionBackend>>,
        fallback: Box<dyn DetectionBackend>,
        surface: S,
        events: EventSink,
    ) -> Self {
        let config = config.sanitized();
        let selector = DetectionEngineSelector::new(
            native,
            fallback,
            FallbackPolicy::from(&config),
            events.clone(),
        );
        let facing = config.facing;
        Self {
            session: Uuid::new_v4(),
            provider,
            stream: None,
            scheduler: FrameScheduler::new(config, selector, events.clone()),
            surface,
            events,
            state: PlaybackState::Idle,
            facing,
            torch: false,
        }
    }

    pub fn session_id(&self) -> Uuid {
        self.session
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn facing(&self) -> CameraFacing {
        self.facing
    }

    pub fn config(&self) -> &ScannerConfig {
        self.scheduler.config()
    }

    pub fn active_engine(&self) -> Option<EngineKind> {
        self.scheduler.active_engine()
    }

    /// Whether a camera device is currently held
    pub fn has_device(&self) -> bool {
        self.stream.is_some()
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    /// Command channel for [`run`](Self::run)
    pub fn command_channel(&self) -> (PlaybackHandle, mpsc::UnboundedReceiver<PlaybackCommand>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (
            PlaybackHandle {
                sender,
                cancel: self.scheduler.cancel_token(),
            },
            receiver,
        )
    }

    /// Acquire the camera, pick a detection engine and start scheduling
    ///
    /// Starts paused when the configuration says so. Failures are emitted
    /// once and leave the controller idle.
    pub async fn start(&mut self) -> ScanResult<()> {
        if self.state != PlaybackState::Idle {
            debug!(state = %self.state, "Scanner already started");
            return Ok(());
        }
        info!(session = %self.session, facing = %self.facing, "Starting scanner");
        self.open_session().await?;
        self.set_state(PlaybackState::Running);

        if self.scheduler.config().paused {
            self.pause()?;
        }
        Ok(())
    }

    /// Stop scheduling; the device is kept or released per `release_on_pause`
    pub fn pause(&mut self) -> ScanResult<()> {
        if self.state != PlaybackState::Running {
            debug!(state = %self.state, "Pause ignored");
            return Ok(());
        }
        self.scheduler.cancel_token().cancel();

        if self.scheduler.config().release_on_pause {
            self.close_session();
            self.set_state(PlaybackState::PausedReleased);
        } else {
            if let Some(stream) = self.stream.as_mut() {
                stream.pause();
            }
            self.set_state(PlaybackState::PausedRetained);
        }
        Ok(())
    }

    /// Continue scanning after a pause
    ///
    /// Does not leave [`PlaybackState::StoppedAfterDetection`]; use
    /// [`restart`](Self::restart) for that.
    pub async fn resume(&mut self) -> ScanResult<()> {
        match self.state {
            PlaybackState::Running => Ok(()),
            PlaybackState::Idle => self.start().await,
            PlaybackState::PausedRetained => {
                let Some(stream) = self.stream.as_mut() else {
                    return Err(self.report(ScanError::Device(DeviceError::NotAcquired)));
                };
                stream.resume();
                self.set_state(PlaybackState::Running);
                Ok(())
            }
            PlaybackState::PausedReleased => {
                self.open_session().await?;
                self.set_state(PlaybackState::Running);
                Ok(())
            }
            PlaybackState::StoppedAfterDetection => {
                warn!("Scanner stopped after a detection; restart it to scan again");
                Ok(())
            }
        }
    }

    /// Apply the pause flag
    pub async fn set_paused(&mut self, paused: bool) -> ScanResult<()> {
        if paused {
            self.pause()
        } else {
            self.resume().await
        }
    }

    /// Tear everything down and start scanning again
    pub async fn restart(&mut self) -> ScanResult<()> {
        info!(state = %self.state, "Restarting scanner");
        self.close_session();
        self.set_state(PlaybackState::Idle);
        self.start().await
    }

    /// Toggle between front and back camera
    ///
    /// The engine choice is re-evaluated from scratch. A running scanner
    /// keeps running on the new camera. A paused one ends up paused without
    /// a device, and the engine is chosen again when it resumes.
    pub async fn switch_camera(&mut self) -> ScanResult<()> {
        let previous = self.state;
        self.facing = self.facing.toggled();
        info!(facing = %self.facing, state = %previous, "Switching camera");
        if previous == PlaybackState::Idle {
            return Ok(());
        }

        self.close_session();
        match previous {
            PlaybackState::Running => {
                if let Err(e) = self.open_session().await {
                    self.set_state(PlaybackState::Idle);
                    return Err(e);
                }
            }
            PlaybackState::PausedRetained => self.set_state(PlaybackState::PausedReleased),
            _ => {}
        }
        Ok(())
    }

    /// Turn the torch on or off; a no-op when the camera has none
    pub fn set_torch(&mut self, enabled: bool) -> ScanResult<()> {
        self.torch = enabled;
        match self.stream.as_mut() {
            Some(stream) if stream.supports_torch() => {
                stream.apply_torch(enabled)?;
                debug!(enabled, "Torch updated");
            }
            Some(_) => debug!("Camera has no torch"),
            None => debug!(enabled, "Torch will be applied when a camera is acquired"),
        }
        Ok(())
    }

    /// Release everything and go idle
    pub fn shutdown(&mut self) {
        info!(session = %self.session, "Shutting down scanner");
        self.close_session();
        self.set_state(PlaybackState::Idle);
    }

    /// Run one scheduled tick; `None` when not running
    pub async fn step(&mut self) -> Option<TickOutcome> {
        if !self.state.is_running() {
            return None;
        }
        let Some(stream) = self.stream.as_mut() else {
            warn!("Running without a camera device");
            return None;
        };

        let outcome = self.scheduler.tick(stream.as_mut(), &mut self.surface).await;
        match &outcome {
            TickOutcome::StoppedAfterDetection => {
                if self.scheduler.config().release_on_pause {
                    self.close_session();
                } else if let Some(stream) = self.stream.as_mut() {
                    stream.pause();
                }
                self.set_state(PlaybackState::StoppedAfterDetection);
            }
            TickOutcome::Fatal(_) => {
                self.close_session();
                self.set_state(PlaybackState::Idle);
            }
            _ => {}
        }
        Some(outcome)
    }

    /// Drive the session until shut down
    ///
    /// Ticks at the configured cadence while running and applies commands
    /// between ticks.
    pub async fn run(
        &mut self,
        mut commands: mpsc::UnboundedReceiver<PlaybackCommand>,
    ) -> ScanResult<()> {
        let span = info_span!("scanner", session = %self.session);
        async move {
            let mut ticker = tokio::time::interval(self.scheduler.config().tick_interval());
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    biased;
                    command = commands.recv() => {
                        match command {
                            None | Some(PlaybackCommand::Shutdown) => break,
                            Some(command) => {
                                if let Err(e) = self.apply(command).await {
                                    debug!(?command, error = %e, "Command failed");
                                }
                            }
                        }
                    }
                    _ = ticker.tick(), if self.state.is_running() => {
                        self.step().await;
                    }
                }
            }

            self.shutdown();
            Ok(())
        }
        .instrument(span)
        .await
    }

    async fn apply(&mut self, command: PlaybackCommand) -> ScanResult<()> {
        debug!(?command, "Applying playback command");
        match command {
            PlaybackCommand::Pause => self.pause(),
            PlaybackCommand::Resume => self.resume().await,
            PlaybackCommand::SetPaused(paused) => self.set_paused(paused).await,
            PlaybackCommand::SwitchCamera => self.switch_camera().await,
            PlaybackCommand::Restart => self.restart().await,
            PlaybackCommand::SetTorch(enabled) => self.set_torch(enabled),
            PlaybackCommand::Shutdown => {
                self.shutdown();
                Ok(())
            }
        }
    }

    /// Acquire the device and initialize a detection engine
    async fn open_session(&mut self) -> ScanResult<()> {
        let mut stream = match self.provider.acquire(self.facing).await {
            Ok(stream) => stream,
            Err(e) => return Err(self.report(ScanError::Device(e))),
        };

        if let Err(e) = self.scheduler.initialize_engine().await {
            stream.release();
            return Err(self.report(ScanError::Backend(e)));
        }

        if self.torch && stream.supports_torch() {
            if let Err(e) = stream.apply_torch(true) {
                warn!(error = %e, "Failed to restore torch");
            }
        }

        self.scheduler.reset();
        self.stream = Some(stream);
        Ok(())
    }

    /// Cancel in-flight work, release the device and dispose the engines
    fn close_session(&mut self) {
        self.scheduler.cancel_token().cancel();
        if let Some(stream) = self.stream.take() {
            stream.release();
        }
        self.scheduler.dispose_engine();
    }

    fn set_state(&mut self, state: PlaybackState) {
        if self.state == state {
            return;
        }
        info!(from = %self.state, to = %state, "Playback state changed");
        self.state = state;
        self.events.emit(ScannerEvent::StateChanged(state));
    }

    fn report(&self, error: ScanError) -> ScanError {
        warn!(error = %error, "Scanner error");
        self.events.emit(ScannerEvent::Error(error.clone()));
        error
    }
}

impl<S> Drop for PlaybackController<S> {
    fn drop(&mut self) {
        if let Some(stream) = self.stream.take() {
            stream.release();
        }
    }
}
