//! # Tuner Session Module
//!
//! Owns one capture at a time and runs the sampling loop.
//!
//! The loop is cooperative and self-rescheduling: the host's refresh
//! callback hands the pending [`FrameRequest`] back to [`TunerSession::on_frame`],
//! which reads one snapshot and schedules the next request. Stopping clears
//! the request before tearing the capture down, so a late callback finds
//! nothing to run.

use crate::audio::{AudioInput, CaptureStream, DefaultInput};
use crate::config::{AnalyzerConfig, CaptureConfig, TunerConfig};
use crate::error::Result;
use crate::fft::FrequencyAnalyzer;
use crate::FrequencySnapshot;

/// Token for the next scheduled iteration of the sampling loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameRequest(u64);

impl FrameRequest {
    pub fn id(&self) -> u64 {
        self.0
    }
}

/// Stream and analysis context for an active capture.
struct ActiveCapture {
    stream: Box<dyn CaptureStream>,
    analyzer: FrequencyAnalyzer,
    incoming: Vec<f32>,
}

/// Transient tuner state: whether capture is running and the latest
/// snapshot.
pub struct TunerSession<I: AudioInput = DefaultInput> {
    input: I,
    analyzer_config: AnalyzerConfig,
    capture_config: CaptureConfig,
    capture: Option<ActiveCapture>,
    current_snapshot: FrequencySnapshot,
    pending_frame: Option<FrameRequest>,
    next_frame_id: u64,
    last_error: Option<String>,
}

impl TunerSession<DefaultInput> {
    /// Session reading from the default microphone.
    pub fn with_default_input(config: &TunerConfig) -> Self {
        Self::new(DefaultInput, config)
    }
}

impl<I: AudioInput> TunerSession<I> {
    pub fn new(input: I, config: &TunerConfig) -> Self {
        Self {
            input,
            analyzer_config: config.analyzer.clone(),
            capture_config: config.capture.clone(),
            capture: None,
            current_snapshot: FrequencySnapshot::default(),
            pending_frame: None,
            next_frame_id: 0,
            last_error: None,
        }
    }

    pub fn is_capturing(&self) -> bool {
        self.capture.is_some()
    }

    /// The latest snapshot; empty before the first frame and after stop.
    pub fn current_snapshot(&self) -> &FrequencySnapshot {
        &self.current_snapshot
    }

    pub fn pending_frame(&self) -> Option<FrameRequest> {
        self.pending_frame
    }

    /// Message of the most recent capture-setup failure, cleared by the
    /// next successful start.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Sample rate of the running capture.
    pub fn sample_rate(&self) -> Option<u32> {
        self.capture.as_ref().map(|c| c.stream.sample_rate())
    }

    /// Opens the input stream and analysis context, then schedules the
    /// first frame.
    ///
    /// On failure the error is logged, recorded in [`last_error`](Self::last_error)
    /// and returned; the session stays stopped. Starting an active session
    /// does nothing.
    pub fn start(&mut self) -> Result<()> {
        if self.is_capturing() {
            log::debug!("[SESSION] Start requested while already capturing");
            return Ok(());
        }

        match self.open_capture() {
            Ok(capture) => {
                log::info!(
                    "[SESSION] Capture started: {} Hz, {}-sample window",
                    capture.analyzer.sample_rate(),
                    capture.analyzer.fft_size()
                );
                self.capture = Some(capture);
                self.last_error = None;
                self.schedule_frame();
                Ok(())
            }
            Err(e) => {
                log::error!("[SESSION] Error setting up audio capture: {}", e);
                self.last_error = Some(e.to_string());
                Err(e)
            }
        }
    }

    fn open_capture(&mut self) -> Result<ActiveCapture> {
        let stream = self.input.open(&self.capture_config)?;
        let analyzer = FrequencyAnalyzer::new(self.analyzer_config.clone(), stream.sample_rate())?;
        Ok(ActiveCapture {
            stream,
            analyzer,
            incoming: Vec::new(),
        })
    }

    /// Cancels the pending frame and releases the stream and analyzer.
    pub fn stop(&mut self) {
        self.pending_frame = None;
        if let Some(capture) = self.capture.take() {
            drop(capture);
            log::info!("[SESSION] Capture stopped");
        }
        self.current_snapshot = FrequencySnapshot::default();
    }

    /// Stops an active session or starts an inactive one.
    ///
    /// # Returns
    /// * `Ok(capturing)` - Whether the session is capturing afterwards
    /// * `Err(e)` - Capture setup failed; the session is not capturing
    pub fn toggle(&mut self) -> Result<bool> {
        if self.is_capturing() {
            self.stop();
        } else {
            self.start()?;
        }
        Ok(self.is_capturing())
    }

    /// Runs one iteration of the sampling loop for `request`.
    ///
    /// Reads the samples that arrived since the previous frame, publishes a
    /// fresh snapshot and schedules the next request. Requests that are no
    /// longer pending (cancelled by [`stop`](Self::stop), or already run)
    /// are ignored.
    pub fn on_frame(&mut self, request: FrameRequest) -> Option<&FrequencySnapshot> {
        if self.pending_frame != Some(request) {
            log::trace!("[SESSION] Ignoring stale frame {}", request.id());
            return None;
        }
        self.pending_frame = None;

        let capture = self.capture.as_mut()?;
        capture.incoming.clear();
        capture.stream.drain_into(&mut capture.incoming);
        capture.analyzer.push_samples(&capture.incoming);
        self.current_snapshot = capture.analyzer.snapshot();

        self.schedule_frame();
        Some(&self.current_snapshot)
    }

    /// Runs the pending frame, if there is one.
    pub fn tick(&mut self) -> Option<&FrequencySnapshot> {
        let request = self.pending_frame?;
        self.on_frame(request)
    }

    fn schedule_frame(&mut self) {
        self.next_frame_id += 1;
        self.pending_frame = Some(FrameRequest(self.next_frame_id));
    }
}

impl<I: AudioInput> Drop for TunerSession<I> {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TunerError;

    struct Silence;

    impl CaptureStream for Silence {
        fn sample_rate(&self) -> u32 {
            44100
        }

        fn drain_into(&mut self, _out: &mut Vec<f32>) {}
    }

    struct SilentInput;

    impl AudioInput for SilentInput {
        fn open(&mut self, _config: &CaptureConfig) -> Result<Box<dyn CaptureStream>> {
            Ok(Box::new(Silence))
        }
    }

    struct MissingDevice;

    impl AudioInput for MissingDevice {
        fn open(&mut self, _config: &CaptureConfig) -> Result<Box<dyn CaptureStream>> {
            Err(TunerError::NoInputDevice)
        }
    }

    fn small_config() -> TunerConfig {
        let mut config = TunerConfig::default();
        config.analyzer.fft_size = 256;
        config
    }

    #[test]
    fn new_session_is_idle() {
        let session = TunerSession::new(SilentInput, &small_config());
        assert!(!session.is_capturing());
        assert!(session.pending_frame().is_none());
        assert!(session.current_snapshot().is_empty());
        assert!(session.last_error().is_none());
    }

    #[test]
    fn start_schedules_a_frame() {
        let mut session = TunerSession::new(SilentInput, &small_config());
        session.start().unwrap();
        assert!(session.is_capturing());
        assert!(session.pending_frame().is_some());
        assert_eq!(session.sample_rate(), Some(44100));
    }

    #[test]
    fn each_frame_reschedules_itself() {
        let mut session = TunerSession::new(SilentInput, &small_config());
        session.start().unwrap();
        let first = session.pending_frame().unwrap();
        assert_eq!(session.on_frame(first).map(|s| s.len()), Some(128));
        let second = session.pending_frame().unwrap();
        assert_ne!(first, second);
        // The consumed request cannot run twice.
        assert!(session.on_frame(first).is_none());
    }

    #[test]
    fn stop_cancels_pending_frame() {
        let mut session = TunerSession::new(SilentInput, &small_config());
        session.start().unwrap();
        let request = session.pending_frame().unwrap();
        session.stop();
        assert!(session.pending_frame().is_none());
        assert!(session.on_frame(request).is_none());
        assert!(session.tick().is_none());
        assert!(session.current_snapshot().is_empty());
    }

    #[test]
    fn toggle_twice_returns_to_idle() {
        let mut session = TunerSession::new(SilentInput, &small_config());
        assert!(session.toggle().unwrap());
        assert!(!session.toggle().unwrap());
        assert!(!session.is_capturing());
        assert!(session.pending_frame().is_none());
    }

    #[test]
    fn failed_start_stays_idle_and_records_error() {
        let mut session = TunerSession::new(MissingDevice, &small_config());
        let err = session.toggle().unwrap_err();
        assert!(err.is_capture_setup());
        assert!(!session.is_capturing());
        assert!(session.pending_frame().is_none());
        assert_eq!(session.last_error(), Some("no audio input device available"));
    }

    #[test]
    fn invalid_window_fails_start() {
        let mut config = small_config();
        config.analyzer.fft_size = 100;
        let mut session = TunerSession::new(SilentInput, &config);
        assert!(matches!(
            session.start(),
            Err(TunerError::InvalidWindowSize(100))
        ));
        assert!(!session.is_capturing());
    }
}
