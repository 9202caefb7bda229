//! # Concert A - Tuner GUI
//!
//! A start/stop toggle and a status line over the headless tuner session.
//!
//! ## Architecture
//! - **Main Thread**: Iced application owning the [`TunerSession`]
//! - **Capture Thread**: owned by the core crate, feeds samples over a channel
//! - **Updates**: a frame timer subscription that exists only while the
//!   session has a frame pending, so stopping ends the loop

mod cli;

use clap::Parser;
use concert_a_core::monitor::{MonitorReading, TargetMonitor};
use concert_a_core::pitch::Intonation;
use concert_a_core::{TunerConfig, TunerSession};
use iced::widget::{button, column, text};
use iced::{Element, Subscription, Task, Theme};
use std::time::Duration;

/// Main entry point for the tuner.
pub fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = cli::Args::parse();
    let config = args.resolve_config()?;

    log::info!(
        "[MAIN] Starting tuner, target {} Hz",
        config.target.frequency
    );
    iced::application("Sound Testing Station", TunerApp::update, TunerApp::view)
        .subscription(TunerApp::subscription)
        .theme(TunerApp::theme)
        .run_with(move || (TunerApp::new(config), Task::none()))?;
    log::info!("[MAIN] Application finished");
    Ok(())
}

/// Application message types.
#[derive(Debug, Clone)]
pub enum Message {
    ToggleRecording, // Start/stop button pressed
    Frame,           // Display refresh: run the pending sampling frame
}

struct TunerApp {
    session: TunerSession,
    monitor: TargetMonitor,
    frame_interval: Duration,
    last_reading: Option<MonitorReading>,
}

impl TunerApp {
    fn new(config: TunerConfig) -> Self {
        Self {
            session: TunerSession::with_default_input(&config),
            monitor: TargetMonitor::new(config.target.clone()),
            frame_interval: config.frame_interval(),
            last_reading: None,
        }
    }

    fn update(&mut self, message: Message) {
        match message {
            Message::ToggleRecording => {
                // Failures are logged and recorded by the session itself.
                match self.session.toggle() {
                    Ok(true) => log::info!("[MAIN] Listening..."),
                    Ok(false) => {
                        self.monitor.reset();
                        self.last_reading = None;
                        log::info!("[MAIN] Not listening");
                    }
                    Err(_) => {}
                }
            }
            Message::Frame => {
                if let Some(snapshot) = self.session.tick() {
                    self.last_reading = self.monitor.observe(snapshot);
                }
            }
        }
    }

    fn view(&self) -> Element<'_, Message> {
        let capturing = self.session.is_capturing();
        let label = if capturing {
            "Stop Recording"
        } else {
            "Start Recording"
        };
        let status = if capturing {
            "Listening..."
        } else {
            "Not Listening"
        };

        let mut content = column![
            button(text(label)).on_press(Message::ToggleRecording),
            text(status),
        ]
        .spacing(10)
        .padding(20);

        if let Some(error) = self.session.last_error() {
            content = content.push(text(format!("Microphone unavailable: {}", error)));
        }
        if let Some(line) = self.reading_line() {
            content = content.push(text(line));
        }

        content.into()
    }

    fn reading_line(&self) -> Option<String> {
        let reading = self.last_reading?;
        if !reading.reading.is_present() {
            return None;
        }
        let note = self.monitor.note_name();
        let line = match (reading.peak, reading.intonation) {
            (Some(peak), Some(Intonation::InTune)) => {
                format!("{} in tune ({:.1} Hz)", note, peak.frequency)
            }
            (Some(peak), Some(Intonation::Sharp)) => {
                format!("{} sharp by {:.0} cents ({:.1} Hz)", note, peak.cents, peak.frequency)
            }
            (Some(peak), Some(Intonation::Flat)) => {
                format!("{} flat by {:.0} cents ({:.1} Hz)", note, -peak.cents, peak.frequency)
            }
            _ => format!(
                "Signal near {} Hz, amplitude {}",
                self.monitor.target_frequency(),
                reading.reading.amplitude
            ),
        };
        Some(line)
    }

    /// Ticks at the configured frame interval while a frame is pending.
    fn subscription(&self) -> Subscription<Message> {
        if self.session.pending_frame().is_some() {
            iced::time::every(self.frame_interval).map(|_| Message::Frame)
        } else {
            Subscription::none()
        }
    }

    fn theme(&self) -> Theme {
        Theme::Dark
    }
}
