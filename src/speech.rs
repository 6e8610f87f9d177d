use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::info;

#[derive(Debug, Clone, PartialEq)]
pub struct Utterance {
    pub text: String,
    pub rate: f32,
    pub pitch: f32,
}

impl Utterance {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            rate: 1.0,
            pitch: 1.0,
        }
    }
}

/// Shared text-to-speech engine; at most one utterance plays at a time.
///
/// Completion is reported back by the host calling
/// [`PopupController::speech_finished`](crate::popup::PopupController::speech_finished).
pub trait SpeechEngine: Send + Sync {
    fn is_speaking(&self) -> bool;
    fn speak(&self, utterance: Utterance);
    fn cancel(&self);
}

/// The three read-aloud buttons.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum ReadButton {
    Main,
    Summary,
    Simplified,
}

pub const STOP_LABEL: &str = "⏸ Stop reading";

impl ReadButton {
    pub const ALL: [ReadButton; 3] = [ReadButton::Main, ReadButton::Summary, ReadButton::Simplified];

    pub fn idle_label(&self) -> &'static str {
        match self {
            ReadButton::Main => "🔊 Read Aloud",
            ReadButton::Summary => "Read summary aloud",
            ReadButton::Simplified => "Read simplified aloud",
        }
    }
}

/// Engine without audio output: logs utterances and tracks the speaking flag.
#[derive(Clone, Default)]
pub struct HeadlessSpeech {
    speaking: Arc<AtomicBool>,
}

impl HeadlessSpeech {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks the current utterance as finished.
    pub fn finish(&self) {
        self.speaking.store(false, Ordering::SeqCst);
    }
}

impl SpeechEngine for HeadlessSpeech {
    fn is_speaking(&self) -> bool {
        self.speaking.load(Ordering::SeqCst)
    }

    fn speak(&self, utterance: Utterance) {
        info!(
            chars = utterance.text.chars().count(),
            rate = utterance.rate,
            pitch = utterance.pitch,
            "speaking"
        );
        self.speaking.store(true, Ordering::SeqCst);
    }

    fn cancel(&self) {
        self.speaking.store(false, Ordering::SeqCst);
    }
}
