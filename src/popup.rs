//! Popup controller: turns user actions into calls on storage, the active
//! page, the summary relay and the speech engine, and keeps the rendered UI
//! state in a [`PopupView`].

use crate::error::PageError;
use crate::messaging::{PageChannel, PageRequest};
use crate::settings::{
    AccessibilitySettings, DisplayMode, Preferences, StorageArea, Theme, keys, settings_entries,
    single_entry,
};
use crate::speech::{ReadButton, STOP_LABEL, SpeechEngine, Utterance};
use crate::summary::SummaryClient;
use crate::text::{bullet_items, format_as_bullets, generate_answer};
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{debug, warn};

pub const ANALYZE_IDLE_LABEL: &str = "📊 Analyze This Page";
pub const ANALYZE_BUSY_LABEL: &str = "Processing...";
pub const SUMMARY_PENDING: &str = "Generating AI summary...";
pub const SIMPLIFIED_PENDING: &str = "Generating simplified version...";
pub const SUMMARY_FAILED: &str = "Error generating AI summary.";
pub const SIMPLIFIED_FAILED: &str = "Error generating AI simplified version.";
pub const ALERT_NO_TEXT: &str = "No text found on this page.";
pub const ALERT_NO_QUESTION: &str = "Please enter a question";
pub const ALERT_DISABLED: &str = "Turn on \"Enable AccessNow on this page\" first.";
pub const ALERT_APPLIED: &str = "✓ Accessibility settings applied to page!";
pub const ALERT_NOTHING_TO_READ: &str = "Please analyze the page first";

#[derive(Debug, Clone, Copy, Eq, PartialEq, Default)]
pub enum Phase {
    #[default]
    Idle,
    Analyzing,
    ResultsShown,
}

/// Popup-local state; created when the popup opens, dropped when it closes.
#[derive(Debug, Clone, Default)]
pub struct PopupSession {
    pub phase: Phase,
    /// Text of the last analyzed page.
    pub page_text: String,
    pub summary: Option<String>,
    pub mode: DisplayMode,
    pub settings: AccessibilitySettings,
    pub extension_enabled: bool,
    pub current_utterance: Option<Utterance>,
}

/// A results pane: its plain text, plus markup when rendered as a list.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Pane {
    pub text: String,
    pub html: Option<String>,
}

impl Pane {
    fn plain(text: &str) -> Self {
        Self {
            text: text.to_string(),
            html: None,
        }
    }

    fn render(text: &str, mode: DisplayMode) -> Self {
        match mode {
            DisplayMode::Visual => Self::plain(text),
            DisplayMode::Reading => Self {
                text: bullet_items(text).join(" "),
                html: Some(format_as_bullets(text)),
            },
        }
    }
}

#[derive(Debug, Clone)]
pub struct PopupView {
    pub body_class: String,
    pub analyze_label: String,
    pub analyze_disabled: bool,
    pub summary: Pane,
    /// Legacy pane; mirrors the summary.
    pub simplified: Pane,
    pub results_visible: bool,
    pub qa_visible: bool,
    pub answer: Option<String>,
    pub read_labels: [String; 3],
    pub font_size_label: String,
    pub letter_spacing_label: String,
    pub line_height_label: String,
    pub alerts: Vec<String>,
}

impl Default for PopupView {
    fn default() -> Self {
        let settings = AccessibilitySettings::default();
        Self {
            body_class: DisplayMode::Visual.body_class(),
            analyze_label: ANALYZE_IDLE_LABEL.to_string(),
            analyze_disabled: false,
            summary: Pane::default(),
            simplified: Pane::default(),
            results_visible: false,
            qa_visible: false,
            answer: None,
            read_labels: ReadButton::ALL.map(|button| button.idle_label().to_string()),
            font_size_label: font_size_label(settings.font_size),
            letter_spacing_label: letter_spacing_label(settings.letter_spacing),
            line_height_label: line_height_label(settings.line_height),
            alerts: Vec::new(),
        }
    }
}

impl PopupView {
    pub fn read_label(&self, button: ReadButton) -> &str {
        &self.read_labels[button as usize]
    }
}

pub fn font_size_label(size: u32) -> String {
    format!("{size}px")
}

pub fn letter_spacing_label(spacing: f64) -> String {
    if spacing == 0.0 {
        "Normal".to_string()
    } else {
        format!("+{:.0}%", spacing * 100.0)
    }
}

pub fn line_height_label(height: f64) -> String {
    format!("{height}x")
}

/// Collaborators the popup talks to.
#[derive(Clone)]
pub struct PopupServices {
    pub storage: Arc<dyn StorageArea>,
    pub page: Arc<dyn PageChannel>,
    pub summarizer: Arc<dyn SummaryClient>,
    pub speech: Arc<dyn SpeechEngine>,
}

pub struct PopupController {
    services: PopupServices,
    session: PopupSession,
    view: PopupView,
}

impl PopupController {
    /// Opens the popup, restoring persisted preferences. Storage failures
    /// leave the built-in defaults in place.
    pub async fn open(services: PopupServices) -> Self {
        let prefs = match services.storage.get(&keys::ALL).await {
            Ok(values) => Preferences::from_map(&values),
            Err(err) => {
                warn!(error = %err, "failed to load preferences; using defaults");
                Preferences::default()
            }
        };
        let state = prefs.state();
        let settings = prefs.settings();
        let mut controller = Self {
            services,
            session: PopupSession {
                mode: state.current_mode,
                settings: settings.clone(),
                extension_enabled: state.extension_enabled,
                ..PopupSession::default()
            },
            view: PopupView::default(),
        };
        controller.view.body_class = state.current_mode.body_class();
        controller.view.font_size_label = font_size_label(settings.font_size);
        controller.view.letter_spacing_label = letter_spacing_label(settings.letter_spacing);
        controller.view.line_height_label = line_height_label(settings.line_height);
        debug!(mode = state.current_mode.as_str(), enabled = state.extension_enabled, "popup opened");
        controller
    }

    pub fn session(&self) -> &PopupSession {
        &self.session
    }

    pub fn view(&self) -> &PopupView {
        &self.view
    }

    /// Drains alerts raised since the last call.
    pub fn take_alerts(&mut self) -> Vec<String> {
        std::mem::take(&mut self.view.alerts)
    }

    fn alert(&mut self, message: impl Into<String>) {
        let message = message.into();
        debug!(%message, "alert");
        self.view.alerts.push(message);
    }

    async fn persist(&self, entries: Map<String, Value>) {
        if let Err(err) = self.services.storage.set(entries).await {
            warn!(error = %err, "failed to persist preferences");
        }
    }

    /// Switches layout mode. Results already on screen are left as they are.
    pub async fn set_mode(&mut self, mode: DisplayMode) {
        self.session.mode = mode;
        self.view.body_class = mode.body_class();
        self.persist(single_entry(keys::CURRENT_MODE, mode.as_str()))
            .await;
    }

    pub async fn set_extension_enabled(&mut self, enabled: bool) {
        self.session.extension_enabled = enabled;
        self.persist(single_entry(keys::EXTENSION_ENABLED, enabled))
            .await;
        if !enabled {
            if let Err(err) = self
                .services
                .page
                .send(PageRequest::ResetAccessibility)
                .await
            {
                warn!(error = %err, "failed to reset page styles");
            }
        }
    }

    pub async fn set_theme(&mut self, theme: Theme) {
        self.session.settings.theme = theme;
        self.persist(single_entry(keys::CURRENT_THEME, theme.as_str()))
            .await;
    }

    pub async fn set_font_size(&mut self, size: u32) {
        self.session.settings.font_size = size;
        self.view.font_size_label = font_size_label(size);
        self.persist(single_entry(keys::FONT_SIZE, size)).await;
    }

    pub async fn set_dyslexia_font(&mut self, enabled: bool) {
        self.session.settings.dyslexia_font = enabled;
        self.persist(single_entry(keys::DYSLEXIA_FONT, enabled))
            .await;
    }

    pub async fn set_letter_spacing(&mut self, spacing: f64) {
        self.session.settings.letter_spacing = spacing;
        self.view.letter_spacing_label = letter_spacing_label(spacing);
        self.persist(single_entry(keys::LETTER_SPACING, spacing))
            .await;
    }

    pub async fn set_line_height(&mut self, height: f64) {
        self.session.settings.line_height = height;
        self.view.line_height_label = line_height_label(height);
        self.persist(single_entry(keys::LINE_HEIGHT, height))
            .await;
    }

    /// Sends the current control values to the page and stores them.
    pub async fn apply_settings(&mut self) {
        if !self.session.extension_enabled {
            self.alert(ALERT_DISABLED);
            return;
        }
        let settings = self.session.settings.normalized();
        let request = PageRequest::ApplyAccessibility {
            settings: settings.clone(),
        };
        match self.services.page.send(request).await {
            Ok(_) => self.alert(ALERT_APPLIED),
            Err(err) => {
                warn!(error = %err, "failed to apply page styles");
                self.alert(format!("Error applying settings: {err}"));
            }
        }
        self.persist(settings_entries(&settings)).await;
    }

    /// Extracts the page text and fetches its summary. The analyze button
    /// is re-enabled however the flow ends.
    pub async fn analyze(&mut self) {
        self.view.analyze_label = ANALYZE_BUSY_LABEL.to_string();
        self.view.analyze_disabled = true;

        if let Err(err) = self.run_analysis().await {
            warn!(error = %err, "page analysis failed");
            self.session.phase = Phase::Idle;
            self.alert(format!("Error analyzing page: {err}"));
        }

        self.view.analyze_label = ANALYZE_IDLE_LABEL.to_string();
        self.view.analyze_disabled = false;
    }

    async fn run_analysis(&mut self) -> Result<(), PageError> {
        let text = self.services.page.extract_text().await?;
        self.session.page_text = text;
        if self.session.page_text.trim().is_empty() {
            self.session.phase = Phase::Idle;
            self.alert(ALERT_NO_TEXT);
            return Ok(());
        }

        self.session.phase = Phase::Analyzing;
        self.display_results().await;
        self.view.results_visible = true;
        self.view.qa_visible = true;
        self.session.phase = Phase::ResultsShown;
        Ok(())
    }

    async fn display_results(&mut self) {
        self.view.summary = Pane::plain(SUMMARY_PENDING);
        self.view.simplified = Pane::plain(SIMPLIFIED_PENDING);

        match self
            .services
            .summarizer
            .summarize(&self.session.page_text)
            .await
        {
            Ok(summary) => {
                let mode = self.session.mode;
                self.view.summary = Pane::render(&summary, mode);
                self.view.simplified = Pane::render(&summary, mode);
                self.session.summary = Some(summary);
            }
            Err(err) => {
                warn!(error = %err, "summary request failed");
                self.session.summary = None;
                self.view.summary = Pane::plain(SUMMARY_FAILED);
                self.view.simplified = Pane::plain(SIMPLIFIED_FAILED);
            }
        }
    }

    /// Starts reading the pane bound to `button`, or stops any speech in progress.
    pub fn read_aloud(&mut self, button: ReadButton) {
        if self.services.speech.is_speaking() {
            self.services.speech.cancel();
            self.session.current_utterance = None;
            self.reset_read_buttons();
            return;
        }

        let pane = match button {
            ReadButton::Main | ReadButton::Summary => &self.view.summary,
            ReadButton::Simplified => &self.view.simplified,
        };
        if pane.text.trim().is_empty() {
            self.alert(ALERT_NOTHING_TO_READ);
            return;
        }

        let utterance = Utterance::new(pane.text.clone());
        self.reset_read_buttons();
        self.view.read_labels[button as usize] = STOP_LABEL.to_string();
        self.session.current_utterance = Some(utterance.clone());
        self.services.speech.speak(utterance);
    }

    /// Called when the engine reports the utterance ended or failed.
    pub fn speech_finished(&mut self) {
        self.session.current_utterance = None;
        self.reset_read_buttons();
    }

    fn reset_read_buttons(&mut self) {
        self.view.read_labels = ReadButton::ALL.map(|button| button.idle_label().to_string());
    }

    pub fn ask(&mut self, question: &str) {
        if question.trim().is_empty() {
            self.alert(ALERT_NO_QUESTION);
            return;
        }
        self.view.answer = Some(generate_answer(&self.session.page_text, question));
    }
}
