//! Page accessibility adjustments, readable-text extraction and AI summaries.
//!
//! The page side ([`style`], [`extract`], [`messaging::handle_request`])
//! operates on a [`dom::Document`]. The popup side ([`popup`]) drives it
//! through the [`messaging::PageChannel`] seam, persists preferences through
//! [`settings::StorageArea`], and fetches summaries from the relay
//! ([`relay`], behind the `relay` feature) via [`summary::SummaryClient`].

pub mod dom;
pub mod error;
pub mod extract;
pub mod gemini;
pub mod messaging;
pub mod popup;
#[cfg(feature = "relay")]
pub mod relay;
pub mod settings;
pub mod speech;
pub mod style;
pub mod summary;
pub mod text;

pub use dom::{Document, Element};
pub use error::{GeminiError, PageError, StorageError, SummaryError};
pub use extract::extract_page_text;
pub use messaging::{InProcessTab, PageChannel, PageRequest, PageResponse, PageStatus};
pub use popup::{PopupController, PopupServices, PopupSession, PopupView};
pub use settings::{
    AccessibilitySettings, DisplayMode, ExtensionState, StorageArea, SyncStorage, Theme,
};
pub use style::{STYLE_ELEMENT_ID, build_css};
pub use text::{format_as_bullets, generate_answer};
