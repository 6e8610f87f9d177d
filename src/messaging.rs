use crate::dom::Document;
use crate::error::PageError;
use crate::extract::extract_page_text;
use crate::settings::AccessibilitySettings;
use crate::style;
use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

/// One-shot request the popup sends to the active page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum PageRequest {
    ApplyAccessibility { settings: AccessibilitySettings },
    ResetAccessibility,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
pub enum PageStatus {
    Applied,
    Reset,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
pub struct PageResponse {
    pub status: PageStatus,
}

/// Content-script listener: realizes `request` against the page document.
pub fn handle_request(document: &mut Document, request: &PageRequest) -> PageResponse {
    match request {
        PageRequest::ApplyAccessibility { settings } => {
            style::apply(document, settings);
            PageResponse {
                status: PageStatus::Applied,
            }
        }
        PageRequest::ResetAccessibility => {
            let removed = style::reset(document);
            debug!(removed, "reset page styles");
            PageResponse {
                status: PageStatus::Reset,
            }
        }
    }
}

/// Popup-side view of the active tab.
#[async_trait]
pub trait PageChannel: Send + Sync {
    /// Delivers `request` to the page and waits for its acknowledgement.
    async fn send(&self, request: PageRequest) -> Result<PageResponse, PageError>;

    /// Runs the text extractor inside the page and returns its result.
    async fn extract_text(&self) -> Result<String, PageError>;
}

/// A tab whose document lives in this process.
#[derive(Clone, Default)]
pub struct InProcessTab {
    document: Arc<Mutex<Document>>,
}

impl InProcessTab {
    pub fn new(document: Document) -> Self {
        Self {
            document: Arc::new(Mutex::new(document)),
        }
    }

    pub fn snapshot(&self) -> Document {
        self.document.lock().clone()
    }
}

#[async_trait]
impl PageChannel for InProcessTab {
    async fn send(&self, request: PageRequest) -> Result<PageResponse, PageError> {
        let mut guard = self.document.lock();
        Ok(handle_request(&mut guard, &request))
    }

    async fn extract_text(&self) -> Result<String, PageError> {
        let guard = self.document.lock();
        Ok(extract_page_text(&guard))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::Element;
    use crate::settings::Theme;
    use serde_json::json;

    #[test]
    fn requests_use_action_tags() {
        let reset = serde_json::to_value(PageRequest::ResetAccessibility).unwrap();
        assert_eq!(reset, json!({ "action": "resetAccessibility" }));

        let apply: PageRequest = serde_json::from_value(json!({
            "action": "applyAccessibility",
            "settings": { "theme": "dark", "fontSize": 20 }
        }))
        .unwrap();
        match apply {
            PageRequest::ApplyAccessibility { settings } => {
                assert_eq!(settings.theme, Theme::Dark);
                assert_eq!(settings.font_size, 20);
                assert_eq!(settings.line_height, 1.5);
            }
            other => panic!("unexpected request {other:?}"),
        }
    }

    #[tokio::test]
    async fn in_process_tab_applies_and_resets() {
        let tab = InProcessTab::new(Document::new(vec![Element::with_text("p", "Hello.")]));
        let applied = tab
            .send(PageRequest::ApplyAccessibility {
                settings: AccessibilitySettings::default(),
            })
            .await
            .unwrap();
        assert_eq!(applied.status, PageStatus::Applied);
        assert_eq!(tab.snapshot().count_styles_with_id(style::STYLE_ELEMENT_ID), 1);

        let reset = tab.send(PageRequest::ResetAccessibility).await.unwrap();
        assert_eq!(reset.status, PageStatus::Reset);
        assert!(tab.snapshot().head.is_empty());

        let again = tab.send(PageRequest::ResetAccessibility).await.unwrap();
        assert_eq!(again.status, PageStatus::Reset);
        assert_eq!(tab.extract_text().await.unwrap(), "Hello.");
    }
}
