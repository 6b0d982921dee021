//! Browser action port.
//!
//! `BrowserAdapter` is the narrow surface the runner drives the page
//! through. Implementations wrap a real automation backend; the crate
//! ships [`RecordingBrowser`] for tests and dry runs.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;

use stride_core_types::PageRoute;

use crate::errors::BrowserError;

/// Primitive page interactions the runner needs.
///
/// Every call targets an explicit [`PageRoute`] so one adapter can serve
/// several concurrent sessions.
#[async_trait]
pub trait BrowserAdapter: Send + Sync {
    /// Click at viewport coordinates.
    async fn click(&self, route: &PageRoute, x: f64, y: f64) -> Result<(), BrowserError>;

    /// Click the element with the given snapshot id.
    async fn click_element(&self, route: &PageRoute, element_id: u64) -> Result<(), BrowserError>;

    /// Type text into the focused element.
    async fn type_text(&self, route: &PageRoute, text: &str) -> Result<(), BrowserError>;

    /// Press a named key or chord, e.g. `Enter` or `Control+a`.
    async fn press_key(&self, route: &PageRoute, key: &str) -> Result<(), BrowserError>;

    /// Evaluate a script in the page and return its JSON result.
    async fn evaluate(&self, route: &PageRoute, script: &str) -> Result<Value, BrowserError>;

    /// Capture a screenshot of the page as encoded image bytes.
    async fn screenshot(&self, route: &PageRoute) -> Result<Vec<u8>, BrowserError>;
}

/// In-memory adapter that records every interaction instead of driving
/// a real page.
#[derive(Default)]
pub struct RecordingBrowser {
    clicks: Mutex<Vec<(f64, f64)>>,
    element_clicks: Mutex<Vec<u64>>,
    typed: Mutex<Vec<String>>,
    keys: Mutex<Vec<String>>,
    scripts: Mutex<Vec<String>>,
    evaluate_result: Mutex<Value>,
    screenshot_bytes: Mutex<Vec<u8>>,
    fail_element_clicks: Mutex<Option<BrowserError>>,
    fail_screenshots: Mutex<Option<BrowserError>>,
}

impl RecordingBrowser {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            evaluate_result: Mutex::new(Value::Bool(false)),
            screenshot_bytes: Mutex::new(vec![0x89, b'P', b'N', b'G']),
            ..Self::default()
        })
    }

    /// Fix the result every `evaluate` call returns.
    pub fn set_evaluate_result(&self, value: Value) {
        *self.evaluate_result.lock() = value;
    }

    /// Make every `click_element` call fail with the given error.
    pub fn fail_element_clicks(&self, error: BrowserError) {
        *self.fail_element_clicks.lock() = Some(error);
    }

    /// Make every `screenshot` call fail with the given error.
    pub fn fail_screenshots(&self, error: BrowserError) {
        *self.fail_screenshots.lock() = Some(error);
    }

    pub fn clicks(&self) -> Vec<(f64, f64)> {
        self.clicks.lock().clone()
    }

    pub fn element_clicks(&self) -> Vec<u64> {
        self.element_clicks.lock().clone()
    }

    pub fn typed(&self) -> Vec<String> {
        self.typed.lock().clone()
    }

    pub fn keys(&self) -> Vec<String> {
        self.keys.lock().clone()
    }

    pub fn scripts(&self) -> Vec<String> {
        self.scripts.lock().clone()
    }
}

#[async_trait]
impl BrowserAdapter for RecordingBrowser {
    async fn click(&self, _route: &PageRoute, x: f64, y: f64) -> Result<(), BrowserError> {
        self.clicks.lock().push((x, y));
        Ok(())
    }

    async fn click_element(&self, _route: &PageRoute, element_id: u64) -> Result<(), BrowserError> {
        if let Some(err) = self.fail_element_clicks.lock().clone() {
            return Err(err);
        }
        self.element_clicks.lock().push(element_id);
        Ok(())
    }

    async fn type_text(&self, _route: &PageRoute, text: &str) -> Result<(), BrowserError> {
        self.typed.lock().push(text.to_string());
        Ok(())
    }

    async fn press_key(&self, _route: &PageRoute, key: &str) -> Result<(), BrowserError> {
        self.keys.lock().push(key.to_string());
        Ok(())
    }

    async fn evaluate(&self, _route: &PageRoute, script: &str) -> Result<Value, BrowserError> {
        self.scripts.lock().push(script.to_string());
        Ok(self.evaluate_result.lock().clone())
    }

    async fn screenshot(&self, _route: &PageRoute) -> Result<Vec<u8>, BrowserError> {
        if let Some(err) = self.fail_screenshots.lock().clone() {
            return Err(err);
        }
        Ok(self.screenshot_bytes.lock().clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use stride_core_types::{PageId, SessionId};

    fn route() -> PageRoute {
        PageRoute::for_page(SessionId("s1".into()), PageId("p1".into()))
    }

    #[tokio::test]
    async fn recording_browser_captures_interactions() {
        let browser = RecordingBrowser::new();
        browser.click(&route(), 10.0, 20.0).await.unwrap();
        browser.click_element(&route(), 7).await.unwrap();
        browser.type_text(&route(), "hello").await.unwrap();
        browser.press_key(&route(), "Enter").await.unwrap();

        assert_eq!(browser.clicks(), vec![(10.0, 20.0)]);
        assert_eq!(browser.element_clicks(), vec![7]);
        assert_eq!(browser.typed(), vec!["hello".to_string()]);
        assert_eq!(browser.keys(), vec!["Enter".to_string()]);
    }

    #[tokio::test]
    async fn evaluate_returns_the_configured_result() {
        let browser = RecordingBrowser::new();
        browser.set_evaluate_result(json!(true));
        let value = browser.evaluate(&route(), "1 + 1").await.unwrap();
        assert_eq!(value, json!(true));
        assert_eq!(browser.scripts(), vec!["1 + 1".to_string()]);
    }

    #[tokio::test]
    async fn scripted_failures_surface_as_errors() {
        let browser = RecordingBrowser::new();
        browser.fail_element_clicks(BrowserError::ElementNotFound(3));
        let err = browser.click_element(&route(), 3).await.unwrap_err();
        assert!(matches!(err, BrowserError::ElementNotFound(3)));
        assert!(browser.element_clicks().is_empty());
    }
}
