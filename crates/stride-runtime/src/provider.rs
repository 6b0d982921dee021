//! Model provider ports.
//!
//! Two capabilities, two traits:
//! - [`LanguageProvider`] answers text prompts built from ranked element
//!   lists (the structured executor).
//! - [`VisionProvider`] additionally accepts a page screenshot (the
//!   vision executor).
//!
//! Provider failures are transport-level and fatal to the step; see
//! [`ProviderError`](crate::errors::ProviderError).

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::errors::ProviderError;

/// Generation knobs passed through to the backing model.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct GenerateOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(default)]
    pub json_mode: bool,
}

/// One model completion.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Generation {
    pub content: String,
    pub model_name: String,
}

impl Generation {
    pub fn new(content: impl Into<String>, model_name: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            model_name: model_name.into(),
        }
    }
}

/// Text-only model access.
#[async_trait]
pub trait LanguageProvider: Send + Sync {
    async fn generate(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        options: &GenerateOptions,
    ) -> Result<Generation, ProviderError>;

    fn supports_json_mode(&self) -> bool {
        false
    }

    fn name(&self) -> &str {
        "unknown"
    }
}

/// Model access with image input.
#[async_trait]
pub trait VisionProvider: Send + Sync {
    async fn generate_with_image(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        image_base64: &str,
        options: &GenerateOptions,
    ) -> Result<Generation, ProviderError>;

    fn supports_vision(&self) -> bool {
        true
    }

    fn name(&self) -> &str {
        "unknown"
    }
}

/// Scripted text provider for tests. Replays a queue of replies and
/// repeats the last one once the queue runs dry.
pub struct ScriptedLanguageProvider {
    replies: Mutex<VecDeque<String>>,
    prompts: Mutex<Vec<String>>,
    calls: AtomicU32,
    fail_with: Mutex<Option<ProviderError>>,
}

impl ScriptedLanguageProvider {
    pub fn new<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            replies: Mutex::new(replies.into_iter().map(Into::into).collect()),
            prompts: Mutex::new(Vec::new()),
            calls: AtomicU32::new(0),
            fail_with: Mutex::new(None),
        }
    }

    /// Provider that fails every call with the given error.
    pub fn failing(error: ProviderError) -> Self {
        let provider = Self::new(Vec::<String>::new());
        *provider.fail_with.lock() = Some(error);
        provider
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    /// User prompts seen so far, in call order.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().clone()
    }

    fn next_reply(&self) -> Result<String, ProviderError> {
        let mut replies = self.replies.lock();
        let reply = replies
            .front()
            .cloned()
            .ok_or_else(|| ProviderError::Request("scripted replies exhausted".into()))?;
        if replies.len() > 1 {
            replies.pop_front();
        }
        Ok(reply)
    }
}

#[async_trait]
impl LanguageProvider for ScriptedLanguageProvider {
    async fn generate(
        &self,
        _system_prompt: &str,
        user_prompt: &str,
        _options: &GenerateOptions,
    ) -> Result<Generation, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.fail_with.lock().clone() {
            return Err(err);
        }
        self.prompts.lock().push(user_prompt.to_string());
        Ok(Generation::new(self.next_reply()?, "scripted"))
    }

    fn supports_json_mode(&self) -> bool {
        true
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

/// Scripted vision provider for tests. Records the size of each image
/// it is shown.
pub struct ScriptedVisionProvider {
    replies: Mutex<VecDeque<String>>,
    image_sizes: Mutex<Vec<usize>>,
    calls: AtomicU32,
}

impl ScriptedVisionProvider {
    pub fn new<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            replies: Mutex::new(replies.into_iter().map(Into::into).collect()),
            image_sizes: Mutex::new(Vec::new()),
            calls: AtomicU32::new(0),
        }
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    /// Base64 lengths of the screenshots passed in, in call order.
    pub fn image_sizes(&self) -> Vec<usize> {
        self.image_sizes.lock().clone()
    }
}

#[async_trait]
impl VisionProvider for ScriptedVisionProvider {
    async fn generate_with_image(
        &self,
        _system_prompt: &str,
        _user_prompt: &str,
        image_base64: &str,
        _options: &GenerateOptions,
    ) -> Result<Generation, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.image_sizes.lock().push(image_base64.len());
        let mut replies = self.replies.lock();
        let reply = replies
            .front()
            .cloned()
            .ok_or_else(|| ProviderError::Request("scripted replies exhausted".into()))?;
        if replies.len() > 1 {
            replies.pop_front();
        }
        Ok(Generation::new(reply, "scripted-vision"))
    }

    fn name(&self) -> &str {
        "scripted-vision"
    }
}
