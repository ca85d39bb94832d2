//! Test helpers: a scripted gateway standing in for the hosted backend so
//! pipeline behavior can be exercised deterministically.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::llm::{GenError, TextGenerator};

/// A [`TextGenerator`] that replays a fixed script of responses, recording
/// every prompt it receives. Responses are consumed in order regardless of
/// which generation method is called; an exhausted script returns a backend
/// error.
#[derive(Debug, Default)]
pub struct ScriptedGateway {
    responses: Mutex<VecDeque<Result<String, GenError>>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedGateway {
    /// Creates a gateway that replays `responses` in order.
    #[must_use]
    pub fn new(responses: Vec<Result<String, GenError>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Convenience constructor for all-success scripts.
    #[must_use]
    pub fn replying(responses: &[&str]) -> Self {
        Self::new(responses.iter().map(|r| Ok((*r).to_owned())).collect())
    }

    /// Prompts received so far, in call order.
    #[must_use]
    pub fn recorded_prompts(&self) -> Vec<String> {
        self.prompts.lock().map(|p| p.clone()).unwrap_or_default()
    }

    /// Number of responses not yet consumed.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.responses.lock().map(|r| r.len()).unwrap_or(0)
    }

    fn next(&self, prompt: &str) -> Result<String, GenError> {
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(prompt.to_owned());
        }
        self.responses
            .lock()
            .ok()
            .and_then(|mut r| r.pop_front())
            .unwrap_or_else(|| Err(GenError::Backend("scripted gateway exhausted".to_owned())))
    }
}

#[async_trait]
impl TextGenerator for ScriptedGateway {
    async fn generate_json(&self, prompt: &str) -> Result<String, GenError> {
        self.next(prompt)
    }

    async fn generate_plain(&self, prompt: &str) -> Result<String, GenError> {
        self.next(prompt)
    }

    async fn generate_from_image(
        &self,
        instruction: &str,
        _image_base64: &str,
        _mime_type: &str,
    ) -> Result<String, GenError> {
        self.next(instruction)
    }
}
