use std::fmt;

use tt_core::{CompletionRequest, InferenceModel, Result};

/// Offline stand-in that echoes the start of the prompt.
pub struct DummyModel;

impl fmt::Debug for DummyModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DummyModel").finish()
    }
}

impl DummyModel {
    pub fn new() -> Self {
        Self
    }
}

impl Default for DummyModel {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl InferenceModel for DummyModel {
    fn name(&self) -> &str {
        "Dummy"
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<String> {
        // First 20 words of the prompt
        let words: Vec<&str> = request.prompt.split_whitespace().take(20).collect();
        Ok(words.join(" "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_dummy_model() {
        let model = DummyModel::new();
        let request = CompletionRequest::new("system", "This is a   test prompt.\nIt has two lines.");
        let result = model.complete(&request).await.unwrap();
        assert_eq!(result, "This is a test prompt. It has two lines.");

        let long = CompletionRequest::new("", "word ".repeat(50));
        assert_eq!(model.complete(&long).await.unwrap().split(' ').count(), 20);
    }
}
