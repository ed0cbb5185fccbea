use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::errors::Result;
use crate::models::GeneratedPair;

/// Subject and theme the generated cards will be filed under.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationContext {
    pub subject: Option<String>,
    pub theme: Option<String>,
}

impl GenerationContext {
    pub fn new(subject: impl Into<String>, theme: impl Into<String>) -> Self {
        Self {
            subject: Some(subject.into()),
            theme: Some(theme.into()),
        }
    }
}

/// Turns free-form text into question/answer pairs.
///
/// How pairs are produced is up to the implementation. Every pair still goes through
/// the same validation as a manually entered card, so empty questions or answers are
/// rejected regardless of source.
#[async_trait]
pub trait CardGenerator: Send + Sync {
    /// Name used in logs.
    fn name(&self) -> &str;

    async fn generate(&self, source_text: &str, context: &GenerationContext) -> Result<Vec<GeneratedPair>>;
}
