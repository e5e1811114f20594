/// Builder for [`OllamaConfig`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct OllamaConfigBuilder {
    model: Option<String>,
    base_url: Option<String>,
}

impl OllamaConfigBuilder {
    /// Creates a builder for the given model, e.g. `llama3`.
    #[inline]
    pub fn with_model<S: Into<String>>(model: S) -> Self {
        Self {
            model: Some(model.into()),
            base_url: None,
        }
    }

    /// Sets a custom base URL of the Ollama server.
    #[inline]
    pub fn with_base_url<S: Into<String>>(mut self, base_url: S) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Builds the configuration.
    #[inline]
    pub fn build(self) -> OllamaConfig {
        OllamaConfig {
            model: self.model.unwrap_or_else(|| "llama3".to_owned()),
            base_url: self
                .base_url
                .map(|url| url.trim_end_matches('/').to_owned())
                .unwrap_or_else(|| "http://localhost:11434".to_owned()),
        }
    }
}

/// Configuration for the Ollama provider.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct OllamaConfig {
    pub(crate) model: String,
    pub(crate) base_url: String,
}

impl Default for OllamaConfig {
    #[inline]
    fn default() -> Self {
        OllamaConfigBuilder::default().build()
    }
}
