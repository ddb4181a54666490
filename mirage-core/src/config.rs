//! Interpreter configuration.

/// System text sent with every ask call.
pub const HELPER_INSTRUCTIONS: &str = include_str!("prompts/helper.txt");

/// System text for the delegating interpreter.
pub const DELEGATE_INSTRUCTIONS: &str = include_str!("prompts/delegate.txt");

/// Configuration shared by both interpreters.
///
/// Built once and passed in at construction; nothing here is global.
#[derive(Debug, Clone)]
pub struct InterpreterConfig {
    /// Model override. `None` uses the service's own default.
    pub model: Option<String>,

    /// Maximum tokens per reply.
    pub max_tokens: usize,

    /// Sampling temperature.
    pub temperature: Option<f32>,

    /// System text for ask calls.
    pub helper_instructions: String,

    /// System text for the delegating interpreter.
    pub delegate_instructions: String,

    /// Upper bound on service calls made by the delegating interpreter.
    pub max_turns: usize,
}

impl Default for InterpreterConfig {
    fn default() -> Self {
        Self {
            model: None,
            max_tokens: 2048,
            temperature: Some(1.0),
            helper_instructions: HELPER_INSTRUCTIONS.to_string(),
            delegate_instructions: DELEGATE_INSTRUCTIONS.to_string(),
            max_turns: 64,
        }
    }
}

impl InterpreterConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: usize) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Set the temperature; `None` leaves it to the service.
    pub fn with_temperature(mut self, temperature: Option<f32>) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_helper_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.helper_instructions = instructions.into();
        self
    }

    pub fn with_delegate_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.delegate_instructions = instructions.into();
        self
    }

    pub fn with_max_turns(mut self, max_turns: usize) -> Self {
        self.max_turns = max_turns;
        self
    }

    /// Apply model, token and temperature settings to a request.
    pub(crate) fn apply(&self, mut request: claude::Request) -> claude::Request {
        request = request.with_max_tokens(self.max_tokens);
        if let Some(model) = &self.model {
            request = request.with_model(model.clone());
        }
        if let Some(temperature) = self.temperature {
            request = request.with_temperature(temperature);
        }
        request
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = InterpreterConfig::default();
        assert_eq!(config.max_tokens, 2048);
        assert_eq!(config.temperature, Some(1.0));
        assert_eq!(config.max_turns, 64);
        assert!(config.helper_instructions.contains("record_result"));
        assert!(config.delegate_instructions.contains("emit_output"));
    }

    #[test]
    fn test_apply() {
        let config = InterpreterConfig::new()
            .with_model("claude-test")
            .with_max_tokens(100)
            .with_temperature(None);
        let request = config.apply(claude::Request::new(vec![]));
        assert_eq!(request.model.as_deref(), Some("claude-test"));
        assert_eq!(request.max_tokens, 100);
        assert_eq!(request.temperature, None);
    }
}
