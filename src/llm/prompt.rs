use serde::{Deserialize, Serialize};

/// System-level behaviour for a session, built from ordered text fragments.
///
/// Instructions are fixed when a session is created and become the first
/// transcript entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instructions {
    segments: Vec<String>,
}

impl Instructions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a fragment
    pub fn segment(mut self, text: impl Into<String>) -> Self {
        self.segments.push(text.into());
        self
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Fragments joined into a single system message
    pub fn render(&self) -> String {
        self.segments.join("\n\n")
    }
}

impl<S: Into<String>> FromIterator<S> for Instructions {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            segments: iter.into_iter().map(Into::into).collect(),
        }
    }
}

/// A user prompt sent to a session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prompt {
    text: String,
}

impl Prompt {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub(crate) fn with_guidance(self, guidance: &str) -> Self {
        Self {
            text: format!("{}\n\n{}", self.text, guidance),
        }
    }
}

impl From<&str> for Prompt {
    fn from(text: &str) -> Self {
        Prompt::new(text)
    }
}

impl From<String> for Prompt {
    fn from(text: String) -> Self {
        Prompt::new(text)
    }
}
