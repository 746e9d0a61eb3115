use std::fmt;

use crate::shared::constants::PLACEHOLDER;
use crate::view::view_state::ViewState;

/// Age/gender/emotion panel drawn over the live video.
#[derive(Clone, Debug, PartialEq)]
pub struct OverlayView {
    pub age: String,
    pub gender: String,
    pub emotion: String,
    pub error: Option<String>,
    pub scores: Option<String>,
}

impl OverlayView {
    pub fn from_state(state: &ViewState) -> Self {
        let result = state.result.as_ref();
        Self {
            age: field(result.and_then(|r| r.age).map(|age| age.to_string())),
            gender: field(result.and_then(|r| r.gender.clone())),
            emotion: field(result.and_then(|r| r.emotion.clone())),
            error: state.error.clone(),
            scores: result.and_then(|r| {
                let ranked = r.ranked_emotions();
                if ranked.is_empty() {
                    return None;
                }
                let parts: Vec<String> = ranked
                    .iter()
                    .map(|(label, score)| format!("{label} {score:.1}%"))
                    .collect();
                Some(parts.join(", "))
            }),
        }
    }

    pub fn age_line(&self) -> String {
        format!("Age: {}", self.age)
    }

    pub fn gender_line(&self) -> String {
        format!("Gender: {}", self.gender)
    }

    pub fn emotion_line(&self) -> String {
        format!("Emotion: {}", self.emotion)
    }

    pub fn lines(&self) -> Vec<String> {
        let mut lines = vec![self.age_line(), self.gender_line(), self.emotion_line()];
        if let Some(scores) = &self.scores {
            lines.push(format!("Scores: {scores}"));
        }
        if let Some(error) = &self.error {
            lines.push(error.clone());
        }
        lines
    }
}

impl fmt::Display for OverlayView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.lines().join("\n"))
    }
}

fn field(value: Option<String>) -> String {
    value.unwrap_or_else(|| PLACEHOLDER.to_string())
}
