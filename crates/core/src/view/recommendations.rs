use std::fmt;

use crate::shared::constants::EMPTY_RECOMMENDATIONS_MESSAGE;
use crate::view::view_state::ViewState;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecommendationLink {
    pub label: String,
    pub url: String,
}

/// Side panel listing what the backend suggested for the current mood.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecommendationsView {
    pub links: Vec<RecommendationLink>,
}

impl RecommendationsView {
    pub fn from_state(state: &ViewState) -> Self {
        let links = state
            .result
            .iter()
            .flat_map(|result| result.recommendations.iter())
            .map(|item| RecommendationLink {
                label: format!("[{}] {}", item.source, item.title),
                url: item.url.clone(),
            })
            .collect();
        Self { links }
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }
}

impl fmt::Display for RecommendationsView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Recommendations")?;
        if self.links.is_empty() {
            return write!(f, "{EMPTY_RECOMMENDATIONS_MESSAGE}");
        }
        let rendered: Vec<String> = self
            .links
            .iter()
            .map(|link| format!("  - {} <{}>", link.label, link.url))
            .collect();
        write!(f, "{}", rendered.join("\n"))
    }
}
