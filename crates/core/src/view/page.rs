use std::fmt;

use crate::shared::constants::PAGE_TITLE;
use crate::view::overlay::OverlayView;
use crate::view::recommendations::RecommendationsView;
use crate::view::view_state::ViewState;

/// Page shell: title, overlay, recommendations.
#[derive(Clone, Debug, PartialEq)]
pub struct PageView {
    pub overlay: OverlayView,
    pub recommendations: RecommendationsView,
}

impl PageView {
    pub fn from_state(state: &ViewState) -> Self {
        Self {
            overlay: OverlayView::from_state(state),
            recommendations: RecommendationsView::from_state(state),
        }
    }
}

impl fmt::Display for PageView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{PAGE_TITLE}")?;
        writeln!(f, "{}", "=".repeat(PAGE_TITLE.len()))?;
        writeln!(f, "{}", self.overlay)?;
        writeln!(f)?;
        write!(f, "{}", self.recommendations)
    }
}
