/// Viewport width below which selecting a case collapses the list.
pub const REFERENCE_BREAKPOINT_PX: u16 = 1024;

/// Decides whether the case list is shown next to the detail view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayoutController {
    breakpoint: u16,
    collapsed: bool,
}

impl Default for LayoutController {
    fn default() -> Self {
        Self::new(REFERENCE_BREAKPOINT_PX)
    }
}

impl LayoutController {
    pub fn new(breakpoint: u16) -> Self {
        Self {
            breakpoint,
            collapsed: false,
        }
    }

    pub fn is_collapsed(&self) -> bool {
        self.collapsed
    }

    pub fn is_compact(&self, viewport_width: u16) -> bool {
        viewport_width < self.breakpoint
    }

    /// Collapses the list on the none -> some selection edge in a compact
    /// viewport. Returns true when the flag changed.
    pub fn on_selection_changed(
        &mut self,
        had_selection: bool,
        has_selection: bool,
        viewport_width: u16,
    ) -> bool {
        if had_selection || !has_selection || !self.is_compact(viewport_width) {
            return false;
        }
        if self.collapsed {
            return false;
        }
        self.collapsed = true;
        true
    }

    pub fn toggle(&mut self) -> bool {
        self.collapsed = !self.collapsed;
        self.collapsed
    }

    pub fn expand(&mut self) {
        self.collapsed = false;
    }
}
