use crate::render::Surface;

/// Prefix of the style attribute that drives every gauge and bar.
pub const PERCENTAGE_VAR: &str = "--percentage: ";

/// A single mutation of the render surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Set the `--percentage` style variable to an already formatted value.
    SetPercentage(String),

    /// Replace the element's text content.
    SetText(String),

    AddClass(&'static str),

    RemoveClass(&'static str),
}

/// A mutation together with the element it targets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VisualUpdate {
    pub selector: &'static str,
    pub action: Action,
}

impl VisualUpdate {
    pub fn percentage(selector: &'static str, value: impl Into<String>) -> Self {
        Self {
            selector,
            action: Action::SetPercentage(value.into()),
        }
    }

    pub fn text(selector: &'static str, text: impl Into<String>) -> Self {
        Self {
            selector,
            action: Action::SetText(text.into()),
        }
    }

    pub fn add_class(selector: &'static str, class: &'static str) -> Self {
        Self {
            selector,
            action: Action::AddClass(class),
        }
    }

    pub fn remove_class(selector: &'static str, class: &'static str) -> Self {
        Self {
            selector,
            action: Action::RemoveClass(class),
        }
    }

    /// Apply the update to a surface.
    ///
    /// Returns `false` when the selector matched nothing; that is a normal
    /// outcome and leaves the surface untouched.
    pub fn apply<S: Surface + ?Sized>(&self, surface: &mut S) -> bool {
        let Some(element) = surface.query_selector(self.selector) else {
            return false;
        };

        match &self.action {
            Action::SetPercentage(value) => {
                element.set_attribute("style", &format!("{PERCENTAGE_VAR}{value}"))
            }
            Action::SetText(text) => element.set_text_content(text),
            Action::AddClass(class) => element.add_class(class),
            Action::RemoveClass(class) => element.remove_class(class),
        }
        true
    }
}
