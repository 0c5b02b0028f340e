//! Interaction visibility of scene elements.

use super::scene::{DrawSurface, ElementId};
use crate::core::Result;
use serde::{Deserialize, Serialize};

/// Interaction state of an element, orthogonal to its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Visibility {
    /// No interaction
    #[default]
    Default,
    /// Related to the focused element
    Emphasized,
    /// The element the user focused
    Focused,
    /// Unrelated to the focused element
    DeEmphasized,
}

impl Visibility {
    /// Every visibility, in declaration order
    pub const ALL: [Visibility; 4] = [
        Visibility::Default,
        Visibility::Emphasized,
        Visibility::Focused,
        Visibility::DeEmphasized,
    ];

    /// Class applied to elements in this state, `None` for the default
    pub fn class(&self) -> Option<&'static str> {
        match self {
            Visibility::Default => None,
            Visibility::Emphasized => Some("emphasized"),
            Visibility::Focused => Some("focused"),
            Visibility::DeEmphasized => Some("de-emphasized"),
        }
    }

    /// Emphasized or focused elements show their category colors
    pub fn is_highlighted(&self) -> bool {
        matches!(self, Visibility::Emphasized | Visibility::Focused)
    }
}

/// Applies visibility classes, keeping exactly one (or none) on an element
#[derive(Debug, Clone, Copy, Default)]
pub struct VisibilityUpdater;

impl VisibilityUpdater {
    /// Creates an updater
    pub fn new() -> Self {
        Self
    }

    /// Replace the visibility class of `element`
    pub fn update_visibility<S: DrawSurface>(
        &self,
        surface: &mut S,
        element: ElementId,
        visibility: Visibility,
    ) -> Result<()> {
        for candidate in Visibility::ALL {
            if let Some(class) = candidate.class() {
                surface.toggle_class(element, class, candidate == visibility)?;
            }
        }
        Ok(())
    }
}
