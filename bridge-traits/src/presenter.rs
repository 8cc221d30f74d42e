//! Presenter (rendering surface) bridge trait.

use crate::engine::MediaEngine;
use crate::ids::PresenterId;
use serde::{Deserialize, Serialize};

/// How video is fitted into the presenter's bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BoxFit {
    #[default]
    Contain,
    Cover,
    Fill,
    FitWidth,
    FitHeight,
}

impl BoxFit {
    /// Parse the wire name. Unknown names fall back to [`BoxFit::Contain`].
    pub fn from_wire(name: &str) -> Self {
        match name {
            "cover" => BoxFit::Cover,
            "fill" => BoxFit::Fill,
            "fitWidth" => BoxFit::FitWidth,
            "fitHeight" => BoxFit::FitHeight,
            _ => BoxFit::Contain,
        }
    }
}

/// A UI-side surface able to display the engine's video output.
///
/// The core holds presenters weakly; it never keeps one alive. At most one
/// presenter per session is bound at a time. `bind` receives a borrowed
/// engine so the presenter can wire its native view to it without taking
/// ownership.
pub trait Presenter: Send + Sync {
    fn id(&self) -> PresenterId;

    /// Start receiving video output (and keep the screen on).
    fn bind(&self, engine: &dyn MediaEngine);

    /// Stop receiving video output.
    fn unbind(&self);

    fn set_box_fit(&self, fit: BoxFit);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn box_fit_wire_names() {
        assert_eq!(BoxFit::from_wire("cover"), BoxFit::Cover);
        assert_eq!(BoxFit::from_wire("fitHeight"), BoxFit::FitHeight);
        assert_eq!(BoxFit::from_wire("stretch"), BoxFit::Contain);

        let fit: BoxFit = serde_json::from_str("\"fitWidth\"").unwrap();
        assert_eq!(fit, BoxFit::FitWidth);
    }
}
