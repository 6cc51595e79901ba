use serde::Serialize;
use std::path::PathBuf;

/// Label used for views without a configured name.
pub const DEFAULT_VIEW_NAME: &str = "VUE PRINCIPALE";

/// Trims and upper-cases a view name; blank or absent names map to
/// [`DEFAULT_VIEW_NAME`].
pub fn normalize_view_name(name: Option<&str>) -> String {
    match name.map(str::trim) {
        Some(trimmed) if !trimmed.is_empty() => trimmed.to_uppercase(),
        _ => DEFAULT_VIEW_NAME.to_string(),
    }
}

/// One marker on a view: a single item, or every row of a lot combined.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VehicleViewEntry {
    pub key: String,
    pub name: String,
    pub reference: String,
    pub quantity: i64,
    pub lot_label: Option<String>,
    /// One line per constituent row when the entry aggregates a lot.
    pub components: Vec<String>,
    pub category_id: Option<i64>,
    pub category_name: Option<String>,
    pub view_name: String,
    pub bubble_x: Option<f32>,
    pub bubble_y: Option<f32>,
    pub anchor_x: Option<f32>,
    pub anchor_y: Option<f32>,
    pub icon_path: Option<PathBuf>,
}

impl VehicleViewEntry {
    pub fn has_bubble_position(&self) -> bool {
        self.bubble_x.is_some() && self.bubble_y.is_some()
    }

    pub fn bubble_ratios(&self) -> Option<(f32, f32)> {
        self.bubble_x.zip(self.bubble_y)
    }

    pub fn anchor_ratios(&self) -> Option<(f32, f32)> {
        self.anchor_x.zip(self.anchor_y)
    }
}

/// A renderable page candidate: one category seen from one named side.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VehicleView {
    pub category_id: Option<i64>,
    pub category_name: String,
    pub view_name: String,
    pub background_path: Option<PathBuf>,
    pub background_photo_id: Option<i64>,
    pub entries: Vec<VehicleViewEntry>,
    pub pointer_mode: bool,
    pub hide_edit_buttons: bool,
    pub has_positions: bool,
}

impl VehicleView {
    pub fn title(&self) -> String {
        format!("{} — {}", self.category_name, self.view_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn view_names_are_trimmed_and_uppercased() {
        assert_eq!(normalize_view_name(Some("  côté gauche ")), "CÔTÉ GAUCHE");
        assert_eq!(normalize_view_name(Some("   ")), DEFAULT_VIEW_NAME);
        assert_eq!(normalize_view_name(None), DEFAULT_VIEW_NAME);
    }
}
