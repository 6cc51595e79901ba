//! Records supplied by the persistence layer.
//!
//! These mirror what the inventory store hands over for an export: categories
//! (one per vehicle) with their configured views, and item rows. Nothing here
//! is validated beyond deserialization; aggregation decides what is usable.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A vehicle category and the views configured for it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: i64,
    pub name: String,
    /// Fallback background for views without their own.
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub views: Vec<ViewConfig>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ViewConfig {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub background_url: Option<String>,
    /// Set when the view requires a specific uploaded photo.
    #[serde(default)]
    pub background_photo_id: Option<i64>,
    #[serde(default)]
    pub pointer_mode_enabled: bool,
    #[serde(default)]
    pub hide_edit_buttons: bool,
}

/// One inventory row. Rows sharing a `lot_id` are exported as a single marker.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub sku: Option<String>,
    #[serde(default)]
    pub category_id: Option<i64>,
    #[serde(default)]
    pub quantity: i64,
    /// Reused by the inventory screens as the name of the view the item sits on.
    #[serde(default)]
    pub size: Option<String>,
    #[serde(default)]
    pub position_x: Option<f32>,
    #[serde(default)]
    pub position_y: Option<f32>,
    #[serde(default)]
    pub lot_id: Option<i64>,
    #[serde(default)]
    pub lot_name: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
}

/// Where a marker's pointer should land on the background, as ratios.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PointerTarget {
    pub x: f32,
    pub y: f32,
}

/// Pointer overrides keyed by entry key (`lot-3`, `item-12`).
pub type PointerTargets = HashMap<String, PointerTarget>;
