//! Grouping of inventory rows into per-view markers.
//!
//! Rows sharing a lot become one marker whose quantity is the sum of the
//! rows. Markers are then distributed over the views configured for their
//! category; markers pointing at a view nobody configured still get a page of
//! their own so no stock disappears from the export.

use log::debug;
use rigsheet_resource::MediaResolver;
use rigsheet_types::{
    Category, Item, PointerTargets, VehicleView, VehicleViewEntry, ViewConfig,
    normalize_view_name,
};
use std::collections::HashMap;

/// Category label for markers whose category is unknown.
pub const FALLBACK_CATEGORY_NAME: &str = "Inventaire";

fn entry_key(item: &Item) -> String {
    match item.lot_id {
        Some(lot_id) => format!("lot-{lot_id}"),
        None => format!("item-{}", item.id),
    }
}

fn lot_label(item: &Item) -> Option<String> {
    let lot_id = item.lot_id?;
    Some(match item.lot_name.as_deref().map(str::trim) {
        Some(name) if !name.is_empty() => name.to_string(),
        _ => format!("Lot #{lot_id}"),
    })
}

fn component_line(item: &Item) -> String {
    match item.sku.as_deref().filter(|s| !s.is_empty()) {
        Some(sku) => format!("• {} × {} (réf. {})", item.quantity, item.name, sku),
        None => format!("• {} × {}", item.quantity, item.name),
    }
}

fn build_entry(
    key: String,
    rows: &[&Item],
    categories: &HashMap<i64, &Category>,
    pointer_targets: &PointerTargets,
    media: &MediaResolver,
) -> Option<VehicleViewEntry> {
    let first = rows.first()?;
    let lot = lot_label(first);
    let (name, reference, components) = match &lot {
        Some(label) => (
            format!("{label} (Lot)"),
            label.clone(),
            rows.iter().map(|row| component_line(row)).collect(),
        ),
        None => (
            first.name.clone(),
            first
                .sku
                .clone()
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| "-".to_string()),
            Vec::new(),
        ),
    };

    let (anchor_x, anchor_y) = match pointer_targets.get(&key) {
        Some(target) => (Some(target.x), Some(target.y)),
        None => (first.position_x, first.position_y),
    };

    Some(VehicleViewEntry {
        name,
        reference,
        quantity: rows.iter().map(|row| row.quantity).sum(),
        lot_label: lot,
        components,
        category_id: first.category_id,
        category_name: first
            .category_id
            .and_then(|id| categories.get(&id))
            .map(|c| c.name.clone()),
        view_name: normalize_view_name(first.size.as_deref()),
        bubble_x: first.position_x,
        bubble_y: first.position_y,
        anchor_x,
        anchor_y,
        icon_path: media.resolve(first.image_url.as_deref()),
        key,
    })
}

fn has_positions(entries: &[VehicleViewEntry]) -> bool {
    entries.iter().any(VehicleViewEntry::has_bubble_position)
}

/// Builds every view candidate for the export, configured views first in
/// category order, then synthetic views for uncovered markers.
pub fn build_vehicle_views(
    categories: &[Category],
    items: &[Item],
    pointer_targets: &PointerTargets,
    media: &MediaResolver,
) -> Vec<VehicleView> {
    let by_id: HashMap<i64, &Category> = categories.iter().map(|c| (c.id, c)).collect();

    let mut order: Vec<String> = Vec::new();
    let mut groups: HashMap<String, Vec<&Item>> = HashMap::new();
    for item in items {
        let key = entry_key(item);
        let rows = groups.entry(key.clone()).or_insert_with(|| {
            order.push(key);
            Vec::new()
        });
        rows.push(item);
    }

    let entries: Vec<VehicleViewEntry> = order
        .into_iter()
        .filter_map(|key| {
            let rows = groups.remove(&key)?;
            build_entry(key, &rows, &by_id, pointer_targets, media)
        })
        .collect();

    let default_config = [ViewConfig::default()];
    let mut views = Vec::new();
    let mut covered: Vec<(Option<i64>, String)> = Vec::new();
    for category in categories {
        let configs: &[ViewConfig] = if category.views.is_empty() {
            &default_config
        } else {
            &category.views
        };
        for config in configs {
            let view_name = normalize_view_name(config.name.as_deref());
            let view_entries: Vec<VehicleViewEntry> = entries
                .iter()
                .filter(|e| e.category_id == Some(category.id) && e.view_name == view_name)
                .cloned()
                .collect();
            let background_url = config
                .background_url
                .as_deref()
                .filter(|u| !u.trim().is_empty())
                .or(category.image_url.as_deref());
            let background_path = media.resolve(background_url);
            if config.background_photo_id.is_some() && background_path.is_none() {
                debug!(
                    "view '{}' of '{}' references photo {:?} with no file",
                    view_name, category.name, config.background_photo_id
                );
            }
            covered.push((Some(category.id), view_name.clone()));
            views.push(VehicleView {
                category_id: Some(category.id),
                category_name: category.name.clone(),
                has_positions: has_positions(&view_entries),
                view_name,
                background_path,
                background_photo_id: config.background_photo_id,
                entries: view_entries,
                pointer_mode: config.pointer_mode_enabled,
                hide_edit_buttons: config.hide_edit_buttons,
            });
        }
    }

    let mut synthetic: Vec<VehicleView> = Vec::new();
    for entry in entries {
        let marker = (entry.category_id, entry.view_name.clone());
        if covered.contains(&marker) {
            continue;
        }
        match synthetic
            .iter_mut()
            .find(|v| v.category_id == marker.0 && v.view_name == marker.1)
        {
            Some(view) => {
                view.has_positions |= entry.has_bubble_position();
                view.entries.push(entry);
            }
            None => synthetic.push(VehicleView {
                category_id: entry.category_id,
                category_name: entry
                    .category_name
                    .clone()
                    .unwrap_or_else(|| FALLBACK_CATEGORY_NAME.to_string()),
                view_name: entry.view_name.clone(),
                background_path: None,
                background_photo_id: None,
                pointer_mode: false,
                hide_edit_buttons: false,
                has_positions: entry.has_bubble_position(),
                entries: vec![entry],
            }),
        }
    }
    if !synthetic.is_empty() {
        debug!("{} synthetic views for uncovered markers", synthetic.len());
    }
    views.extend(synthetic);
    views
}
