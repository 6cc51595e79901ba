//! Page plan construction.
//!
//! The plan is the complete, ordered list of pages the document will contain.
//! A view with a photo and positioned markers becomes one visual page; any
//! other view with markers becomes one or more table pages.

use crate::error::PlanError;
use crate::style::Theme;
use log::{debug, warn};
use rigsheet_resource::{CacheError, ImageInfo};
use rigsheet_types::geometry::Orientation;
use rigsheet_types::{ExportOptions, VehicleView, VehicleViewEntry};
use serde::Serialize;
use std::ops::Range;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PageKind {
    Visual,
    Table,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlannedPage {
    pub kind: PageKind,
    /// Index into [`PagePlan::views`].
    pub view: usize,
    /// Slice of the view's entries shown on this page.
    pub rows: Range<usize>,
    /// Position of this page among the pages of its view, and their count.
    pub chunk: usize,
    pub chunk_count: usize,
    pub orientation: Orientation,
    /// Request option OR the view's own flag.
    pub pointer_mode: bool,
    /// Oriented pixel size of the background, for visual pages.
    pub background: Option<ImageInfo>,
}

#[derive(Debug, Clone)]
pub struct PagePlan {
    pub views: Vec<VehicleView>,
    pub pages: Vec<PlannedPage>,
    pub theme: Theme,
    pub include_header: bool,
    pub include_footer: bool,
}

/// Flat description of one page, for logs and the `plan` command.
#[derive(Debug, Clone, Serialize)]
pub struct PageSummary {
    pub number: usize,
    pub kind: PageKind,
    pub category: String,
    pub view: String,
    pub orientation: Orientation,
    pub pointer_mode: bool,
    pub entries: usize,
    pub chunk: usize,
    pub chunk_count: usize,
}

impl PagePlan {
    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    pub fn view(&self, page: &PlannedPage) -> &VehicleView {
        &self.views[page.view]
    }

    pub fn entries(&self, page: &PlannedPage) -> &[VehicleViewEntry] {
        &self.views[page.view].entries[page.rows.clone()]
    }

    pub fn first_kind(&self) -> Option<PageKind> {
        self.pages.first().map(|p| p.kind)
    }

    pub fn summary(&self) -> Vec<PageSummary> {
        self.pages
            .iter()
            .enumerate()
            .map(|(i, page)| {
                let view = self.view(page);
                PageSummary {
                    number: i + 1,
                    kind: page.kind,
                    category: view.category_name.clone(),
                    view: view.view_name.clone(),
                    orientation: page.orientation,
                    pointer_mode: page.pointer_mode,
                    entries: page.rows.len(),
                    chunk: page.chunk + 1,
                    chunk_count: page.chunk_count,
                }
            })
            .collect()
    }
}

fn background_orientation<P>(path: &Path, probe: &P) -> Result<(Orientation, Option<ImageInfo>), PlanError>
where
    P: Fn(&Path) -> Result<ImageInfo, CacheError>,
{
    match probe(path) {
        Ok(info) => Ok((Orientation::for_dimensions(info.width, info.height), Some(info))),
        Err(CacheError::NotFound(missing)) => {
            warn!("background {} vanished while planning", missing.display());
            Ok((Orientation::Landscape, None))
        }
        Err(e) => Err(PlanError::Image(e)),
    }
}

/// Orders the views and decides the pages each one produces.
///
/// `probe` reports the oriented pixel size of a background photo and decides
/// the orientation of visual pages.
pub fn build_plan<P>(
    mut views: Vec<VehicleView>,
    options: &ExportOptions,
    probe: P,
) -> Result<PagePlan, PlanError>
where
    P: Fn(&Path) -> Result<ImageInfo, CacheError>,
{
    if let Some(selected) = options.selected_category_id {
        views.retain(|v| v.category_id == Some(selected));
    }
    views.sort_by(|a, b| {
        a.category_name
            .cmp(&b.category_name)
            .then_with(|| a.view_name.cmp(&b.view_name))
    });

    let theme = Theme::named(&options.theme);
    let rows_per_page = theme.rows_per_page();
    let mut pages = Vec::new();

    for (index, view) in views.iter().enumerate() {
        if view.background_photo_id.is_some() && view.background_path.is_none() {
            return Err(PlanError::MissingBackground {
                category: view.category_name.clone(),
                view: view.view_name.clone(),
            });
        }
        if view.entries.is_empty() && view.background_path.is_none() {
            debug!("skipping empty view {}", view.title());
            continue;
        }

        let pointer_mode = options.pointer_mode || view.pointer_mode;
        match &view.background_path {
            Some(background) if view.has_positions && !options.table_fallback => {
                let (orientation, info) = background_orientation(background, &probe)?;
                pages.push(PlannedPage {
                    kind: PageKind::Visual,
                    view: index,
                    rows: 0..view.entries.len(),
                    chunk: 0,
                    chunk_count: 1,
                    orientation,
                    pointer_mode,
                    background: info,
                });
            }
            _ if !view.entries.is_empty() => {
                let total = view.entries.len();
                let chunk_count = total.div_ceil(rows_per_page);
                for chunk in 0..chunk_count {
                    let start = chunk * rows_per_page;
                    pages.push(PlannedPage {
                        kind: PageKind::Table,
                        view: index,
                        rows: start..(start + rows_per_page).min(total),
                        chunk,
                        chunk_count,
                        orientation: Orientation::Landscape,
                        pointer_mode,
                        background: None,
                    });
                }
            }
            _ => debug!("view {} has a background but nothing to show", view.title()),
        }
    }

    if pages.is_empty() {
        return Err(PlanError::NoContent);
    }
    debug!("planned {} pages from {} views", pages.len(), views.len());

    Ok(PagePlan {
        views,
        pages,
        theme,
        include_header: options.include_header,
        include_footer: options.include_footer,
    })
}
