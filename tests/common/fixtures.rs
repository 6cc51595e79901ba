use chrono::{NaiveDate, NaiveDateTime};
use image::{Rgb, RgbImage};
use rigsheet::{
    Category, ExportConfig, ExportOptions, ExportPipeline, ExportRequest, Item,
    RendererCapabilities, ViewConfig,
};
use tempfile::TempDir;

/// Media root and image cache living in one temporary directory.
pub struct Workspace {
    pub dir: TempDir,
}

impl Workspace {
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().expect("create temp dir"),
        }
    }

    /// Writes a solid-colour PNG under the media root and returns its `/media/` URL.
    pub fn photo(&self, name: &str, width: u32, height: u32) -> String {
        let media = self.dir.path().join("media");
        std::fs::create_dir_all(&media).expect("create media dir");
        RgbImage::from_pixel(width, height, Rgb([40, 90, 160]))
            .save(media.join(name))
            .expect("write photo");
        format!("/media/{}", name)
    }

    pub fn config(&self) -> ExportConfig {
        let mut config = ExportConfig::default();
        config.media_root = self.dir.path().join("media");
        config.images.cache_dir = Some(self.dir.path().join("cache"));
        config.jobs.dir = Some(self.dir.path().join("jobs"));
        config
    }

    /// A pipeline on a host without a browser.
    pub fn vector_pipeline(&self) -> ExportPipeline {
        ExportPipeline::new(&self.config(), RendererCapabilities::vector_only())
            .expect("build pipeline")
    }
}

pub fn generated_at() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 11, 2)
        .unwrap()
        .and_hms_opt(8, 30, 0)
        .unwrap()
}

pub fn category(id: i64, name: &str, views: Vec<ViewConfig>) -> Category {
    Category {
        id,
        name: name.to_string(),
        image_url: None,
        views,
    }
}

pub fn view_config(name: &str, background_url: Option<&str>) -> ViewConfig {
    ViewConfig {
        name: Some(name.to_string()),
        background_url: background_url.map(str::to_string),
        ..ViewConfig::default()
    }
}

pub fn item(id: i64, name: &str, category_id: i64, view: &str, position: Option<(f32, f32)>) -> Item {
    Item {
        id,
        name: name.to_string(),
        sku: Some(format!("SKU-{}", id)),
        category_id: Some(category_id),
        quantity: 1,
        size: Some(view.to_string()),
        position_x: position.map(|p| p.0),
        position_y: position.map(|p| p.1),
        ..Item::default()
    }
}

pub fn request(categories: Vec<Category>, items: Vec<Item>, options: ExportOptions) -> ExportRequest {
    ExportRequest {
        categories,
        items,
        generated_at: generated_at(),
        pointer_targets: Default::default(),
        options,
    }
}

/// One category with a photographed main view and three positioned items.
pub fn single_view_request(ws: &Workspace) -> ExportRequest {
    let background = ws.photo("vsav.png", 1600, 900);
    request(
        vec![category(1, "VSAV 1", vec![view_config("Vue principale", Some(&background))])],
        vec![
            item(1, "Défibrillateur", 1, "Vue principale", Some((0.2, 0.3))),
            item(2, "Sac d'oxygène", 1, "Vue principale", Some((0.5, 0.5))),
            item(3, "Attelle", 1, "Vue principale", Some((0.8, 0.7))),
        ],
        ExportOptions::default(),
    )
}
