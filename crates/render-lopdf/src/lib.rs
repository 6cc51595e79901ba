//! Vector PDF renderer using lopdf.
//!
//! This crate draws a page plan directly into PDF content streams with the
//! base-14 Helvetica fonts, writing each page to the output as soon as it is
//! complete.

mod canvas;
mod renderer;
mod writer;

pub use renderer::VectorRenderer;
pub use writer::{JpegImage, StreamingPdfWriter};

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use image::{Rgb, RgbImage};
    use rigsheet_core::{PageKind, build_plan};
    use rigsheet_render_core::{CancellationToken, PageRenderer, RenderContext, RenderError};
    use rigsheet_resource::ImageCache;
    use rigsheet_types::{ExportOptions, VehicleView, VehicleViewEntry};
    use std::path::PathBuf;
    use std::sync::Mutex;
    use tempfile::TempDir;

    fn entry(key: &str, name: &str, ratio: Option<f32>) -> VehicleViewEntry {
        VehicleViewEntry {
            key: key.to_string(),
            name: name.to_string(),
            reference: "REF-1".to_string(),
            quantity: 2,
            lot_label: None,
            components: Vec::new(),
            category_id: Some(1),
            category_name: Some("VSAV".to_string()),
            view_name: "VUE PRINCIPALE".to_string(),
            bubble_x: ratio,
            bubble_y: ratio,
            anchor_x: ratio,
            anchor_y: ratio,
            icon_path: None,
        }
    }

    fn view(background: Option<PathBuf>, entries: Vec<VehicleViewEntry>) -> VehicleView {
        VehicleView {
            category_id: Some(1),
            category_name: "VSAV".to_string(),
            view_name: "VUE PRINCIPALE".to_string(),
            background_path: background,
            background_photo_id: None,
            has_positions: entries.iter().any(|e| e.has_bubble_position()),
            entries,
            pointer_mode: false,
            hide_edit_buttons: false,
        }
    }

    fn write_photo(dir: &TempDir) -> PathBuf {
        let path = dir.path().join("truck.png");
        RgbImage::from_pixel(320, 180, Rgb([180, 40, 40])).save(&path).unwrap();
        path
    }

    fn generated_at() -> chrono::NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 5)
            .unwrap()
            .and_hms_opt(9, 15, 0)
            .unwrap()
    }

    #[test]
    fn visual_page_embeds_photo_and_cards() {
        let dir = tempfile::tempdir().unwrap();
        let photo = write_photo(&dir);
        let cache = ImageCache::new(dir.path().join("cache")).unwrap();
        let plan = build_plan(
            vec![view(Some(photo), vec![entry("item-1", "Gants nitrile", Some(0.5))])],
            &ExportOptions {
                pointer_mode: true,
                ..Default::default()
            },
            rigsheet_resource::probe,
        )
        .unwrap();
        assert_eq!(plan.first_kind(), Some(PageKind::Visual));

        let cancel = CancellationToken::new();
        let ctx = RenderContext::new(generated_at(), &cache, &cancel);
        let bytes = VectorRenderer::new().render(&plan, &ctx).unwrap();

        let doc = lopdf::Document::load_mem(&bytes).unwrap();
        assert_eq!(doc.get_pages().len(), 1);
        let text = doc.extract_text(&[1]).unwrap();
        assert!(text.contains("Gants nitrile"), "{text}");
        assert!(text.contains("05/03/2024"), "{text}");
        assert!(bytes.windows(9).any(|w| w == b"DCTDecode"));
    }

    #[test]
    fn table_pages_follow_the_plan() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ImageCache::new(dir.path().join("cache")).unwrap();
        let entries: Vec<_> = (0..25)
            .map(|i| entry(&format!("item-{i}"), &format!("Article {i}"), None))
            .collect();
        let plan = build_plan(
            vec![view(None, entries)],
            &ExportOptions::default(),
            rigsheet_resource::probe,
        )
        .unwrap();

        let cancel = CancellationToken::new();
        let steps = Mutex::new(Vec::new());
        let sink = |_: &str, current: usize, total: usize| steps.lock().unwrap().push((current, total));
        let ctx = RenderContext::new(generated_at(), &cache, &cancel).with_progress(&sink);
        let bytes = VectorRenderer::new().render(&plan, &ctx).unwrap();

        let doc = lopdf::Document::load_mem(&bytes).unwrap();
        assert_eq!(doc.get_pages().len(), plan.len());
        let first = doc.extract_text(&[1]).unwrap();
        assert!(first.contains("Article 0"), "{first}");
        assert!(first.contains(&format!("Page 1/{}", plan.len())), "{first}");
        let steps = steps.into_inner().unwrap();
        assert_eq!(steps.last(), Some(&(plan.len(), plan.len())));
    }

    #[test]
    fn cancelled_token_stops_rendering() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ImageCache::new(dir.path().join("cache")).unwrap();
        let plan = build_plan(
            vec![view(None, vec![entry("item-1", "Gants", None)])],
            &ExportOptions::default(),
            rigsheet_resource::probe,
        )
        .unwrap();
        let cancel = CancellationToken::new();
        cancel.cancel();
        let ctx = RenderContext::new(generated_at(), &cache, &cancel);
        let err = VectorRenderer::new().render(&plan, &ctx).unwrap_err();
        assert!(matches!(err, RenderError::Cancelled));
    }
}
