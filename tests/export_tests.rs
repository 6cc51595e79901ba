mod common;

use common::engines::{CannedEngine, CrashingEngine};
use common::fixtures::*;
use common::{GeneratedPdf, TestResult, init_logging};
use rigsheet::{
    CancellationToken, ExportError, ExportOptions, ExportPipeline, PageKind, PlanError,
    RenderError, RendererCapabilities, RendererMode, SelectedRenderer,
};
use rigsheet_core::layout::{Rect, layout_bubbles};
use rigsheet_types::geometry::{A4_LONG_EDGE, A4_SHORT_EDGE};
use std::sync::{Arc, Mutex};

fn browser_pipeline(ws: &Workspace, engine: Arc<dyn rigsheet_render_html::BrowserEngine>) -> ExportPipeline {
    ExportPipeline::new(
        &ws.config(),
        RendererCapabilities::with_browser("/opt/chromium/chrome", Some("Chromium 120".to_string())),
    )
    .expect("build pipeline")
    .with_browser_engine(engine)
}

#[test]
fn single_view_renders_one_landscape_visual_page() -> TestResult {
    init_logging();
    let ws = Workspace::new();
    let pipeline = ws.vector_pipeline();
    let request = single_view_request(&ws);

    let plan = pipeline.plan(&request)?;
    assert_eq!(plan.len(), 1);
    assert_eq!(plan.first_kind(), Some(PageKind::Visual));

    let document = pipeline.export(&request)?;
    assert_eq!(document.renderer, SelectedRenderer::Vector);
    assert_eq!(document.content_type, "application/pdf");
    assert_eq!(document.filename, "vehicle_inventory_20241102_083000.pdf");
    assert!(document.bytes.len() > 1000);

    let pdf = GeneratedPdf::from_bytes(document.bytes)?;
    assert_eq!(pdf.page_count(), 1);
    let (width, height) = pdf.page_sizes()[0];
    assert!((width - A4_LONG_EDGE).abs() < 0.5);
    assert!((height - A4_SHORT_EDGE).abs() < 0.5);
    assert!(pdf.image_count() >= 1, "background photo should be embedded");
    Ok(())
}

#[test]
fn empty_inventory_has_no_content() {
    init_logging();
    let ws = Workspace::new();
    let request = request(
        vec![category(1, "VSAV 1", vec![view_config("Vue principale", None)])],
        Vec::new(),
        ExportOptions::default(),
    );

    match ws.vector_pipeline().export(&request) {
        Err(ExportError::Plan(PlanError::NoContent)) => {}
        other => panic!("expected NoContent, got {:?}", other.map(|d| d.filename)),
    }
}

#[test]
fn stacked_pointer_markers_are_spread_without_overlap() -> TestResult {
    init_logging();
    let ws = Workspace::new();
    let background = ws.photo("fpt.png", 1600, 900);
    let items = (1..=4)
        .map(|id| item(id, &format!("Lance {}", id), 1, "Côté gauche", Some((0.5, 0.5))))
        .collect();
    let request = request(
        vec![category(1, "FPT", vec![view_config("Côté gauche", Some(&background))])],
        items,
        ExportOptions {
            pointer_mode: true,
            ..ExportOptions::default()
        },
    );

    let pipeline = ws.vector_pipeline();
    let plan = pipeline.plan(&request)?;
    let page = &plan.pages[0];
    assert_eq!(page.kind, PageKind::Visual);
    assert!(page.pointer_mode);

    let board = Rect::new(40.0, 90.0, 760.0, 428.0);
    let placements = layout_bubbles(plan.entries(page), board, page.pointer_mode);
    assert_eq!(placements.len(), 4);
    for (i, a) in placements.iter().enumerate() {
        assert!(a.has_connector());
        for b in &placements[i + 1..] {
            assert!(!a.rect.intersects(&b.rect), "{} overlaps {}", a.key, b.key);
        }
    }

    let pdf = GeneratedPdf::from_bytes(pipeline.export(&request)?.bytes)?;
    assert_eq!(pdf.page_count(), 1);
    Ok(())
}

#[test]
fn table_fallback_starts_with_a_table_page() -> TestResult {
    init_logging();
    let ws = Workspace::new();
    let mut request = single_view_request(&ws);
    request.options.table_fallback = true;

    let pipeline = ws.vector_pipeline();
    let plan = pipeline.plan(&request)?;
    assert_eq!(plan.first_kind(), Some(PageKind::Table));
    assert!(plan.pages.iter().all(|p| p.kind == PageKind::Table));

    let pdf = GeneratedPdf::from_bytes(pipeline.export(&request)?.bytes)?;
    assert_eq!(pdf.page_count(), plan.len());
    Ok(())
}

#[test]
fn required_photo_that_is_missing_fails_the_export() {
    init_logging();
    let ws = Workspace::new();
    let mut view = view_config("Arrière", Some("/media/deleted.jpg"));
    view.background_photo_id = Some(7);
    let request = request(
        vec![category(3, "CCF", vec![view])],
        vec![item(1, "Tuyau", 3, "Arrière", Some((0.4, 0.4)))],
        ExportOptions::default(),
    );

    match ws.vector_pipeline().export(&request) {
        Err(ExportError::Plan(PlanError::MissingBackground { category, view })) => {
            assert_eq!(category, "CCF");
            assert_eq!(view, "ARRIÈRE");
        }
        other => panic!("expected MissingBackground, got {:?}", other.map(|d| d.filename)),
    }
}

#[test]
fn lot_rows_become_one_marker_with_summed_quantity() -> TestResult {
    let ws = Workspace::new();
    let mut first = item(1, "Compresses", 1, "Vue principale", None);
    let mut second = item(2, "Bande", 1, "Vue principale", None);
    for (row, quantity) in [(&mut first, 4), (&mut second, 2)] {
        row.lot_id = Some(9);
        row.lot_name = Some("Trousse de secours".to_string());
        row.quantity = quantity;
    }
    let request = request(
        vec![category(1, "VSAV 1", vec![view_config("Vue principale", None)])],
        vec![first, second],
        ExportOptions::default(),
    );

    let plan = ws.vector_pipeline().plan(&request)?;
    let entries = plan.entries(&plan.pages[0]);
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].key, "lot-9");
    assert_eq!(entries[0].quantity, 6);
    assert_eq!(entries[0].components.len(), 2);
    Ok(())
}

#[test]
fn selected_category_limits_the_export() -> TestResult {
    let ws = Workspace::new();
    let request = request(
        vec![
            category(1, "VSAV 1", vec![view_config("Cabine", None)]),
            category(2, "FPT", vec![view_config("Cabine", None)]),
        ],
        vec![item(1, "Casque", 1, "Cabine", None), item(2, "Masque", 2, "Cabine", None)],
        ExportOptions {
            selected_category_id: Some(2),
            ..ExportOptions::default()
        },
    );

    let summary = ws.vector_pipeline().plan(&request)?.summary();
    assert_eq!(summary.len(), 1);
    assert_eq!(summary[0].category, "FPT");
    Ok(())
}

#[test]
fn progress_reaches_the_page_count() -> TestResult {
    let ws = Workspace::new();
    let request = single_view_request(&ws);
    let seen = Mutex::new(Vec::new());
    let progress = |step: &str, current: usize, total: usize| {
        seen.lock().unwrap().push((step.to_string(), current, total));
    };

    ws.vector_pipeline()
        .export_with(&request, &CancellationToken::new(), &progress)?;

    let seen = seen.into_inner().unwrap();
    assert_eq!(seen.last(), Some(&("Rendu des pages".to_string(), 1, 1)));
    Ok(())
}

#[test]
fn cancelled_token_stops_before_rendering() {
    let ws = Workspace::new();
    let cancel = CancellationToken::new();
    cancel.cancel();
    let err = ws
        .vector_pipeline()
        .export_with(&single_view_request(&ws), &cancel, &rigsheet_render_core::NoProgress)
        .unwrap_err();
    assert!(err.is_cancelled());
}

#[test]
fn auto_uses_markup_when_a_browser_is_ready() -> TestResult {
    init_logging();
    let ws = Workspace::new();
    let document = browser_pipeline(&ws, Arc::new(CannedEngine)).export(&single_view_request(&ws))?;
    assert_eq!(document.renderer, SelectedRenderer::Markup);
    assert!(document.bytes.starts_with(b"%PDF-"));
    Ok(())
}

#[test]
fn auto_falls_back_to_vector_when_the_browser_crashes() -> TestResult {
    init_logging();
    let ws = Workspace::new();
    let document = browser_pipeline(&ws, Arc::new(CrashingEngine)).export(&single_view_request(&ws))?;
    assert_eq!(document.renderer, SelectedRenderer::Vector);
    assert_eq!(GeneratedPdf::from_bytes(document.bytes)?.page_count(), 1);
    Ok(())
}

#[test]
fn pinned_markup_failures_propagate() {
    let ws = Workspace::new();
    let pipeline = browser_pipeline(&ws, Arc::new(CrashingEngine)).with_mode(RendererMode::Markup);
    match pipeline.export(&single_view_request(&ws)) {
        Err(ExportError::Render(RenderError::Browser(message))) => assert!(message.contains("signal 11")),
        other => panic!("expected browser failure, got {:?}", other.map(|d| d.renderer)),
    }
}

#[test]
fn pinned_markup_without_browser_explains_how_to_install_one() {
    let ws = Workspace::new();
    let pipeline = ws.vector_pipeline().with_mode(RendererMode::Markup);
    match pipeline.export(&single_view_request(&ws)) {
        Err(ExportError::RendererUnavailable { hint }) => assert!(hint.contains("CHROME_BIN")),
        other => panic!("expected RendererUnavailable, got {:?}", other.map(|d| d.renderer)),
    }
    assert_eq!(pipeline.diagnostics().renderer_active, None);
}
