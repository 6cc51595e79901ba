//! HTML document for the markup renderer.
//!
//! Every planned page becomes a `<section class="page">` sized to the physical
//! page in points. Geometry comes from the same frame and bubble layout the
//! vector renderer uses; markers are then expressed as percentages of the
//! board so the browser only has to stack boxes.

use crate::assets::AssetEncoder;
use rigsheet_core::style::TABLE_ROW_BUDGET;
use rigsheet_core::{PageKind, PagePlan, PlannedPage, Theme};
use rigsheet_layout::bubbles::{BubblePlacement, layout_bubbles};
use rigsheet_layout::frame::{BACKGROUND_ASPECT, fit_aspect, fit_image};
use rigsheet_render_core::utils::{DOCUMENT_TITLE, footer_label};
use rigsheet_render_core::{RenderContext, RenderError};
use rigsheet_types::geometry::{Orientation, Point, Rect};
use rigsheet_types::{VehicleView, VehicleViewEntry};
use std::fmt::Write;

pub(crate) const SECTION_TITLE_HEIGHT: f32 = 22.0;
pub(crate) const ICON_SIZE: f32 = 32.0;
const MAX_CARD_COMPONENTS: usize = 3;

pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn placed(rect: Rect) -> String {
    format!(
        "left:{:.2}pt;top:{:.2}pt;width:{:.2}pt;height:{:.2}pt",
        rect.x, rect.y, rect.width, rect.height
    )
}

fn percent(value: f32, origin: f32, extent: f32) -> f32 {
    if extent <= 0.0 {
        return 0.0;
    }
    ((value - origin) / extent * 100.0).clamp(0.0, 100.0)
}

fn relative(point: Point, board: Rect) -> (f32, f32) {
    (
        percent(point.x, board.x, board.width),
        percent(point.y, board.y, board.height),
    )
}

fn stylesheet(theme: &Theme) -> String {
    let p = &theme.palette;
    let f = &theme.fonts;
    let weight = if theme.bold_text { 700 } else { 400 };
    format!(
        r#"@page landscape {{ size: A4 landscape; margin: 0; }}
@page portrait {{ size: A4 portrait; margin: 0; }}
* {{ box-sizing: border-box; margin: 0; padding: 0; }}
html, body {{ font-family: Helvetica, Arial, sans-serif; font-weight: {weight}; color: {text}; -webkit-print-color-adjust: exact; print-color-adjust: exact; }}
.page {{ position: relative; overflow: hidden; background: {background}; break-after: page; }}
.page:last-child {{ break-after: auto; }}
.page.landscape {{ page: landscape; width: 841.89pt; height: 595.28pt; }}
.page.portrait {{ page: portrait; width: 595.28pt; height: 841.89pt; }}
.page > * {{ position: absolute; }}
.page-header {{ background: {header_band}; color: {on_header}; display: flex; align-items: center; }}
.module-title {{ font-size: {title}pt; font-weight: 700; }}
.view-title {{ font-size: {subtitle}pt; font-weight: 700; white-space: nowrap; overflow: hidden; text-overflow: ellipsis; }}
.frame {{ background: {surface}; border: 0.75pt solid {border}; }}
.board-image {{ display: block; object-fit: fill; }}
.board-layer {{ overflow: visible; }}
.pointer-layer {{ position: absolute; inset: 0; width: 100%; height: 100%; overflow: visible; }}
.pointer-point {{ position: absolute; width: 6pt; height: 6pt; border-radius: 50%; background: {accent}; border: 1pt solid {point_fill}; transform: translate(-50%, -50%); z-index: 3; }}
.marker {{ position: absolute; display: flex; align-items: center; gap: 6pt; padding: 4pt 6pt; border-radius: 8pt; background: {bubble}; border: 0.75pt solid {border}; box-shadow: 2pt 2pt 0 {shadow}; z-index: 2; }}
.marker-image {{ width: {icon}pt; height: {icon}pt; flex: none; object-fit: cover; border-radius: 4pt; }}
.marker-placeholder {{ width: {icon}pt; height: {icon}pt; flex: none; border-radius: 4pt; border: 0.75pt solid {border}; background: {surface}; color: {muted}; font-size: 6pt; font-weight: 700; display: flex; align-items: center; justify-content: center; }}
.marker-body {{ min-width: 0; flex: 1; }}
.marker-name {{ font-size: {body}pt; font-weight: 700; white-space: nowrap; overflow: hidden; text-overflow: ellipsis; }}
.marker-qty {{ font-size: {small}pt; color: {muted}; }}
.marker-lot {{ display: inline-block; margin-top: 2pt; padding: 0 5pt; border-radius: 999pt; background: {accent}; color: {badge_text}; font-size: 6.5pt; font-weight: 700; text-transform: uppercase; }}
.marker-components {{ list-style: none; font-size: 6.5pt; color: {muted}; }}
.marker-components li {{ white-space: nowrap; overflow: hidden; text-overflow: ellipsis; }}
table.inventory {{ width: 100%; border-collapse: collapse; font-size: {body}pt; table-layout: fixed; }}
table.inventory th {{ background: {table_header}; text-align: left; font-weight: 700; height: 22pt; padding: 0 5pt; }}
table.inventory td {{ background: {surface}; padding: 5pt; vertical-align: top; border-bottom: 0.5pt solid {border}; }}
table.inventory .qty {{ text-align: right; font-weight: 700; }}
table.inventory .cell {{ max-height: {cell_budget}pt; overflow: hidden; }}
table.inventory .component {{ font-size: {small}pt; color: {muted}; }}
.page-footer {{ font-size: {small}pt; color: {muted}; display: flex; align-items: center; justify-content: flex-end; }}
"#,
        weight = weight,
        text = p.text.to_css(),
        background = p.background.to_css(),
        header_band = p.header_band.to_css(),
        on_header = p.on_header.to_css(),
        title = f.title,
        subtitle = f.subtitle,
        body = f.body,
        small = f.small,
        surface = p.surface.to_css(),
        border = p.bubble_border.to_css(),
        accent = p.accent.to_css(),
        point_fill = p.point_fill.to_css(),
        bubble = p.bubble.to_css(),
        shadow = p.shadow.to_css(),
        muted = p.muted.to_css(),
        badge_text = p.badge_text.to_css(),
        table_header = p.table_header.to_css(),
        icon = ICON_SIZE,
        cell_budget = TABLE_ROW_BUDGET - 10.0,
    )
}

/// Builds the full document for `plan`. Images are embedded as data URIs.
pub fn build_document(plan: &PagePlan, ctx: &RenderContext<'_>) -> Result<String, RenderError> {
    let mut assets = AssetEncoder::new(ctx);
    assets.prepare_icons(plan)?;

    let mut html = String::with_capacity(16 * 1024);
    let _ = write!(
        html,
        "<!doctype html>\n<html lang=\"fr\">\n<head>\n<meta charset=\"utf-8\" />\n<title>{}</title>\n<style>\n{}</style>\n</head>\n<body>\n",
        escape_html(DOCUMENT_TITLE),
        stylesheet(&plan.theme)
    );

    let total = plan.len();
    for (index, page) in plan.pages.iter().enumerate() {
        ctx.checkpoint()?;
        ctx.report("Rendu des pages", index, total);
        render_page(&mut html, plan, page, index, &mut assets, ctx)?;
    }
    html.push_str("</body>\n</html>\n");
    Ok(html)
}

fn render_page(
    html: &mut String,
    plan: &PagePlan,
    page: &PlannedPage,
    index: usize,
    assets: &mut AssetEncoder<'_, '_>,
    ctx: &RenderContext<'_>,
) -> Result<(), RenderError> {
    let theme = &plan.theme;
    let view = plan.view(page);
    let size = page.orientation.page_size();
    let orientation = match page.orientation {
        Orientation::Landscape => "landscape",
        Orientation::Portrait => "portrait",
    };
    let _ = writeln!(
        html,
        "<section class=\"page {}\" data-kind=\"{}\">",
        orientation,
        match page.kind {
            PageKind::Visual => "visual",
            PageKind::Table => "table",
        }
    );

    if plan.include_header {
        let band = theme.metrics.header_band(size);
        let _ = writeln!(
            html,
            "<header class=\"page-header\" style=\"{};padding-left:{:.2}pt\"><span class=\"module-title\">{}</span></header>",
            placed(band),
            theme.metrics.margins.left + 6.0,
            escape_html(DOCUMENT_TITLE)
        );
    }

    let bounds = theme.metrics.content_bounds(size);
    let mut title = view.title();
    if page.chunk_count > 1 {
        title = format!("{title} ({}/{})", page.chunk + 1, page.chunk_count);
    }
    let _ = writeln!(
        html,
        "<h2 class=\"view-title\" style=\"{}\">{}</h2>",
        placed(Rect::new(bounds.x, bounds.y, bounds.width, SECTION_TITLE_HEIGHT)),
        escape_html(&title)
    );
    let body = Rect::new(
        bounds.x,
        bounds.y + SECTION_TITLE_HEIGHT,
        bounds.width,
        (bounds.height - SECTION_TITLE_HEIGHT).max(0.0),
    );

    match page.kind {
        PageKind::Visual => render_visual(html, plan, page, view, body, assets)?,
        PageKind::Table => render_table(html, plan.entries(page), body),
    }

    if plan.include_footer {
        let band = theme.metrics.footer_band(size);
        let _ = writeln!(
            html,
            "<footer class=\"page-footer\" style=\"{}\"><span>{}</span></footer>",
            placed(band),
            escape_html(&footer_label(&ctx.generated_at, index + 1, plan.len()))
        );
    }
    html.push_str("</section>\n");
    Ok(())
}

fn render_visual(
    html: &mut String,
    plan: &PagePlan,
    page: &PlannedPage,
    view: &VehicleView,
    body: Rect,
    assets: &mut AssetEncoder<'_, '_>,
) -> Result<(), RenderError> {
    let frame = fit_aspect(body, BACKGROUND_ASPECT);
    let _ = writeln!(html, "<div class=\"frame\" style=\"{}\"></div>", placed(frame));

    let mut board = frame;
    if let Some(background) = &view.background_path {
        if let Some(info) = page.background {
            board = fit_image(frame, info.width, info.height);
        }
        let image = assets.background(background, board.width, board.height)?;
        board = fit_image(frame, image.width, image.height);
        let _ = writeln!(
            html,
            "<img class=\"board-image\" style=\"{}\" src=\"{}\" alt=\"\" />",
            placed(board),
            image.data_uri
        );
    }

    let entries = plan.entries(page);
    let placements = layout_bubbles(entries, board, page.pointer_mode);
    let _ = writeln!(html, "<div class=\"board-layer\" style=\"{}\">", placed(board));

    if placements.iter().any(BubblePlacement::has_connector) {
        html.push_str(
            "<svg class=\"pointer-layer\" viewBox=\"0 0 100 100\" preserveAspectRatio=\"none\" aria-hidden=\"true\">\n",
        );
        for connector in placements.iter().filter_map(|p| p.connector.as_ref()) {
            let (x1, y1) = relative(connector.from, board);
            let (x2, y2) = relative(connector.to, board);
            let _ = writeln!(
                html,
                "<line x1=\"{x1:.2}\" y1=\"{y1:.2}\" x2=\"{x2:.2}\" y2=\"{y2:.2}\" stroke=\"rgba(255,255,255,0.85)\" stroke-width=\"2.5\" vector-effect=\"non-scaling-stroke\" stroke-linecap=\"round\" />"
            );
            let _ = writeln!(
                html,
                "<line class=\"connector\" x1=\"{x1:.2}\" y1=\"{y1:.2}\" x2=\"{x2:.2}\" y2=\"{y2:.2}\" stroke=\"{}\" stroke-width=\"1.2\" vector-effect=\"non-scaling-stroke\" stroke-linecap=\"round\" />",
                plan.theme.palette.accent.to_css()
            );
        }
        html.push_str("</svg>\n");
    }

    for placement in &placements {
        let entry = &entries[placement.entry_index];
        render_marker(html, entry, placement, board, assets);
    }

    for connector in placements.iter().filter_map(|p| p.connector.as_ref()) {
        let (x, y) = relative(connector.to, board);
        let _ = writeln!(
            html,
            "<span class=\"pointer-point\" style=\"left:{x:.2}%;top:{y:.2}%\"></span>"
        );
    }
    html.push_str("</div>\n");
    Ok(())
}

fn render_marker(
    html: &mut String,
    entry: &VehicleViewEntry,
    placement: &BubblePlacement,
    board: Rect,
    assets: &AssetEncoder<'_, '_>,
) {
    let rect = placement.rect;
    let (left, top) = relative(Point::new(rect.x, rect.y), board);
    let width = if board.width > 0.0 { rect.width / board.width * 100.0 } else { 0.0 };
    let _ = write!(
        html,
        "<div class=\"marker\" data-key=\"{}\" style=\"left:{left:.2}%;top:{top:.2}%;width:{width:.2}%;min-height:{:.2}pt\">",
        escape_html(&entry.key),
        rect.height
    );

    match entry.icon_path.as_deref().and_then(|path| assets.icon(path)) {
        Some(uri) => {
            let _ = write!(
                html,
                "<img class=\"marker-image\" src=\"{}\" alt=\"{}\" />",
                uri,
                escape_html(&entry.name)
            );
        }
        None => html.push_str("<div class=\"marker-placeholder\">N/A</div>"),
    }

    let _ = write!(
        html,
        "<div class=\"marker-body\"><div class=\"marker-name\">{}</div><div class=\"marker-qty\">Qté : {}</div>",
        escape_html(&entry.name),
        entry.quantity
    );
    if let Some(lot) = &entry.lot_label {
        let _ = write!(html, "<div class=\"marker-lot\">{}</div>", escape_html(lot));
    }
    if !entry.components.is_empty() {
        html.push_str("<ul class=\"marker-components\">");
        for line in entry.components.iter().take(MAX_CARD_COMPONENTS) {
            let _ = write!(html, "<li>{}</li>", escape_html(line));
        }
        let hidden = entry.components.len().saturating_sub(MAX_CARD_COMPONENTS);
        if hidden > 0 {
            let _ = write!(html, "<li>… +{hidden}</li>");
        }
        html.push_str("</ul>");
    }
    html.push_str("</div></div>\n");
}

fn render_table(html: &mut String, entries: &[VehicleViewEntry], body: Rect) {
    let _ = writeln!(
        html,
        "<div class=\"table-body\" style=\"{}\">\n<table class=\"inventory\">\n<colgroup><col style=\"width:55%\" /><col style=\"width:30%\" /><col style=\"width:15%\" /></colgroup>\n<thead><tr><th>Article</th><th>Référence</th><th class=\"qty\">Quantité</th></tr></thead>\n<tbody>",
        placed(body)
    );
    for entry in entries {
        let _ = write!(
            html,
            "<tr><td><div class=\"cell\"><div>{}</div>",
            escape_html(&entry.name)
        );
        for component in &entry.components {
            let _ = write!(html, "<div class=\"component\">{}</div>", escape_html(component));
        }
        let _ = writeln!(
            html,
            "</div></td><td><div class=\"cell\">{}</div></td><td class=\"qty\">{}</td></tr>",
            escape_html(&entry.reference),
            entry.quantity
        );
    }
    html.push_str("</tbody>\n</table>\n</div>\n");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_markup_characters() {
        assert_eq!(
            escape_html(r#"<Gants & "Masques" l'été>"#),
            "&lt;Gants &amp; &quot;Masques&quot; l&#39;été&gt;"
        );
    }

    #[test]
    fn percentages_are_relative_to_the_board() {
        let board = Rect::new(100.0, 50.0, 200.0, 100.0);
        assert_eq!(relative(Point::new(200.0, 100.0), board), (50.0, 50.0));
        assert_eq!(relative(Point::new(0.0, 500.0), board), (0.0, 100.0));
        assert_eq!(percent(10.0, 0.0, 0.0), 0.0);
    }

    #[test]
    fn stylesheet_carries_theme_tokens() {
        let css = stylesheet(&Theme::premium());
        assert!(css.contains("font-weight: 700; color: #ffffff"));
        assert!(css.contains("@page portrait"));
        let css = stylesheet(&Theme::default());
        assert!(css.contains("font-weight: 400"));
    }
}
