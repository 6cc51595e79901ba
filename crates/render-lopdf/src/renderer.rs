use crate::canvas::{BOLD_FONT, PageContext, REGULAR_FONT};
use crate::writer::{JpegImage, StreamingPdfWriter};
use log::{debug, warn};
use lopdf::{Dictionary, Object, ObjectId, dictionary};
use rigsheet_core::style::TABLE_ROW_BUDGET;
use rigsheet_core::{PageKind, PagePlan, PlannedPage, Theme};
use rigsheet_layout::bubbles::{BubblePlacement, layout_bubbles};
use rigsheet_layout::frame::{BACKGROUND_ASPECT, fit_aspect, fit_image};
use rigsheet_layout::text::{FontWeight, ellipsize, text_width, wrap_text};
use rigsheet_render_core::utils::{DOCUMENT_TITLE, footer_label};
use rigsheet_render_core::{PageRenderer, RenderContext, RenderError};
use rigsheet_types::geometry::{Point, Rect, Size};
use rigsheet_types::{Color, VehicleViewEntry};
use std::collections::HashMap;
use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::time::Instant;

const SECTION_TITLE_HEIGHT: f32 = 22.0;
const CARD_RADIUS: f32 = 8.0;
const CARD_PADDING: f32 = 6.0;
const ICON_SIZE: f32 = 32.0;
const SHADOW_OFFSET: f32 = 2.0;
const TABLE_CELL_PADDING: f32 = 5.0;
const LINE_SPACING: f32 = 1.2;
const TABLE_HEADER_HEIGHT: f32 = 22.0;
const TABLE_MIN_ROW_HEIGHT: f32 = 22.0;
const COLUMN_SHARES: [f32; 3] = [0.55, 0.30, 0.15];

/// An image already written to the file, reusable by later pages.
#[derive(Clone, Copy)]
struct EmbeddedImage {
    id: ObjectId,
    width: u32,
    height: u32,
}

/// Draws the plan directly as PDF content streams.
#[derive(Debug, Clone, Default)]
pub struct VectorRenderer;

impl VectorRenderer {
    pub fn new() -> Self {
        Self
    }
}

impl PageRenderer for VectorRenderer {
    fn name(&self) -> &'static str {
        "vector"
    }

    fn render(&self, plan: &PagePlan, ctx: &RenderContext<'_>) -> Result<Vec<u8>, RenderError> {
        ctx.checkpoint()?;
        let started = Instant::now();
        let base_font = if plan.theme.bold_text { "Helvetica-Bold" } else { "Helvetica" };
        let font_dict = dictionary! {
            REGULAR_FONT => dictionary! {
                "Type" => "Font", "Subtype" => "Type1", "BaseFont" => base_font, "Encoding" => "WinAnsiEncoding",
            },
            BOLD_FONT => dictionary! {
                "Type" => "Font", "Subtype" => "Type1", "BaseFont" => "Helvetica-Bold", "Encoding" => "WinAnsiEncoding",
            },
        };

        let mut doc = DocumentState {
            writer: StreamingPdfWriter::new(Cursor::new(Vec::new()), "1.7", font_dict)?,
            images: HashMap::new(),
        };

        let total = plan.len();
        for (index, page) in plan.pages.iter().enumerate() {
            ctx.checkpoint()?;
            ctx.report("Rendu des pages", index, total);
            doc.render_page(plan, page, index, ctx)?;
        }
        ctx.report("Rendu des pages", total, total);

        doc.writer.set_info(
            DOCUMENT_TITLE,
            "rigsheet",
            &ctx.generated_at.format("D:%Y%m%d%H%M%S").to_string(),
        );
        let bytes = doc.writer.finish()?.into_inner();
        debug!(
            "vector render pages={} size_bytes={} render_ms={:.2}",
            total,
            bytes.len(),
            started.elapsed().as_secs_f64() * 1000.0
        );
        Ok(bytes)
    }
}

struct DocumentState {
    writer: StreamingPdfWriter<Cursor<Vec<u8>>>,
    images: HashMap<PathBuf, EmbeddedImage>,
}

/// Per-page image names collected for the resource dictionary.
#[derive(Default)]
struct PageImages {
    names: Vec<(String, ObjectId)>,
}

impl PageImages {
    fn register(&mut self, id: ObjectId) -> String {
        if let Some((name, _)) = self.names.iter().find(|(_, existing)| *existing == id) {
            return name.clone();
        }
        let name = format!("Im{}", self.names.len() + 1);
        self.names.push((name.clone(), id));
        name
    }

    fn into_dictionary(self) -> Dictionary {
        let mut dict = Dictionary::new();
        for (name, id) in self.names {
            dict.set(name.into_bytes(), Object::Reference(id));
        }
        dict
    }
}

impl DocumentState {
    fn render_page(
        &mut self,
        plan: &PagePlan,
        page: &PlannedPage,
        index: usize,
        ctx: &RenderContext<'_>,
    ) -> Result<(), RenderError> {
        let theme = &plan.theme;
        let view = plan.view(page);
        let size = page.orientation.page_size();
        let mut canvas = PageContext::new(size);
        let mut images = PageImages::default();

        canvas.fill_rect(Rect::new(0.0, 0.0, size.width, size.height), theme.palette.background);
        if plan.include_header {
            draw_header(&mut canvas, theme, size);
        }

        let bounds = theme.metrics.content_bounds(size);
        let mut title = view.title();
        if page.chunk_count > 1 {
            title = format!("{title} ({}/{})", page.chunk + 1, page.chunk_count);
        }
        canvas.text(
            bounds.x,
            bounds.y + theme.fonts.subtitle,
            FontWeight::Bold,
            theme.fonts.subtitle,
            theme.palette.text,
            &ellipsize(&title, bounds.width, theme.fonts.subtitle, FontWeight::Bold),
        );
        let body = Rect::new(
            bounds.x,
            bounds.y + SECTION_TITLE_HEIGHT,
            bounds.width,
            (bounds.height - SECTION_TITLE_HEIGHT).max(0.0),
        );

        match page.kind {
            PageKind::Visual => {
                self.draw_visual(&mut canvas, &mut images, plan, page, body, ctx)?;
            }
            PageKind::Table => draw_table(&mut canvas, theme, plan.entries(page), body)?,
        }

        if plan.include_footer {
            let band = theme.metrics.footer_band(size);
            canvas.text_right(
                band.right(),
                band.y + band.height / 2.0 + theme.fonts.small / 2.0,
                FontWeight::Regular,
                theme.fonts.small,
                theme.palette.muted,
                &footer_label(&ctx.generated_at, index + 1, plan.len()),
            );
        }

        let (content, states) = canvas.finish();
        let content_id = self.writer.write_content_stream(content)?;
        let mut resources = dictionary! { "Font" => self.writer.fonts_id };
        if !states.is_empty() {
            resources.set("ExtGState", states);
        }
        let xobjects = images.into_dictionary();
        if !xobjects.is_empty() {
            resources.set("XObject", xobjects);
        }
        self.writer.write_page(content_id, resources, size.width, size.height)?;
        Ok(())
    }

    fn embed(&mut self, path: &Path, ctx: &RenderContext<'_>, width_pt: f32, height_pt: f32) -> Result<EmbeddedImage, RenderError> {
        let prepared = ctx.prepare_image(path, width_pt, height_pt)?;
        if let Some(existing) = self.images.get(&prepared.path) {
            return Ok(*existing);
        }
        let info = rigsheet_resource::probe(&prepared.path)?;
        let data = fs::read(&prepared.path)?;
        let id = self.writer.write_jpeg(JpegImage {
            width: info.width,
            height: info.height,
            data: &data,
        })?;
        let embedded = EmbeddedImage {
            id,
            width: info.width,
            height: info.height,
        };
        self.images.insert(prepared.path, embedded);
        Ok(embedded)
    }

    fn draw_visual(
        &mut self,
        canvas: &mut PageContext,
        images: &mut PageImages,
        plan: &PagePlan,
        page: &PlannedPage,
        body: Rect,
        ctx: &RenderContext<'_>,
    ) -> Result<(), RenderError> {
        let theme = &plan.theme;
        let view = plan.view(page);
        let frame = fit_aspect(body, BACKGROUND_ASPECT);
        canvas.fill_rect(frame, theme.palette.surface);

        let mut board = frame;
        if let Some(background) = &view.background_path {
            let drawn = match page.background {
                Some(info) => fit_image(frame, info.width, info.height),
                None => frame,
            };
            let embedded = self.embed(background, ctx, drawn.width, drawn.height)?;
            board = fit_image(frame, embedded.width, embedded.height);
            let name = images.register(embedded.id);
            canvas.image(&name, board);
        }
        canvas.stroke_rect(frame, theme.palette.bubble_border, 0.75);

        let entries = plan.entries(page);
        let placements = layout_bubbles(entries, board, page.pointer_mode);

        for placement in &placements {
            if let Some(connector) = &placement.connector {
                canvas.line(connector.from, connector.to, Color::rgba(255, 255, 255, 0.85), 2.5);
                canvas.line(connector.from, connector.to, theme.palette.accent, 1.2);
            }
        }
        for placement in &placements {
            ctx.checkpoint()?;
            let entry = &entries[placement.entry_index];
            let icon = match &entry.icon_path {
                Some(path) => match self.embed(path, ctx, ICON_SIZE, ICON_SIZE) {
                    Ok(icon) => Some((images.register(icon.id), icon)),
                    Err(RenderError::Cancelled) => return Err(RenderError::Cancelled),
                    Err(e) => {
                        warn!("icon {} skipped: {}", path.display(), e);
                        None
                    }
                },
                None => None,
            };
            draw_card(canvas, theme, entry, placement, icon.as_ref());
        }
        for placement in &placements {
            if let Some(connector) = &placement.connector {
                canvas.circle(
                    connector.to,
                    connector.dot_radius,
                    theme.palette.accent,
                    Some((theme.palette.point_fill, 1.0)),
                );
            }
        }
        Ok(())
    }
}

fn draw_header(canvas: &mut PageContext, theme: &Theme, page: Size) {
    let band = theme.metrics.header_band(page);
    canvas.fill_rect(band, theme.palette.header_band);
    canvas.text(
        theme.metrics.margins.left + 6.0,
        band.height / 2.0 + theme.fonts.title * 0.35,
        FontWeight::Bold,
        theme.fonts.title,
        theme.palette.on_header,
        DOCUMENT_TITLE,
    );
}

/// Card with icon, name, reference line and quantity badge.
fn draw_card(
    canvas: &mut PageContext,
    theme: &Theme,
    entry: &VehicleViewEntry,
    placement: &BubblePlacement,
    icon: Option<&(String, EmbeddedImage)>,
) {
    let rect = placement.rect;
    let palette = &theme.palette;
    let shadow = Rect::new(rect.x + SHADOW_OFFSET, rect.y + SHADOW_OFFSET, rect.width, rect.height);
    canvas.rounded_rect(shadow, CARD_RADIUS, palette.shadow, None);
    canvas.rounded_rect(rect, CARD_RADIUS, palette.bubble, Some((palette.bubble_border, 0.75)));

    let mut text_x = rect.x + CARD_PADDING;
    let icon_box = Rect::new(
        rect.x + CARD_PADDING,
        rect.y + (rect.height - ICON_SIZE) / 2.0,
        ICON_SIZE,
        ICON_SIZE,
    );
    if let Some((name, image)) = icon {
        // cover the square, cropping the longer side
        let scale = (ICON_SIZE / image.width as f32).max(ICON_SIZE / image.height as f32);
        let (w, h) = (image.width as f32 * scale, image.height as f32 * scale);
        let cover = Rect::new(icon_box.center().x - w / 2.0, icon_box.center().y - h / 2.0, w, h);
        canvas.save();
        canvas.clip_rect(icon_box);
        canvas.image(name, cover);
        canvas.restore();
        text_x = icon_box.right() + CARD_PADDING;
    }

    let badge_label = format!("×{}", entry.quantity);
    let badge_width = text_width(&badge_label, theme.fonts.small, FontWeight::Bold) + 10.0;
    let badge = Rect::new(rect.right() - badge_width - 4.0, rect.y + 4.0, badge_width, 14.0);
    canvas.rounded_rect(badge, 7.0, palette.accent, None);
    canvas.text_centered(
        badge.center().x,
        badge.y + 10.0,
        FontWeight::Bold,
        theme.fonts.small,
        palette.badge_text,
        &badge_label,
    );

    let name_width = (badge.x - 4.0 - text_x).max(0.0);
    canvas.text(
        text_x,
        rect.y + 18.0,
        FontWeight::Bold,
        theme.fonts.body,
        palette.text,
        &ellipsize(&entry.name, name_width, theme.fonts.body, FontWeight::Bold),
    );
    let detail = match &entry.lot_label {
        Some(lot) => format!("Lot : {lot}"),
        None => format!("Réf. {}", entry.reference),
    };
    let detail_width = (rect.right() - CARD_PADDING - text_x).max(0.0);
    canvas.text(
        text_x,
        rect.y + 33.0,
        FontWeight::Regular,
        theme.fonts.small,
        palette.muted,
        &ellipsize(&detail, detail_width, theme.fonts.small, FontWeight::Regular),
    );
}

fn cell_lines(text: &str, width: f32, size: f32, weight: FontWeight) -> Vec<String> {
    let lines = wrap_text(text, width, size, weight);
    if lines.is_empty() { vec![String::new()] } else { lines }
}

/// Fails instead of clipping when the planned rows do not fit `body`.
fn draw_table(
    canvas: &mut PageContext,
    theme: &Theme,
    entries: &[VehicleViewEntry],
    body: Rect,
) -> Result<(), RenderError> {
    let palette = &theme.palette;
    let size = theme.fonts.body;
    let small = theme.fonts.small;
    let widths: Vec<f32> = COLUMN_SHARES.iter().map(|share| body.width * share).collect();
    let column_x = [body.x, body.x + widths[0], body.x + widths[0] + widths[1]];

    let header = Rect::new(body.x, body.y, body.width, TABLE_HEADER_HEIGHT);
    canvas.fill_rect(header, palette.table_header);
    let header_baseline = header.y + TABLE_HEADER_HEIGHT / 2.0 + size * 0.35;
    for (i, label) in ["Article", "Référence", "Quantité"].iter().enumerate() {
        if i == 2 {
            canvas.text_right(column_x[i] + widths[i] - TABLE_CELL_PADDING, header_baseline, FontWeight::Bold, size, palette.text, label);
        } else {
            canvas.text(column_x[i] + TABLE_CELL_PADDING, header_baseline, FontWeight::Bold, size, palette.text, label);
        }
    }

    let mut y = header.bottom();
    for (drawn, entry) in entries.iter().enumerate() {
        let inner = widths[0] - 2.0 * TABLE_CELL_PADDING;
        let mut lines: Vec<(String, f32)> = cell_lines(&entry.name, inner, size, FontWeight::Regular)
            .into_iter()
            .map(|line| (line, size))
            .collect();
        for component in &entry.components {
            for line in wrap_text(component, inner, small, FontWeight::Regular) {
                lines.push((line, small));
            }
        }

        // keep what fits in one row budget
        let budget = TABLE_ROW_BUDGET - 2.0 * TABLE_CELL_PADDING;
        let mut used = 0.0;
        let mut kept = 0;
        for (_, font_size) in &lines {
            let height = font_size * LINE_SPACING;
            if used + height > budget + 0.01 {
                break;
            }
            used += height;
            kept += 1;
        }
        if kept < lines.len() {
            lines.truncate(kept.max(1));
            if let Some(last) = lines.last_mut() {
                last.0 = ellipsize(&format!("{}…", last.0), inner, last.1, FontWeight::Regular);
            }
        }

        let row_height = (used + 2.0 * TABLE_CELL_PADDING).max(TABLE_MIN_ROW_HEIGHT);
        if y + row_height > body.bottom() + 0.5 {
            return Err(RenderError::TableOverflow {
                drawn,
                total: entries.len(),
            });
        }
        let row = Rect::new(body.x, y, body.width, row_height);
        canvas.fill_rect(row, palette.surface);

        let first_baseline = y + TABLE_CELL_PADDING + size * 0.85;
        let mut baseline = first_baseline;
        for (text, font_size) in &lines {
            let color = if *font_size < size { palette.muted } else { palette.text };
            canvas.text(column_x[0] + TABLE_CELL_PADDING, baseline, FontWeight::Regular, *font_size, color, text);
            baseline += font_size * LINE_SPACING;
        }
        let reference = ellipsize(&entry.reference, widths[1] - 2.0 * TABLE_CELL_PADDING, size, FontWeight::Regular);
        canvas.text(column_x[1] + TABLE_CELL_PADDING, first_baseline, FontWeight::Regular, size, palette.text, &reference);
        canvas.text_right(
            column_x[2] + widths[2] - TABLE_CELL_PADDING,
            first_baseline,
            FontWeight::Bold,
            size,
            palette.text,
            &entry.quantity.to_string(),
        );
        canvas.line(
            Point::new(body.x, row.bottom()),
            Point::new(body.right(), row.bottom()),
            palette.bubble_border,
            0.5,
        );
        y = row.bottom();
    }
    Ok(())
}
