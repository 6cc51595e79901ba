//! Page drawing context.
//!
//! Callers work in top-left page coordinates; every operation is flipped into
//! PDF space here. Translucent fills are expressed with ExtGState entries the
//! context collects for the page's resource dictionary.

use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Object, StringFormat, dictionary};
use rigsheet_layout::text::{FontWeight, text_width};
use rigsheet_render_core::utils::{flip_y, to_win_ansi};
use rigsheet_types::Color;
use rigsheet_types::geometry::{Point, Rect, Size};

pub(crate) const REGULAR_FONT: &str = "F1";
pub(crate) const BOLD_FONT: &str = "F2";

// Bezier control distance approximating a quarter circle.
const KAPPA: f32 = 0.552_284_8;

fn font_resource(weight: FontWeight) -> &'static str {
    match weight {
        FontWeight::Regular => REGULAR_FONT,
        FontWeight::Bold => BOLD_FONT,
    }
}

fn rgb_operands(color: Color) -> Vec<Object> {
    color.to_unit_rgb().iter().map(|c| (*c).into()).collect()
}

pub(crate) struct PageContext {
    page_height: f32,
    content: Content,
    /// Alpha values used on this page, in first-use order.
    alphas: Vec<u8>,
}

impl PageContext {
    pub fn new(page: Size) -> Self {
        Self {
            page_height: page.height,
            content: Content { operations: vec![] },
            alphas: Vec::new(),
        }
    }

    pub fn finish(self) -> (Content, Dictionary) {
        let mut states = Dictionary::new();
        for alpha in &self.alphas {
            let value = *alpha as f32 / 255.0;
            states.set(
                Self::alpha_state_name(*alpha).into_bytes(),
                dictionary! { "Type" => "ExtGState", "ca" => value, "CA" => value },
            );
        }
        (self.content, states)
    }

    fn op(&mut self, operator: &str, operands: Vec<Object>) {
        self.content.operations.push(Operation::new(operator, operands));
    }

    fn alpha_state_name(alpha: u8) -> String {
        format!("GA{}", alpha)
    }

    fn y(&self, y: f32) -> f32 {
        flip_y(y, self.page_height)
    }

    pub fn save(&mut self) {
        self.op("q", vec![]);
    }

    pub fn restore(&mut self) {
        self.op("Q", vec![]);
    }

    /// Sets the fill color. Colors with alpha select a matching ExtGState and
    /// must be used between [`save`](Self::save) and [`restore`](Self::restore).
    fn set_fill(&mut self, color: Color) {
        if color.a < 1.0 {
            let alpha = (color.a.clamp(0.0, 1.0) * 255.0).round() as u8;
            if !self.alphas.contains(&alpha) {
                self.alphas.push(alpha);
            }
            self.op("gs", vec![Object::Name(Self::alpha_state_name(alpha).into_bytes())]);
        }
        self.op("rg", rgb_operands(color));
    }

    fn set_stroke(&mut self, color: Color, width: f32) {
        self.op("RG", rgb_operands(color));
        self.op("w", vec![width.into()]);
    }

    fn rect_path(&mut self, rect: Rect) {
        self.op(
            "re",
            vec![
                rect.x.into(),
                self.y(rect.bottom()).into(),
                rect.width.into(),
                rect.height.into(),
            ],
        );
    }

    fn rounded_rect_path(&mut self, rect: Rect, radius: f32) {
        let r = radius.min(rect.width / 2.0).min(rect.height / 2.0).max(0.0);
        if r == 0.0 {
            self.rect_path(rect);
            return;
        }
        let k = r * KAPPA;
        let (left, right) = (rect.x, rect.right());
        let (top, bottom) = (self.y(rect.y), self.y(rect.bottom()));
        self.op("m", vec![(left + r).into(), top.into()]);
        self.op("l", vec![(right - r).into(), top.into()]);
        self.op(
            "c",
            vec![
                (right - r + k).into(), top.into(),
                right.into(), (top - r + k).into(),
                right.into(), (top - r).into(),
            ],
        );
        self.op("l", vec![right.into(), (bottom + r).into()]);
        self.op(
            "c",
            vec![
                right.into(), (bottom + r - k).into(),
                (right - r + k).into(), bottom.into(),
                (right - r).into(), bottom.into(),
            ],
        );
        self.op("l", vec![(left + r).into(), bottom.into()]);
        self.op(
            "c",
            vec![
                (left + r - k).into(), bottom.into(),
                left.into(), (bottom + r - k).into(),
                left.into(), (bottom + r).into(),
            ],
        );
        self.op("l", vec![left.into(), (top - r).into()]);
        self.op(
            "c",
            vec![
                left.into(), (top - r + k).into(),
                (left + r - k).into(), top.into(),
                (left + r).into(), top.into(),
            ],
        );
        self.op("h", vec![]);
    }

    fn circle_path(&mut self, center: Point, radius: f32) {
        let (cx, cy) = (center.x, self.y(center.y));
        let k = radius * KAPPA;
        self.op("m", vec![(cx + radius).into(), cy.into()]);
        self.op("c", vec![(cx + radius).into(), (cy + k).into(), (cx + k).into(), (cy + radius).into(), cx.into(), (cy + radius).into()]);
        self.op("c", vec![(cx - k).into(), (cy + radius).into(), (cx - radius).into(), (cy + k).into(), (cx - radius).into(), cy.into()]);
        self.op("c", vec![(cx - radius).into(), (cy - k).into(), (cx - k).into(), (cy - radius).into(), cx.into(), (cy - radius).into()]);
        self.op("c", vec![(cx + k).into(), (cy - radius).into(), (cx + radius).into(), (cy - k).into(), (cx + radius).into(), cy.into()]);
        self.op("h", vec![]);
    }

    pub fn fill_rect(&mut self, rect: Rect, color: Color) {
        self.save();
        self.set_fill(color);
        self.rect_path(rect);
        self.op("f", vec![]);
        self.restore();
    }

    pub fn stroke_rect(&mut self, rect: Rect, color: Color, width: f32) {
        self.save();
        self.set_stroke(color, width);
        self.rect_path(rect);
        self.op("S", vec![]);
        self.restore();
    }

    pub fn rounded_rect(&mut self, rect: Rect, radius: f32, fill: Color, border: Option<(Color, f32)>) {
        self.save();
        self.set_fill(fill);
        self.rounded_rect_path(rect, radius);
        match border {
            Some((color, width)) => {
                self.set_stroke(color, width);
                self.op("B", vec![]);
            }
            None => self.op("f", vec![]),
        }
        self.restore();
    }

    pub fn circle(&mut self, center: Point, radius: f32, fill: Color, border: Option<(Color, f32)>) {
        self.save();
        self.set_fill(fill);
        self.circle_path(center, radius);
        match border {
            Some((color, width)) => {
                self.set_stroke(color, width);
                self.op("B", vec![]);
            }
            None => self.op("f", vec![]),
        }
        self.restore();
    }

    pub fn line(&mut self, from: Point, to: Point, color: Color, width: f32) {
        self.save();
        self.set_stroke(color, width);
        self.op("J", vec![1.into()]);
        self.op("m", vec![from.x.into(), self.y(from.y).into()]);
        self.op("l", vec![to.x.into(), self.y(to.y).into()]);
        self.op("S", vec![]);
        self.restore();
    }

    /// Restricts subsequent drawing to `rect` until the enclosing restore.
    pub fn clip_rect(&mut self, rect: Rect) {
        self.rect_path(rect);
        self.op("W", vec![]);
        self.op("n", vec![]);
    }

    /// Draws an image XObject stretched over `rect`.
    pub fn image(&mut self, name: &str, rect: Rect) {
        self.save();
        self.op(
            "cm",
            vec![
                rect.width.into(),
                0.into(),
                0.into(),
                rect.height.into(),
                rect.x.into(),
                self.y(rect.bottom()).into(),
            ],
        );
        self.op("Do", vec![Object::Name(name.as_bytes().to_vec())]);
        self.restore();
    }

    /// Single line of text with its baseline at `baseline_y`.
    pub fn text(&mut self, x: f32, baseline_y: f32, weight: FontWeight, size: f32, color: Color, text: &str) {
        if text.trim().is_empty() {
            return;
        }
        self.op("BT", vec![]);
        self.op("Tf", vec![Object::Name(font_resource(weight).as_bytes().to_vec()), size.into()]);
        self.op("rg", rgb_operands(color));
        self.op("Td", vec![x.into(), self.y(baseline_y).into()]);
        self.op("Tj", vec![Object::String(to_win_ansi(text), StringFormat::Literal)]);
        self.op("ET", vec![]);
    }

    pub fn text_right(&mut self, right: f32, baseline_y: f32, weight: FontWeight, size: f32, color: Color, text: &str) {
        let width = text_width(text, size, weight);
        self.text(right - width, baseline_y, weight, size, color, text);
    }

    pub fn text_centered(&mut self, center_x: f32, baseline_y: f32, weight: FontWeight, size: f32, color: Color, text: &str) {
        let width = text_width(text, size, weight);
        self.text(center_x - width / 2.0, baseline_y, weight, size, color, text);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn operators(content: &Content) -> Vec<&str> {
        content.operations.iter().map(|op| op.operator.as_str()).collect()
    }

    #[test]
    fn rectangles_are_flipped_into_pdf_space() {
        let mut ctx = PageContext::new(Size::new(200.0, 100.0));
        ctx.fill_rect(Rect::new(10.0, 20.0, 30.0, 40.0), Color::WHITE);
        let (content, states) = ctx.finish();
        let re = content.operations.iter().find(|op| op.operator == "re").unwrap();
        assert_eq!(re.operands[1].as_float().unwrap(), 40.0);
        assert!(states.is_empty());
    }

    #[test]
    fn translucent_fills_register_a_graphics_state() {
        let mut ctx = PageContext::new(Size::new(200.0, 100.0));
        ctx.rounded_rect(Rect::new(0.0, 0.0, 50.0, 20.0), 6.0, Color::rgba(0, 0, 0, 0.18), None);
        ctx.rounded_rect(Rect::new(0.0, 30.0, 50.0, 20.0), 6.0, Color::rgba(0, 0, 0, 0.18), None);
        let (content, states) = ctx.finish();
        assert_eq!(states.len(), 1);
        assert!(states.has(b"GA46"));
        let ops = operators(&content);
        assert_eq!(ops.iter().filter(|op| **op == "gs").count(), 2);
        assert_eq!(ops.first(), Some(&"q"));
        assert_eq!(ops.last(), Some(&"Q"));
    }

    #[test]
    fn blank_text_emits_nothing() {
        let mut ctx = PageContext::new(Size::new(200.0, 100.0));
        ctx.text(0.0, 10.0, FontWeight::Regular, 10.0, Color::default(), "   ");
        let (content, _) = ctx.finish();
        assert!(content.operations.is_empty());
    }
}
