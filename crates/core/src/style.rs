use rigsheet_layout::frame::{Margins, PageMetrics};
use rigsheet_types::Color;
use rigsheet_types::geometry::Orientation;

/// Height budget of one table row when paginating.
pub const TABLE_ROW_BUDGET: f32 = 40.0;
/// Space taken above the rows by the section title and column headings.
pub const TABLE_HEADING_HEIGHT: f32 = 48.0;
/// Tables always hold at least this many rows per page.
pub const MIN_ROWS_PER_PAGE: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FontSizes {
    pub title: f32,
    pub subtitle: f32,
    pub body: f32,
    pub small: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Palette {
    pub background: Color,
    pub surface: Color,
    pub bubble: Color,
    pub bubble_border: Color,
    pub text: Color,
    pub muted: Color,
    pub accent: Color,
    pub badge_text: Color,
    pub point_fill: Color,
    pub shadow: Color,
    pub header_band: Color,
    pub on_header: Color,
    pub table_header: Color,
}

/// Spacing, typography and color tokens for one visual theme.
#[derive(Debug, Clone, PartialEq)]
pub struct Theme {
    pub name: &'static str,
    pub metrics: PageMetrics,
    pub fonts: FontSizes,
    pub palette: Palette,
    /// Premium sets every label in the bold face.
    pub bold_text: bool,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            name: "default",
            metrics: PageMetrics {
                margins: Margins::from_mm(18.0, 14.0, 16.0, 18.0),
                header_height: 34.0,
                footer_height: 22.0,
            },
            fonts: FontSizes {
                title: 18.0,
                subtitle: 11.0,
                body: 10.0,
                small: 8.0,
            },
            palette: Palette {
                background: Color::rgb(0xF8, 0xFA, 0xFC),
                surface: Color::WHITE,
                bubble: Color::rgb(0xEE, 0xF2, 0xFF),
                bubble_border: Color::rgb(0xCB, 0xD5, 0xE1),
                text: Color::rgb(0x0F, 0x17, 0x2A),
                muted: Color::rgb(0x94, 0xA3, 0xB8),
                accent: Color::rgb(0x3B, 0x82, 0xF6),
                badge_text: Color::WHITE,
                point_fill: Color::WHITE,
                shadow: Color::rgba(0, 0, 0, 0.18),
                header_band: Color::rgb(0x0F, 0x17, 0x2A),
                on_header: Color::WHITE,
                table_header: Color::rgb(0xE2, 0xE8, 0xF0),
            },
            bold_text: false,
        }
    }
}

impl Theme {
    pub fn premium() -> Self {
        Self {
            name: "premium",
            metrics: PageMetrics {
                margins: Margins::from_mm(22.0, 18.0, 18.0, 22.0),
                header_height: 46.0,
                footer_height: 28.0,
            },
            fonts: FontSizes {
                title: 20.0,
                subtitle: 12.0,
                body: 10.0,
                small: 8.0,
            },
            palette: Palette {
                background: Color::rgb(0x0B, 0x12, 0x20),
                surface: Color::rgb(0x0F, 0x17, 0x2A),
                bubble: Color::rgb(0x0F, 0x17, 0x2A),
                bubble_border: Color::rgb(0x1E, 0x29, 0x3B),
                text: Color::WHITE,
                muted: Color::rgb(0xCB, 0xD5, 0xE1),
                accent: Color::rgb(0x3B, 0x82, 0xF6),
                badge_text: Color::WHITE,
                point_fill: Color::WHITE,
                shadow: Color::rgba(0, 0, 0, 0.3),
                header_band: Color::rgb(0x0F, 0x17, 0x2A),
                on_header: Color::rgb(0xF8, 0xFA, 0xFC),
                table_header: Color::rgb(0x1E, 0x29, 0x3B),
            },
            bold_text: true,
        }
    }

    /// Looks a theme up by name. Unknown names fall back to the default theme.
    pub fn named(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "premium" => Self::premium(),
            _ => Self::default(),
        }
    }

    /// Rows that fit on one landscape table page.
    pub fn rows_per_page(&self) -> usize {
        let page = Orientation::Landscape.page_size();
        let body = self.metrics.content_bounds(page).height - TABLE_HEADING_HEIGHT;
        ((body / TABLE_ROW_BUDGET).floor().max(0.0) as usize).max(MIN_ROWS_PER_PAGE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_theme_falls_back_to_default() {
        assert_eq!(Theme::named("neon").name, "default");
        assert_eq!(Theme::named(" Premium ").name, "premium");
    }

    #[test]
    fn rows_per_page_follows_page_metrics() {
        let default_rows = Theme::default().rows_per_page();
        let premium_rows = Theme::premium().rows_per_page();
        assert_eq!(default_rows, 10);
        assert!(premium_rows < default_rows);
        assert!(premium_rows >= MIN_ROWS_PER_PAGE);
    }
}
