use chrono::NaiveDateTime;

/// Title shown in the header band of every page.
pub const DOCUMENT_TITLE: &str = "Inventaire véhicules";

/// Convert layout Y coordinate to PDF Y coordinate (flip origin)
pub fn flip_y(y: f32, page_height: f32) -> f32 {
    page_height - y
}

/// Encodes text for a WinAnsiEncoding Type1 font. Characters outside the
/// encoding become `?`.
pub fn to_win_ansi(s: &str) -> Vec<u8> {
    s.chars()
        .map(|c| match c {
            '€' => 0x80,
            '‚' => 0x82,
            '„' => 0x84,
            '…' => 0x85,
            '‰' => 0x89,
            '‹' => 0x8B,
            'Œ' => 0x8C,
            '‘' => 0x91,
            '’' => 0x92,
            '“' => 0x93,
            '”' => 0x94,
            '•' => 0x95,
            '–' => 0x96,
            '—' => 0x97,
            '™' => 0x99,
            '›' => 0x9B,
            'œ' => 0x9C,
            'Ÿ' => 0x9F,
            c if (c as u32) < 0x80 || (0xA0..=0xFF).contains(&(c as u32)) => c as u8,
            _ => b'?',
        })
        .collect()
}

pub fn format_date(at: &NaiveDateTime) -> String {
    at.format("%d/%m/%Y").to_string()
}

/// Footer text, e.g. `Généré le 05/03/2024 — Page 2/7`.
pub fn footer_label(generated_at: &NaiveDateTime, page_number: usize, page_count: usize) -> String {
    format!(
        "Généré le {} — Page {}/{}",
        format_date(generated_at),
        page_number,
        page_count
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn win_ansi_maps_typographic_characters() {
        assert_eq!(to_win_ansi("é"), vec![0xE9]);
        assert_eq!(to_win_ansi("• 2 × Gants"), b"\x95 2 \xD7 Gants".to_vec());
        assert_eq!(to_win_ansi("—"), vec![0x97]);
        assert_eq!(to_win_ansi("漢"), b"?".to_vec());
    }

    #[test]
    fn footer_uses_day_month_year() {
        let at = NaiveDate::from_ymd_opt(2024, 3, 5)
            .unwrap()
            .and_hms_opt(14, 30, 0)
            .unwrap();
        assert_eq!(footer_label(&at, 2, 7), "Généré le 05/03/2024 — Page 2/7");
    }

    #[test]
    fn flip_y_mirrors_against_page_height() {
        assert_eq!(flip_y(10.0, 100.0), 90.0);
    }
}
