use serde::{Deserialize, Serialize};

/// Options provided by the caller to customize an export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportOptions {
    pub pointer_mode: bool,
    pub hide_edit_buttons: bool,
    pub theme: String,
    pub include_header: bool,
    pub include_footer: bool,
    /// Render every view as rows even when a background photo is available.
    pub table_fallback: bool,
    /// Restricts the export to one category when set.
    pub selected_category_id: Option<i64>,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            pointer_mode: false,
            hide_edit_buttons: false,
            theme: "default".to_string(),
            include_header: true,
            include_footer: true,
            table_fallback: false,
            selected_category_id: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_take_defaults() {
        let options: ExportOptions = serde_json::from_str(r#"{"pointer_mode": true}"#).unwrap();
        assert!(options.pointer_mode);
        assert!(options.include_header);
        assert_eq!(options.theme, "default");
        assert_eq!(options.selected_category_id, None);
    }
}
