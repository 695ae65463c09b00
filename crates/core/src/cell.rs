use serde::{Deserialize, Serialize};

/// A single field of a curricular table as handed over by the extractor.
///
/// Spreadsheet cells arrive as text, numbers, booleans or nothing at all, so
/// every table field keeps the raw shape and the engine decides how to read it.
/// JSON `null` and missing fields both deserialize to `Empty`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    #[default]
    Empty,
    Bool(bool),
    Number(f64),
    Text(String),
}

impl CellValue {
    pub fn text(s: impl Into<String>) -> Self {
        CellValue::Text(s.into())
    }

    /// Build a cell from free-form input: blank is `Empty`, numerics become
    /// `Number`, everything else is kept as trimmed text.
    pub fn from_input(input: &str) -> Self {
        let trimmed = input.trim();

        if trimmed.is_empty() {
            return CellValue::Empty;
        }

        if let Ok(num) = trimmed.parse::<f64>() {
            if num.is_finite() {
                return CellValue::Number(num);
            }
        }

        CellValue::Text(trimmed.to_string())
    }

    /// Whether the cell counts as filled for completeness purposes.
    pub fn is_filled(&self) -> bool {
        match self {
            CellValue::Empty => false,
            CellValue::Text(s) => !s.trim().is_empty(),
            CellValue::Number(n) => n.is_finite(),
            CellValue::Bool(_) => true,
        }
    }

    pub fn is_empty(&self) -> bool {
        !self.is_filled()
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            CellValue::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Read a text field. Non-text values coerce to `""`; the flag reports
    /// whether a coercion happened so the caller can warn about it.
    pub fn text_or_empty(&self) -> (&str, bool) {
        match self {
            CellValue::Text(s) => (s.as_str(), false),
            CellValue::Empty => ("", false),
            CellValue::Number(_) | CellValue::Bool(_) => ("", true),
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            CellValue::Number(n) if n.is_finite() => Some(*n),
            CellValue::Text(s) => s.trim().replace(',', ".").parse::<f64>().ok().filter(|n| n.is_finite()),
            _ => None,
        }
    }

    /// Identity used when joining tables (competency ids, outcome ids).
    ///
    /// Whole numbers render without a fractional part so `3.0` and `"3"`
    /// produce the same key. Text keys are trimmed and lower-cased.
    pub fn as_key(&self) -> Option<String> {
        match self {
            CellValue::Empty => None,
            CellValue::Bool(_) => None,
            CellValue::Number(n) => {
                if !n.is_finite() {
                    None
                } else if n.fract() == 0.0 && n.abs() < 1e15 {
                    Some(format!("{}", *n as i64))
                } else {
                    Some(format!("{n}"))
                }
            }
            CellValue::Text(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    return None;
                }
                match trimmed.parse::<f64>() {
                    Ok(n) if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 => {
                        Some(format!("{}", n as i64))
                    }
                    _ => Some(trimmed.to_lowercase()),
                }
            }
        }
    }

    pub fn raw_display(&self) -> String {
        match self {
            CellValue::Empty => String::new(),
            CellValue::Text(s) => s.clone(),
            CellValue::Bool(b) => b.to_string(),
            CellValue::Number(n) => {
                if n.fract() == 0.0 {
                    format!("{}", *n as i64)
                } else {
                    format!("{:.2}", n)
                }
            }
        }
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        CellValue::Text(value.to_string())
    }
}

impl From<String> for CellValue {
    fn from(value: String) -> Self {
        CellValue::Text(value)
    }
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        CellValue::Number(value)
    }
}

impl From<i64> for CellValue {
    fn from(value: i64) -> Self {
        CellValue::Number(value as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_input_classifies() {
        assert_eq!(CellValue::from_input("   "), CellValue::Empty);
        assert_eq!(CellValue::from_input(" 12 "), CellValue::Number(12.0));
        assert_eq!(CellValue::from_input("Taller"), CellValue::text("Taller"));
    }

    #[test]
    fn filled_ignores_blank_text() {
        assert!(!CellValue::text("  ").is_filled());
        assert!(!CellValue::Empty.is_filled());
        assert!(CellValue::Number(0.0).is_filled());
        assert!(CellValue::Bool(false).is_filled());
        assert!(CellValue::text("x").is_filled());
    }

    #[test]
    fn text_or_empty_flags_coercion() {
        assert_eq!(CellValue::text("abc").text_or_empty(), ("abc", false));
        assert_eq!(CellValue::Empty.text_or_empty(), ("", false));
        assert_eq!(CellValue::Number(4.0).text_or_empty(), ("", true));
        assert_eq!(CellValue::Bool(true).text_or_empty(), ("", true));
    }

    #[test]
    fn keys_unify_numbers_and_text() {
        assert_eq!(CellValue::Number(3.0).as_key().as_deref(), Some("3"));
        assert_eq!(CellValue::text(" 3 ").as_key().as_deref(), Some("3"));
        assert_eq!(CellValue::text("C1").as_key().as_deref(), Some("c1"));
        assert_eq!(CellValue::text("  ").as_key(), None);
        assert_eq!(CellValue::Empty.as_key(), None);
    }

    #[test]
    fn as_number_accepts_decimal_comma() {
        assert_eq!(CellValue::text("2,5").as_number(), Some(2.5));
        assert_eq!(CellValue::Number(48.0).as_number(), Some(48.0));
        assert_eq!(CellValue::text("n/a").as_number(), None);
    }

    #[test]
    fn deserializes_untagged() {
        let cells: Vec<CellValue> = serde_json::from_str(r#"[null, true, 3, 2.5, "hola"]"#).unwrap();
        assert_eq!(
            cells,
            vec![
                CellValue::Empty,
                CellValue::Bool(true),
                CellValue::Number(3.0),
                CellValue::Number(2.5),
                CellValue::text("hola"),
            ]
        );
    }
}
