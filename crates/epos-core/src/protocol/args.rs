//! Positional argument lists for each command.
//!
//! The executor receives arguments by position, not by name, so the order in
//! these builders *is* the protocol.  Nothing else in the workspace assembles
//! an argument list by hand.

use serde_json::{json, Value};

use crate::domain::format::{ImageStyle, TextStyle};

/// Arguments for every parameterless command.
pub fn none() -> Vec<Value> {
    Vec::new()
}

/// `connectPrinter`: `[target]`, or `[target, model]` when a model is given.
///
/// An empty model string is treated as absent.
pub fn connect(target: &str, model: Option<&str>) -> Vec<Value> {
    let mut args = vec![json!(target)];
    if let Some(model) = model.filter(|m| !m.is_empty()) {
        args.push(json!(model));
    }
    args
}

/// `printText`: `[lines, font, size, align]`.
pub fn print_text(lines: &[String], style: TextStyle) -> Vec<Value> {
    vec![
        json!(lines),
        json!(style.font.code()),
        json!(style.size.get()),
        json!(style.align.code()),
    ]
}

/// `printImage`: `[dataUrl, printMode, halfTone]`.
pub fn print_image(data_url: &str, style: ImageStyle) -> Vec<Value> {
    vec![
        json!(data_url),
        json!(style.mode.code()),
        json!(style.halftone.code()),
    ]
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::format::{Alignment, Font, HalfTone, PrintMode, TextSize};

    #[test]
    fn test_connect_without_model_has_one_argument() {
        assert_eq!(connect("TCP:192.168.1.5", None), vec![json!("TCP:192.168.1.5")]);
    }

    #[test]
    fn test_connect_with_model_appends_it() {
        assert_eq!(
            connect("BT:00:11:22:33:44:55", Some("TM-T88VI")),
            vec![json!("BT:00:11:22:33:44:55"), json!("TM-T88VI")]
        );
    }

    #[test]
    fn test_connect_ignores_empty_model() {
        assert_eq!(connect("TCP:10.0.0.1", Some("")).len(), 1);
    }

    #[test]
    fn test_print_text_default_style_encodes_0_1_0() {
        let args = print_text(&["hello".to_string()], TextStyle::default());
        assert_eq!(args, vec![json!(["hello"]), json!(0), json!(1), json!(0)]);
    }

    #[test]
    fn test_print_text_encodes_custom_style() {
        let style = TextStyle {
            font: Font::C,
            size: TextSize::new(3).unwrap(),
            align: Alignment::Center,
        };
        let args = print_text(&["a".to_string(), "b".to_string()], style);
        assert_eq!(args, vec![json!(["a", "b"]), json!(2), json!(3), json!(1)]);
    }

    #[test]
    fn test_print_image_encodes_mode_and_halftone() {
        let style = ImageStyle {
            mode: PrintMode::Gradation16,
            halftone: HalfTone::Threshold,
        };
        let args = print_image("data:image/png;base64,AAAA", style);
        assert_eq!(args, vec![json!("data:image/png;base64,AAAA"), json!(1), json!(2)]);
    }
}
