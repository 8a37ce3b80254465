//! Gradient ASCII banner (MEAL-ANALYZER).

use crossterm::ExecutableCommand;
use crossterm::style::{Color, Print, ResetColor, SetForegroundColor};
use figlet_rs::FIGfont;
use std::io::{Write, stdout};

/// Leaf green (#2ecc71).
const LEAF_GREEN: (u8, u8, u8) = (0x2e, 0xcc, 0x71);
/// Carrot orange (#f39c12).
const CARROT_ORANGE: (u8, u8, u8) = (0xf3, 0x9c, 0x12);

/// Linear interpolation between two RGB colors. `t` in [0.0, 1.0].
fn lerp_rgb(a: (u8, u8, u8), b: (u8, u8, u8), t: f64) -> (u8, u8, u8) {
    let r = (f64::from(a.0) * (1.0 - t) + f64::from(b.0) * t).round() as u8;
    let g = (f64::from(a.1) * (1.0 - t) + f64::from(b.1) * t).round() as u8;
    let bl = (f64::from(a.2) * (1.0 - t) + f64::from(b.2) * t).round() as u8;
    (r, g, bl)
}

fn banner_art(text: &str) -> String {
    FIGfont::standard()
        .ok()
        .and_then(|font| font.convert(text).map(|figure| figure.to_string()))
        .unwrap_or_else(|| format!("{}\n", text))
}

/// Prints "MEAL" in figlet art with a green-to-orange gradient, then the version.
pub fn print_welcome() {
    let mut out = stdout();
    let art = banner_art("MEAL");
    let lines: Vec<&str> = art.lines().collect();
    let total = lines.len().max(1);

    for (i, line) in lines.iter().enumerate() {
        let t = if total <= 1 {
            1.0
        } else {
            i as f64 / (total - 1) as f64
        };
        let (r, g, b) = lerp_rgb(LEAF_GREEN, CARROT_ORANGE, t);
        let _ = out.execute(SetForegroundColor(Color::Rgb { r, g, b }));
        let _ = out.execute(Print(line));
        let _ = out.execute(Print("\r\n"));
        let _ = out.execute(ResetColor);
    }

    let version = env!("CARGO_PKG_VERSION");
    let _ = out.execute(SetForegroundColor(Color::Rgb {
        r: CARROT_ORANGE.0,
        g: CARROT_ORANGE.1,
        b: CARROT_ORANGE.2,
    }));
    let _ = out.execute(Print(format!("meal-analyzer v{}\r\n", version)));
    let _ = out.execute(Print(
        "Carbs, protein, fat and calories from a photo or a description\r\n",
    ));
    let _ = out.execute(ResetColor);
    let _ = out.flush();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gradient_endpoints() {
        assert_eq!(lerp_rgb(LEAF_GREEN, CARROT_ORANGE, 0.0), LEAF_GREEN);
        assert_eq!(lerp_rgb(LEAF_GREEN, CARROT_ORANGE, 1.0), CARROT_ORANGE);
    }

    #[test]
    fn test_banner_art_is_multiline() {
        assert!(banner_art("MEAL").lines().count() > 1);
    }
}
