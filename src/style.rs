use crate::dom::{Document, StyleElement};
use crate::settings::{AccessibilitySettings, Theme};
use tracing::debug;

pub const STYLE_ELEMENT_ID: &str = "accessnow-styles";
const DYSLEXIA_FAMILY: &str = "'OpenDyslexic', ";
const MIN_TARGET_PX: u32 = 44;

/// Colours for one theme: page background/foreground, links, buttons.
struct Palette {
    background: &'static str,
    foreground: &'static str,
    link: &'static str,
    underline_links: bool,
    button_background: &'static str,
    button_border: &'static str,
}

fn palette(theme: Theme) -> Palette {
    match theme {
        Theme::Dark => Palette {
            background: "#1a1a1a",
            foreground: "#e0e0e0",
            link: "#4da6ff",
            underline_links: false,
            button_background: "#2a2a2a",
            button_border: "1px solid #555",
        },
        Theme::BlueYellow => Palette {
            background: "#000080",
            foreground: "#FFFF00",
            link: "#00FFFF",
            underline_links: true,
            button_background: "#003366",
            button_border: "2px solid #FFFF00",
        },
        Theme::YellowBlue => Palette {
            background: "#FFFF00",
            foreground: "#000080",
            link: "#0000FF",
            underline_links: true,
            button_background: "#FFCC00",
            button_border: "2px solid #000080",
        },
        Theme::Gray => Palette {
            background: "#e5e5e5",
            foreground: "#333333",
            link: "#0066cc",
            underline_links: true,
            button_background: "#cccccc",
            button_border: "1px solid #999",
        },
        Theme::Default => Palette {
            background: "#ffffff",
            foreground: "#000000",
            link: "#0066cc",
            underline_links: true,
            button_background: "#f0f0f0",
            button_border: "2px solid #000000",
        },
    }
}

pub fn theme_css(theme: Theme) -> String {
    let p = palette(theme);
    let underline = if p.underline_links {
        " text-decoration: underline !important;"
    } else {
        ""
    };
    format!(
        "body {{ background-color: {bg} !important; color: {fg} !important; }}\n\
         * {{ background-color: {bg} !important; color: {fg} !important; }}\n\
         a {{ color: {link} !important;{underline} }}\n\
         button {{ background-color: {btn} !important; color: {fg} !important; border: {border} !important; }}\n",
        bg = p.background,
        fg = p.foreground,
        link = p.link,
        underline = underline,
        btn = p.button_background,
        border = p.button_border,
    )
}

fn typography_css(settings: &AccessibilitySettings) -> String {
    let family = if settings.dyslexia_font {
        DYSLEXIA_FAMILY
    } else {
        ""
    };
    format!(
        "* {{\n  font-size: {size}px !important;\n  line-height: {line} !important;\n  letter-spacing: {spacing}em !important;\n  font-family: {family}'Arial', sans-serif !important;\n}}\n\
         p, div, span, li, td, th, a, button, input, label {{\n  font-size: {size}px !important;\n  line-height: {line} !important;\n}}\n",
        size = settings.font_size,
        line = settings.line_height,
        spacing = settings.letter_spacing,
        family = family,
    )
}

fn spacing_css(settings: &AccessibilitySettings) -> String {
    format!(
        "body, body * {{\n  margin-bottom: {margin}px !important;\n  padding: 12px !important;\n}}\n",
        margin = settings.line_height * 8.0,
    )
}

fn controls_css() -> String {
    format!(
        "button, input[type=\"button\"], input[type=\"submit\"] {{\n  padding: 12px 20px !important;\n  min-height: {MIN_TARGET_PX}px !important;\n  min-width: {MIN_TARGET_PX}px !important;\n  cursor: pointer !important;\n}}\n\
         input, textarea, select {{\n  border: 2px solid #000 !important;\n  padding: 8px !important;\n}}\n"
    )
}

fn image_css() -> &'static str {
    "img {\n  border: 2px solid #ccc !important;\n}\n"
}

/// Full stylesheet for `settings`, out-of-range values replaced by defaults.
pub fn build_css(settings: &AccessibilitySettings) -> String {
    let settings = settings.normalized();
    let mut css = String::with_capacity(2048);
    css.push_str(&typography_css(&settings));
    css.push_str(&theme_css(settings.theme));
    css.push_str(&spacing_css(&settings));
    css.push_str(&controls_css());
    css.push_str(image_css());
    css
}

/// Replaces the injected stylesheet with one generated from `settings`.
pub fn apply(document: &mut Document, settings: &AccessibilitySettings) {
    while document.remove_style(STYLE_ELEMENT_ID) {}
    document.append_style(StyleElement {
        id: STYLE_ELEMENT_ID.to_string(),
        text_content: build_css(settings),
    });
    debug!(theme = %settings.theme, font_size = settings.font_size, "applied page styles");
}

/// Removes the injected stylesheet; returns whether anything was removed.
pub fn reset(document: &mut Document) -> bool {
    let mut removed = false;
    while document.remove_style(STYLE_ELEMENT_ID) {
        removed = true;
    }
    removed
}
