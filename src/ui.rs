use owo_colors::{OwoColorize, Stream};

pub fn status_glyph(passed: bool) -> String {
    if passed {
        format!("[{}]", "✓".if_supports_color(Stream::Stdout, |t| t.green()))
    } else {
        format!("[{}]", "X".if_supports_color(Stream::Stdout, |t| t.red()))
    }
}

pub fn heading(text: &str) -> String {
    text.if_supports_color(Stream::Stdout, |t| t.cyan()).to_string()
}

pub fn warning(text: &str) -> String {
    text.if_supports_color(Stream::Stdout, |t| t.yellow()).to_string()
}

pub fn failure(text: &str) -> String {
    text.if_supports_color(Stream::Stdout, |t| t.red()).to_string()
}

pub fn success(text: &str) -> String {
    text.if_supports_color(Stream::Stdout, |t| t.green()).to_string()
}

pub fn muted(text: &str) -> String {
    text.if_supports_color(Stream::Stdout, |t| t.bright_black())
        .to_string()
}
