//! Safe display of secret values.

/// Glyphs tried in order; the first one absent from the secret is used.
const MASK_GLYPHS: [char; 4] = ['•', '*', '#', 'x'];

/// Cap used by the guided diagnostics when showing a password.
pub const PASSWORD_DISPLAY_CAP: usize = 12;

/// Masks `value` without revealing any of its characters.
///
/// The result has `min(len, cap)` glyphs when `cap` is given, otherwise
/// exactly `len` glyphs, where `len` counts characters, not bytes.
#[must_use]
pub fn mask(value: &str, cap: Option<usize>) -> String {
    let len = value.chars().count();
    let width = cap.map_or(len, |cap| len.min(cap));
    let glyph = mask_glyph(value);
    std::iter::repeat_n(glyph, width).collect()
}

fn mask_glyph(value: &str) -> char {
    MASK_GLYPHS
        .into_iter()
        .chain('\u{2580}'..='\u{259f}')
        .chain('A'..='Z')
        .find(|glyph| !value.contains(*glyph))
        .unwrap_or('?')
}
