//! Hangul text drawing from the glyph table.
//!
//! Text is walked byte by byte: the lead byte of each UTF-8 sequence decides
//! how many bytes make up the character, and the cursor always advances by that
//! many bytes. A broken sequence simply fails the glyph lookup.

use crate::glyphs::GlyphTable;
use embedded_graphics::{pixelcolor::BinaryColor, prelude::*};

/// Cursor advance for a space.
pub const SPACE_ADVANCE: i32 = 10;
/// Cursor advance for a character with no glyph.
pub const MISSING_GLYPH_ADVANCE: i32 = 8;
/// Gap after each drawn glyph.
pub const GLYPH_SPACING: i32 = 2;

/// Per-glyph vertical corrections. 초 renders short and sits 4 px lower.
const GLYPH_Y_NUDGE: [(char, i32); 1] = [('초', 4)];

/// Length of the UTF-8 sequence introduced by `lead`.
///
/// Continuation and invalid lead bytes count as a single byte.
pub fn utf8_char_len(lead: u8) -> usize {
    if lead & 0x80 == 0x00 {
        1
    } else if lead & 0xE0 == 0xC0 {
        2
    } else if lead & 0xF0 == 0xE0 {
        3
    } else if lead & 0xF8 == 0xF0 {
        4
    } else {
        1
    }
}

fn glyph_y_nudge(ch: char) -> i32 {
    GLYPH_Y_NUDGE
        .iter()
        .find(|(nudged, _)| *nudged == ch)
        .map_or(0, |(_, dy)| *dy)
}

/// Draw `text` left to right with the top of each glyph at `y_top`.
///
/// Returns the cursor x position after the last character, so
/// `draw_hangul(..) - x` is the rendered advance.
pub fn draw_hangul<D>(
    target: &mut D,
    glyphs: &GlyphTable,
    x: i32,
    y_top: i32,
    text: impl AsRef<[u8]>,
) -> Result<i32, D::Error>
where
    D: DrawTarget<Color = BinaryColor>,
{
    let bytes = text.as_ref();
    let mut cursor = x;
    let mut i = 0;

    while i < bytes.len() {
        let len = utf8_char_len(bytes[i]);
        let sequence = &bytes[i..(i + len).min(bytes.len())];
        i += len;

        if sequence == b" " {
            cursor += SPACE_ADVANCE;
            continue;
        }

        let decoded = std::str::from_utf8(sequence)
            .ok()
            .and_then(|s| s.chars().next());
        let Some((ch, glyph)) = decoded.and_then(|ch| glyphs.get(ch).map(|g| (ch, g))) else {
            cursor += MISSING_GLYPH_ADVANCE;
            continue;
        };

        let origin = Point::new(cursor, y_top + glyph_y_nudge(ch));
        target.draw_iter(glyph.pixels(origin))?;
        cursor += glyph.width() as i32 + GLYPH_SPACING;
    }

    Ok(cursor)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::glyphs::Glyph;
    use crate::panel::{FrameBuffer, Rotation};

    /// Solid glyph of the given size.
    fn block(width: u32, height: u32) -> Glyph {
        let stride = width.div_ceil(8) as usize;
        Glyph::new(width, height, vec![0xFF; stride * height as usize]).unwrap()
    }

    fn table() -> GlyphTable {
        let mut table = GlyphTable::new();
        table.insert('강', block(5, 4));
        table.insert('남', block(7, 4));
        table.insert('초', block(1, 1));
        table
    }

    fn canvas() -> FrameBuffer {
        FrameBuffer::new(64, 32, Rotation::Landscape)
    }

    #[test]
    fn lead_byte_lengths() {
        assert_eq!(utf8_char_len(b'a'), 1);
        assert_eq!(utf8_char_len(0xC3), 2);
        assert_eq!(utf8_char_len("강".as_bytes()[0]), 3);
        assert_eq!(utf8_char_len(0xF0), 4);
        assert_eq!(utf8_char_len(0x80), 1);
        assert_eq!(utf8_char_len(0xFF), 1);
    }

    #[test]
    fn glyphs_and_spaces_advance_by_their_widths() {
        let mut target = canvas();
        let end = draw_hangul(&mut target, &table(), 3, 0, "강 남").unwrap();
        assert_eq!(end, 3 + (5 + 2) + 10 + (7 + 2));
    }

    #[test]
    fn missing_glyph_advances_without_drawing() {
        let mut target = canvas();
        let end = draw_hangul(&mut target, &table(), 0, 0, "역X").unwrap();
        assert_eq!(end, 2 * MISSING_GLYPH_ADVANCE);
        assert_eq!(target.ink_count(), 0);
    }

    #[test]
    fn truncated_sequence_is_skipped() {
        let mut target = canvas();
        let bytes = &"강".as_bytes()[..2];
        let end = draw_hangul(&mut target, &table(), 0, 0, bytes).unwrap();
        assert_eq!(end, MISSING_GLYPH_ADVANCE);
        assert_eq!(target.ink_count(), 0);
    }

    #[test]
    fn glyph_is_blitted_at_cursor() {
        let mut target = canvas();
        draw_hangul(&mut target, &table(), 10, 2, "강").unwrap();
        assert_eq!(target.ink_count(), 5 * 4);
        assert_eq!(target.pixel(Point::new(10, 2)), BinaryColor::On);
        assert_eq!(target.pixel(Point::new(14, 5)), BinaryColor::On);
        assert_eq!(target.pixel(Point::new(15, 2)), BinaryColor::Off);
    }

    #[test]
    fn cho_is_drawn_four_pixels_lower() {
        let mut target = canvas();
        draw_hangul(&mut target, &table(), 0, 10, "초강").unwrap();
        assert_eq!(target.pixel(Point::new(0, 14)), BinaryColor::On);
        assert_eq!(target.pixel(Point::new(0, 10)), BinaryColor::Off);
        // the correction does not carry over to the next glyph
        assert_eq!(target.pixel(Point::new(3, 10)), BinaryColor::On);
    }
}
