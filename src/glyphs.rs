//! # Hangul Glyph Table
//!
//! The panel fonts only cover Latin text, so the station labels are drawn from
//! pre-rendered bitmaps. Each glyph is an XBM file (rows padded to whole bytes,
//! least significant bit is the leftmost pixel) generated offline from a Hangul
//! TrueType font.
//!
//! The table is loaded once at startup and then only read.

use embedded_graphics::{pixelcolor::BinaryColor, prelude::*};
use log::{debug, info, warn};
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::Path;
use thiserror::Error;

/// Characters the board can draw, with the XBM file stem holding each bitmap.
pub const GLYPH_FILES: [(char, &str); 12] = [
    ('강', "gang"),
    ('남', "nam"),
    ('고', "go"),
    ('석', "sok"),
    ('터', "to"),
    ('미', "mi"),
    ('널', "nol"),
    ('서', "seo"),
    ('초', "cho"),
    ('부', "bu"),
    ('호', "ho"),
    ('선', "son"),
];

#[derive(Error, Debug)]
pub enum GlyphError {
    #[error("glyph IO: {0}")]
    Io(#[from] io::Error),

    #[error("malformed XBM: {0}")]
    Malformed(&'static str),

    #[error("XBM has {actual} bytes, expected {expected} for its size")]
    Size { expected: usize, actual: usize },
}

/// A 1-bit bitmap in XBM bit order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Glyph {
    width: u32,
    height: u32,
    bits: Vec<u8>,
}

impl Glyph {
    pub fn new(width: u32, height: u32, bits: Vec<u8>) -> Result<Self, GlyphError> {
        let expected = width.div_ceil(8) as usize * height as usize;
        if bits.len() != expected {
            return Err(GlyphError::Size {
                expected,
                actual: bits.len(),
            });
        }
        Ok(Self {
            width,
            height,
            bits,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn is_set(&self, x: u32, y: u32) -> bool {
        if x >= self.width || y >= self.height {
            return false;
        }
        let stride = self.width.div_ceil(8);
        let byte = self.bits[(y * stride + x / 8) as usize];
        byte & (1 << (x % 8)) != 0
    }

    /// Ink pixels of the glyph with its top-left corner at `origin`.
    ///
    /// Unset bits produce no pixel, so whatever is underneath shows through.
    pub fn pixels(&self, origin: Point) -> impl Iterator<Item = Pixel<BinaryColor>> + '_ {
        (0..self.height).flat_map(move |y| {
            (0..self.width).filter_map(move |x| {
                self.is_set(x, y).then(|| {
                    Pixel(origin + Point::new(x as i32, y as i32), BinaryColor::On)
                })
            })
        })
    }
}

/// Parse the C-source XBM format produced by ImageMagick.
///
/// ```text
/// #define cho_width 64
/// #define cho_height 64
/// static char cho_bits[] = { 0x00, 0x00, ... };
/// ```
/// The array's element type is ignored, so `const uint8_t` arrays work too.
pub fn parse_xbm(source: &str) -> Result<Glyph, GlyphError> {
    let mut width = None;
    let mut height = None;

    for line in source.lines() {
        let mut parts = line.split_whitespace();
        if parts.next() != Some("#define") {
            continue;
        }
        let (Some(name), Some(value)) = (parts.next(), parts.next()) else {
            continue;
        };
        if name.ends_with("_width") {
            width = value.parse::<u32>().ok();
        } else if name.ends_with("_height") {
            height = value.parse::<u32>().ok();
        }
    }

    let width = width.ok_or(GlyphError::Malformed("missing width"))?;
    let height = height.ok_or(GlyphError::Malformed("missing height"))?;

    let open = source.find('{').ok_or(GlyphError::Malformed("missing '{'"))?;
    let close = source[open..]
        .find('}')
        .map(|offset| open + offset)
        .ok_or(GlyphError::Malformed("missing '}'"))?;

    let bits = source[open + 1..close]
        .split(',')
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(|token| {
            let hex = token
                .strip_prefix("0x")
                .or_else(|| token.strip_prefix("0X"))
                .ok_or(GlyphError::Malformed("byte is not hex"))?;
            u8::from_str_radix(hex, 16).map_err(|_| GlyphError::Malformed("byte is not hex"))
        })
        .collect::<Result<Vec<u8>, GlyphError>>()?;

    Glyph::new(width, height, bits)
}

/// Character to bitmap lookup used by the Hangul text renderer.
#[derive(Clone, Debug, Default)]
pub struct GlyphTable {
    glyphs: HashMap<char, Glyph>,
}

impl GlyphTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, ch: char, glyph: Glyph) {
        self.glyphs.insert(ch, glyph);
    }

    pub fn get(&self, ch: char) -> Option<&Glyph> {
        self.glyphs.get(&ch)
    }

    pub fn len(&self) -> usize {
        self.glyphs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.glyphs.is_empty()
    }

    /// Load every glyph in [`GLYPH_FILES`] from `dir`.
    ///
    /// A missing or malformed file leaves that character out of the table;
    /// the text renderer then advances past it without drawing.
    pub fn load_from_dir<P: AsRef<Path>>(dir: P) -> Self {
        let dir = dir.as_ref();
        let mut table = Self::new();

        for (ch, stem) in GLYPH_FILES {
            let path = dir.join(format!("{stem}.xbm"));
            let source = match fs::read_to_string(&path) {
                Ok(source) => source,
                Err(e) => {
                    debug!("No glyph for {} at {}: {}", ch, path.display(), e);
                    continue;
                }
            };
            match parse_xbm(&source) {
                Ok(glyph) => table.insert(ch, glyph),
                Err(e) => warn!("Skipping glyph {} ({}): {}", ch, path.display(), e),
            }
        }

        info!(
            "Loaded {}/{} Hangul glyphs from {}",
            table.len(),
            GLYPH_FILES.len(),
            dir.display()
        );
        table
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const CHO_XBM: &str = "#define cho_width 9
#define cho_height 2
static char cho_bits[] = {
   0x01, 0x01, 0xFF, 0x00 };
";

    #[test]
    fn parse_reads_size_and_lsb_first_bits() {
        let glyph = parse_xbm(CHO_XBM).unwrap();
        assert_eq!((glyph.width(), glyph.height()), (9, 2));

        assert!(glyph.is_set(0, 0));
        assert!(!glyph.is_set(1, 0));
        assert!(glyph.is_set(8, 0));
        assert!((0..8).all(|x| glyph.is_set(x, 1)));
        assert!(!glyph.is_set(8, 1));
    }

    #[test]
    fn parse_accepts_const_uint8_arrays() {
        let source = CHO_XBM.replace("static char", "const uint8_t");
        assert!(parse_xbm(&source).is_ok());
    }

    #[test]
    fn parse_rejects_wrong_byte_count() {
        let source = CHO_XBM.replace("0xFF, 0x00 ", "0xFF ");
        assert!(matches!(
            parse_xbm(&source),
            Err(GlyphError::Size {
                expected: 4,
                actual: 3
            })
        ));
    }

    #[test]
    fn parse_rejects_missing_header() {
        assert!(matches!(
            parse_xbm("static char x_bits[] = { 0x00 };"),
            Err(GlyphError::Malformed(_))
        ));
    }

    #[test]
    fn pixels_only_yield_set_bits() {
        let glyph = parse_xbm(CHO_XBM).unwrap();
        let pixels: Vec<Point> = glyph
            .pixels(Point::new(10, 20))
            .map(|Pixel(point, _)| point)
            .collect();
        assert_eq!(pixels.len(), 2 + 8);
        assert_eq!(pixels[0], Point::new(10, 20));
        assert_eq!(pixels[1], Point::new(18, 20));
    }

    #[test]
    fn load_from_dir_skips_missing_and_malformed_files() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("cho.xbm"), CHO_XBM).unwrap();
        fs::write(dir.path().join("gang.xbm"), "not an xbm").unwrap();

        let table = GlyphTable::load_from_dir(dir.path());
        assert_eq!(table.len(), 1);
        assert!(table.get('초').is_some());
        assert!(table.get('강').is_none());
        assert!(table.get('남').is_none());
    }
}
