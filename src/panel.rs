//! E-ink panel abstraction and the 1-bit frame buffer it displays.
//!
//! Rendering code only ever draws into a [`FrameBuffer`] through
//! `embedded-graphics`; a [`Panel`] owns that buffer and knows how to push it
//! to the glass with either a full or a partial refresh.

use embedded_graphics::{pixelcolor::BinaryColor, prelude::*};
use log::debug;
use std::convert::Infallible;
use thiserror::Error;

/// Physical panel dimensions (4.2" 400x300)
pub const PANEL_WIDTH: u32 = 400;
pub const PANEL_HEIGHT: u32 = 300;

#[derive(Error, Debug)]
pub enum PanelError {
    #[error("SPI error: {0}")]
    Spi(String),

    #[error("GPIO error: {0}")]
    Pin(String),
}

/// How the panel updates the glass.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RefreshMode {
    /// Full waveform: slow and flashes, clears ghosting.
    Full,
    /// Differential waveform over the whole panel area: fast, no flash.
    Partial,
}

/// Orientation of the drawing coordinates relative to the panel's RAM layout.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Rotation {
    /// Drawing coordinates match the panel.
    Landscape,
    /// Rotated 90 degrees clockwise: width and height swap.
    Portrait,
}

/// 1 bit per pixel frame in the panel's native row-major layout.
///
/// Bits are MSB-first within each byte; a set bit is white, a clear bit is
/// black. `BinaryColor::On` draws black ink.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FrameBuffer {
    width: u32,
    height: u32,
    rotation: Rotation,
    buffer: Vec<u8>,
}

impl FrameBuffer {
    /// `width` and `height` are the physical panel dimensions.
    pub fn new(width: u32, height: u32, rotation: Rotation) -> Self {
        let bytes_per_row = width.div_ceil(8);
        let buffer_size = (bytes_per_row * height) as usize;
        Self {
            width,
            height,
            rotation,
            buffer: vec![0xFF; buffer_size], // White by default
        }
    }

    /// The station board: the 400x300 panel stood on its side.
    pub fn portrait() -> Self {
        Self::new(PANEL_WIDTH, PANEL_HEIGHT, Rotation::Portrait)
    }

    /// Raw frame in panel RAM order.
    pub fn bytes(&self) -> &[u8] {
        &self.buffer
    }

    /// Number of black pixels.
    pub fn ink_count(&self) -> u32 {
        self.buffer.iter().map(|b| b.count_zeros()).sum()
    }

    /// Colour at a drawing coordinate; anything outside the frame reads as white.
    pub fn pixel(&self, point: Point) -> BinaryColor {
        match self.locate(point) {
            Some((index, mask)) if self.buffer[index] & mask == 0 => BinaryColor::On,
            _ => BinaryColor::Off,
        }
    }

    fn set_pixel(&mut self, point: Point, color: BinaryColor) {
        let Some((index, mask)) = self.locate(point) else {
            return;
        };
        match color {
            BinaryColor::On => self.buffer[index] &= !mask,
            BinaryColor::Off => self.buffer[index] |= mask,
        }
    }

    /// Byte index and bit mask for a drawing coordinate.
    fn locate(&self, point: Point) -> Option<(usize, u8)> {
        let size = self.size();
        if point.x < 0
            || point.y < 0
            || point.x as u32 >= size.width
            || point.y as u32 >= size.height
        {
            return None;
        }
        let (x, y) = match self.rotation {
            Rotation::Landscape => (point.x as u32, point.y as u32),
            Rotation::Portrait => (self.width - 1 - point.y as u32, point.x as u32),
        };
        let bytes_per_row = self.width.div_ceil(8);
        let index = (y * bytes_per_row + x / 8) as usize;
        Some((index, 0x80 >> (x % 8)))
    }
}

impl OriginDimensions for FrameBuffer {
    fn size(&self) -> Size {
        match self.rotation {
            Rotation::Landscape => Size::new(self.width, self.height),
            Rotation::Portrait => Size::new(self.height, self.width),
        }
    }
}

impl DrawTarget for FrameBuffer {
    type Color = BinaryColor;
    type Error = Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        for Pixel(point, color) in pixels {
            self.set_pixel(point, color);
        }
        Ok(())
    }
}

/// A display surface the control loop draws on.
pub trait Panel {
    /// Frame to draw the next screen into.
    fn canvas(&mut self) -> &mut FrameBuffer;

    /// Push the current frame to the glass.
    fn refresh(&mut self, mode: RefreshMode) -> Result<(), PanelError>;
}

/// Panel with no hardware behind it.
///
/// Used in `--stdout` development mode and in tests; it keeps the frame and
/// counts refreshes.
#[derive(Debug)]
pub struct HeadlessPanel {
    canvas: FrameBuffer,
    full_refreshes: usize,
    partial_refreshes: usize,
}

impl HeadlessPanel {
    pub fn new(canvas: FrameBuffer) -> Self {
        Self {
            canvas,
            full_refreshes: 0,
            partial_refreshes: 0,
        }
    }

    pub fn portrait() -> Self {
        Self::new(FrameBuffer::portrait())
    }

    pub fn frame(&self) -> &FrameBuffer {
        &self.canvas
    }

    pub fn full_refreshes(&self) -> usize {
        self.full_refreshes
    }

    pub fn partial_refreshes(&self) -> usize {
        self.partial_refreshes
    }
}

impl Panel for HeadlessPanel {
    fn canvas(&mut self) -> &mut FrameBuffer {
        &mut self.canvas
    }

    fn refresh(&mut self, mode: RefreshMode) -> Result<(), PanelError> {
        match mode {
            RefreshMode::Full => self.full_refreshes += 1,
            RefreshMode::Partial => self.partial_refreshes += 1,
        }
        debug!(
            "Headless {:?} refresh, {} black pixels",
            mode,
            self.canvas.ink_count()
        );
        Ok(())
    }
}
