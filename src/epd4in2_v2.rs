//! Custom EPD 4.2" B/W V2 Driver
//!
//! Driver for the SSD1683-based 400x300 black/white panel (GDEY042T81 and the
//! Waveshare 4.2" V2). It supports the two update modes the station board
//! needs: a full refresh and a differential partial refresh over the whole
//! panel area.
//!
//! The controller keeps two RAM planes. `0x24` holds the new image and `0x26`
//! the previous one; the partial waveform only drives pixels that differ
//! between them, so after every update the new frame is copied into `0x26`.

use crate::panel::{FrameBuffer, Panel, PanelError, RefreshMode, PANEL_HEIGHT, PANEL_WIDTH};
use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{InputPin, OutputPin};
use embedded_hal::spi::SpiDevice;
use log::{debug, info, warn};

/// Largest single SPI write; spidev rejects transfers above its 4 KiB buffer.
const SPI_CHUNK: usize = 4096;

/// BUSY polling: 10 ms steps, give up after 10 seconds.
const BUSY_POLL_MS: u32 = 10;
const BUSY_MAX_POLLS: u32 = 1000;

mod command {
    pub const DRIVER_OUTPUT_CONTROL: u8 = 0x01;
    pub const DEEP_SLEEP: u8 = 0x10;
    pub const DATA_ENTRY_MODE: u8 = 0x11;
    pub const SW_RESET: u8 = 0x12;
    pub const TEMPERATURE_SENSOR: u8 = 0x18;
    pub const MASTER_ACTIVATION: u8 = 0x20;
    pub const DISPLAY_UPDATE_CONTROL_1: u8 = 0x21;
    pub const DISPLAY_UPDATE_CONTROL_2: u8 = 0x22;
    pub const WRITE_RAM_BW: u8 = 0x24;
    pub const WRITE_RAM_PREVIOUS: u8 = 0x26;
    pub const BORDER_WAVEFORM: u8 = 0x3C;
    pub const RAM_X_RANGE: u8 = 0x44;
    pub const RAM_Y_RANGE: u8 = 0x45;
    pub const RAM_X_COUNTER: u8 = 0x4E;
    pub const RAM_Y_COUNTER: u8 = 0x4F;
}

/// Update sequence for a full refresh (clock, analog, temperature, LUT, display).
const UPDATE_FULL: u8 = 0xF7;
/// Update sequence for a partial refresh using the differential LUT.
const UPDATE_PARTIAL: u8 = 0xFC;

/// EPD 4.2" B/W V2 display driver
pub struct Epd4in2V2<SPI, DC, RST, BUSY, DELAY> {
    spi: SPI,
    dc_pin: DC,
    rst_pin: RST,
    busy_pin: BUSY,
    delay: DELAY,
    width: u32,
    height: u32,
}

impl<SPI, DC, RST, BUSY, DELAY> Epd4in2V2<SPI, DC, RST, BUSY, DELAY>
where
    SPI: SpiDevice,
    DC: OutputPin,
    RST: OutputPin,
    BUSY: InputPin,
    DELAY: DelayNs,
{
    /// Create a new EPD instance
    pub fn new(spi: SPI, dc_pin: DC, rst_pin: RST, busy_pin: BUSY, delay: DELAY) -> Self {
        Self {
            spi,
            dc_pin,
            rst_pin,
            busy_pin,
            delay,
            width: PANEL_WIDTH,
            height: PANEL_HEIGHT,
        }
    }

    fn bytes_per_frame(&self) -> usize {
        (self.width.div_ceil(8) * self.height) as usize
    }

    /// Hardware reset pulse
    fn reset(&mut self) -> Result<(), PanelError> {
        debug!("Performing hardware reset");
        self.rst_pin.set_high().map_err(pin_error)?;
        self.delay.delay_ms(200);
        self.rst_pin.set_low().map_err(pin_error)?;
        self.delay.delay_ms(5);
        self.rst_pin.set_high().map_err(pin_error)?;
        self.delay.delay_ms(200);
        Ok(())
    }

    fn send_command(&mut self, command: u8) -> Result<(), PanelError> {
        self.dc_pin.set_low().map_err(pin_error)?; // Command mode
        self.spi.write(&[command]).map_err(spi_error)
    }

    fn send_data(&mut self, data: &[u8]) -> Result<(), PanelError> {
        self.dc_pin.set_high().map_err(pin_error)?; // Data mode
        for chunk in data.chunks(SPI_CHUNK) {
            self.spi.write(chunk).map_err(spi_error)?;
        }
        Ok(())
    }

    fn command_with_data(&mut self, command: u8, data: &[u8]) -> Result<(), PanelError> {
        self.send_command(command)?;
        self.send_data(data)
    }

    /// Wait while BUSY is high. A stuck panel is logged, not treated as fatal.
    fn wait_until_idle(&mut self) -> Result<(), PanelError> {
        let mut polls = 0;
        while self.busy_pin.is_high().map_err(pin_error)? {
            self.delay.delay_ms(BUSY_POLL_MS);
            polls += 1;
            if polls >= BUSY_MAX_POLLS {
                warn!(
                    "BUSY still high after {} ms, display may be stuck",
                    BUSY_POLL_MS * BUSY_MAX_POLLS
                );
                break;
            }
        }
        debug!("Display ready after {} BUSY checks", polls);
        Ok(())
    }

    fn reset_ram_counters(&mut self) -> Result<(), PanelError> {
        self.command_with_data(command::RAM_X_COUNTER, &[0x00])?;
        self.command_with_data(command::RAM_Y_COUNTER, &[0x00, 0x00])
    }

    /// Initialize the display for full-window updates
    pub fn init(&mut self) -> Result<(), PanelError> {
        info!("Initializing EPD {}x{}", self.width, self.height);

        self.reset()?;
        self.wait_until_idle()?;
        self.send_command(command::SW_RESET)?;
        self.wait_until_idle()?;

        let last_row = self.height - 1;
        let last_row_lo = (last_row % 256) as u8;
        let last_row_hi = (last_row / 256) as u8;
        let last_column_byte = (self.width / 8 - 1) as u8;

        self.command_with_data(
            command::DRIVER_OUTPUT_CONTROL,
            &[last_row_lo, last_row_hi, 0x00],
        )?;
        self.command_with_data(command::DISPLAY_UPDATE_CONTROL_1, &[0x40, 0x00])?;
        self.command_with_data(command::BORDER_WAVEFORM, &[0x05])?;
        self.command_with_data(command::TEMPERATURE_SENSOR, &[0x80])?; // internal sensor
        self.command_with_data(command::DATA_ENTRY_MODE, &[0x03])?; // X+, Y+
        self.command_with_data(command::RAM_X_RANGE, &[0x00, last_column_byte])?;
        self.command_with_data(
            command::RAM_Y_RANGE,
            &[0x00, 0x00, last_row_lo, last_row_hi],
        )?;
        self.reset_ram_counters()?;
        self.wait_until_idle()?;

        info!("EPD initialization completed");
        Ok(())
    }

    fn check_frame(&self, frame: &[u8]) -> Result<(), PanelError> {
        if frame.len() != self.bytes_per_frame() {
            return Err(PanelError::Spi(format!(
                "frame is {} bytes, panel needs {}",
                frame.len(),
                self.bytes_per_frame()
            )));
        }
        Ok(())
    }

    fn activate(&mut self, sequence: u8) -> Result<(), PanelError> {
        self.command_with_data(command::DISPLAY_UPDATE_CONTROL_2, &[sequence])?;
        self.send_command(command::MASTER_ACTIVATION)?;
        self.wait_until_idle()
    }

    /// Full refresh: both RAM planes get the frame, then the full waveform runs.
    pub fn display_full(&mut self, frame: &[u8]) -> Result<(), PanelError> {
        self.check_frame(frame)?;
        debug!("Full refresh, {} bytes", frame.len());

        self.command_with_data(command::DISPLAY_UPDATE_CONTROL_1, &[0x40, 0x00])?;
        self.command_with_data(command::BORDER_WAVEFORM, &[0x05])?;
        self.reset_ram_counters()?;
        self.command_with_data(command::WRITE_RAM_BW, frame)?;
        self.reset_ram_counters()?;
        self.command_with_data(command::WRITE_RAM_PREVIOUS, frame)?;
        self.activate(UPDATE_FULL)
    }

    /// Partial refresh over the whole panel area.
    pub fn display_partial(&mut self, frame: &[u8]) -> Result<(), PanelError> {
        self.check_frame(frame)?;
        debug!("Partial refresh, {} bytes", frame.len());

        self.command_with_data(command::DISPLAY_UPDATE_CONTROL_1, &[0x00, 0x00])?;
        self.command_with_data(command::BORDER_WAVEFORM, &[0x80])?; // hold border
        self.reset_ram_counters()?;
        self.command_with_data(command::WRITE_RAM_BW, frame)?;
        self.activate(UPDATE_PARTIAL)?;

        // the new image becomes the reference for the next differential update
        self.reset_ram_counters()?;
        self.command_with_data(command::WRITE_RAM_PREVIOUS, frame)
    }

    /// Deep sleep; a hardware reset is needed before the next update.
    pub fn sleep(&mut self) -> Result<(), PanelError> {
        self.command_with_data(command::DEEP_SLEEP, &[0x01])?;
        self.delay.delay_ms(100);
        info!("Display sleeping");
        Ok(())
    }
}

fn spi_error<E: core::fmt::Debug>(error: E) -> PanelError {
    PanelError::Spi(format!("{error:?}"))
}

fn pin_error<E: core::fmt::Debug>(error: E) -> PanelError {
    PanelError::Pin(format!("{error:?}"))
}

/// An initialized EPD plus the portrait frame drawn onto it.
pub struct EpdPanel<SPI, DC, RST, BUSY, DELAY> {
    epd: Epd4in2V2<SPI, DC, RST, BUSY, DELAY>,
    canvas: FrameBuffer,
}

impl<SPI, DC, RST, BUSY, DELAY> EpdPanel<SPI, DC, RST, BUSY, DELAY>
where
    SPI: SpiDevice,
    DC: OutputPin,
    RST: OutputPin,
    BUSY: InputPin,
    DELAY: DelayNs,
{
    pub fn new(epd: Epd4in2V2<SPI, DC, RST, BUSY, DELAY>) -> Self {
        Self {
            epd,
            canvas: FrameBuffer::portrait(),
        }
    }

    /// Stop driving the panel; the last image stays on the glass.
    pub fn sleep(&mut self) -> Result<(), PanelError> {
        self.epd.sleep()
    }
}

impl<SPI, DC, RST, BUSY, DELAY> Panel for EpdPanel<SPI, DC, RST, BUSY, DELAY>
where
    SPI: SpiDevice,
    DC: OutputPin,
    RST: OutputPin,
    BUSY: InputPin,
    DELAY: DelayNs,
{
    fn canvas(&mut self) -> &mut FrameBuffer {
        &mut self.canvas
    }

    fn refresh(&mut self, mode: RefreshMode) -> Result<(), PanelError> {
        match mode {
            RefreshMode::Full => self.epd.display_full(self.canvas.bytes()),
            RefreshMode::Partial => self.epd.display_partial(self.canvas.bytes()),
        }
    }
}
