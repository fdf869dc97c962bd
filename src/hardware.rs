//! E-paper bring-up on a Raspberry Pi: kernel spidev for SPI (chip select is
//! handled by the driver) and gpio-cdev lines for DC, RST and BUSY.

use anyhow::{Context, Result};
use linux_embedded_hal::gpio_cdev::{Chip, LineRequestFlags};
use linux_embedded_hal::spidev::{SpiModeFlags, SpidevOptions};
use linux_embedded_hal::{CdevPin, Delay, SpidevDevice};
use log::info;
use station_monitor_lib::config::HardwareConfig;
use station_monitor_lib::epd4in2_v2::{Epd4in2V2, EpdPanel};

pub type HardwarePanel = EpdPanel<SpidevDevice, CdevPin, CdevPin, CdevPin, Delay>;

const SPI_SPEED_HZ: u32 = 4_000_000;
const GPIO_CONSUMER: &str = "station-monitor";

fn request_pin(chip: &mut Chip, line: u32, flags: LineRequestFlags) -> Result<CdevPin> {
    let handle = chip
        .get_line(line)
        .with_context(|| format!("get GPIO line {line}"))?
        .request(flags, 0, GPIO_CONSUMER)
        .with_context(|| format!("request GPIO {line}"))?;
    CdevPin::new(handle).with_context(|| format!("configure GPIO {line}"))
}

/// Open and initialize the panel described by `[display.hardware]`.
pub fn open_panel(hw: &HardwareConfig) -> Result<HardwarePanel> {
    info!(
        "Opening e-paper on {} (DC={}, RST={}, BUSY={} on {})",
        hw.spi_device, hw.dc_pin, hw.rst_pin, hw.busy_pin, hw.gpio_chip
    );

    let mut chip = Chip::new(&hw.gpio_chip).with_context(|| format!("open {}", hw.gpio_chip))?;
    let dc = request_pin(&mut chip, hw.dc_pin, LineRequestFlags::OUTPUT)?;
    let rst = request_pin(&mut chip, hw.rst_pin, LineRequestFlags::OUTPUT)?;
    let busy = request_pin(&mut chip, hw.busy_pin, LineRequestFlags::INPUT)?;

    let mut spi =
        SpidevDevice::open(&hw.spi_device).with_context(|| format!("open {}", hw.spi_device))?;
    let options = SpidevOptions::new()
        .bits_per_word(8)
        .max_speed_hz(SPI_SPEED_HZ)
        .mode(SpiModeFlags::SPI_MODE_0)
        .build();
    spi.0.configure(&options).context("configure SPI")?;

    let mut epd = Epd4in2V2::new(spi, dc, rst, busy, Delay);
    epd.init().context("initialize e-paper display")?;
    Ok(EpdPanel::new(epd))
}
