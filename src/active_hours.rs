//! # Active-Hours Gate
//!
//! Trains do not run overnight, so outside a daily window the board shows a
//! paused notice instead of polling the API. The gate checks the local hour,
//! and when the board is outside its window it draws the notice once and then
//! re-checks the clock every few seconds until the window opens.
//!
//! Local time is a fixed offset from UTC (KST, no daylight saving).

use crate::eink_renderer;
use crate::panel::{Panel, RefreshMode};
use chrono::{FixedOffset, Timelike, Utc};
use log::{info, warn};
use std::time::Duration;

/// Daily window `[start_hour, end_hour)` in local hours.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ActiveHours {
    pub start_hour: u32,
    pub end_hour: u32,
}

impl ActiveHours {
    pub const fn new(start_hour: u32, end_hour: u32) -> Self {
        Self {
            start_hour,
            end_hour,
        }
    }

    pub fn contains(&self, hour: u32) -> bool {
        (self.start_hour..self.end_hour).contains(&hour)
    }
}

impl Default for ActiveHours {
    fn default() -> Self {
        Self::new(6, 21)
    }
}

/// Wall clock and timer used by the control loop.
#[allow(async_fn_in_trait)]
pub trait Clock {
    /// Current local hour, 0-23.
    fn local_hour(&self) -> u32;

    async fn sleep(&self, duration: Duration);
}

/// Real clock at a fixed UTC offset.
#[derive(Clone, Copy, Debug)]
pub struct SystemClock {
    offset: FixedOffset,
}

impl SystemClock {
    /// `None` if the offset is outside ±23 hours.
    pub fn with_utc_offset_hours(hours: i32) -> Option<Self> {
        FixedOffset::east_opt(hours.checked_mul(3600)?).map(|offset| Self { offset })
    }
}

impl Clock for SystemClock {
    fn local_hour(&self) -> u32 {
        Utc::now().with_timezone(&self.offset).hour()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Outcome of passing through the gate.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GateState {
    /// Inside the window on the first check; nothing was drawn.
    Active,
    /// The board was paused and has just resumed.
    Paused,
}

/// Block until the local hour is inside `window`.
///
/// Inside the window this returns at once without touching the panel.
/// Otherwise the paused notice is drawn and fully refreshed once, and the
/// clock is re-checked every `poll` until the window opens.
pub async fn pause_until_active<C, P>(
    clock: &C,
    panel: &mut P,
    window: ActiveHours,
    poll: Duration,
) -> GateState
where
    C: Clock,
    P: Panel,
{
    let hour = clock.local_hour();
    if window.contains(hour) {
        return GateState::Active;
    }

    info!(
        "Outside active hours ({}:00, window {}-{}), pausing",
        hour, window.start_hour, window.end_hour
    );
    eink_renderer::render_paused(panel.canvas(), window.start_hour);
    if let Err(e) = panel.refresh(RefreshMode::Full) {
        warn!("Paused screen refresh failed: {}", e);
    }

    loop {
        clock.sleep(poll).await;
        let hour = clock.local_hour();
        if window.contains(hour) {
            info!("Resuming at {}:00", hour);
            return GateState::Paused;
        }
    }
}
