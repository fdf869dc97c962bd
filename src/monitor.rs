//! # Control Loop
//!
//! One cycle runs gate, fetch, parse and sort, render, and refresh in that
//! order, and a fixed delay separates cycles:
//!
//! ```text
//! GATING ──> FETCHING ──> RENDERING ──> SLEEPING ──┐
//!    ^                                             │
//!    └─────────────────────────────────────────────┘
//! ```
//!
//! A failed fetch is not an error at this level: the cycle renders an empty
//! grid and the next poll is the retry. Panel refresh failures are logged and
//! the loop keeps going.

use crate::active_hours::{pause_until_active, ActiveHours, Clock, GateState};
use crate::arrival_data::{ArrivalFetcher, Transport};
use crate::eink_renderer;
use crate::glyphs::GlyphTable;
use crate::panel::{Panel, PanelError, RefreshMode};
use crate::renderer;
use crate::ArrivalResult;
use log::{debug, info, warn};
use std::time::Duration;

/// Loop timing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Schedule {
    pub active_hours: ActiveHours,
    /// Delay after each cycle.
    pub poll_interval: Duration,
    /// Clock re-check interval while paused.
    pub pause_poll_interval: Duration,
    /// Every Nth refresh is a full one; 0 means partial only.
    pub full_refresh_every: u32,
}

impl Default for Schedule {
    fn default() -> Self {
        Self {
            active_hours: ActiveHours::default(),
            poll_interval: Duration::from_secs(20),
            pause_poll_interval: Duration::from_secs(5),
            full_refresh_every: 30,
        }
    }
}

/// What one cycle did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CycleReport {
    pub gate: GateState,
    /// Arrivals drawn this cycle.
    pub arrivals: usize,
    pub fetch_ok: bool,
    pub refresh: RefreshMode,
}

/// The station board: owns the fetcher, clock, panel, and arrival buffer.
pub struct StationMonitor<'g, T, C, P> {
    fetcher: ArrivalFetcher<T>,
    clock: C,
    panel: P,
    glyphs: &'g GlyphTable,
    schedule: Schedule,
    arrivals: ArrivalResult,
    partials_since_full: u32,
    force_full: bool,
}

impl<'g, T, C, P> StationMonitor<'g, T, C, P>
where
    T: Transport,
    C: Clock,
    P: Panel,
{
    pub fn new(
        fetcher: ArrivalFetcher<T>,
        clock: C,
        panel: P,
        glyphs: &'g GlyphTable,
        schedule: Schedule,
    ) -> Self {
        Self {
            fetcher,
            clock,
            panel,
            glyphs,
            schedule,
            arrivals: ArrivalResult::new(),
            partials_since_full: 0,
            force_full: false,
        }
    }

    pub fn arrivals(&self) -> &ArrivalResult {
        &self.arrivals
    }

    pub fn panel(&self) -> &P {
        &self.panel
    }

    pub fn panel_mut(&mut self) -> &mut P {
        &mut self.panel
    }

    /// Draw the startup screen with a full refresh.
    pub fn show_splash(&mut self) -> Result<(), PanelError> {
        info!("{}", eink_renderer::SPLASH_TEXT);
        eink_renderer::render_splash(self.panel.canvas());
        self.panel.refresh(RefreshMode::Full)
    }

    /// Full after a pause and on every `full_refresh_every`th refresh.
    pub fn next_refresh_mode(&mut self) -> RefreshMode {
        let every = self.schedule.full_refresh_every;
        let periodic = every > 0 && self.partials_since_full + 1 >= every;

        if self.force_full || periodic {
            self.force_full = false;
            self.partials_since_full = 0;
            RefreshMode::Full
        } else {
            self.partials_since_full += 1;
            RefreshMode::Partial
        }
    }

    /// Gate, fetch, render and refresh once.
    pub async fn run_cycle(&mut self) -> CycleReport {
        let gate = pause_until_active(
            &self.clock,
            &mut self.panel,
            self.schedule.active_hours,
            self.schedule.pause_poll_interval,
        )
        .await;
        if gate == GateState::Paused {
            // the paused notice is still on the glass
            self.force_full = true;
        }

        let fetch_ok = match self.fetcher.refresh(&mut self.arrivals).await {
            Ok(count) => {
                debug!("Parsed {} arrivals", count);
                true
            }
            Err(e) => {
                warn!("Arrival fetch failed: {}", e);
                false
            }
        };
        renderer::log_arrivals(&self.arrivals);

        eink_renderer::render_arrivals(self.panel.canvas(), self.glyphs, &self.arrivals);
        let refresh = self.next_refresh_mode();
        if let Err(e) = self.panel.refresh(refresh) {
            warn!("{:?} panel refresh failed: {}", refresh, e);
        }

        CycleReport {
            gate,
            arrivals: self.arrivals.len(),
            fetch_ok,
            refresh,
        }
    }

    pub async fn sleep_until_next_cycle(&self) {
        self.clock.sleep(self.schedule.poll_interval).await;
    }

    /// Run cycles until `max_cycles` is reached, or forever with `None`.
    ///
    /// `after_cycle` sees each report and the arrivals just drawn. There is no
    /// delay after the final cycle.
    pub async fn run<F>(&mut self, max_cycles: Option<u64>, mut after_cycle: F)
    where
        F: FnMut(&CycleReport, &ArrivalResult),
    {
        let mut completed = 0u64;
        loop {
            let report = self.run_cycle().await;
            completed += 1;
            after_cycle(&report, &self.arrivals);

            if max_cycles.is_some_and(|max| completed >= max) {
                info!("Stopping after {} cycles", completed);
                return;
            }
            self.sleep_until_next_cycle().await;
        }
    }
}
