//! # Station Monitor Core Library
//!
//! This library provides the data pipeline and rendering for a subway arrival
//! board: a single e-ink panel that shows the next trains leaving 교대 station
//! on lines 2 and 3, refreshed from the Seoul real-time arrival API.
//!
//! ## Design Philosophy
//!
//! ### Memory Efficiency
//! - **Fixed-capacity buffers**: arrivals live in a `heapless::Vec` of at most
//!   [`MAX_ARRIVALS`] records that is cleared and refilled every cycle
//! - **Reused response buffer**: the HTTP body is read into one pre-sized buffer
//!   owned by the fetcher, so a steady-state cycle does not grow the heap
//! - **Closed data model**: stations and lines are a fixed set, so records hold
//!   a small enum instead of owned strings
//!
//! ### Data Flow
//! 1. **Gate**: outside active hours, show a paused screen and wait
//! 2. **Fetch**: one HTTP GET, body parsed as JSON
//! 3. **Parse**: map each record's direction key to (line, destination)
//! 4. **Sort**: soonest arrival first
//! 5. **Render**: full redraw of the 2x2 grid, partial panel refresh
//! 6. **Sleep**: fixed poll interval, then repeat
//!
//! ## Core Types
//! - [`Station`]: one of the four destinations the board tracks
//! - [`ArrivalInfo`]: a single upcoming train
//! - [`ArrivalResult`]: the bounded, reusable set of arrivals for one cycle

pub mod active_hours;
pub mod arrival_data;
pub mod config;
pub mod eink_renderer;
pub mod epd4in2_v2;
pub mod glyphs;
pub mod hangul_text;
pub mod monitor;
pub mod panel;
pub mod renderer;

/// Maximum number of arrival records taken from a single API response.
pub const MAX_ARRIVALS: usize = 8;

/// Next-stop destination for a train leaving the monitored station.
///
/// The board has one cell per destination. Each destination is served by
/// exactly one line and one direction of travel.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Station {
    /// Line 2, outer loop.
    Gangnam,
    /// Line 2, inner loop.
    Seocho,
    /// Line 3, northbound (Express Bus Terminal).
    ExpressBusTerminal,
    /// Line 3, southbound (Nambu Bus Terminal).
    NambuTerminal,
}

impl Station {
    /// Hangul label drawn above the station's cell.
    pub fn label(self) -> &'static str {
        match self {
            Station::Gangnam => "강남",
            Station::Seocho => "서초",
            Station::ExpressBusTerminal => "고터",
            Station::NambuTerminal => "남부",
        }
    }
}

/// A single real-time arrival.
///
/// `arrival_time` is seconds until the train reaches the platform. It can be
/// negative when the train is overdue or already departing.
///
/// # Example
/// ```
/// use station_monitor_lib::{ArrivalInfo, Station};
///
/// let next = ArrivalInfo {
///     line_number: 2,
///     arrival_time: 125,
///     next_station: Station::Gangnam,
/// };
/// assert_eq!(next.next_station.label(), "강남");
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ArrivalInfo {
    /// Subway line number (2 or 3)
    pub line_number: u8,
    /// Seconds until arrival
    pub arrival_time: i32,
    /// Destination this train heads toward
    pub next_station: Station,
}

/// Arrivals collected in one fetch cycle.
///
/// Backed by a fixed-capacity buffer of [`MAX_ARRIVALS`] slots. Every slot in
/// `0..len()` holds a record with a recognized direction; unrecognized records
/// never occupy a slot.
///
/// # Example
/// ```
/// use station_monitor_lib::{ArrivalInfo, ArrivalResult, Station};
///
/// let mut result = ArrivalResult::new();
/// assert!(result.push(ArrivalInfo {
///     line_number: 3,
///     arrival_time: 60,
///     next_station: Station::NambuTerminal,
/// }));
/// assert_eq!(result.len(), 1);
/// assert_eq!(result.for_station(Station::Gangnam).count(), 0);
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ArrivalResult {
    arrivals: heapless::Vec<ArrivalInfo, MAX_ARRIVALS>,
}

impl ArrivalResult {
    pub const fn new() -> Self {
        Self {
            arrivals: heapless::Vec::new(),
        }
    }

    /// Drop all records, keeping the buffer for the next cycle.
    pub fn clear(&mut self) {
        self.arrivals.clear();
    }

    /// Append a record. Returns `false` if the buffer is already full.
    pub fn push(&mut self, arrival: ArrivalInfo) -> bool {
        self.arrivals.push(arrival).is_ok()
    }

    pub fn len(&self) -> usize {
        self.arrivals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arrivals.is_empty()
    }

    pub fn as_slice(&self) -> &[ArrivalInfo] {
        &self.arrivals
    }

    pub fn as_mut_slice(&mut self) -> &mut [ArrivalInfo] {
        &mut self.arrivals
    }

    pub fn iter(&self) -> impl Iterator<Item = &ArrivalInfo> {
        self.arrivals.iter()
    }

    /// Records heading to `station`, in buffer order.
    pub fn for_station(&self, station: Station) -> impl Iterator<Item = &ArrivalInfo> {
        self.arrivals
            .iter()
            .filter(move |arrival| arrival.next_station == station)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn arrival(time: i32, station: Station) -> ArrivalInfo {
        ArrivalInfo {
            line_number: 2,
            arrival_time: time,
            next_station: station,
        }
    }

    #[test]
    fn push_stops_at_capacity() {
        let mut result = ArrivalResult::new();
        for i in 0..MAX_ARRIVALS {
            assert!(result.push(arrival(i as i32, Station::Gangnam)));
        }
        assert!(!result.push(arrival(99, Station::Gangnam)));
        assert_eq!(result.len(), MAX_ARRIVALS);
    }

    #[test]
    fn for_station_filters_in_order() {
        let mut result = ArrivalResult::new();
        result.push(arrival(30, Station::Seocho));
        result.push(arrival(10, Station::Gangnam));
        result.push(arrival(20, Station::Seocho));

        let times: Vec<i32> = result
            .for_station(Station::Seocho)
            .map(|a| a.arrival_time)
            .collect();
        assert_eq!(times, vec![30, 20]);
    }
}
