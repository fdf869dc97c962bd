//! # Terminal and Log Output
//!
//! The e-ink layout lives in [`crate::eink_renderer`]. This module covers the
//! two text outputs of a cycle:
//!
//! - **Arrival summary**: one log line per train, for the systemd journal
//! - **ASCII board**: the same 2x2 grid as the panel, printed to stdout in
//!   `--stdout` development mode so the loop can be watched without hardware
//!
//! Hangul occupies two terminal columns, so padding is computed on display
//! width rather than on `char` count.

use crate::eink_renderer::{cell_countdowns, CELLS, MAX_ROWS_PER_CELL};
use crate::{ArrivalInfo, ArrivalResult, Station};
use log::info;

/// Columns reserved for a station name in the arrival summary.
pub const STATION_NAME_WIDTH: usize = 5;

/// Inner width of one ASCII board column.
const COLUMN_WIDTH: usize = 18;

/// "Line 2 to 강남  arriving in 2:05"
pub fn summary_line(arrival: &ArrivalInfo) -> String {
    let sign = if arrival.arrival_time < 0 { "-" } else { "" };
    let seconds = arrival.arrival_time.unsigned_abs();
    format!(
        "Line {} to {} arriving in {}{}:{:02}",
        arrival.line_number,
        pad_to_width(arrival.next_station.label(), STATION_NAME_WIDTH),
        sign,
        seconds / 60,
        seconds % 60
    )
}

/// Log every arrival in buffer order.
pub fn log_arrivals(arrivals: &ArrivalResult) {
    if arrivals.is_empty() {
        info!("No arrivals this cycle");
        return;
    }
    for arrival in arrivals.iter() {
        info!("{}", summary_line(arrival));
    }
}

/// Terminal columns taken by `text`. Hangul and other wide CJK are 2.
pub fn display_width(text: &str) -> usize {
    text.chars()
        .map(|ch| match ch as u32 {
            0x1100..=0x115F | 0x2E80..=0xA4CF | 0xAC00..=0xD7A3 | 0xF900..=0xFAFF => 2,
            _ => 1,
        })
        .sum()
}

fn pad_to_width(text: &str, width: usize) -> String {
    let padding = width.saturating_sub(display_width(text));
    format!("{}{}", text, " ".repeat(padding))
}

fn separator() -> String {
    let rule = "-".repeat(COLUMN_WIDTH + 2);
    format!("+{rule}+{rule}+")
}

fn row(left: &str, right: &str) -> String {
    format!(
        "| {} | {} |",
        pad_to_width(left, COLUMN_WIDTH),
        pad_to_width(right, COLUMN_WIDTH)
    )
}

/// Cell contents: the station label followed by one line per countdown row.
fn cell_lines(arrivals: &ArrivalResult, station: Station) -> Vec<String> {
    let mut countdowns = cell_countdowns(arrivals, station).into_iter();
    let mut lines = vec![station.label().to_string()];
    lines.extend((0..MAX_ROWS_PER_CELL).map(|row| match countdowns.next() {
        Some(countdown) => format!("{}{}", " ".repeat(2 + row), countdown),
        None => String::new(),
    }));
    lines
}

/// The board as text, one `String` per terminal line.
pub fn ascii_board(arrivals: &ArrivalResult) -> Vec<String> {
    let mut lines = vec![separator(), row("Line 2", "Line 3"), separator()];

    for pair in CELLS.chunks(2) {
        let left = cell_lines(arrivals, pair[0].station);
        let right = cell_lines(arrivals, pair[1].station);
        for (l, r) in left.iter().zip(&right) {
            lines.push(row(l, r));
        }
        lines.push(separator());
    }

    lines
}

/// Print the board to stdout (development mode).
pub fn draw_ascii(arrivals: &ArrivalResult) {
    for line in ascii_board(arrivals) {
        println!("{}", line);
    }
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;

    fn arrival(line_number: u8, arrival_time: i32, next_station: Station) -> ArrivalInfo {
        ArrivalInfo {
            line_number,
            arrival_time,
            next_station,
        }
    }

    #[test]
    fn hangul_is_double_width() {
        assert_eq!(display_width("Line 2"), 6);
        assert_eq!(display_width("강남"), 4);
        assert_eq!(display_width("02:05"), 5);
    }

    #[test]
    fn summary_pads_station_to_fixed_width() {
        let line = summary_line(&arrival(2, 125, Station::Gangnam));
        assert_eq!(line, "Line 2 to 강남  arriving in 2:05");

        let line = summary_line(&arrival(3, 59, Station::NambuTerminal));
        assert_eq!(line, "Line 3 to 남부  arriving in 0:59");

        let line = summary_line(&arrival(2, -30, Station::Seocho));
        assert_eq!(line, "Line 2 to 서초  arriving in -0:30");
    }

    #[test]
    fn board_lines_have_equal_display_width() {
        let mut arrivals = ArrivalResult::new();
        arrivals.push(arrival(2, 125, Station::Gangnam));
        arrivals.push(arrival(3, 40, Station::ExpressBusTerminal));
        arrivals.push(arrival(2, 370, Station::Gangnam));

        let board = ascii_board(&arrivals);
        let width = display_width(&board[0]);
        assert!(board.iter().all(|line| display_width(line) == width));
        // header, two cells of label + rows, and their separators
        assert_eq!(board.len(), 3 + 2 * (1 + MAX_ROWS_PER_CELL + 1));
    }

    #[test]
    fn board_shows_countdowns_under_their_station() {
        let mut arrivals = ArrivalResult::new();
        arrivals.push(arrival(2, 125, Station::Gangnam));
        arrivals.push(arrival(3, 40, Station::NambuTerminal));

        let board = ascii_board(&arrivals);
        let gangnam = board.iter().position(|l| l.contains("강남")).unwrap();
        assert!(board[gangnam + 1].starts_with("|   02:05"));

        let nambu = board.iter().position(|l| l.contains("남부")).unwrap();
        let expected = format!("  00:40{} |", " ".repeat(COLUMN_WIDTH - 7));
        assert!(board[nambu + 1].ends_with(&expected));
        assert!(board[nambu].contains("서초"));
    }

    #[test]
    fn empty_board_has_labels_only() {
        let board = ascii_board(&ArrivalResult::new());
        assert!(!board.iter().any(|line| line.contains(':')));
        for station in [Station::Gangnam, Station::Seocho, Station::NambuTerminal] {
            assert!(board.iter().any(|line| line.contains(station.label())));
        }
    }
}
