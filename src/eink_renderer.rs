//! E-ink arrival board renderer
//!
//! Draws the fixed station board on the 300x400 portrait canvas: a header with
//! the two line names, a 2x2 grid with one cell per destination, and up to two
//! countdowns per cell. The paused and splash screens live here too.
//!
//! ```text
//!  ────────────────────────────── y=3
//!  Line 2        │ Line 3
//!  ──────────────┼─────────────── y=62
//!  강남           │ 고터
//!   02:05        │  00:40
//!    06:10       │   04:55
//!  ──────────────┼─────────────── y=230
//!  서초           │ 남부
//!   ...          │  ...
//! ```
//!
//! Every call is a full redraw of the frame. Latin text uses u8g2 fonts; the
//! Hangul station labels come from the glyph table.

use crate::glyphs::GlyphTable;
use crate::hangul_text::draw_hangul;
use crate::{ArrivalResult, Station};
use core::fmt::Debug;
use embedded_graphics::{
    pixelcolor::BinaryColor,
    prelude::*,
    primitives::{Line, PrimitiveStyle},
};
use u8g2_fonts::{
    fonts,
    types::{FontColor, VerticalPosition},
    FontRenderer,
};

/// Countdowns and header labels.
pub const LARGE_FONT: FontRenderer =
    FontRenderer::new::<fonts::u8g2_font_helvB24_tf>().with_ignore_unknown_chars(true);
/// Second countdown row and the paused and splash messages.
pub const SMALL_FONT: FontRenderer =
    FontRenderer::new::<fonts::u8g2_font_helvR12_tf>().with_ignore_unknown_chars(true);

pub const TOP_RULE_Y: i32 = 3;
pub const HEADER_HEIGHT: i32 = 68;
/// Rule under the header labels.
pub const HEADER_RULE_Y: i32 = HEADER_HEIGHT - 6;
pub const HEADER_BASELINE_Y: i32 = 50;
pub const COLUMN_DIVIDER_X: i32 = 150;
pub const COLUMN_DIVIDER_TOP: i32 = 5;

/// Cells start 10 px in from their column edge.
const CELL_INSET_X: i32 = 10;
/// Top-row cells start 6 px below the header rule.
const FIRST_ROW_Y: i32 = HEADER_HEIGHT + 6;
/// Half way between the header and the bottom edge, lifted slightly.
pub const MIDDLE_RULE_Y: i32 = (400 + FIRST_ROW_Y) / 2 - 7;
const SECOND_ROW_Y: i32 = MIDDLE_RULE_Y + 15;

/// Baseline of the first countdown, below the station label.
pub const COUNTDOWN_OFFSET_Y: i32 = 108;
pub const COUNTDOWN_INSET_X: i32 = 4;
pub const COUNTDOWN_LINE_HEIGHT: i32 = 32;
/// The small-font row sits 3 px right so its digits line up under the large ones.
pub const SECOND_ROW_NUDGE_X: i32 = 3;
pub const MAX_ROWS_PER_CELL: usize = 2;

/// Vertical gap between consecutive lines of a centered message.
const MESSAGE_LINE_SPACING: i32 = 30;

pub const SPLASH_TEXT: &str = "Starting Live Station Monitor";

/// Where a station's label and countdowns are drawn.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StationCell {
    pub station: Station,
    pub x: i32,
    pub y: i32,
}

pub const CELLS: [StationCell; 4] = [
    StationCell {
        station: Station::Gangnam,
        x: CELL_INSET_X,
        y: FIRST_ROW_Y,
    },
    StationCell {
        station: Station::ExpressBusTerminal,
        x: COLUMN_DIVIDER_X + CELL_INSET_X,
        y: FIRST_ROW_Y,
    },
    StationCell {
        station: Station::Seocho,
        x: CELL_INSET_X,
        y: SECOND_ROW_Y,
    },
    StationCell {
        station: Station::NambuTerminal,
        x: COLUMN_DIVIDER_X + CELL_INSET_X,
        y: SECOND_ROW_Y,
    },
];

/// "MM:SS" for a countdown in seconds. Overdue trains read "00:00".
pub fn format_countdown(seconds: i32) -> String {
    let seconds = seconds.max(0);
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}

/// 12-hour clock label for a whole hour: 6 -> "6:00 AM", 13 -> "1:00 PM".
pub fn format_resume_time(hour: u32) -> String {
    let suffix = if hour % 24 < 12 { "AM" } else { "PM" };
    let display_hour = match hour % 12 {
        0 => 12,
        h => h,
    };
    format!("{}:00 {}", display_hour, suffix)
}

/// Baseline-left position of countdown `row` in `cell`.
pub fn countdown_position(cell: &StationCell, row: usize) -> Point {
    let nudge = if row == 0 { 0 } else { SECOND_ROW_NUDGE_X };
    Point::new(
        cell.x + COUNTDOWN_INSET_X + nudge,
        cell.y + COUNTDOWN_OFFSET_Y + row as i32 * COUNTDOWN_LINE_HEIGHT,
    )
}

fn row_font(row: usize) -> &'static FontRenderer {
    if row == 0 {
        &LARGE_FONT
    } else {
        &SMALL_FONT
    }
}

/// Countdown strings for one cell, soonest first when `arrivals` is sorted.
pub fn cell_countdowns(arrivals: &ArrivalResult, station: Station) -> Vec<String> {
    arrivals
        .for_station(station)
        .take(MAX_ROWS_PER_CELL)
        .map(|arrival| format_countdown(arrival.arrival_time))
        .collect()
}

/// Draw the full arrival board for `arrivals`.
pub fn render_arrivals<D>(target: &mut D, glyphs: &GlyphTable, arrivals: &ArrivalResult)
where
    D: DrawTarget<Color = BinaryColor>,
    D::Error: Debug,
{
    target.clear(BinaryColor::Off).ok();
    draw_chrome(target);

    for cell in &CELLS {
        draw_hangul(target, glyphs, cell.x, cell.y, cell.station.label()).ok();
        for (row, countdown) in cell_countdowns(arrivals, cell.station).iter().enumerate() {
            draw_text(target, row_font(row), countdown, countdown_position(cell, row));
        }
    }
}

/// Header, rules, and dividers. Everything on the board except the data.
fn draw_chrome<D>(target: &mut D)
where
    D: DrawTarget<Color = BinaryColor>,
    D::Error: Debug,
{
    let size = target.bounding_box().size;
    let right = size.width as i32 - 1;
    let bottom = size.height as i32 - 1;
    let style = PrimitiveStyle::with_stroke(BinaryColor::On, 1);

    for y in [TOP_RULE_Y, HEADER_RULE_Y, MIDDLE_RULE_Y] {
        Line::new(Point::new(0, y), Point::new(right, y))
            .into_styled(style)
            .draw(target)
            .ok();
    }
    Line::new(
        Point::new(COLUMN_DIVIDER_X, COLUMN_DIVIDER_TOP),
        Point::new(COLUMN_DIVIDER_X, bottom),
    )
    .into_styled(style)
    .draw(target)
    .ok();

    draw_text(target, &LARGE_FONT, "Line 2", Point::new(8, HEADER_BASELINE_Y));
    draw_text(
        target,
        &LARGE_FONT,
        "Line 3",
        Point::new(COLUMN_DIVIDER_X + CELL_INSET_X, HEADER_BASELINE_Y),
    );
}

/// Notice shown outside active hours.
pub fn render_paused<D>(target: &mut D, start_hour: u32)
where
    D: DrawTarget<Color = BinaryColor>,
    D::Error: Debug,
{
    let resume = format!("{} each day.", format_resume_time(start_hour));
    target.clear(BinaryColor::Off).ok();
    draw_centered(
        target,
        &SMALL_FONT,
        &["Station monitor inactive", "Service will resume at", &resume],
    );
}

/// One-line startup screen.
pub fn render_splash<D>(target: &mut D)
where
    D: DrawTarget<Color = BinaryColor>,
    D::Error: Debug,
{
    target.clear(BinaryColor::Off).ok();
    draw_centered(target, &SMALL_FONT, &[SPLASH_TEXT]);
}

/// Center each line on the canvas by its own bounding box, then lift line
/// `i` of `n` by `(n - 1 - i)` line spacings so the block ends at the middle.
pub fn draw_centered<D>(target: &mut D, font: &FontRenderer, lines: &[&str])
where
    D: DrawTarget<Color = BinaryColor>,
    D::Error: Debug,
{
    let size = target.bounding_box().size;
    let (width, height) = (size.width as i32, size.height as i32);

    for (i, line) in lines.iter().enumerate() {
        let Some(bounds) = font
            .get_rendered_dimensions(*line, Point::zero(), VerticalPosition::Baseline)
            .ok()
            .and_then(|dims| dims.bounding_box)
        else {
            continue;
        };
        let lift = (lines.len() - 1 - i) as i32 * MESSAGE_LINE_SPACING;
        let x = (width - bounds.size.width as i32) / 2 - bounds.top_left.x;
        let y = (height - bounds.size.height as i32) / 2 - bounds.top_left.y - lift;
        draw_text(target, font, line, Point::new(x, y));
    }
}

fn draw_text<D>(target: &mut D, font: &FontRenderer, text: &str, baseline: Point)
where
    D: DrawTarget<Color = BinaryColor>,
    D::Error: Debug,
{
    font.render(
        text,
        baseline,
        VerticalPosition::Baseline,
        FontColor::Transparent(BinaryColor::On),
        target,
    )
    .ok();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::panel::FrameBuffer;
    use crate::ArrivalInfo;
    use embedded_graphics::primitives::Rectangle;

    fn arrival(line_number: u8, arrival_time: i32, next_station: Station) -> ArrivalInfo {
        ArrivalInfo {
            line_number,
            arrival_time,
            next_station,
        }
    }

    fn board(arrivals: &ArrivalResult) -> FrameBuffer {
        let mut frame = FrameBuffer::portrait();
        render_arrivals(&mut frame, &GlyphTable::new(), arrivals);
        frame
    }

    fn ink_in(frame: &FrameBuffer, area: Rectangle) -> usize {
        area.points()
            .filter(|&p| frame.pixel(p) == BinaryColor::On)
            .count()
    }

    /// Every ink pixel of `part` is also ink in `whole`.
    fn contains_ink(whole: &FrameBuffer, part: &FrameBuffer) -> bool {
        part.bounding_box()
            .points()
            .filter(|&p| part.pixel(p) == BinaryColor::On)
            .all(|p| whole.pixel(p) == BinaryColor::On)
    }

    /// Countdown area of a cell, clear of its label and the grid rules.
    fn countdown_area(cell: &StationCell) -> Rectangle {
        Rectangle::new(
            Point::new(cell.x + 1, cell.y + COUNTDOWN_OFFSET_Y - 40),
            Size::new(130, 80),
        )
    }

    #[test]
    fn layout_constants() {
        assert_eq!(HEADER_RULE_Y, 62);
        assert_eq!(MIDDLE_RULE_Y, 230);
        assert_eq!((CELLS[0].x, CELLS[0].y), (10, 74));
        assert_eq!((CELLS[1].x, CELLS[1].y), (160, 74));
        assert_eq!((CELLS[2].x, CELLS[2].y), (10, 245));
        assert_eq!((CELLS[3].x, CELLS[3].y), (160, 245));
        assert_eq!(countdown_position(&CELLS[0], 0), Point::new(14, 182));
        assert_eq!(countdown_position(&CELLS[0], 1), Point::new(17, 214));
    }

    #[test]
    fn countdown_formatting() {
        assert_eq!(format_countdown(125), "02:05");
        assert_eq!(format_countdown(0), "00:00");
        assert_eq!(format_countdown(59), "00:59");
        assert_eq!(format_countdown(3600), "60:00");
        assert_eq!(format_countdown(-30), "00:00");
    }

    #[test]
    fn resume_time_uses_twelve_hour_clock() {
        assert_eq!(format_resume_time(6), "6:00 AM");
        assert_eq!(format_resume_time(0), "12:00 AM");
        assert_eq!(format_resume_time(12), "12:00 PM");
        assert_eq!(format_resume_time(13), "1:00 PM");
    }

    #[test]
    fn cell_takes_first_two_matches_in_order() {
        let mut arrivals = ArrivalResult::new();
        arrivals.push(arrival(2, 30, Station::Gangnam));
        arrivals.push(arrival(3, 40, Station::NambuTerminal));
        arrivals.push(arrival(2, 90, Station::Gangnam));
        arrivals.push(arrival(2, 400, Station::Gangnam));

        assert_eq!(
            cell_countdowns(&arrivals, Station::Gangnam),
            vec!["00:30", "01:30"]
        );
        assert_eq!(cell_countdowns(&arrivals, Station::NambuTerminal), vec!["00:40"]);
        assert!(cell_countdowns(&arrivals, Station::Seocho).is_empty());
    }

    #[test]
    fn single_arrival_renders_in_gangnam_cell() {
        let mut arrivals = ArrivalResult::new();
        arrivals.push(arrival(2, 125, Station::Gangnam));
        let frame = board(&arrivals);

        let mut expected = FrameBuffer::portrait();
        draw_text(
            &mut expected,
            &LARGE_FONT,
            "02:05",
            countdown_position(&CELLS[0], 0),
        );
        assert!(expected.ink_count() > 0);
        assert!(contains_ink(&frame, &expected));

        assert!(ink_in(&frame, countdown_area(&CELLS[0])) > 0);
        for cell in &CELLS[1..] {
            assert_eq!(ink_in(&frame, countdown_area(cell)), 0, "{:?}", cell.station);
        }
    }

    #[test]
    fn empty_result_draws_chrome_only() {
        let frame = board(&ArrivalResult::new());

        for y in [TOP_RULE_Y, HEADER_RULE_Y, MIDDLE_RULE_Y] {
            assert_eq!(frame.pixel(Point::new(0, y)), BinaryColor::On);
            assert_eq!(frame.pixel(Point::new(299, y)), BinaryColor::On);
        }
        assert_eq!(frame.pixel(Point::new(150, 5)), BinaryColor::On);
        assert_eq!(frame.pixel(Point::new(150, 399)), BinaryColor::On);
        assert_eq!(frame.pixel(Point::new(150, 4)), BinaryColor::Off);

        let header = Rectangle::new(Point::new(1, 10), Size::new(148, 45));
        assert!(ink_in(&frame, header) > 0);
        for cell in &CELLS {
            assert_eq!(ink_in(&frame, countdown_area(cell)), 0);
        }
    }

    #[test]
    fn third_match_is_not_drawn() {
        let mut two = ArrivalResult::new();
        two.push(arrival(2, 60, Station::Seocho));
        two.push(arrival(2, 180, Station::Seocho));
        let mut three = two.clone();
        three.push(arrival(2, 300, Station::Seocho));

        assert_eq!(board(&two), board(&three));
        assert_ne!(board(&two), board(&ArrivalResult::new()));
    }

    #[test]
    fn redraw_replaces_previous_frame() {
        let mut arrivals = ArrivalResult::new();
        arrivals.push(arrival(3, 45, Station::ExpressBusTerminal));

        let mut frame = FrameBuffer::portrait();
        let glyphs = GlyphTable::new();
        render_arrivals(&mut frame, &glyphs, &arrivals);
        render_arrivals(&mut frame, &glyphs, &ArrivalResult::new());
        assert_eq!(frame, board(&ArrivalResult::new()));
    }

    #[test]
    fn paused_screen_is_three_centered_lines() {
        let mut frame = FrameBuffer::portrait();
        render_paused(&mut frame, 6);
        assert!(frame.ink_count() > 0);

        // the last line sits on the vertical middle, the first two above it
        let above = Rectangle::new(Point::new(0, 120), Size::new(300, 70));
        let middle = Rectangle::new(Point::new(0, 190), Size::new(300, 20));
        let below = Rectangle::new(Point::new(0, 215), Size::new(300, 185));
        assert!(ink_in(&frame, above) > 0);
        assert!(ink_in(&frame, middle) > 0);
        assert_eq!(ink_in(&frame, below), 0);

        let mut other = FrameBuffer::portrait();
        render_paused(&mut other, 7);
        assert_ne!(frame, other);
    }

    #[test]
    fn splash_is_centered() {
        let mut frame = FrameBuffer::portrait();
        render_splash(&mut frame);
        let left = Rectangle::new(Point::zero(), Size::new(150, 400));
        let right = Rectangle::new(Point::new(150, 0), Size::new(150, 400));
        let (l, r) = (ink_in(&frame, left) as i64, ink_in(&frame, right) as i64);
        assert!(l > 0 && r > 0);
        assert!((l - r).abs() < (l + r) / 2);
    }
}
