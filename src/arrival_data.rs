//! # Real-Time Arrival Fetching and Parsing
//!
//! This module handles the network side of the board: one HTTP GET against the
//! Seoul real-time arrival API per cycle, JSON decoding, mapping each record's
//! direction onto a line and destination, and ordering the result.
//!
//! ## Data Source
//! - **Endpoint**: `realtimeStationArrival` for 교대, configured in `[api]`
//! - **Format**: JSON object with a `realtimeArrivalList` array
//! - **Fields used**: `updnLine` (direction) and `barvlDt` (seconds to arrival,
//!   as a numeric string)
//!
//! ## Processing Pipeline
//! 1. **Fetch**: GET into a reused body buffer, reject non-200 responses and
//!    bodies over [`MAX_BODY_SIZE`]
//! 2. **Decode**: parse the body as JSON
//! 3. **Parse**: first [`MAX_ARRIVALS`] records, unknown directions skipped
//! 4. **Sort**: ascending by seconds to arrival
//!
//! ## Error Handling
//! Every failure is confined to the current cycle: the result comes back empty
//! and the board draws an empty grid until the next poll succeeds. There is no
//! retry beyond the regular poll interval.

use crate::{ArrivalInfo, ArrivalResult, Station, MAX_ARRIVALS};
use log::{debug, warn};
use serde_json::Value;
use std::net::UdpSocket;
use thiserror::Error;

pub const ARRIVAL_LIST_KEY: &str = "realtimeArrivalList";
pub const LINE_KEY: &str = "updnLine";
pub const ARRIVAL_TIME_KEY: &str = "barvlDt";

/// Size the response body buffer is kept at between cycles.
pub const JSON_DOC_SIZE: usize = 6144;

/// Largest response body accepted. Ten records run to roughly 15 KiB.
pub const MAX_BODY_SIZE: usize = 64 * 1024;

/// Any routable address works; connecting a UDP socket sends nothing.
const CONNECTIVITY_PROBE: &str = "8.8.8.8:53";

/// Errors that end a fetch cycle early.
#[derive(Error, Debug)]
pub enum ArrivalError {
    /// No usable network route
    #[error("network not connected")]
    NotConnected,

    /// Server answered with something other than 200 OK
    #[error("HTTP GET failed, status {0}")]
    Status(u16),

    /// Request could not be sent or the body could not be read
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Body does not fit in [`MAX_BODY_SIZE`]
    #[error("response body exceeds {0} bytes")]
    TooLarge(usize),

    /// Body is not valid JSON
    #[error("JSON deserialization failed: {0}")]
    Json(#[from] serde_json::Error),
}

/// Network capability used by the fetcher.
#[allow(async_fn_in_trait)]
pub trait Transport {
    fn is_connected(&self) -> bool;

    /// GET `url`, appending the response body to `body`. Returns the status code.
    ///
    /// The body is only read for a 200 response, and reading stops with
    /// [`ArrivalError::TooLarge`] once it would pass [`MAX_BODY_SIZE`].
    async fn get(&self, url: &str, body: &mut Vec<u8>) -> Result<u16, ArrivalError>;
}

/// `reqwest`-backed transport. No timeout is set beyond the client defaults.
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new() -> Result<Self, ArrivalError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("station-monitor/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }
}

impl Transport for HttpTransport {
    fn is_connected(&self) -> bool {
        UdpSocket::bind("0.0.0.0:0")
            .and_then(|socket| socket.connect(CONNECTIVITY_PROBE))
            .is_ok()
    }

    async fn get(&self, url: &str, body: &mut Vec<u8>) -> Result<u16, ArrivalError> {
        let mut response = self.client.get(url).send().await?;
        let status = response.status().as_u16();
        if status != 200 {
            return Ok(status);
        }
        while let Some(chunk) = response.chunk().await? {
            if body.len() + chunk.len() > MAX_BODY_SIZE {
                return Err(ArrivalError::TooLarge(MAX_BODY_SIZE));
            }
            body.extend_from_slice(&chunk);
        }
        Ok(status)
    }
}

/// Fetches the arrival document, reusing one body buffer across cycles.
pub struct ArrivalFetcher<T> {
    transport: T,
    url: String,
    body: Vec<u8>,
}

impl<T: Transport> ArrivalFetcher<T> {
    pub fn new(transport: T, url: impl Into<String>) -> Self {
        Self {
            transport,
            url: url.into(),
            body: Vec::with_capacity(JSON_DOC_SIZE),
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// One GET and JSON decode. The body buffer is empty again on return and
    /// back to [`JSON_DOC_SIZE`] capacity.
    pub async fn fetch(&mut self) -> Result<Value, ArrivalError> {
        self.body.clear();
        let document = self.fetch_document().await;
        self.body.clear();
        self.body.shrink_to(JSON_DOC_SIZE);
        document
    }

    async fn fetch_document(&mut self) -> Result<Value, ArrivalError> {
        if !self.transport.is_connected() {
            return Err(ArrivalError::NotConnected);
        }

        let status = self.transport.get(&self.url, &mut self.body).await?;
        if status != 200 {
            return Err(ArrivalError::Status(status));
        }
        if self.body.len() > MAX_BODY_SIZE {
            return Err(ArrivalError::TooLarge(MAX_BODY_SIZE));
        }

        debug!("Fetched {} byte arrival document", self.body.len());
        Ok(serde_json::from_slice(&self.body)?)
    }

    /// Fetch, parse and sort into `arrivals`.
    ///
    /// `arrivals` is cleared first, so on error it is left empty.
    pub async fn refresh(&mut self, arrivals: &mut ArrivalResult) -> Result<usize, ArrivalError> {
        arrivals.clear();
        let document = self.fetch().await?;
        parse_arrivals(&document, arrivals);
        sort_by_arrival(arrivals);
        Ok(arrivals.len())
    }
}

/// Line number and destination for a raw `updnLine` value.
pub fn line_info(direction: &str) -> Option<(u8, Station)> {
    match direction {
        "외선" => Some((2, Station::Gangnam)),
        "내선" => Some((2, Station::Seocho)),
        "상행" => Some((3, Station::ExpressBusTerminal)),
        "하행" => Some((3, Station::NambuTerminal)),
        _ => None,
    }
}

/// Decimal prefix of `text` with `atoi` semantics.
///
/// Leading whitespace and one sign are accepted, parsing stops at the first
/// non-digit, and input with no digits is 0. Overflow saturates.
pub fn parse_seconds(text: &str) -> i32 {
    let trimmed = text.trim_start();
    let (negative, digits) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };

    let magnitude = digits
        .bytes()
        .take_while(u8::is_ascii_digit)
        .fold(0i32, |acc, digit| {
            acc.saturating_mul(10).saturating_add(i32::from(digit - b'0'))
        });

    if negative {
        -magnitude
    } else {
        magnitude
    }
}

/// Fill `arrivals` from the first [`MAX_ARRIVALS`] records of `document`.
///
/// Records with an unknown or missing direction are skipped and do not take a
/// slot; a missing or non-array list yields no arrivals.
pub fn parse_arrivals(document: &Value, arrivals: &mut ArrivalResult) {
    arrivals.clear();

    let Some(records) = document.get(ARRIVAL_LIST_KEY).and_then(Value::as_array) else {
        debug!("No {} array in document", ARRIVAL_LIST_KEY);
        return;
    };

    for record in records.iter().take(MAX_ARRIVALS) {
        let direction = record.get(LINE_KEY).and_then(Value::as_str);
        let seconds = record.get(ARRIVAL_TIME_KEY).and_then(Value::as_str);
        debug!("Record: {:?} {:?}", direction, seconds);

        let Some((line_number, next_station)) = direction.and_then(line_info) else {
            warn!("Unknown line key: {}", direction.unwrap_or("<missing>"));
            continue;
        };

        let arrival = ArrivalInfo {
            line_number,
            arrival_time: parse_seconds(seconds.unwrap_or_default()),
            next_station,
        };
        if !arrivals.push(arrival) {
            break;
        }
    }
}

/// Soonest arrival first. Only the valid records are touched.
pub fn sort_by_arrival(arrivals: &mut ArrivalResult) {
    arrivals
        .as_mut_slice()
        .sort_unstable_by_key(|arrival| arrival.arrival_time);
}
