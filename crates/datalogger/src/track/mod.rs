//! GPX track output.
//!
//! [`TrackWriter`] owns the log file; this module emits what goes into it:
//! the envelope and one line per track point, written as XML events so names
//! and attribute values are escaped on the way out.

mod writer;

pub use writer::{Opened, TrackWriter};

use std::io::Write;

use chrono::{DateTime, Utc};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;

use crate::error::Result;
use crate::telemetry::Position;

/// Prefix of every log file name.
pub const FILE_PREFIX: &str = "DataLog-";

/// Extension of every log file name.
pub const FILE_EXTENSION: &str = ".gpx";

const GPX_VERSION: &str = "1.0";

/// UTC time as written inside the document, e.g. `2024-05-01T12:30:05Z`.
#[must_use]
pub fn timestamp(time: DateTime<Utc>) -> String {
    time.format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

/// UTC time safe for file names, e.g. `2024-05-01T12-30-05Z`.
#[must_use]
pub fn file_timestamp(time: DateTime<Utc>) -> String {
    time.format("%Y-%m-%dT%H-%M-%SZ").to_string()
}

/// Log file name for a session started at `time`.
#[must_use]
pub fn file_name(time: DateTime<Utc>) -> String {
    format!("{FILE_PREFIX}{}{FILE_EXTENSION}", file_timestamp(time))
}

/// Write the document header up to and including the open track segment.
///
/// # Errors
///
/// Returns an error if the underlying writer fails.
pub fn write_prolog<W: Write>(
    xml: &mut Writer<W>,
    time: DateTime<Utc>,
    track_name: &str,
) -> Result<()> {
    xml.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
    newline(xml)?;

    let mut gpx = BytesStart::new("gpx");
    gpx.push_attribute(("version", GPX_VERSION));
    xml.write_event(Event::Start(gpx))?;
    newline(xml)?;

    xml.write_event(Event::Start(BytesStart::new("metadata")))?;
    text_element(xml, "time", &timestamp(time))?;
    xml.write_event(Event::End(BytesEnd::new("metadata")))?;
    newline(xml)?;

    xml.write_event(Event::Start(BytesStart::new("trk")))?;
    text_element(xml, "name", track_name)?;
    xml.write_event(Event::Start(BytesStart::new("trkseg")))?;
    newline(xml)
}

/// Write the closing tags for the segment, track and document.
///
/// # Errors
///
/// Returns an error if the underlying writer fails.
pub fn write_epilog<W: Write>(xml: &mut Writer<W>) -> Result<()> {
    xml.write_event(Event::End(BytesEnd::new("trkseg")))?;
    xml.write_event(Event::End(BytesEnd::new("trk")))?;
    newline(xml)?;
    xml.write_event(Event::End(BytesEnd::new("gpx")))?;
    newline(xml)
}

/// Write one `<trkpt>` line. Coordinates use six fractional digits.
///
/// # Errors
///
/// Returns an error if the underlying writer fails.
pub fn write_track_point<W: Write>(
    xml: &mut Writer<W>,
    position: &Position,
    time: DateTime<Utc>,
) -> Result<()> {
    let lat = format!("{:.6}", position.latitude);
    let lon = format!("{:.6}", position.longitude);

    let mut point = BytesStart::new("trkpt");
    point.push_attribute(("lat", lat.as_str()));
    point.push_attribute(("lon", lon.as_str()));
    xml.write_event(Event::Start(point))?;
    text_element(xml, "ele", &format!("{:.6}", position.altitude))?;
    text_element(xml, "time", &timestamp(time))?;
    xml.write_event(Event::End(BytesEnd::new("trkpt")))?;
    newline(xml)
}

fn text_element<W: Write>(xml: &mut Writer<W>, name: &str, text: &str) -> Result<()> {
    xml.write_event(Event::Start(BytesStart::new(name)))?;
    xml.write_event(Event::Text(BytesText::new(text)))?;
    xml.write_event(Event::End(BytesEnd::new(name)))?;
    Ok(())
}

fn newline<W: Write>(xml: &mut Writer<W>) -> Result<()> {
    xml.write_event(Event::Text(BytesText::new("\n")))?;
    Ok(())
}
