//! Rendering of ranked arrivals and stop matches.
//!
//! Supports a human-readable text layout and a pretty-printed JSON document.

use std::fmt::Display;
use std::io::Write;

use anyhow::Result;
use chrono::{DateTime, FixedOffset, TimeZone};
use serde::{Deserialize, Serialize};

use crate::gtfs::Stop;
use crate::rank::{Arrival, VehicleInfo};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    pub fn from_json_flag(json: bool) -> Self {
        if json {
            OutputFormat::Json
        } else {
            OutputFormat::Text
        }
    }
}

/// Identity and position of the queried stop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StopSummary {
    pub stop_id: String,
    pub stop_code: Option<String>,
    pub stop_name: String,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
}

impl From<&Stop> for StopSummary {
    fn from(stop: &Stop) -> Self {
        Self {
            stop_id: stop.stop_id.clone(),
            stop_code: stop.stop_code.clone(),
            stop_name: stop.stop_name.clone(),
            lat: stop.stop_lat,
            lon: stop.stop_lon,
        }
    }
}

/// The structured result of one `next` run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArrivalReport {
    pub stop: StopSummary,
    /// When the report was generated, in the display zone, with offset.
    pub generated_at: DateTime<FixedOffset>,
    pub arrivals: Vec<Arrival>,
}

impl ArrivalReport {
    pub fn new<Tz: TimeZone>(stop: &Stop, arrivals: Vec<Arrival>, now: &DateTime<Tz>) -> Self {
        Self {
            stop: stop.into(),
            generated_at: now.fixed_offset(),
            arrivals,
        }
    }
}

/// A resolver match, as listed by the `stops` command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StopMatch {
    #[serde(flatten)]
    pub stop: StopSummary,
    pub location_type: Option<u8>,
    pub parent_station: Option<String>,
}

impl From<&Stop> for StopMatch {
    fn from(stop: &Stop) -> Self {
        Self {
            stop: stop.into(),
            location_type: stop.location_type,
            parent_station: stop.parent_station.clone(),
        }
    }
}

/// Formats a countdown: `"<N>s"` under a minute, else `"<M> min <SS>s"`.
/// Negative values are shown as zero.
pub fn format_eta(seconds: i64) -> String {
    let seconds = seconds.max(0);
    if seconds < 60 {
        format!("{seconds}s")
    } else {
        format!("{} min {:02}s", seconds / 60, seconds % 60)
    }
}

/// Where the vehicle is, for the text layout.
pub fn describe_vehicle(vehicle: Option<&VehicleInfo>) -> String {
    match vehicle {
        None => "unknown".to_string(),
        Some(v) => match v.distance_m_to_stop {
            Some(d) => format!("{:.6},{:.6} (~{d} m away)", v.lat, v.lon),
            None => format!("{:.6},{:.6}", v.lat, v.lon),
        },
    }
}

/// Renders arrivals in the requested format. Clock times are shown in the
/// time zone of `now`.
pub fn render<W, Tz>(
    out: &mut W,
    stop: &Stop,
    arrivals: Vec<Arrival>,
    format: OutputFormat,
    now: &DateTime<Tz>,
) -> Result<()>
where
    W: Write,
    Tz: TimeZone,
    Tz::Offset: Display,
{
    match format {
        OutputFormat::Text => write_text(out, stop, &arrivals, now),
        OutputFormat::Json => write_json(out, &ArrivalReport::new(stop, arrivals, now)),
    }
}

pub fn write_text<W, Tz>(
    out: &mut W,
    stop: &Stop,
    arrivals: &[Arrival],
    now: &DateTime<Tz>,
) -> Result<()>
where
    W: Write,
    Tz: TimeZone,
    Tz::Offset: Display,
{
    writeln!(out, "Now:  {}", now.format("%Y-%m-%d %H:%M:%S %Z"))?;
    writeln!(
        out,
        "Stop: {} (stop_id={}, code={})",
        stop.stop_name,
        stop.stop_id,
        stop.stop_code.as_deref().unwrap_or("")
    )?;
    match stop.coordinates() {
        Some(c) => writeln!(out, "Loc:  {:.6},{:.6}", c.lat, c.lon)?,
        None => writeln!(out, "Loc:  unknown")?,
    }
    writeln!(out)?;

    if arrivals.is_empty() {
        writeln!(out, "No realtime arrivals found for this stop right now.")?;
        writeln!(
            out,
            "Tip: Late night? Service ended? Or predictions temporarily unavailable."
        )?;
        writeln!(out)?;
        return Ok(());
    }

    let tz = now.timezone();
    for a in arrivals {
        let at = DateTime::from_timestamp(a.arrival_epoch_utc, 0)
            .map(|utc| utc.with_timezone(&tz).format("%H:%M:%S").to_string())
            .unwrap_or_else(|| "?".to_string());
        writeln!(
            out,
            "• Route {} → {}  |  ETA: {}  (at {})",
            a.route,
            a.headsign,
            format_eta(a.eta_seconds),
            at
        )?;
        writeln!(out, "  Vehicle: {}", describe_vehicle(a.vehicle.as_ref()))?;
    }
    writeln!(out)?;
    Ok(())
}

pub fn write_json<W: Write, T: Serialize + ?Sized>(out: &mut W, value: &T) -> Result<()> {
    serde_json::to_writer_pretty(&mut *out, value)?;
    writeln!(out)?;
    Ok(())
}

/// Lists resolver matches; the first one is what `next` would use.
pub fn write_stop_matches<W: Write>(
    out: &mut W,
    query: &str,
    matches: &[&Stop],
    format: OutputFormat,
) -> Result<()> {
    if format == OutputFormat::Json {
        let rows: Vec<StopMatch> = matches.iter().map(|s| StopMatch::from(*s)).collect();
        return write_json(out, &rows);
    }

    writeln!(out, "{} stop(s) match {query:?}:", matches.len())?;
    for (i, stop) in matches.iter().enumerate() {
        let marker = if i == 0 { "*" } else { " " };
        let loc = stop
            .coordinates()
            .map(|c| format!("{:.6},{:.6}", c.lat, c.lon))
            .unwrap_or_else(|| "unknown".to_string());
        writeln!(
            out,
            "{marker} {}  code={}  {}  {}  location_type={}  parent={}",
            stop.stop_id,
            stop.stop_code.as_deref().unwrap_or("-"),
            stop.stop_name,
            loc,
            stop.location_type.unwrap_or(0),
            stop.parent_station.as_deref().unwrap_or("-"),
        )?;
    }
    Ok(())
}
