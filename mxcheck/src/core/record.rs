//! Line classification for raw per-process snapshot records.
//!
//! Each line of a record is either a section marker, a field, an in-transit
//! reply message, or noise. Classification is lenient: anything that does not
//! parse cleanly is [`Line::Ignored`].

use std::sync::LazyLock;

use regex::Regex;

use crate::core::types::{MxState, ProcessId, SnapshotId, Waiting};

/// Raw lines one process wrote, in capture order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRecord {
    pub process: ProcessId,
    pub lines: Vec<String>,
}

impl RawRecord {
    pub fn from_text(process: ProcessId, text: &str) -> Self {
        Self {
            process,
            lines: text.lines().map(str::to_string).collect(),
        }
    }
}

/// A single recognized field value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Field {
    State(MxState),
    LogicalClock(i64),
    RequestTimestamp(i64),
    Waiting(Waiting),
    PendingReplies(i64),
}

/// Classified line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Line<'a> {
    /// `Snapshot <id>` section boundary.
    Marker(SnapshotId),
    Field(Field),
    /// Reply message recorded in flight, trimmed.
    Message(&'a str),
    Ignored,
}

static MARKER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^Snapshot\s+(-?\d+)$").unwrap());
static FLAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(true|false)\b").unwrap());

/// Marker substring identifying a reply message line.
const REPLY_TAG: &str = "respOK";

/// Classify one raw line.
///
/// Labels written by the DIMEX dumper (`Estado`, `Relógio Lógico`,
/// `Timestamp de Requisição`, `Mensagens`) are accepted alongside the English
/// ones.
pub fn classify(raw: &str) -> Line<'_> {
    let line = raw.trim();
    if let Some(caps) = MARKER_RE.captures(line) {
        return match caps[1].parse() {
            Ok(id) => Line::Marker(id),
            Err(_) => Line::Ignored,
        };
    }
    if let Some((label, value)) = line.split_once(':')
        && let Some(field) = parse_field(label.trim(), value.trim())
    {
        return field;
    }
    if line.contains(REPLY_TAG) {
        return Line::Message(line);
    }
    Line::Ignored
}

/// Returns `None` for unknown labels so the caller can try the message rule.
fn parse_field<'a>(label: &str, value: &str) -> Option<Line<'a>> {
    let field = match label {
        "State" | "Estado" => MxState::parse(value).map(Field::State),
        "LogicalClock" | "Relógio Lógico" => value.parse().ok().map(Field::LogicalClock),
        "RequestTimestamp" | "Timestamp de Requisição" => {
            value.parse().ok().map(Field::RequestTimestamp)
        }
        "Waiting" => Some(Field::Waiting(parse_waiting(value))),
        "NbrResps" => value.parse().ok().map(Field::PendingReplies),
        "Messages" | "Mensagens" => return Some(Line::Ignored),
        _ => return None,
    };
    Some(field.map_or(Line::Ignored, Line::Field))
}

/// Extract `true`/`false` tokens in order from a bracketed list.
pub fn parse_waiting(value: &str) -> Waiting {
    let inner = value.trim_start_matches('[').trim_end_matches(']');
    Waiting::from_flags(FLAG_RE.find_iter(inner).map(|token| token.as_str() == "true"))
}
