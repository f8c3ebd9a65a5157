//! Prometheus text exposition parsing.
//!
//! The parser is best-effort: anything that does not look like a
//! `name{labels} value` sample line is skipped, never reported.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;
use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;

static SAMPLE_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([a-zA-Z_:][a-zA-Z0-9_:]*(?:\{[^}]*\})?) (.+)$")
        .expect("sample line pattern is valid")
});

/// One exposition line: the full labelled identifier and its value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricSample {
    /// Identifier with the label block stripped; this is the bucket key.
    pub name: String,
    /// Identifier exactly as exposed, e.g. `http_requests_total{method="GET"}`.
    pub labelled_name: String,
    pub value: f64,
}

impl MetricSample {
    pub fn new(labelled_name: impl Into<String>, value: f64) -> Self {
        let labelled_name = labelled_name.into();
        let name = base_name(&labelled_name).to_string();
        Self {
            name,
            labelled_name,
            value,
        }
    }

    /// Label pairs in exposition order. Malformed trailing pairs are dropped.
    pub fn labels(&self) -> Vec<(String, String)> {
        let Some(start) = self.labelled_name.find('{') else {
            return Vec::new();
        };
        let block = &self.labelled_name[start + 1..];
        parse_label_block(block.strip_suffix('}').unwrap_or(block))
    }

    pub fn label(&self, key: &str) -> Option<String> {
        self.labels()
            .into_iter()
            .find(|(name, _)| name == key)
            .map(|(_, value)| value)
    }
}

/// All samples sharing one bare metric name, in first-seen order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricFamily {
    pub name: String,
    pub samples: Vec<MetricSample>,
}

/// Parsed `/metrics` payload keyed by bare metric name.
///
/// Families keep the order in which their name was first seen. A snapshot is
/// never merged into another; each refresh produces a new one.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetricsSnapshot {
    families: Vec<MetricFamily>,
    index: HashMap<String, usize>,
}

impl MetricsSnapshot {
    pub fn get(&self, name: &str) -> Option<&[MetricSample]> {
        self.index
            .get(name)
            .map(|&slot| self.families[slot].samples.as_slice())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.families.iter().map(|family| family.name.as_str())
    }

    pub fn families(&self) -> &[MetricFamily] {
        &self.families
    }

    pub fn len(&self) -> usize {
        self.families.len()
    }

    pub fn is_empty(&self) -> bool {
        self.families.is_empty()
    }

    pub fn sample_count(&self) -> usize {
        self.families.iter().map(|family| family.samples.len()).sum()
    }

    pub fn first_value(&self, name: &str) -> Option<f64> {
        self.get(name)
            .and_then(|samples| samples.first())
            .map(|sample| sample.value)
    }

    /// Sum over every labelled series of `name`.
    pub fn sum(&self, name: &str) -> Option<f64> {
        self.get(name)
            .map(|samples| samples.iter().map(|sample| sample.value).sum())
    }

    fn push(&mut self, sample: MetricSample) {
        match self.index.get(&sample.name) {
            Some(&slot) => self.families[slot].samples.push(sample),
            None => {
                self.index.insert(sample.name.clone(), self.families.len());
                self.families.push(MetricFamily {
                    name: sample.name.clone(),
                    samples: vec![sample],
                });
            }
        }
    }
}

impl FromIterator<MetricSample> for MetricsSnapshot {
    fn from_iter<I: IntoIterator<Item = MetricSample>>(iter: I) -> Self {
        let mut snapshot = Self::default();
        for sample in iter {
            snapshot.push(sample);
        }
        snapshot
    }
}

impl Serialize for MetricsSnapshot {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.families.len()))?;
        for family in &self.families {
            map.serialize_entry(&family.name, &family.samples)?;
        }
        map.end()
    }
}

/// Parse exposition text into a snapshot. Comment, blank and malformed lines
/// contribute nothing.
pub fn parse_metrics(text: &str) -> MetricsSnapshot {
    text.split('\n').filter_map(parse_line).collect()
}

fn parse_line(raw: &str) -> Option<MetricSample> {
    let line = raw.strip_suffix('\r').unwrap_or(raw);
    if line.starts_with('#') || line.trim().is_empty() {
        return None;
    }
    let captures = SAMPLE_LINE.captures(line)?;
    let labelled_name = captures.get(1)?.as_str();
    let value = leading_float(captures.get(2)?.as_str())?;
    Some(MetricSample::new(labelled_name, value))
}

fn base_name(labelled_name: &str) -> &str {
    labelled_name
        .split_once('{')
        .map_or(labelled_name, |(name, _)| name)
}

/// Longest numeric prefix of `raw`, after leading whitespace.
///
/// Trailing content such as a sample timestamp is ignored. The special values
/// must be whole tokens: `NaN`, `Inf` and `Infinity`, optionally signed.
/// `None` when there is no numeric prefix at all.
fn leading_float(raw: &str) -> Option<f64> {
    let text = raw.trim_start();
    let token = text.split_whitespace().next().unwrap_or_default();
    match token {
        "NaN" => return Some(f64::NAN),
        "Inf" | "+Inf" | "Infinity" | "+Infinity" => return Some(f64::INFINITY),
        "-Inf" | "-Infinity" => return Some(f64::NEG_INFINITY),
        _ => {}
    }

    let bytes = text.as_bytes();
    let mut end = 0;
    if matches!(bytes.first(), Some(b'+' | b'-')) {
        end = 1;
    }

    let integer_start = end;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    let mut mantissa_digits = end - integer_start;

    if end < bytes.len() && bytes[end] == b'.' {
        let mut cursor = end + 1;
        while cursor < bytes.len() && bytes[cursor].is_ascii_digit() {
            cursor += 1;
        }
        let fraction_digits = cursor - end - 1;
        if mantissa_digits + fraction_digits > 0 {
            mantissa_digits += fraction_digits;
            end = cursor;
        }
    }
    if mantissa_digits == 0 {
        return None;
    }

    if end < bytes.len() && matches!(bytes[end], b'e' | b'E') {
        let mut cursor = end + 1;
        if cursor < bytes.len() && matches!(bytes[cursor], b'+' | b'-') {
            cursor += 1;
        }
        let exponent_start = cursor;
        while cursor < bytes.len() && bytes[cursor].is_ascii_digit() {
            cursor += 1;
        }
        if cursor > exponent_start {
            end = cursor;
        }
    }

    text[..end].parse().ok()
}

fn parse_label_block(block: &str) -> Vec<(String, String)> {
    let mut labels = Vec::new();
    let mut chars = block.chars().peekable();
    loop {
        while chars.next_if(|c| *c == ',' || c.is_whitespace()).is_some() {}
        if chars.peek().is_none() {
            break;
        }

        let mut key = String::new();
        while let Some(c) = chars.next_if(|c| *c != '=' && *c != ',') {
            key.push(c);
        }
        if chars.next() != Some('=') || key.trim().is_empty() {
            break;
        }
        if chars.next() != Some('"') {
            break;
        }

        let mut value = String::new();
        let mut closed = false;
        while let Some(c) = chars.next() {
            match c {
                '\\' => match chars.next() {
                    Some('n') => value.push('\n'),
                    Some(escaped) => value.push(escaped),
                    None => break,
                },
                '"' => {
                    closed = true;
                    break;
                }
                other => value.push(other),
            }
        }
        if !closed {
            break;
        }
        labels.push((key.trim().to_string(), value));
    }
    labels
}
