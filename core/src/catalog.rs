use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::io::{BufRead, Read};

/// One catalog entry. Every field has a defined default, so scoring code never
/// deals with missing or oddly typed values.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawRecord")]
pub struct Record {
    pub id: String,
    pub name: String,
    pub title: String,
    pub description: String,
    pub topics: Vec<String>,
    /// Always finite and within `[0, 1]`.
    pub quality: f64,
}

impl Record {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self { id: id.into(), name: name.into(), ..Self::default() }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self { self.title = title.into(); self }
    pub fn with_description(mut self, description: impl Into<String>) -> Self { self.description = description.into(); self }
    pub fn with_topics<I, S>(mut self, topics: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.topics = topics.into_iter().map(Into::into).collect();
        self
    }
    pub fn with_quality(mut self, quality: f64) -> Self { self.quality = clamp_quality(quality); self }

    /// Topics flattened into one text blob for tokenization.
    pub fn topics_text(&self) -> String { self.topics.join(" ") }
}

/// Loosely typed shape accepted on input; coerced into [`Record`].
#[derive(Deserialize)]
struct RawRecord {
    #[serde(default)]
    id: Option<Value>,
    #[serde(default, alias = "package_name")]
    name: Option<Value>,
    #[serde(default)]
    title: Option<Value>,
    #[serde(default)]
    description: Option<Value>,
    #[serde(default)]
    topics: Option<Value>,
    #[serde(default, alias = "quality_score", alias = "qualityScore")]
    quality: Option<Value>,
}

impl From<RawRecord> for Record {
    fn from(raw: RawRecord) -> Self {
        let name = text_of(raw.name.as_ref());
        let mut id = text_of(raw.id.as_ref());
        if id.trim().is_empty() { id = name.clone(); }
        Record {
            id: id.trim().to_string(),
            name,
            title: text_of(raw.title.as_ref()),
            description: text_of(raw.description.as_ref()),
            topics: topics_of(raw.topics.as_ref()),
            quality: quality_of(raw.quality.as_ref()),
        }
    }
}

fn text_of(v: Option<&Value>) -> String {
    match v {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        _ => String::new(),
    }
}

fn topics_of(v: Option<&Value>) -> Vec<String> {
    match v {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect(),
        Some(Value::String(s)) => s
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect(),
        _ => Vec::new(),
    }
}

fn quality_of(v: Option<&Value>) -> f64 {
    let raw = match v {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(s)) => s.trim().parse::<f64>().unwrap_or(0.0),
        _ => 0.0,
    };
    clamp_quality(raw)
}

/// Unicode case-insensitive equality, the folding used for names and ids.
pub(crate) fn same_name(a: &str, b: &str) -> bool {
    a == b || a.to_lowercase() == b.to_lowercase()
}

fn clamp_quality(q: f64) -> f64 {
    if q.is_finite() { q.clamp(0.0, 1.0) } else { 0.0 }
}

/// Ordered snapshot of records. The ranking engine only ever reads it.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Catalog {
    records: Vec<Record>,
}

impl Catalog {
    pub fn new(records: Vec<Record>) -> Self {
        let before = records.len();
        let records: Vec<Record> = records.into_iter().filter(|r| !r.id.is_empty()).collect();
        if records.len() < before {
            tracing::warn!(skipped = before - records.len(), "dropped records without an identifier");
        }
        Self { records }
    }

    pub fn records(&self) -> &[Record] { &self.records }
    pub fn len(&self) -> usize { self.records.len() }
    pub fn is_empty(&self) -> bool { self.records.is_empty() }

    pub fn get(&self, id: &str) -> Option<&Record> {
        self.records.iter().find(|r| r.id == id)
    }

    /// Look up a record by identifier, falling back to a case-insensitive match.
    pub fn resolve(&self, id: &str) -> Option<&Record> {
        let id = id.trim();
        self.get(id).or_else(|| self.records.iter().find(|r| same_name(&r.id, id)))
    }

    pub fn extend(&mut self, other: Catalog) { self.records.extend(other.records); }

    /// Parse a JSON document: an array of records, or an object holding one
    /// under `records` or `packages`, or a single record object.
    pub fn from_json_value(json: Value) -> Result<Self> {
        let items = match json {
            Value::Array(items) => items,
            Value::Object(mut obj) => match obj.remove("records").or_else(|| obj.remove("packages")) {
                Some(Value::Array(items)) => items,
                Some(_) => anyhow::bail!("`records` must be an array"),
                None => vec![Value::Object(obj)],
            },
            _ => anyhow::bail!("catalog must be a JSON array or object"),
        };
        let mut records = Vec::with_capacity(items.len());
        for (i, v) in items.into_iter().enumerate() {
            match serde_json::from_value::<Record>(v) {
                Ok(r) => records.push(r),
                Err(e) => tracing::warn!(index = i, error = %e, "skipping malformed record"),
            }
        }
        Ok(Self::new(records))
    }

    pub fn from_json_reader<R: Read>(reader: R) -> Result<Self> {
        let json: Value = serde_json::from_reader(reader).context("parsing catalog JSON")?;
        Self::from_json_value(json)
    }

    /// One record per line; blank lines are ignored.
    pub fn from_jsonl_reader<R: BufRead>(reader: R) -> Result<Self> {
        let mut records = Vec::new();
        for (lineno, line) in reader.lines().enumerate() {
            let line = line.with_context(|| format!("reading line {}", lineno + 1))?;
            if line.trim().is_empty() { continue; }
            let record: Record = serde_json::from_str(&line)
                .with_context(|| format!("parsing record on line {}", lineno + 1))?;
            records.push(record);
        }
        Ok(Self::new(records))
    }
}

impl From<Vec<Record>> for Catalog {
    fn from(records: Vec<Record>) -> Self { Self::new(records) }
}

impl FromIterator<Record> for Catalog {
    fn from_iter<I: IntoIterator<Item = Record>>(iter: I) -> Self { Self::new(iter.into_iter().collect()) }
}

/// Supplies the current catalog snapshot. Where it comes from is up to the
/// implementor.
pub trait CatalogSource {
    fn load(&self) -> Result<Catalog>;
}

impl CatalogSource for Catalog {
    fn load(&self) -> Result<Catalog> { Ok(self.clone()) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn coerces_loose_fields() {
        let r: Record = serde_json::from_value(json!({
            "package_name": "incidence",
            "title": 42,
            "description": null,
            "topics": ["epidemiology", 7, " outbreaks "],
            "quality_score": "0.8"
        }))
        .unwrap();
        assert_eq!(r.id, "incidence");
        assert_eq!(r.name, "incidence");
        assert_eq!(r.title, "42");
        assert_eq!(r.description, "");
        assert_eq!(r.topics, vec!["epidemiology", "outbreaks"]);
        assert!((r.quality - 0.8).abs() < 1e-12);
    }

    #[test]
    fn invalid_quality_is_zero_and_clamped() {
        let q = |v: Value| serde_json::from_value::<Record>(json!({"name": "x", "quality": v})).unwrap().quality;
        assert_eq!(q(json!("high")), 0.0);
        assert_eq!(q(json!({"nested": 1})), 0.0);
        assert_eq!(q(json!(7.5)), 1.0);
        assert_eq!(q(json!(-2)), 0.0);
        assert_eq!(Record::new("a", "a").with_quality(f64::NAN).quality, 0.0);
    }

    #[test]
    fn comma_separated_topics() {
        let r: Record = serde_json::from_value(json!({"name": "sf", "topics": "spatial, gis,,"})).unwrap();
        assert_eq!(r.topics, vec!["spatial", "gis"]);
    }

    #[test]
    fn records_without_id_are_dropped() {
        let c = Catalog::from_json_value(json!([{"title": "orphan"}, {"name": "dplyr"}, 3])).unwrap();
        assert_eq!(c.len(), 1);
        assert_eq!(c.records()[0].id, "dplyr");
    }

    #[test]
    fn wrapped_and_jsonl_forms() {
        let c = Catalog::from_json_value(json!({"packages": [{"name": "a"}, {"name": "b"}]})).unwrap();
        assert_eq!(c.len(), 2);
        let text = "{\"name\":\"a\"}\n\n{\"id\":\"b-id\",\"name\":\"b\"}\n";
        let c = Catalog::from_jsonl_reader(text.as_bytes()).unwrap();
        assert_eq!(c.records().iter().map(|r| r.id.as_str()).collect::<Vec<_>>(), vec!["a", "b-id"]);
        assert!(Catalog::from_jsonl_reader("{not json}".as_bytes()).is_err());
    }

    #[test]
    fn resolve_is_case_insensitive() {
        let c: Catalog = vec![Record::new("ggplot2", "ggplot2")].into();
        assert_eq!(c.resolve("GGPlot2").map(|r| r.id.as_str()), Some("ggplot2"));
        assert!(c.resolve("plotly").is_none());

        let c: Catalog = vec![Record::new("Ärzte", "Ärzte"), Record::new("Öffi", "Öffi")].into();
        assert_eq!(c.resolve("ärzte").map(|r| r.id.as_str()), Some("Ärzte"));
        assert_eq!(c.resolve(" ÖFFI ").map(|r| r.id.as_str()), Some("Öffi"));
    }
}
