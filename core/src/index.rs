use crate::catalog::{Catalog, Record};
use crate::tokenizer::analyze;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};

/// The text-bearing fields of a record, highest-signal first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Field {
    Name,
    Title,
    Topics,
    Description,
}

impl Field {
    pub const ALL: [Field; 4] = [Field::Name, Field::Title, Field::Topics, Field::Description];

    pub fn text(self, record: &Record) -> String {
        match self {
            Field::Name => record.name.clone(),
            Field::Title => record.title.clone(),
            Field::Topics => record.topics_text(),
            Field::Description => record.description.clone(),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Field::Name => "name",
            Field::Title => "title",
            Field::Topics => "topics",
            Field::Description => "description",
        }
    }
}

/// Stemmed tokens of each field of one record.
#[derive(Debug, Clone, Default)]
pub struct AnalyzedRecord {
    pub fields: [Vec<String>; 4],
}

impl AnalyzedRecord {
    pub fn new(record: &Record) -> Self {
        Self { fields: Field::ALL.map(|f| analyze(f.text(record).as_str())) }
    }

    pub fn tokens(&self, field: Field) -> &[String] {
        &self.fields[field as usize]
    }
}

/// Corpus statistics derived from one catalog snapshot. Never mutated after
/// construction; a changed catalog gets a fresh index.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DocumentIndex {
    pub document_frequency: HashMap<String, u32>,
    pub average_field_length: BTreeMap<Field, f64>,
    pub total_documents: usize,
}

impl DocumentIndex {
    pub fn df(&self, term: &str) -> u32 { self.document_frequency.get(term).copied().unwrap_or(0) }

    pub fn idf(&self, term: &str) -> f64 { idf(self.df(term), self.total_documents) }

    /// Average stemmed length of `field`, never below 1.
    pub fn avg_len(&self, field: Field) -> f64 {
        self.average_field_length.get(&field).copied().unwrap_or(1.0).max(1.0)
    }

    pub fn num_terms(&self) -> usize { self.document_frequency.len() }

    /// Terms ordered by descending document frequency, ties alphabetical.
    pub fn most_frequent(&self, n: usize) -> Vec<(&str, u32)> {
        let mut terms: Vec<(&str, u32)> = self.document_frequency.iter().map(|(t, df)| (t.as_str(), *df)).collect();
        terms.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        terms.truncate(n);
        terms
    }
}

/// Build the document-frequency and field-length statistics for a catalog.
pub fn build_index(catalog: &Catalog) -> DocumentIndex {
    let mut document_frequency: HashMap<String, u32> = HashMap::new();
    let mut field_totals = [0usize; 4];

    for record in catalog.records() {
        let analyzed = AnalyzedRecord::new(record);
        let mut seen_in_doc: HashSet<&str> = HashSet::new();
        for (slot, tokens) in analyzed.fields.iter().enumerate() {
            field_totals[slot] += tokens.len();
            seen_in_doc.extend(tokens.iter().map(String::as_str));
        }
        for term in seen_in_doc {
            *document_frequency.entry(term.to_string()).or_insert(0) += 1;
        }
    }

    let total_documents = catalog.len();
    let average_field_length = Field::ALL
        .iter()
        .zip(field_totals)
        .map(|(field, total)| {
            let avg = if total_documents == 0 { 0.0 } else { total as f64 / total_documents as f64 };
            (*field, avg.max(1.0))
        })
        .collect();

    tracing::info!(total_documents, num_terms = document_frequency.len(), "built document index");
    DocumentIndex { document_frequency, average_field_length, total_documents }
}

/// Smoothed inverse document frequency: `ln(1 + (N - df + 0.5) / (df + 0.5))`.
pub fn idf(df: u32, total_documents: usize) -> f64 {
    let n = total_documents as f64;
    let df = df as f64;
    (1.0 + (n - df + 0.5) / (df + 0.5)).ln()
}
