//! Loading and rendering of pipeline and catalog documents.
//!
//! Documents are JSON when the path ends in `.json` and YAML otherwise.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;
use serde::de::DeserializeOwned;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Json,
    Yaml,
}

impl DocumentFormat {
    pub fn for_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => DocumentFormat::Json,
            _ => DocumentFormat::Yaml,
        }
    }
}

pub fn parse_str<T: DeserializeOwned>(input: &str, format: DocumentFormat) -> Result<T> {
    match format {
        DocumentFormat::Json => serde_json::from_str(input).context("Parsing JSON document"),
        DocumentFormat::Yaml => serde_yaml::from_str(input).context("Parsing YAML document"),
    }
}

pub fn load_from_path<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let file = File::open(path).with_context(|| format!("Opening document {path:?}"))?;
    let mut reader = BufReader::new(file);
    let mut raw = String::new();
    reader
        .read_to_string(&mut raw)
        .with_context(|| format!("Reading document {path:?}"))?;
    parse_str(&raw, DocumentFormat::for_path(path))
}

pub fn to_json_string<T: Serialize>(value: &T) -> Result<String> {
    serde_json::to_string_pretty(value).context("Serializing JSON document")
}
