//! Reading and writing `---` delimited YAML front matter.

use std::sync::OnceLock;

use regex::{Regex, RegexBuilder};
use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq)]
pub struct Document<T> {
    pub header: T,
    pub body: String,
}

#[derive(Error, Debug)]
pub enum FrontMatterError {
    #[error("missing front matter block")]
    MissingFence,

    #[error("malformed front matter: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

fn header_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        RegexBuilder::new(r"\A\x{FEFF}?---[ \t]*\r?\n(.*?)^---[ \t]*(?:\r?\n|\z)(.*)\z")
            .dot_matches_new_line(true)
            .multi_line(true)
            .build()
            .expect("front matter pattern is valid")
    })
}

/// Split `content` into its header and body and deserialize the header.
pub fn parse<T: DeserializeOwned>(content: &str) -> Result<Document<T>, FrontMatterError> {
    let caps = header_pattern()
        .captures(content)
        .ok_or(FrontMatterError::MissingFence)?;
    let header = serde_yaml::from_str(&caps[1])?;
    Ok(Document {
        header,
        body: caps[2].to_string(),
    })
}

pub fn render<T: Serialize>(doc: &Document<T>) -> Result<String, serde_yaml::Error> {
    let yaml = serde_yaml::to_string(&doc.header)?;
    Ok(format!("---\n{yaml}---\n{}", doc.body))
}
