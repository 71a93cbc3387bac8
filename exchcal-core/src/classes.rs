//! Subject classification.
//!
//! A `RegexMap` is an ordered list of `label -> pattern` pairs. An event
//! subject is labelled with the first label whose pattern matches anywhere in
//! it (case-insensitive), or left unlabelled.

use regex::{Regex, RegexBuilder};

use crate::error::{ExchError, ExchResult};

/// Classes used when no regex map is configured.
pub const DEFAULT_CLASSES: &[(&str, &str)] = &[
    ("SICK", "(sick|doctor|dr. appt)"),
    (
        "VACATION",
        "(vacation|OOTO|OOO|out of the office|out of office)",
    ),
];

#[derive(Debug, Clone)]
pub struct RegexMap {
    classes: Vec<(String, Regex)>,
}

impl RegexMap {
    pub fn from_pairs<L, P, I>(pairs: I) -> ExchResult<Self>
    where
        L: Into<String>,
        P: AsRef<str>,
        I: IntoIterator<Item = (L, P)>,
    {
        let classes = pairs
            .into_iter()
            .map(|(label, pattern)| {
                let label = label.into();
                RegexBuilder::new(pattern.as_ref())
                    .case_insensitive(true)
                    .build()
                    .map(|re| (label.clone(), re))
                    .map_err(|source| ExchError::Regex { label, source })
            })
            .collect::<ExchResult<Vec<_>>>()?;

        if classes.is_empty() {
            return Err(ExchError::Config("Regex map has no classes".into()));
        }

        Ok(Self { classes })
    }

    /// Parse a JSON object of `label: pattern`, keeping document order.
    pub fn from_json(json: &str) -> ExchResult<Self> {
        let value: serde_json::Value = serde_json::from_str(json)?;
        let object = value.as_object().ok_or_else(|| {
            ExchError::Config("Regex map must be a JSON object of label -> pattern".into())
        })?;

        let pairs = object
            .iter()
            .map(|(label, pattern)| match pattern.as_str() {
                Some(p) => Ok((label.clone(), p.to_string())),
                None => Err(ExchError::Config(format!(
                    "Pattern for class '{label}' must be a string"
                ))),
            })
            .collect::<ExchResult<Vec<_>>>()?;

        Self::from_pairs(pairs)
    }

    /// Label of the first class matching `subject`.
    pub fn classify(&self, subject: &str) -> Option<&str> {
        self.classes
            .iter()
            .find(|(_, re)| re.is_match(subject))
            .map(|(label, _)| label.as_str())
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.classes.iter().map(|(label, _)| label.as_str())
    }

    pub fn patterns(&self) -> impl Iterator<Item = (&str, &str)> {
        self.classes
            .iter()
            .map(|(label, re)| (label.as_str(), re.as_str()))
    }
}

impl Default for RegexMap {
    fn default() -> Self {
        let classes = DEFAULT_CLASSES
            .iter()
            .filter_map(|(label, pattern)| {
                RegexBuilder::new(pattern)
                    .case_insensitive(true)
                    .build()
                    .ok()
                    .map(|re| (label.to_string(), re))
            })
            .collect();
        Self { classes }
    }
}
