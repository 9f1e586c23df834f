use std::collections::BTreeMap;
use std::path::Path;

use crate::core::errors::{DetectionError, DetectionResult};

/// Class-index to name mapping of a detection model
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClassNames(BTreeMap<usize, String>);

impl ClassNames {
    pub fn new(names: impl IntoIterator<Item = (usize, String)>) -> Self {
        Self(names.into_iter().collect())
    }

    /// Names in index order, starting at 0
    pub fn from_list<S: Into<String>>(names: impl IntoIterator<Item = S>) -> Self {
        Self::new(names.into_iter().map(Into::into).enumerate())
    }

    /// Read a labels file: one class name per non-empty line, in index order
    pub fn from_file(path: &Path) -> DetectionResult<Self> {
        let contents =
            std::fs::read_to_string(path).map_err(|source| DetectionError::LabelsUnreadable {
                path: path.display().to_string(),
                source,
            })?;

        Ok(Self::from_list(
            contents
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty()),
        ))
    }

    /// Parse the `names` entry that YOLO exporters write into ONNX
    /// metadata, e.g. `{0: 'A', 1: 'B', 2: "it's"}`.
    ///
    /// Returns `None` if the string is not in that shape.
    pub fn from_metadata(raw: &str) -> Option<Self> {
        let inner = raw.trim().strip_prefix('{')?.strip_suffix('}')?;
        let mut chars = inner.chars().peekable();
        let mut names = BTreeMap::new();

        loop {
            while chars.next_if(|c| c.is_whitespace() || *c == ',').is_some() {}
            if chars.peek().is_none() {
                break;
            }

            let mut index = String::new();
            while let Some(digit) = chars.next_if(char::is_ascii_digit) {
                index.push(digit);
            }
            let index: usize = index.parse().ok()?;

            while chars.next_if(|c| c.is_whitespace()).is_some() {}
            chars.next_if_eq(&':')?;
            while chars.next_if(|c| c.is_whitespace()).is_some() {}

            let quote = chars.next_if(|c| *c == '\'' || *c == '"')?;
            let mut name = String::new();
            loop {
                match chars.next()? {
                    '\\' => name.push(chars.next()?),
                    c if c == quote => break,
                    c => name.push(c),
                }
            }

            names.insert(index, name);
        }

        Some(Self(names))
    }

    /// Name for `class_id`, or the index itself if the model has none
    pub fn resolve(&self, class_id: usize) -> String {
        self.0
            .get(&class_id)
            .cloned()
            .unwrap_or_else(|| class_id.to_string())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
