//! Paths into a document, as produced by [`crate::diff`].
//!
//! A path starts with the document id and continues with `.field`,
//! `["key"]` and `[index]` segments:
//! `3f2c….children["contact"][0].values[2].value`.

use std::fmt;
use std::str::FromStr;

use serde_json::Value;

use crate::error::{OpenGeoError, OpenGeoResult};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Field(String),
    Key(String),
    Index(usize),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentPath {
    pub root: String,
    pub segments: Vec<Segment>,
}

impl DocumentPath {
    /// Read the value this path points at inside `doc`.
    pub fn get<'a>(&self, doc: &'a Value) -> Option<&'a Value> {
        self.segments
            .iter()
            .try_fold(doc, |node, segment| match segment {
                Segment::Field(name) | Segment::Key(name) => node.get(name.as_str()),
                Segment::Index(i) => node.get(*i),
            })
    }

    /// Overwrite the value this path points at. The slot must exist.
    pub fn set(&self, doc: &mut Value, value: Value) -> OpenGeoResult<()> {
        let mut node = doc;
        for segment in &self.segments {
            node = match segment {
                Segment::Field(name) | Segment::Key(name) => node.get_mut(name.as_str()),
                Segment::Index(i) => node.get_mut(*i),
            }
            .ok_or_else(|| OpenGeoError::validation(format!("le chemin « {self} » n'existe pas")))?;
        }
        *node = value;
        Ok(())
    }
}

fn malformed(path: &str, reason: &str) -> OpenGeoError {
    OpenGeoError::validation(format!("chemin « {path} » mal formé : {reason}"))
}

impl FromStr for DocumentPath {
    type Err = OpenGeoError;

    fn from_str(path: &str) -> Result<Self, Self::Err> {
        let root_end = path.find(['.', '[']).unwrap_or(path.len());
        let root = &path[..root_end];
        if root.is_empty() {
            return Err(malformed(path, "identifiant du document manquant"));
        }

        let mut segments = Vec::new();
        let mut rest = &path[root_end..];
        while !rest.is_empty() {
            if let Some(after_dot) = rest.strip_prefix('.') {
                let end = after_dot.find(['.', '[']).unwrap_or(after_dot.len());
                let name = &after_dot[..end];
                if name.is_empty() {
                    return Err(malformed(path, "nom de champ vide"));
                }
                segments.push(Segment::Field(name.to_string()));
                rest = &after_dot[end..];
            } else if let Some(inner) = rest.strip_prefix("[\"") {
                let close = closing_quote(inner).ok_or_else(|| malformed(path, "clé non terminée"))?;
                let quoted = &rest[1..close + 3];
                let key: String = serde_json::from_str(quoted)
                    .map_err(|_| malformed(path, "échappement de clé invalide"))?;
                rest = rest[close + 3..]
                    .strip_prefix(']')
                    .ok_or_else(|| malformed(path, "']' attendu après la clé"))?;
                segments.push(Segment::Key(key));
            } else if let Some(inner) = rest.strip_prefix('[') {
                let end = inner
                    .find(']')
                    .ok_or_else(|| malformed(path, "index non terminé"))?;
                let index = inner[..end]
                    .parse::<usize>()
                    .map_err(|_| malformed(path, "l'index n'est pas un nombre"))?;
                segments.push(Segment::Index(index));
                rest = &inner[end + 1..];
            } else {
                return Err(malformed(path, "caractère inattendu"));
            }
        }

        Ok(Self {
            root: root.to_string(),
            segments,
        })
    }
}

/// Byte offset in `s` of the first unescaped `"`.
fn closing_quote(s: &str) -> Option<usize> {
    let mut escaped = false;
    for (i, c) in s.char_indices() {
        match c {
            '\\' if !escaped => escaped = true,
            '"' if !escaped => return Some(i),
            _ => escaped = false,
        }
    }
    None
}

impl fmt::Display for DocumentPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.root)?;
        for segment in &self.segments {
            match segment {
                Segment::Field(name) => write!(f, ".{name}")?,
                Segment::Key(key) => write!(f, "[{}]", Value::String(key.clone()))?,
                Segment::Index(i) => write!(f, "[{i}]")?,
            }
        }
        Ok(())
    }
}
