//! The fixed list of request targets.

use crate::{LoadError, LoadResult};
use hyper::Uri;

/// Ordered, non-empty list of absolute HTTP URLs. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetCatalog {
    targets: Vec<String>,
}

impl TargetCatalog {
    pub fn new<I, S>(targets: I) -> LoadResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let targets: Vec<String> = targets.into_iter().map(Into::into).collect();
        if targets.is_empty() {
            return Err(LoadError::EmptyCatalog);
        }

        for target in &targets {
            validate_target(target)?;
        }

        Ok(Self { targets })
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    /// Always false; kept for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.targets.get(index).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.targets.iter().map(String::as_str)
    }
}

fn validate_target(target: &str) -> LoadResult<()> {
    let invalid = |reason: &str| LoadError::InvalidTarget {
        target: target.to_string(),
        reason: reason.to_string(),
    };

    let uri = target.parse::<Uri>().map_err(|e| invalid(&e.to_string()))?;

    match uri.scheme_str() {
        Some("http") => {}
        Some(other) => return Err(invalid(&format!("unsupported scheme '{}'", other))),
        None => return Err(invalid("missing scheme")),
    }

    if uri.authority().is_none() {
        return Err(invalid("missing host"));
    }

    Ok(())
}
