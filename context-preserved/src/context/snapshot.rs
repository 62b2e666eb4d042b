//! Snapshot values captured from the ambient context.

use std::collections::HashMap;
use std::fmt;

/// Marker for values a coordinator can hand out as snapshots.
///
/// A snapshot is an immutable copy of the ambient context at one instant.
/// Absence of context is expressed as `None` at the coordinator boundary, so
/// implementors need nothing beyond cloning and thread transfer.
pub trait Snapshot: Clone + Send + Sync + 'static {}

impl<T> Snapshot for T where T: Clone + Send + Sync + 'static {}

/// The key/value snapshot used by the mapped diagnostic context.
pub type ContextMap = HashMap<String, String>;

/// Builds a [`ContextMap`] from key/value pairs.
pub fn context_map<I, K, V>(pairs: I) -> ContextMap
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<String>,
{
    pairs
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect()
}

/// Renders a [`ContextMap`] as `{k1=v1, k2=v2}` with keys sorted.
#[derive(Debug, Clone, Copy)]
pub struct DisplayContext<'a>(pub &'a ContextMap);

impl fmt::Display for DisplayContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut entries: Vec<_> = self.0.iter().collect();
        entries.sort_by(|a, b| a.0.cmp(b.0));

        f.write_str("{")?;
        for (i, (key, value)) in entries.into_iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{key}={value}")?;
        }
        f.write_str("}")
    }
}
