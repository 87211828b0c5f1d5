//! Label set fingerprinting and registry key composition.
//!
//! A label set is an unordered mapping, so the fingerprint is computed over
//! the pairs sorted by label name. Names and values are each terminated by
//! `0xFF`, a byte that never occurs in UTF-8, so no two distinct label sets
//! produce the same hashed input.

use std::collections::HashMap;
use std::fmt;

use sha2::{Digest, Sha256};

/// Label name to label value.
pub type Labels = HashMap<String, String>;

const SEPARATOR: u8 = 0xFF;

/// Fixed-width digest of a normalized label set.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Width of the hex rendering, in characters.
    pub const WIDTH: usize = 64;

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Computes the fingerprint of a label set.
///
/// The result does not depend on insertion order. The empty set hashes the
/// empty input, which acts as the sentinel for "no labels".
pub fn fingerprint(labels: &Labels) -> Fingerprint {
    let mut pairs: Vec<(&String, &String)> = labels.iter().collect();
    pairs.sort_unstable_by(|a, b| a.0.cmp(b.0));

    let mut hasher = Sha256::new();
    for (name, value) in pairs {
        hasher.update(name.as_bytes());
        hasher.update([SEPARATOR]);
        hasher.update(value.as_bytes());
        hasher.update([SEPARATOR]);
    }
    Fingerprint(format!("{:x}", hasher.finalize()))
}

/// Combines a metric name and a label fingerprint into a registry key.
pub fn compound_key(name: &str, fingerprint: &Fingerprint) -> String {
    format!("{}:{}", name, fingerprint)
}

/// Builds a `Labels` map from borrowed pairs.
pub fn labels_from<'a, I>(pairs: I) -> Labels
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    pairs
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}
