use std::fmt;

/// Surrogate join key for one player across seasons.
///
/// The raw league tables carry no stable player id, only display names,
/// so every join in this crate is keyed on `PlayerId` instead of the raw
/// string. A richer resolver (e.g. one backed by league-assigned ids) can
/// be swapped in without touching the pipeline code.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PlayerId(String);

impl PlayerId {
    pub fn from_norm(norm: impl Into<String>) -> Self {
        Self(norm.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

pub trait IdentityResolver {
    fn resolve(&self, display_name: &str) -> PlayerId;
}

/// Default resolver: normalized display name. Two distinct players who
/// share a name collapse to one id; the season loader keeps the
/// higher-scoring entry when that happens.
#[derive(Debug, Clone, Copy, Default)]
pub struct NameIdentity;

impl IdentityResolver for NameIdentity {
    fn resolve(&self, display_name: &str) -> PlayerId {
        PlayerId(normalize_name(display_name))
    }
}

pub fn normalize_name(input: &str) -> String {
    let lower = input.trim().to_ascii_lowercase();
    let mut out = String::with_capacity(lower.len());
    let mut prev_us = false;
    for ch in lower.chars() {
        if ch.is_ascii_alphanumeric() {
            out.push(ch);
            prev_us = false;
        } else if !prev_us && !out.is_empty() {
            out.push('_');
            prev_us = true;
        }
    }
    while out.ends_with('_') {
        out.pop();
    }
    out
}
