//! Merges the server's met/missing verdict with the user's corrections.

use std::fmt;

/// Percentage of requirements met.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Score {
    /// Rounded to one decimal place. May exceed 100 when the user marks
    /// labels the server never listed.
    Percent(f64),
    /// The server listed no requirements.
    NotApplicable,
}

impl Score {
    pub fn percent(&self) -> Option<f64> {
        match self {
            Score::Percent(p) => Some(*p),
            Score::NotApplicable => None,
        }
    }
}

impl fmt::Display for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Score::Percent(p) => write!(f, "{p:.1}"),
            Score::NotApplicable => f.write_str("N/A"),
        }
    }
}

/// Ordered, deduplicated label list. Requirement lists are short, so a
/// linear scan beats hashing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Labels(Vec<String>);

impl Labels {
    fn contains(&self, label: &str) -> bool {
        self.0.iter().any(|l| l == label)
    }

    fn insert(&mut self, label: &str) {
        if !self.contains(label) {
            self.0.push(label.to_string());
        }
    }

    fn remove(&mut self, label: &str) {
        self.0.retain(|l| l != label);
    }

    fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    fn clear(&mut self) {
        self.0.clear();
    }
}

/// The server baseline plus user overrides.
///
/// Overrides win over the baseline, and a label is never both effectively
/// met and effectively missing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatchReconciler {
    server_met: Labels,
    server_missing: Labels,
    user_met: Labels,
    user_missing: Labels,
}

impl MatchReconciler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the baseline and drop every override.
    ///
    /// Duplicates collapse to their first occurrence. A label the server
    /// lists as both met and missing counts as met.
    pub fn set_server_result<M, N>(&mut self, met: M, missing: N)
    where
        M: IntoIterator,
        M::Item: AsRef<str>,
        N: IntoIterator,
        N::Item: AsRef<str>,
    {
        self.reset();
        for label in met {
            self.server_met.insert(label.as_ref());
        }
        for label in missing {
            let label = label.as_ref();
            if !self.server_met.contains(label) {
                self.server_missing.insert(label);
            }
        }
        tracing::debug!(
            met = self.server_met.0.len(),
            missing = self.server_missing.0.len(),
            "server result applied"
        );
    }

    pub fn mark_met(&mut self, label: &str) {
        self.user_missing.remove(label);
        self.user_met.insert(label);
    }

    pub fn mark_missing(&mut self, label: &str) {
        self.user_met.remove(label);
        self.user_missing.insert(label);
    }

    /// Server-met labels first, then user-added ones, minus anything the
    /// user marked missing.
    pub fn effective_met(&self) -> Vec<String> {
        merge(&self.server_met, &self.user_met, &self.user_missing)
    }

    pub fn effective_missing(&self) -> Vec<String> {
        merge(&self.server_missing, &self.user_missing, &self.user_met)
    }

    /// Every label the server listed. Overrides never add to this.
    pub fn total_requirements(&self) -> Vec<String> {
        let mut all = self.server_met.clone();
        for label in self.server_missing.iter() {
            all.insert(label);
        }
        all.0
    }

    /// Effective-met count over the server's requirement count.
    ///
    /// Labels outside the server baseline count toward the numerator only.
    pub fn score(&self) -> Score {
        let total = self.total_requirements().len();
        if total == 0 {
            return Score::NotApplicable;
        }
        let ratio = self.effective_met().len() as f64 / total as f64 * 100.0;
        Score::Percent((ratio * 10.0).round() / 10.0)
    }

    pub fn is_overridden(&self, label: &str) -> bool {
        self.user_met.contains(label) || self.user_missing.contains(label)
    }

    /// Drop the baseline and every override.
    pub fn reset(&mut self) {
        self.server_met.clear();
        self.server_missing.clear();
        self.user_met.clear();
        self.user_missing.clear();
    }
}

fn merge(server: &Labels, added: &Labels, excluded: &Labels) -> Vec<String> {
    server
        .iter()
        .chain(added.iter().filter(|l| !server.contains(l)))
        .filter(|l| !excluded.contains(l))
        .map(str::to_string)
        .collect()
}
