/// One end of a range scan
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanTerm {
    pub term: String,
    pub exclusive: bool,
}

impl ScanTerm {
    pub fn inclusive(term: impl Into<String>) -> Self {
        Self {
            term: term.into(),
            exclusive: false,
        }
    }

    pub fn exclusive(term: impl Into<String>) -> Self {
        Self {
            term: term.into(),
            exclusive: true,
        }
    }
}

/// Which documents a scan visits
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanType {
    /// Ids between `from` and `to`, unbounded where `None`
    Range {
        from: Option<ScanTerm>,
        to: Option<ScanTerm>,
    },
    /// Ids starting with the prefix
    Prefix(String),
    /// Up to `limit` random documents. A seed makes the selection repeatable.
    Sample { limit: usize, seed: Option<u64> },
}

impl ScanType {
    /// Every document in the collection
    pub fn range() -> Self {
        ScanType::Range {
            from: None,
            to: None,
        }
    }

    pub fn prefix(prefix: impl Into<String>) -> Self {
        ScanType::Prefix(prefix.into())
    }

    pub fn sample(limit: usize) -> Self {
        ScanType::Sample { limit, seed: None }
    }

    /// Does `id` fall inside a range or prefix scan. Samples match everything.
    pub fn matches(&self, id: &str) -> bool {
        match self {
            ScanType::Range { from, to } => {
                let after_from = match from {
                    Some(ScanTerm { term, exclusive }) if *exclusive => id > term.as_str(),
                    Some(ScanTerm { term, .. }) => id >= term.as_str(),
                    None => true,
                };
                let before_to = match to {
                    Some(ScanTerm { term, exclusive }) if *exclusive => id < term.as_str(),
                    Some(ScanTerm { term, .. }) => id <= term.as_str(),
                    None => true,
                };
                after_from && before_to
            }
            ScanType::Prefix(prefix) => id.starts_with(prefix.as_str()),
            ScanType::Sample { .. } => true,
        }
    }
}
