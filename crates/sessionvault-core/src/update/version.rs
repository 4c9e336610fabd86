use std::cmp::Ordering;

/// Dotted version decomposed into integers.
///
/// Comparison pads the shorter tuple with trailing zeros, so `2.0` and
/// `2.0.0` are equal.
#[derive(Debug, Clone)]
pub struct VersionTuple(Vec<u64>);

impl VersionTuple {
    /// Parse leniently: everything but ASCII digits and `.` is dropped, and
    /// empty or overflowing segments read as 0.
    pub fn parse(version: &str) -> Self {
        let cleaned: String = version
            .chars()
            .filter(|c| c.is_ascii_digit() || *c == '.')
            .collect();
        let segments = cleaned
            .split('.')
            .map(|segment| segment.parse::<u64>().unwrap_or(0))
            .collect();
        Self(segments)
    }

    pub fn segments(&self) -> &[u64] {
        &self.0
    }

    fn segment(&self, idx: usize) -> u64 {
        self.0.get(idx).copied().unwrap_or(0)
    }
}

impl Ord for VersionTuple {
    fn cmp(&self, other: &Self) -> Ordering {
        let len = self.0.len().max(other.0.len());
        (0..len)
            .map(|idx| self.segment(idx).cmp(&other.segment(idx)))
            .find(|ord| ord.is_ne())
            .unwrap_or(Ordering::Equal)
    }
}

impl PartialOrd for VersionTuple {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for VersionTuple {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for VersionTuple {}

/// True only when `candidate` is strictly newer than `current`
pub fn is_newer(candidate: &str, current: &str) -> bool {
    VersionTuple::parse(candidate) > VersionTuple::parse(current)
}
