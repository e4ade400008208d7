use log::warn;

/// Inclusive 1-based numeric intervals parsed from a textual range spec
/// like `"1,4,5-8"`. Malformed pieces are skipped with a warning.
#[derive(Clone, Debug, Default)]
pub struct IntervalFilter {
    intervals: Vec<(usize, usize)>,
}

impl IntervalFilter {
    pub fn from_spec(spec: &str) -> Self {
        let mut intervals = Vec::new();
        for piece in spec.split(',') {
            let piece = piece.trim();
            if piece.is_empty() {
                continue;
            }
            if let Some((lo, hi)) = piece.split_once('-') {
                match (lo.trim().parse::<usize>(), hi.trim().parse::<usize>()) {
                    (Ok(lo), Ok(hi)) if lo <= hi => intervals.push((lo, hi)),
                    _ => warn!("skipping malformed interval '{piece}'"),
                }
            } else {
                match piece.parse::<usize>() {
                    Ok(n) => intervals.push((n, n)),
                    Err(_) => warn!("skipping malformed interval '{piece}'"),
                }
            }
        }
        Self { intervals }
    }

    pub fn is_empty(&self) -> bool {
        self.intervals.is_empty()
    }

    pub fn is_number_included(&self, n: usize) -> bool {
        self.intervals.iter().any(|&(lo, hi)| n >= lo && n <= hi)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_singles_and_ranges() {
        let filter = IntervalFilter::from_spec("1,4,5-8");
        assert!(filter.is_number_included(1));
        assert!(!filter.is_number_included(2));
        assert!(filter.is_number_included(4));
        assert!(filter.is_number_included(6));
        assert!(filter.is_number_included(8));
        assert!(!filter.is_number_included(9));
    }

    #[test]
    fn malformed_pieces_are_skipped() {
        let filter = IntervalFilter::from_spec("a,3-2, 5 ,7-9");
        assert!(!filter.is_number_included(2));
        assert!(filter.is_number_included(5));
        assert!(filter.is_number_included(8));
    }
}
