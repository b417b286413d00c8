//! Draw-by-repetition tracking: a counter over canonical position
//! hashes (occupancy, side to move, castling rights, en-passant
//! target), not notation matching.

pub struct RepetitionTracker {
    history: Vec<u64>,
}

impl RepetitionTracker {
    pub fn new(initial: u64) -> RepetitionTracker {
        RepetitionTracker {
            history: vec![initial],
        }
    }

    /// Records a position and reports whether it has now occurred
    /// three times.
    pub fn record(&mut self, hash: u64) -> bool {
        self.history.push(hash);
        self.occurrences(hash) >= 3
    }

    pub fn occurrences(&self, hash: u64) -> usize {
        self.history.iter().filter(|&&h| h == hash).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn third_occurrence_reports_the_draw() {
        let mut tracker = RepetitionTracker::new(1);
        assert!(!tracker.record(2));
        assert!(!tracker.record(1)); // second time
        assert!(!tracker.record(3));
        assert!(tracker.record(1)); // third time
        assert_eq!(tracker.occurrences(1), 3);
        assert_eq!(tracker.occurrences(2), 1);
    }
}
