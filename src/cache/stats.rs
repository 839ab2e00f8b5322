//! Cache Statistics Module
//!
//! Lookup outcome counters for the record cache.

use serde::Serialize;

// == Cache Stats ==
/// Monotonic cache counters plus derived ratios.
///
/// Counters only go back to zero through [`CacheStats::reset`]; clearing the
/// cache leaves them untouched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct CacheStats {
    /// Lookups served from a live entry
    pub hits: u64,
    /// Lookups that found nothing or an expired entry
    pub misses: u64,
    /// Entries dropped to make room for a new key
    pub evictions: u64,
    /// Live entries when the snapshot was taken
    pub total_entries: usize,
}

impl CacheStats {
    pub fn total_requests(&self) -> u64 {
        self.hits + self.misses
    }

    /// Fraction of lookups that were hits, `0.0` before the first lookup.
    pub fn hit_rate(&self) -> f64 {
        match self.total_requests() {
            0 => 0.0,
            total => self.hits as f64 / total as f64,
        }
    }

    pub(crate) fn record_lookup(&mut self, hit: bool) {
        if hit {
            self.hits += 1;
        } else {
            self.misses += 1;
        }
    }

    pub(crate) fn record_eviction(&mut self) {
        self.evictions += 1;
    }

    pub(crate) fn track_entries(&mut self, live: usize) {
        self.total_entries = live;
    }

    // == Reset ==
    /// Zeroes the counters. `total_entries` reflects live state and is kept.
    pub fn reset(&mut self) {
        *self = Self {
            total_entries: self.total_entries,
            ..Self::default()
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn after_lookups(outcomes: &[bool]) -> CacheStats {
        let mut stats = CacheStats::default();
        for &hit in outcomes {
            stats.record_lookup(hit);
        }
        stats
    }

    #[test]
    fn test_fresh_stats_report_zero_hit_rate() {
        let stats = CacheStats::default();
        assert_eq!(stats.total_requests(), 0);
        assert_eq!(stats.hit_rate(), 0.0);
    }

    #[test]
    fn test_hit_rate_counts_expired_reads_as_misses() {
        // two hits, then a read of an expired entry, then a cold key
        let stats = after_lookups(&[true, true, false, false]);

        assert_eq!(stats.hits, 2);
        assert_eq!(stats.misses, 2);
        assert_eq!(stats.total_requests(), 4);
        assert_eq!(stats.hit_rate(), 0.5);
    }

    #[test]
    fn test_hit_rate_stays_in_unit_interval() {
        assert_eq!(after_lookups(&[true; 3]).hit_rate(), 1.0);
        assert_eq!(after_lookups(&[false; 3]).hit_rate(), 0.0);
    }

    #[test]
    fn test_reset_keeps_entry_count() {
        let mut stats = after_lookups(&[true, false]);
        stats.record_eviction();
        stats.track_entries(7);

        stats.reset();

        assert_eq!(
            stats,
            CacheStats {
                total_entries: 7,
                ..CacheStats::default()
            }
        );
    }
}
