//! Cumulative force statistics.

use serde::Serialize;
use std::fmt::Write as _;

/// Cumulative force counters for one log instance.
///
/// These accumulate from `start()` until the log is dropped. A force is one
/// write of the pending buffer followed by the configured sync; records that
/// ride along on another thread's force count toward `grouped_waits`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ForceCounters {
    /// Total forces performed
    pub forces: u64,
    /// Total nanoseconds spent writing and syncing in forces
    pub force_nanos: u64,
    /// Slowest single force in nanoseconds
    pub max_force_nanos: u64,
    /// Total bytes made durable by forces
    pub bytes_forced: u64,
    /// Total records written
    pub records_written: u64,
    /// Waits satisfied by a force some other thread performed
    pub grouped_waits: u64,
    /// Times the writer advanced to the next ring file
    pub file_switches: u64,
}

impl ForceCounters {
    /// Account for one completed force.
    pub fn record_force(&mut self, nanos: u64, bytes: u64, records: u64) {
        self.forces += 1;
        self.force_nanos += nanos;
        self.max_force_nanos = self.max_force_nanos.max(nanos);
        self.bytes_forced += bytes;
        self.records_written += records;
    }

    /// Average force time in microseconds (0 before the first force).
    pub fn average_force_micros(&self) -> u64 {
        if self.forces == 0 {
            return 0;
        }
        self.force_nanos / 1_000 / self.forces
    }

    /// Average bytes per force (0 before the first force).
    pub fn average_bytes_per_force(&self) -> u64 {
        if self.forces == 0 {
            return 0;
        }
        self.bytes_forced / self.forces
    }

    /// Render as the XML fragment embedded in structured reports.
    pub fn to_xml(&self) -> String {
        let mut out = String::with_capacity(256);
        out.push_str("<log-stats>");
        let _ = write!(out, "<forces>{}</forces>", self.forces);
        let _ = write!(out, "<records>{}</records>", self.records_written);
        let _ = write!(out, "<bytes-forced>{}</bytes-forced>", self.bytes_forced);
        let _ = write!(
            out,
            "<average-force-time-micros>{}</average-force-time-micros>",
            self.average_force_micros()
        );
        let _ = write!(
            out,
            "<max-force-time-micros>{}</max-force-time-micros>",
            self.max_force_nanos / 1_000
        );
        let _ = write!(
            out,
            "<average-bytes-per-force>{}</average-bytes-per-force>",
            self.average_bytes_per_force()
        );
        let _ = write!(out, "<grouped-waits>{}</grouped-waits>", self.grouped_waits);
        let _ = write!(out, "<file-switches>{}</file-switches>", self.file_switches);
        out.push_str("</log-stats>");
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_averages_zero_before_first_force() {
        let counters = ForceCounters::default();
        assert_eq!(counters.average_force_micros(), 0);
        assert_eq!(counters.average_bytes_per_force(), 0);
    }

    #[test]
    fn test_record_force_accumulates() {
        let mut counters = ForceCounters::default();
        counters.record_force(3_000, 100, 2);
        counters.record_force(5_000, 300, 3);
        assert_eq!(counters.forces, 2);
        assert_eq!(counters.records_written, 5);
        assert_eq!(counters.max_force_nanos, 5_000);
        assert_eq!(counters.average_force_micros(), 4);
        assert_eq!(counters.average_bytes_per_force(), 200);
    }

    #[test]
    fn test_xml_fragment() {
        let mut counters = ForceCounters::default();
        counters.record_force(2_000, 64, 1);
        let xml = counters.to_xml();
        assert!(xml.starts_with("<log-stats>"));
        assert!(xml.ends_with("</log-stats>"));
        assert!(xml.contains("<forces>1</forces>"));
        assert!(xml.contains("<average-force-time-micros>2</average-force-time-micros>"));
        assert!(xml.contains("<average-bytes-per-force>64</average-bytes-per-force>"));
    }
}
