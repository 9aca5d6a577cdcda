// Emitted event records. Persistence is external: accepted events are handed
// to an `EventSink`, and how records are stored is up to the caller.

use serde::{Deserialize, Serialize};

use crate::primitive::Face;

/// One reaction product detected in one detector.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProductHit {
    /// Index of the struck detector in the setup order
    pub detector: usize,
    /// Estimated interaction point inside the detector (m, global)
    pub position: [f64; 3],
    /// Lab polar angle (deg)
    pub lab_theta: f64,
    /// Lab azimuthal angle (deg)
    pub lab_phi: f64,
    /// Energy-deposit proxy (MeV)
    pub qdc: f64,
    /// Time of flight from the reaction point (ns)
    pub tof: f64,
    /// First face struck
    pub face: Face,
    /// Face-local coordinates of the primary hit (m)
    pub local: [f64; 3],
}

/// One accepted event.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct EventRecord {
    /// Beam kinetic energy at the reaction point (MeV)
    pub reaction_energy: f64,
    /// Reaction point inside the target (m, global)
    pub interaction: [f64; 3],
    /// Straggled beam trajectory at the reaction point (unit)
    pub trajectory: [f64; 3],
    pub eject_hits: Vec<ProductHit>,
    pub recoil_hits: Vec<ProductHit>,
}

/// Consumer of accepted events.
pub trait EventSink {
    fn emit(&mut self, record: EventRecord);
}

/// In-memory sink collecting every accepted event.
#[derive(Debug, Default)]
pub struct MemorySink {
    pub records: Vec<EventRecord>,
}

impl EventSink for MemorySink {
    fn emit(&mut self, record: EventRecord) {
        self.records.push(record);
    }
}

/// Sink that counts accepted events and drops the records.
#[derive(Debug, Default)]
pub struct CountingSink {
    pub accepted: u64,
}

impl EventSink for CountingSink {
    fn emit(&mut self, _record: EventRecord) {
        self.accepted += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_sink_collects() {
        let mut sink = MemorySink::default();
        sink.emit(EventRecord {
            reaction_energy: 5.0,
            ..Default::default()
        });
        sink.emit(EventRecord::default());
        assert_eq!(sink.records.len(), 2);
        assert_eq!(sink.records[0].reaction_energy, 5.0);
    }

    #[test]
    fn test_counting_sink() {
        let mut sink = CountingSink::default();
        for _ in 0..7 {
            sink.emit(EventRecord::default());
        }
        assert_eq!(sink.accepted, 7);
    }
}
