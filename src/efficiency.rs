// Intrinsic detector-efficiency lookup tables, one per detector size class.

use crate::primitive::DetectorKind;

/// A monotonic (energy, efficiency) table interpolated at query time.
/// Queries outside the tabulated energies clamp to the first/last value.
#[derive(Clone, Debug)]
pub struct EfficiencyTable {
    energy: Vec<f64>,
    efficiency: Vec<f64>,
}

impl EfficiencyTable {
    pub fn new(points: &[(f64, f64)]) -> Result<Self, String> {
        if points.is_empty() {
            return Err("efficiency table has no points".to_string());
        }
        for w in points.windows(2) {
            if w[1].0 <= w[0].0 {
                return Err(format!(
                    "efficiency table energies not strictly increasing at {}",
                    w[1].0
                ));
            }
        }
        for &(e, eff) in points {
            if !(0.0..=1.0).contains(&eff) {
                return Err(format!("efficiency {} at {} MeV outside [0, 1]", eff, e));
            }
        }
        Ok(Self {
            energy: points.iter().map(|p| p.0).collect(),
            efficiency: points.iter().map(|p| p.1).collect(),
        })
    }

    pub fn len(&self) -> usize {
        self.energy.len()
    }

    pub fn is_empty(&self) -> bool {
        self.energy.is_empty()
    }

    /// Interpolated efficiency at the given energy (MeV).
    pub fn at(&self, energy: f64) -> f64 {
        if energy <= self.energy[0] {
            return self.efficiency[0];
        }
        let last = self.energy.len() - 1;
        if energy >= self.energy[last] {
            return self.efficiency[last];
        }
        let mut low = 0usize;
        let mut high = last;
        while high - low > 1 {
            let mid = (low + high) >> 1;
            if self.energy[mid] <= energy {
                low = mid;
            } else {
                high = mid;
            }
        }
        let (x1, x2) = (self.energy[low], self.energy[low + 1]);
        let (y1, y2) = (self.efficiency[low], self.efficiency[low + 1]);
        y1 + (energy - x1) * (y2 - y1) / (x2 - x1)
    }
}

/// Efficiency tables keyed by detector size class. A missing table (and any
/// custom-sized detector) is treated as perfectly efficient.
#[derive(Clone, Debug, Default)]
pub struct EfficiencySet {
    pub small: Option<EfficiencyTable>,
    pub medium: Option<EfficiencyTable>,
    pub large: Option<EfficiencyTable>,
}

impl EfficiencySet {
    pub fn lookup(&self, kind: DetectorKind, energy: f64) -> Option<f64> {
        let table = match kind {
            DetectorKind::SmallBar => self.small.as_ref(),
            DetectorKind::MediumBar => self.medium.as_ref(),
            DetectorKind::LargeBar => self.large.as_ref(),
            DetectorKind::Custom { .. } => None,
        };
        table.map(|t| t.at(energy))
    }

    /// True when no class has a table loaded.
    pub fn is_empty(&self) -> bool {
        self.small.is_none() && self.medium.is_none() && self.large.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> EfficiencyTable {
        EfficiencyTable::new(&[(1.0, 0.9), (2.0, 0.7), (4.0, 0.5), (8.0, 0.3)]).unwrap()
    }

    #[test]
    fn test_empty_table_rejected() {
        assert!(EfficiencyTable::new(&[]).is_err());
    }

    #[test]
    fn test_non_monotonic_rejected() {
        assert!(EfficiencyTable::new(&[(1.0, 0.9), (1.0, 0.8)]).is_err());
        assert!(EfficiencyTable::new(&[(2.0, 0.9), (1.0, 0.8)]).is_err());
    }

    #[test]
    fn test_out_of_unit_interval_rejected() {
        assert!(EfficiencyTable::new(&[(1.0, 1.2)]).is_err());
        assert!(EfficiencyTable::new(&[(1.0, -0.1)]).is_err());
    }

    #[test]
    fn test_interpolation() {
        let t = table();
        assert!((t.at(1.5) - 0.8).abs() < 1e-12);
        assert!((t.at(3.0) - 0.6).abs() < 1e-12);
    }

    #[test]
    fn test_clamping() {
        let t = table();
        assert_eq!(t.at(0.1), 0.9);
        assert_eq!(t.at(100.0), 0.3);
    }

    #[test]
    fn test_set_lookup_by_class() {
        let set = EfficiencySet {
            small: Some(table()),
            medium: None,
            large: None,
        };
        assert!(set.lookup(DetectorKind::SmallBar, 2.0).is_some());
        assert!(set.lookup(DetectorKind::MediumBar, 2.0).is_none());
        assert!(set
            .lookup(
                DetectorKind::Custom {
                    length: 1.0,
                    width: 1.0,
                    depth: 1.0
                },
                2.0
            )
            .is_none());
        assert!(!set.is_empty());
        assert!(EfficiencySet::default().is_empty());
    }
}
