// The event loop: samples beam particles, runs them through the target and
// kinematics, tests every detector, applies efficiency and coincidence logic
// and accumulates run statistics.

use std::fmt;

use nalgebra::Vector3;
use rand::Rng;

use crate::constants::C;
use crate::efficiency::EfficiencySet;
use crate::event::{EventRecord, EventSink, ProductHit};
use crate::kinematics::Reaction;
use crate::math;
use crate::primitive::Primitive;
use crate::range_table::RangeTable;
use crate::rng::HistoryRng;
use crate::source::BeamSource;
use crate::target::Target;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Energy-deposit window for an accepted hit (MeV).
const QDC_MIN: f64 = 0.1;
const QDC_MAX: f64 = 5.0;

/// Which reaction products must be detected for an event to be accepted.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CoincidencePolicy {
    /// Both the ejectile and the recoil
    Both,
    /// Either product suffices
    Either,
}

/// Run-control settings.
#[derive(Clone, Debug)]
pub struct Settings {
    /// Accepted events to collect before stopping
    pub n_wanted: u64,
    /// Optional cap on the number of trials
    pub max_trials: Option<u64>,
    pub coincidence: CoincidencePolicy,
    /// When false, hits are thinned by the per-class efficiency tables
    pub perfect_detectors: bool,
    /// Timing resolution, FWHM (ns); applied when detectors are imperfect
    pub time_resolution: f64,
    pub seed: u64,
    /// Histories per batch (the unit of parallel work)
    pub batch_size: u64,
    /// Operator warning once this many beam particles stopped in the target
    pub stopped_beam_warning: u64,
    /// Print progress blocks during the run
    pub report_progress: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            n_wanted: 10_000,
            max_trials: None,
            coincidence: CoincidencePolicy::Both,
            perfect_detectors: true,
            time_resolution: 3.0,
            seed: 1,
            batch_size: 10_000,
            stopped_beam_warning: 10_000,
            report_progress: false,
        }
    }
}

/// Counters accumulated over a run. Per-worker copies are merged after each
/// parallel batch.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RunStats {
    /// Beam particles simulated
    pub trials: u64,
    /// Beam particles that missed the target footprint
    pub missed_target: u64,
    /// Beam particles that ran out of range inside the target
    pub beam_stopped: u64,
    /// Sampled reactions below the kinematic threshold
    pub below_threshold: u64,
    /// Reactions that produced products
    pub reactions: u64,
    /// Events with at least one geometric detector hit
    pub geometric_hits: u64,
    /// Accepted (detected) events
    pub detected: u64,
}

impl RunStats {
    pub fn merge(&mut self, other: &RunStats) {
        self.trials += other.trials;
        self.missed_target += other.missed_target;
        self.beam_stopped += other.beam_stopped;
        self.below_threshold += other.below_threshold;
        self.reactions += other.reactions;
        self.geometric_hits += other.geometric_hits;
        self.detected += other.detected;
    }

    /// Fraction of reactions with a geometric detector hit.
    pub fn geometric_efficiency(&self) -> f64 {
        if self.reactions == 0 {
            0.0
        } else {
            self.geometric_hits as f64 / self.reactions as f64
        }
    }

    /// Fraction of reactions accepted after efficiency and coincidence.
    pub fn detection_efficiency(&self) -> f64 {
        if self.reactions == 0 {
            0.0
        } else {
            self.detected as f64 / self.reactions as f64
        }
    }
}

impl fmt::Display for RunStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Particles simulated: {}", self.trials)?;
        writeln!(f, "  Missed target:     {}", self.missed_target)?;
        writeln!(f, "  Stopped in target: {}", self.beam_stopped)?;
        writeln!(f, "  Below threshold:   {}", self.below_threshold)?;
        writeln!(f, "Reactions:           {}", self.reactions)?;
        writeln!(
            f,
            "Geometric efficiency: {:.2}%",
            100.0 * self.geometric_efficiency()
        )?;
        write!(
            f,
            "Detection efficiency: {:.2}%",
            100.0 * self.detection_efficiency()
        )
    }
}

/// Result of the geometric detector-setup test.
#[derive(Clone, Copy, Debug)]
pub struct GeometricTest {
    pub hits: u64,
    pub trials: u64,
}

impl GeometricTest {
    pub fn efficiency(&self) -> f64 {
        if self.trials == 0 {
            0.0
        } else {
            self.hits as f64 / self.trials as f64
        }
    }
}

/// Monte Carlo efficiency test of a detector setup: isotropic rays from the
/// origin against every detector, until `n_wanted` rays have hit something
/// or the trial budget runs out.
pub fn geometric_test(
    detectors: &[Primitive],
    n_wanted: u64,
    max_trials: u64,
    seed: u64,
) -> Result<GeometricTest, String> {
    if detectors.is_empty() {
        return Err("geometric test needs at least one detector".to_string());
    }
    let origin = Vector3::zeros();
    let mut hits = 0u64;
    let mut trials = 0u64;
    while hits < n_wanted && trials < max_trials {
        let mut rng = HistoryRng::for_history(seed, trials);
        let dir = math::unit_sphere_random(&mut rng);
        trials += 1;
        if detectors.iter().any(|d| d.intersect(&origin, &dir).is_some()) {
            hits += 1;
        }
    }
    Ok(GeometricTest { hits, trials })
}

/// A fully configured simulation. All tables and geometry are read-only once
/// the run starts; every history draws from its own random-number stream.
pub struct Simulation {
    pub detectors: Vec<Primitive>,
    pub target: Target,
    pub reaction: Reaction,
    pub beam: BeamSource,
    /// Range table of the beam species in the target material
    pub beam_range: RangeTable,
    /// Per-class efficiency tables; required when detectors are imperfect
    pub efficiency: Option<EfficiencySet>,
    /// Beam intensity (particles/s), for rate estimates
    pub beam_intensity: Option<f64>,
    pub settings: Settings,
}

/// Outcome of a single history, merged into the run totals.
struct Trial {
    stats: RunStats,
    record: Option<EventRecord>,
}

impl Simulation {
    /// Check the configuration before starting the event loop. Every failure
    /// names the resource at fault.
    pub fn validate(&self) -> Result<(), String> {
        if self.detectors.is_empty() {
            return Err("no detectors configured".to_string());
        }
        if self.settings.n_wanted == 0 {
            return Err("requested zero accepted events".to_string());
        }
        if self.beam.energy <= 0.0 {
            return Err(format!("non-positive beam energy {}", self.beam.energy));
        }
        let (e_max, _) = self
            .beam_range
            .entry(self.beam_range.len() - 1)
            .ok_or_else(|| "empty beam range table".to_string())?;
        if e_max < self.beam.max_energy() {
            return Err(format!(
                "beam range table tops out at {} MeV but the beam can reach {} MeV",
                e_max,
                self.beam.max_energy()
            ));
        }
        if !self.settings.perfect_detectors {
            match &self.efficiency {
                None => {
                    return Err(
                        "imperfect detectors requested but no efficiency tables loaded".to_string()
                    )
                }
                Some(set) if set.is_empty() => {
                    return Err("efficiency table set is empty".to_string())
                }
                Some(_) => {}
            }
        }
        Ok(())
    }

    /// Expected reaction rate (1/s), when the beam intensity is known and
    /// the angular distributions carry cross-sections.
    pub fn reaction_rate(&self) -> Option<f64> {
        let intensity = self.beam_intensity?;
        let xsection = self.reaction.total_cross_section();
        if xsection <= 0.0 {
            return None;
        }
        Some(
            xsection
                * crate::constants::MB_TO_CM2
                * intensity
                * self.target.number_density(),
        )
    }

    /// Run until the requested number of accepted events (or the trial
    /// budget) is reached, emitting each accepted event into `sink`.
    pub fn run(&self, sink: &mut dyn EventSink) -> Result<RunStats, String> {
        self.validate()?;

        let focus = self.beam.focus_point(self.target.real_z_thickness() / 2.0);
        let mut stats = RunStats::default();
        let mut next_report = (self.settings.n_wanted / 10).max(1);
        let mut warned_stopped = false;

        while stats.detected < self.settings.n_wanted {
            let remaining_budget = match self.settings.max_trials {
                Some(max) => {
                    if stats.trials >= max {
                        break;
                    }
                    max - stats.trials
                }
                None => u64::MAX,
            };
            let batch = self.settings.batch_size.min(remaining_budget);
            let first = stats.trials;

            let trials = self.run_batch(first, batch, focus);
            for trial in trials {
                stats.merge(&trial.stats);
                if let Some(record) = trial.record {
                    sink.emit(record);
                }
            }

            if !warned_stopped && stats.beam_stopped >= self.settings.stopped_beam_warning {
                warned_stopped = true;
                println!(
                    " warning: {} beam particles ({:.1}%) stopped in the target; \
                     the target may be too thick for this beam energy",
                    stats.beam_stopped,
                    100.0 * stats.beam_stopped as f64 / stats.trials as f64
                );
            }

            if self.settings.report_progress && stats.detected >= next_report {
                println!(
                    " {} / {} events accepted ({} trials, geometric {:.2}%, detection {:.2}%)",
                    stats.detected,
                    self.settings.n_wanted,
                    stats.trials,
                    100.0 * stats.geometric_efficiency(),
                    100.0 * stats.detection_efficiency()
                );
                next_report += self.settings.n_wanted / 10;
            }
        }
        Ok(stats)
    }

    #[cfg(feature = "parallel")]
    fn run_batch(&self, first: u64, n: u64, focus: Option<Vector3<f64>>) -> Vec<Trial> {
        (0..n)
            .into_par_iter()
            .map(|i| self.simulate_history(first + i, focus))
            .collect()
    }

    #[cfg(not(feature = "parallel"))]
    fn run_batch(&self, first: u64, n: u64, focus: Option<Vector3<f64>>) -> Vec<Trial> {
        (0..n)
            .map(|i| self.simulate_history(first + i, focus))
            .collect()
    }

    /// One complete history: beam particle in, accepted event or discard out.
    fn simulate_history(&self, history: u64, focus: Option<Vector3<f64>>) -> Trial {
        let mut rng = HistoryRng::for_history(self.settings.seed, history);
        let mut stats = RunStats {
            trials: 1,
            ..Default::default()
        };

        // Beam particle onto the target
        let shot = self.beam.sample(focus, &mut rng);
        let Some(crossing) =
            self.target
                .interaction_depth(&shot.start, &shot.trajectory, &mut rng)
        else {
            stats.missed_target = 1;
            return Trial {
                stats,
                record: None,
            };
        };

        // Slow the beam down to the reaction point
        let range = self.beam_range.range(shot.energy);
        if range - crossing.depth <= 0.0 {
            stats.beam_stopped = 1;
            return Trial {
                stats,
                record: None,
            };
        }
        let e_react = self.beam_range.energy(range - crossing.depth);

        // Straggled trajectory at the reaction point
        let beam_species = *self.reaction.beam();
        let straggled = self.target.angle_straggling(
            &shot.trajectory,
            beam_species.a,
            beam_species.z,
            shot.energy,
            &mut rng,
        );

        // Two-body kinematics in the straggled-beam frame
        let Some(products) = self.reaction.sample(e_react, &mut rng) else {
            stats.below_threshold = 1;
            return Trial {
                stats,
                record: None,
            };
        };
        stats.reactions = 1;

        let to_lab = math::beam_frame(&straggled);
        let eject_dir = to_lab * products.eject_dir;
        let recoil_dir = to_lab * products.recoil_dir;

        let mut record = EventRecord {
            reaction_energy: e_react,
            interaction: crossing.interaction.into(),
            trajectory: straggled.into(),
            eject_hits: Vec::new(),
            recoil_hits: Vec::new(),
        };

        let mut any_geometric = false;
        for (index, detector) in self.detectors.iter().enumerate() {
            for (is_eject, dir, energy, mass) in [
                (
                    true,
                    &eject_dir,
                    products.eject_energy,
                    self.reaction.eject_mass(),
                ),
                (
                    false,
                    &recoil_dir,
                    products.recoil_energy,
                    self.reaction.recoil_mass(),
                ),
            ] {
                if is_eject && !detector.eject_sensitive {
                    continue;
                }
                if !is_eject && !detector.recoil_sensitive {
                    continue;
                }
                let Some(hit) = detector.intersect(&crossing.interaction, dir) else {
                    continue;
                };
                any_geometric = true;

                // Imperfect detectors thin the hits by the class efficiency
                if !self.settings.perfect_detectors {
                    if let Some(eff) = self
                        .efficiency
                        .as_ref()
                        .and_then(|set| set.lookup(detector.kind(), energy))
                    {
                        if rng.gen::<f64>() > eff {
                            continue;
                        }
                    }
                }

                let Some(product_hit) = self.score_hit(
                    index,
                    &hit,
                    &crossing.interaction,
                    energy,
                    mass,
                    &mut rng,
                ) else {
                    continue;
                };
                if is_eject {
                    record.eject_hits.push(product_hit);
                } else {
                    record.recoil_hits.push(product_hit);
                }
            }
        }
        if any_geometric {
            stats.geometric_hits = 1;
        }

        let accepted = match self.settings.coincidence {
            CoincidencePolicy::Both => {
                !record.eject_hits.is_empty() && !record.recoil_hits.is_empty()
            }
            CoincidencePolicy::Either => {
                !record.eject_hits.is_empty() || !record.recoil_hits.is_empty()
            }
        };
        if accepted {
            stats.detected = 1;
            Trial {
                stats,
                record: Some(record),
            }
        } else {
            Trial {
                stats,
                record: None,
            }
        }
    }

    /// Turn a geometric intersection into a detected hit: random penetration
    /// depth along the chord, time of flight, energy-deposit proxy and lab
    /// angles. None when the deposit falls outside the accepted window.
    fn score_hit(
        &self,
        index: usize,
        hit: &crate::primitive::Intersection,
        interaction: &Vector3<f64>,
        energy: f64,
        mass: f64,
        rng: &mut HistoryRng,
    ) -> Option<ProductHit> {
        let (entry, exit) = hit.entry_exit(interaction);
        let penetration = rng.gen::<f64>();
        let chord = exit - entry;
        let inside = entry + chord * penetration;
        let flight = (entry - interaction).norm() + chord.norm() * penetration;

        // The product may leave any portion of its energy in the detector
        let qdc = energy * rng.gen::<f64>();
        if !(QDC_MIN..=QDC_MAX).contains(&qdc) {
            return None;
        }

        let beta = (1.0 - (mass / (energy + mass)).powi(2)).sqrt();
        let mut tof = flight / (beta * C) * 1.0e9;
        if !self.settings.perfect_detectors {
            tof += math::gauss_fwhm(rng, self.settings.time_resolution);
        }

        let (_, theta, phi) = math::cart_to_sphere(&(inside - interaction));
        Some(ProductHit {
            detector: index,
            position: inside.into(),
            lab_theta: theta.to_degrees(),
            lab_phi: phi.to_degrees(),
            qdc,
            tof,
            face: hit.face1,
            local: hit.local.into(),
        })
    }
}
