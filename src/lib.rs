mod constants;
mod distribution;
mod efficiency;
mod event;
mod kinematics;
mod material;
mod math;
mod polygon;
mod primitive;
mod range_table;
mod rng;
mod simulation;
mod source;
mod target;

pub use constants::{mean_ionization_ev, radiation_length};
pub use distribution::AngularDistribution;
pub use efficiency::{EfficiencySet, EfficiencyTable};
pub use event::{CountingSink, EventRecord, EventSink, MemorySink, ProductHit};
pub use kinematics::{Reaction, ReactionProducts, Species};
pub use material::{Element, Material};
pub use math::{beam_frame, cart_to_sphere, sphere_to_cart, unit_sphere_random};
pub use polygon::{Ray2, RegularPolygon, Segment2};
pub use primitive::{DetectorKind, DetectorRecord, DetectorRole, Face, Intersection, Primitive};
pub use range_table::{RangeTable, Slowdown};
pub use rng::HistoryRng;
pub use simulation::{
    geometric_test, CoincidencePolicy, GeometricTest, RunStats, Settings, Simulation,
};
pub use source::{BeamProfile, BeamShot, BeamSource};
pub use target::{BeamCrossing, Target};
