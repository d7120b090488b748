mod inflate;
mod occupancy;
mod polygon;

pub use occupancy::{
    ConfirmPolicy, DedupPolicy, MembershipSignal, OccupancyConfig, OccupancyRecord, Transition,
    ZoneOccupancy,
};
pub use polygon::{Zone, box_inside_ratio, crossed_boundary, segments_intersect, signed_distance};
