//! Corridor Module
//!
//! Geodesic math for the journey corridor: the band around the straight
//! start → end great-circle path inside which deviation is tolerated.

pub mod geometry;

pub use geometry::{
    angular_distance,
    cross_track_distance_m,
    great_circle_distance_m,
    initial_bearing,
    EARTH_RADIUS_M,
};
