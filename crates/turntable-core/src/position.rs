//! Fixed camera positions for multi-view capture

use serde::{Deserialize, Serialize};

/// Look-at target for every capture
pub const ORIGIN: [f64; 3] = [0.0, 0.0, 0.0];

/// Position name used for a capture of the live view
pub const CUSTOM_VIEW: &str = "custom-view";

/// Number of entries returned by `calculate_positions`
pub const POSITION_COUNT: usize = 14;

/// A named camera offset from the origin
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub name: String,
    pub vector: [f64; 3],
}

impl Position {
    pub fn new(name: impl Into<String>, vector: [f64; 3]) -> Self {
        Self {
            name: name.into(),
            vector,
        }
    }
}

pub fn length(v: [f64; 3]) -> f64 {
    (v[0] * v[0] + v[1] * v[1] + v[2] * v[2]).sqrt()
}

/// Distance of a point from the origin
pub fn distance_from_origin(point: [f64; 3]) -> f64 {
    length(point)
}

fn scaled_direction(v: [f64; 3], distance: f64) -> [f64; 3] {
    let len = length(v);
    if len == 0.0 {
        return ORIGIN;
    }
    [
        v[0] / len * distance,
        v[1] / len * distance,
        v[2] / len * distance,
    ]
}

const FACES: [(&str, [f64; 3]); 6] = [
    ("front", [0.0, 0.0, 1.0]),
    ("back", [0.0, 0.0, -1.0]),
    ("left", [-1.0, 0.0, 0.0]),
    ("right", [1.0, 0.0, 0.0]),
    ("top", [0.0, 1.0, 0.0]),
    ("bottom", [0.0, -1.0, 0.0]),
];

const CORNERS: [(&str, [f64; 3]); 8] = [
    ("top-front-right", [1.0, 1.0, 1.0]),
    ("top-front-left", [-1.0, 1.0, 1.0]),
    ("bottom-front-right", [1.0, -1.0, 1.0]),
    ("bottom-front-left", [-1.0, -1.0, 1.0]),
    ("top-back-right", [1.0, 1.0, -1.0]),
    ("top-back-left", [-1.0, 1.0, -1.0]),
    ("bottom-back-right", [1.0, -1.0, -1.0]),
    ("bottom-back-left", [-1.0, -1.0, -1.0]),
];

/// The 6 face positions followed by the 8 corner positions, each `distance`
/// away from the origin
pub fn calculate_positions(distance: f64) -> Vec<Position> {
    let faces = FACES.iter().map(|(name, axis)| {
        Position::new(*name, [axis[0] * distance, axis[1] * distance, axis[2] * distance])
    });
    let corners = CORNERS
        .iter()
        .map(|(name, signs)| Position::new(*name, scaled_direction(*signs, distance)));

    faces.chain(corners).collect()
}
