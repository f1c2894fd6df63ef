//! Real Paris landmarks for realistic test fixtures.
//!
//! Coordinates sourced from OpenStreetMap.

use itinerary_planner::Location;
use itinerary_planner::model::Coordinates;

/// A named landmark with coordinates.
#[derive(Debug, Clone, Copy)]
pub struct Landmark {
    pub name: &'static str,
    pub lat: f64,
    pub lng: f64,
}

impl Landmark {
    pub const fn new(name: &'static str, lat: f64, lng: f64) -> Self {
        Self { name, lat, lng }
    }

    pub fn coordinates(&self) -> Coordinates {
        Coordinates::new(self.lat, self.lng)
    }

    pub fn location(&self) -> Location {
        Location::new(self.name).expect("fixture names are not blank")
    }
}

// ============================================================================
// Left bank and the west
// ============================================================================

pub const WEST: &[Landmark] = &[
    Landmark::new("Eiffel Tower", 48.8583701, 2.2944813),
    Landmark::new("Arc de Triomphe", 48.8737917, 2.2950275),
    Landmark::new("Les Invalides", 48.8565, 2.3125),
    Landmark::new("Musee Rodin", 48.8553, 2.3159),
    Landmark::new("Musee d'Orsay", 48.8599614, 2.3265614),
    Landmark::new("Luxembourg Gardens", 48.8462, 2.3372),
];

// ============================================================================
// Centre and the east
// ============================================================================

pub const CENTRE: &[Landmark] = &[
    Landmark::new("Louvre Museum", 48.8606111, 2.337644),
    Landmark::new("Palais Garnier", 48.8719697, 2.3316014),
    Landmark::new("Sainte-Chapelle", 48.8553966, 2.3450136),
    Landmark::new("Notre-Dame Cathedral", 48.852968, 2.349902),
    Landmark::new("Pantheon", 48.8462218, 2.3464138),
    Landmark::new("Centre Pompidou", 48.8606, 2.3522),
    Landmark::new("Jardin des Plantes", 48.844, 2.3596),
    Landmark::new("Place des Vosges", 48.8555, 2.3655),
    Landmark::new("Sacre-Coeur", 48.8867, 2.3431),
    Landmark::new("Pere Lachaise Cemetery", 48.8614, 2.3933),
];

pub fn all_landmarks() -> Vec<Landmark> {
    WEST.iter().chain(CENTRE.iter()).copied().collect()
}

pub fn find(name: &str) -> Option<Landmark> {
    all_landmarks().into_iter().find(|landmark| landmark.name == name)
}

/// The first `count` landmarks as planner locations.
pub fn locations(count: usize) -> Vec<Location> {
    all_landmarks()
        .into_iter()
        .take(count)
        .map(|landmark| landmark.location())
        .collect()
}
