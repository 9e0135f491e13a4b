//! Real Curitiba locations for realistic test fixtures.
//!
//! Coordinates sourced from OpenStreetMap. Restaurants make good depots;
//! the remaining groups are spread across delivery neighborhoods.

use delivery_planner::geo::Coordinate;

/// A named location with coordinates.
#[derive(Debug, Clone)]
pub struct Location {
    pub name: &'static str,
    pub lat: f64,
    pub lng: f64,
}

impl Location {
    pub const fn new(name: &'static str, lat: f64, lng: f64) -> Self {
        Self { name, lat, lng }
    }

    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.lat, self.lng)
    }
}

// ============================================================================
// Restaurants (depot candidates, central Curitiba)
// ============================================================================

pub const RESTAURANTS: &[Location] = &[
    Location::new("Praça Tiradentes", -25.4284, -49.2733),
    Location::new("Rua XV de Novembro", -25.4296, -49.2713),
    Location::new("Mercado Municipal", -25.4372, -49.2622),
    Location::new("Largo da Ordem", -25.4262, -49.2728),
    Location::new("Shopping Estação", -25.4397, -49.2672),
];

// ============================================================================
// Delivery addresses by neighborhood
// ============================================================================

pub const BATEL: &[Location] = &[
    Location::new("Av. do Batel 1868", -25.4430, -49.2870),
    Location::new("Praça da Espanha", -25.4397, -49.2837),
    Location::new("Rua Comendador Araújo 731", -25.4362, -49.2811),
    Location::new("Shopping Pátio Batel", -25.4438, -49.2891),
];

pub const AGUA_VERDE: &[Location] = &[
    Location::new("Av. República Argentina 900", -25.4521, -49.2827),
    Location::new("Rua Guilherme Pugsley 1888", -25.4524, -49.2880),
    Location::new("Praça do Japão", -25.4470, -49.2887),
];

pub const CABRAL: &[Location] = &[
    Location::new("Av. Munhoz da Rocha 490", -25.4083, -49.2590),
    Location::new("Praça Alfredo Andersen", -25.4106, -49.2634),
];

pub const SANTA_FELICIDADE: &[Location] = &[
    Location::new("Av. Manoel Ribas 5875", -25.3923, -49.3330),
    Location::new("Bosque São Cristóvão", -25.3958, -49.3263),
];

pub const PORTAO: &[Location] = &[
    Location::new("Av. República Argentina 3430", -25.4739, -49.2926),
    Location::new("Shopping Palladium", -25.4815, -49.2908),
];

pub fn all_locations() -> Vec<Location> {
    let mut all = Vec::with_capacity(16);
    all.extend_from_slice(RESTAURANTS);
    all.extend_from_slice(BATEL);
    all.extend_from_slice(AGUA_VERDE);
    all.extend_from_slice(CABRAL);
    all.extend_from_slice(SANTA_FELICIDADE);
    all.extend_from_slice(PORTAO);
    all
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coordinates_in_curitiba_area() {
        for loc in all_locations() {
            assert!(
                loc.lat > -25.6 && loc.lat < -25.3,
                "{} lat out of range: {}",
                loc.name,
                loc.lat
            );
            assert!(
                loc.lng > -49.4 && loc.lng < -49.2,
                "{} lng out of range: {}",
                loc.name,
                loc.lng
            );
        }
    }
}
