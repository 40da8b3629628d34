//! Spherical Lambert azimuthal equal-area projection.
//!
//! Areas measured in the projected plane equal areas on the sphere, whatever
//! the centre. Distances are distorted by a factor that grows with the square
//! of the angular distance from the centre and stays well under 0.01% within
//! 100 km.

use geo::{Area, Centroid, Coord, LineString, MapCoords, MultiLineString, MultiPolygon};

/// Mean Earth radius in metres (IUGG).
pub const EARTH_RADIUS_M: f64 = 6_371_008.8;

/// An equal-area projection centred on a fixed longitude and latitude.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocalProjection {
    lon0: f64,
    sin_lat0: f64,
    cos_lat0: f64,
}

impl LocalProjection {
    /// Centre the projection on `centre` (degrees, `x = longitude`).
    #[must_use]
    pub fn new(centre: Coord) -> Self {
        let lat0 = centre.y.to_radians();
        Self {
            lon0: centre.x.to_radians(),
            sin_lat0: lat0.sin(),
            cos_lat0: lat0.cos(),
        }
    }

    /// Centre the projection on the centroid of `area`.
    ///
    /// Returns `None` for an empty multipolygon.
    #[must_use]
    pub fn centred_on(area: &MultiPolygon) -> Option<Self> {
        area.centroid().map(|point| Self::new(point.0))
    }

    /// Project a WGS84 coordinate to metres east/north of the centre.
    ///
    /// The antipode of the centre has no image; it maps to the origin.
    #[must_use]
    #[expect(
        clippy::float_arithmetic,
        reason = "projection formulas are floating-point trigonometry"
    )]
    pub fn project(&self, coord: Coord) -> Coord {
        let lat = coord.y.to_radians();
        let dlon = coord.x.to_radians() - self.lon0;
        let (sin_lat, cos_lat) = lat.sin_cos();
        let cos_dlon = dlon.cos();
        let denom = 1.0 + self.sin_lat0 * sin_lat + self.cos_lat0 * cos_lat * cos_dlon;
        if denom <= f64::EPSILON {
            return Coord { x: 0.0, y: 0.0 };
        }
        let k = (2.0 / denom).sqrt();
        Coord {
            x: EARTH_RADIUS_M * k * cos_lat * dlon.sin(),
            y: EARTH_RADIUS_M * k * (self.cos_lat0 * sin_lat - self.sin_lat0 * cos_lat * cos_dlon),
        }
    }

    /// Surface area of `polygons` in square metres.
    #[must_use]
    pub fn area_m2(&self, polygons: &MultiPolygon) -> f64 {
        polygons.map_coords(|c| self.project(c)).unsigned_area()
    }

    /// Length of `line` in metres.
    #[must_use]
    pub fn length_m(&self, line: &LineString) -> f64 {
        line.map_coords(|c| self.project(c))
            .lines()
            .map(|segment| segment.dx().hypot(segment.dy()))
            .sum()
    }

    /// Total length of `lines` in metres.
    #[must_use]
    pub fn total_length_m(&self, lines: &MultiLineString) -> f64 {
        lines.iter().map(|line| self.length_m(line)).sum()
    }
}

#[cfg(test)]
#[expect(
    clippy::expect_used,
    clippy::float_arithmetic,
    reason = "tests fail fast and compare measurements with float maths"
)]
mod tests {
    use super::*;
    use geo::{LineString, polygon};
    use rstest::rstest;

    fn relative_error(actual: f64, expected: f64) -> f64 {
        ((actual - expected) / expected).abs()
    }

    #[rstest]
    fn centre_maps_to_origin() {
        let projection = LocalProjection::new(Coord { x: 3.7, y: 51.05 });
        let origin = projection.project(Coord { x: 3.7, y: 51.05 });
        assert!(origin.x.abs() < 1e-9 && origin.y.abs() < 1e-9);
    }

    #[rstest]
    fn meridian_arc_has_expected_length() {
        let projection = LocalProjection::new(Coord { x: 0.0, y: 0.0 });
        let line = LineString::from(vec![(0.0, 0.0), (0.0, 1.0)]);
        let expected = EARTH_RADIUS_M * 1.0_f64.to_radians();
        // Radial scale is cos(c / 2), about 1 - 1.3e-5 at one degree.
        assert!(relative_error(projection.length_m(&line), expected) < 1e-4);
    }

    #[rstest]
    #[case(0.0)]
    #[case(51.05)]
    #[case(-33.9)]
    fn one_degree_cell_matches_spherical_area(#[case] lat: f64) {
        let cell = MultiPolygon::new(vec![polygon![
            (x: 10.0, y: lat),
            (x: 11.0, y: lat),
            (x: 11.0, y: lat + 1.0),
            (x: 10.0, y: lat + 1.0),
            (x: 10.0, y: lat),
        ]]);
        let projection = LocalProjection::centred_on(&cell).expect("non-empty cell");
        // Exact area of a lat/lon cell on the sphere.
        let expected = EARTH_RADIUS_M.powi(2)
            * 1.0_f64.to_radians()
            * ((lat + 1.0).to_radians().sin() - lat.to_radians().sin());
        // Straight edges in the plane differ slightly from parallels, hence the tolerance.
        assert!(relative_error(projection.area_m2(&cell), expected) < 2e-3);
    }

    #[rstest]
    fn empty_area_has_no_centre() {
        assert!(LocalProjection::centred_on(&MultiPolygon::new(Vec::new())).is_none());
    }
}
