//! Nominatim search API wire types and boundary selection.

use geo::{Geometry, MultiPolygon};
use geotags_core::{Boundary, ElementId, ElementKind};
use serde::Deserialize;

/// One entry of a `/search?format=jsonv2&polygon_geojson=1` response.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct Place {
    #[serde(default)]
    pub(crate) osm_type: Option<String>,
    #[serde(default)]
    pub(crate) osm_id: Option<i64>,
    #[serde(default)]
    pub(crate) display_name: Option<String>,
    /// `category` in `jsonv2`, `class` in the older `json` format.
    #[serde(default, alias = "class")]
    pub(crate) category: Option<String>,
    #[serde(default, rename = "type")]
    pub(crate) place_type: Option<String>,
    #[serde(default)]
    pub(crate) geojson: Option<geojson::Geometry>,
}

impl Place {
    fn is_administrative(&self) -> bool {
        self.category.as_deref() == Some("boundary")
            && self.place_type.as_deref() == Some("administrative")
    }

    fn element(&self) -> Option<ElementId> {
        let kind = match self.osm_type.as_deref()? {
            "node" | "N" => ElementKind::Node,
            "way" | "W" => ElementKind::Way,
            "relation" | "R" => ElementKind::Relation,
            _ => return None,
        };
        Some(ElementId::new(kind, self.osm_id?))
    }

    fn polygons(&self) -> Option<MultiPolygon> {
        let geometry = Geometry::<f64>::try_from(self.geojson.clone()?).ok()?;
        match geometry {
            Geometry::Polygon(polygon) => Some(MultiPolygon::new(vec![polygon])),
            Geometry::MultiPolygon(polygons) if !polygons.0.is_empty() => Some(polygons),
            _ => None,
        }
    }

    fn into_boundary(self, fallback_name: &str, polygons: MultiPolygon) -> Boundary {
        let element = self.element();
        let name = self
            .display_name
            .unwrap_or_else(|| fallback_name.to_owned());
        Boundary::new(name, polygons, element)
    }
}

/// Pick the boundary from search results.
///
/// The first polygonal administrative boundary wins; otherwise the first
/// polygonal result of any kind. Point and line results are ignored.
pub(crate) fn select_boundary(places: Vec<Place>, fallback_name: &str) -> Option<Boundary> {
    let mut fallback = None;
    for place in places {
        let Some(polygons) = place.polygons() else {
            continue;
        };
        if place.is_administrative() {
            return Some(place.into_boundary(fallback_name, polygons));
        }
        if fallback.is_none() {
            fallback = Some((place, polygons));
        }
    }
    fallback.map(|(place, polygons)| place.into_boundary(fallback_name, polygons))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn places(json: &str) -> Vec<Place> {
        serde_json::from_str(json).expect("valid Nominatim response")
    }

    const SQUARE: &str =
        r#"{"type":"Polygon","coordinates":[[[3.6,51.0],[3.8,51.0],[3.8,51.1],[3.6,51.1],[3.6,51.0]]]}"#;

    #[rstest]
    fn prefers_administrative_boundaries() {
        let json = format!(
            r#"[
                {{"osm_type":"way","osm_id":1,"display_name":"Ghent station","category":"railway","type":"station","geojson":{SQUARE}}},
                {{"osm_type":"relation","osm_id":897671,"display_name":"Gent, Oost-Vlaanderen","category":"boundary","type":"administrative","geojson":{SQUARE}}}
            ]"#
        );
        let boundary = select_boundary(places(&json), "Ghent, Belgium").expect("boundary");
        assert_eq!(boundary.name, "Gent, Oost-Vlaanderen");
        assert_eq!(
            boundary.element,
            Some(ElementId::new(ElementKind::Relation, 897_671))
        );
        assert_eq!(boundary.geometry.0.len(), 1);
    }

    #[rstest]
    fn falls_back_to_first_polygon() {
        let json = format!(
            r#"[
                {{"osm_type":"node","osm_id":5,"display_name":"Ghent","category":"place","type":"city","geojson":{{"type":"Point","coordinates":[3.7,51.05]}}}},
                {{"osm_type":"way","osm_id":7,"display_name":"Ghent centre","class":"place","type":"suburb","geojson":{SQUARE}}}
            ]"#
        );
        let boundary = select_boundary(places(&json), "Ghent, Belgium").expect("boundary");
        assert_eq!(boundary.element, Some(ElementId::new(ElementKind::Way, 7)));
    }

    #[rstest]
    fn ignores_non_polygonal_results() {
        let json = r#"[{"osm_type":"node","osm_id":5,"category":"place","type":"city","geojson":{"type":"Point","coordinates":[3.7,51.05]}}]"#;
        assert!(select_boundary(places(json), "Ghent, Belgium").is_none());
        assert!(select_boundary(Vec::new(), "Ghent, Belgium").is_none());
    }

    #[rstest]
    fn uses_query_text_when_name_missing() {
        let json = format!(
            r#"[{{"category":"boundary","type":"administrative","geojson":{SQUARE}}}]"#
        );
        let boundary = select_boundary(places(&json), "Ghent, Belgium").expect("boundary");
        assert_eq!(boundary.name, "Ghent, Belgium");
        assert!(boundary.element.is_none());
    }
}
