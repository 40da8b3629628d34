//! Per-category feature extraction.

use std::collections::HashSet;

use log::{debug, info, warn};

use crate::{
    Boundary, Category, CategoryOutcome, CategoryResult, ExtractedFeature, ExtractionError,
    MapDataProvider,
};

/// Features gathered for every category plus each category's outcome.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Extraction {
    /// Extracted features, grouped by category in configuration order.
    pub features: Vec<ExtractedFeature>,
    /// One outcome per category, in configuration order.
    pub outcomes: Vec<CategoryOutcome>,
}

/// Query `provider` for every category and filter, sequentially and in order.
///
/// Within a category, features are de-duplicated by element id with the first
/// match winning, and anything outside `boundary` is dropped. A provider error
/// fails only the category it occurred in; the remaining categories still run.
pub fn extract_features<P>(provider: &P, boundary: &Boundary, categories: &[Category]) -> Extraction
where
    P: MapDataProvider + ?Sized,
{
    let mut extraction = Extraction {
        features: Vec::new(),
        outcomes: Vec::with_capacity(categories.len()),
    };
    for category in categories {
        let result = match extract_category(provider, boundary, category) {
            Ok(found) => {
                info!("category {:?}: {} feature(s)", category.name, found.len());
                let count = found.len();
                extraction.features.extend(found);
                CategoryResult::Success { features: count }
            }
            Err(reason) => {
                warn!("{reason}");
                CategoryResult::Failure { reason }
            }
        };
        extraction.outcomes.push(CategoryOutcome {
            category: category.name.clone(),
            result,
        });
    }
    extraction
}

fn extract_category<P>(
    provider: &P,
    boundary: &Boundary,
    category: &Category,
) -> Result<Vec<ExtractedFeature>, ExtractionError>
where
    P: MapDataProvider + ?Sized,
{
    let mut seen = HashSet::new();
    let mut extracted = Vec::new();
    for filter in &category.filters {
        let raw = provider
            .query_features(boundary, filter)
            .map_err(|source| ExtractionError {
                category: category.name.clone(),
                filter: filter.clone(),
                source,
            })?;
        debug!("{filter}: provider returned {} feature(s)", raw.len());
        let mut outside = 0_usize;
        for feature in raw {
            let Some(osm_tag) = filter.matching_tag(&feature.tags) else {
                debug!("{} does not carry {filter}; dropped", feature.id);
                continue;
            };
            if seen.contains(&feature.id) {
                debug!(
                    "{} already extracted for {:?}; keeping the first match",
                    feature.id, category.name
                );
                continue;
            }
            if !boundary.intersects_raw(&feature.geometry) {
                outside += 1;
                continue;
            }
            seen.insert(feature.id);
            extracted.push(ExtractedFeature {
                raw: feature,
                category: category.name.clone(),
                class: category.geometry,
                filter: filter.clone(),
                osm_tag,
            });
        }
        if outside > 0 {
            debug!("{filter}: {outside} feature(s) outside the boundary");
        }
    }
    Ok(extracted)
}
