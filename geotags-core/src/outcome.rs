//! Per-category outcomes and the run report that aggregates them.

use std::fmt;

use thiserror::Error;

use crate::{ElementId, ProviderError, TagFilter};

/// A provider failure that aborted one category.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("category {category:?} failed on filter {filter}: {source}")]
pub struct ExtractionError {
    /// Name of the failed category.
    pub category: String,
    /// Filter being queried when the provider failed.
    pub filter: TagFilter,
    /// Provider error.
    #[source]
    pub source: ProviderError,
}

/// Result of extracting one category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CategoryResult {
    /// Every filter was queried; `features` is the de-duplicated count.
    Success {
        /// Number of features extracted for the category.
        features: usize,
    },
    /// A filter failed and the category produced nothing.
    Failure {
        /// Why the category failed.
        reason: ExtractionError,
    },
}

/// Outcome of one category, in configuration order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryOutcome {
    /// Category name.
    pub category: String,
    /// Success count or failure reason.
    pub result: CategoryResult,
}

impl CategoryOutcome {
    /// Whether the category failed.
    #[must_use]
    pub const fn is_failure(&self) -> bool {
        matches!(self.result, CategoryResult::Failure { .. })
    }
}

/// Why the normalizer dropped a feature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SkipReason {
    /// A polygon category feature whose rings never close.
    DegenerateRing,
    /// A node in a line category.
    PointInLineCategory,
    /// A node in a polygon category.
    PointInPolygonCategory,
    /// No usable coordinates at all.
    EmptyGeometry,
}

impl SkipReason {
    /// Human-readable description used in logs and the report.
    #[must_use]
    pub const fn describe(self) -> &'static str {
        match self {
            Self::DegenerateRing => "geometry cannot form a closed ring",
            Self::PointInLineCategory => "point geometry in a line category",
            Self::PointInPolygonCategory => "point geometry in a polygon category",
            Self::EmptyGeometry => "geometry has no usable coordinates",
        }
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.describe())
    }
}

/// A feature dropped during normalization. Never fatal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedFeature {
    /// Element identity.
    pub id: ElementId,
    /// Owning category.
    pub category: String,
    /// Concrete `key=value` tag.
    pub osm_tag: String,
    /// Why it was dropped.
    pub reason: SkipReason,
}

impl fmt::Display for SkippedFeature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "skipped {} ({}) in category {:?}: {}",
            self.id, self.osm_tag, self.category, self.reason
        )
    }
}

/// Everything the run observed besides the exported features.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    /// Category outcomes in configuration order.
    pub outcomes: Vec<CategoryOutcome>,
    /// Features dropped by the normalizer.
    pub skipped: Vec<SkippedFeature>,
}

impl RunReport {
    /// Combine extraction outcomes with normalizer skips.
    #[must_use]
    pub const fn new(outcomes: Vec<CategoryOutcome>, skipped: Vec<SkippedFeature>) -> Self {
        Self { outcomes, skipped }
    }

    /// Outcomes of categories that failed.
    pub fn failures(&self) -> impl Iterator<Item = (&str, &ExtractionError)> + '_ {
        self.outcomes.iter().filter_map(|outcome| match &outcome.result {
            CategoryResult::Failure { reason } => Some((outcome.category.as_str(), reason)),
            CategoryResult::Success { .. } => None,
        })
    }

    /// Whether every category failed.
    #[must_use]
    pub fn all_failed(&self) -> bool {
        !self.outcomes.is_empty() && self.outcomes.iter().all(CategoryOutcome::is_failure)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ElementKind;
    use rstest::rstest;

    fn failure(category: &str) -> CategoryOutcome {
        CategoryOutcome {
            category: category.into(),
            result: CategoryResult::Failure {
                reason: ExtractionError {
                    category: category.into(),
                    filter: TagFilter::exact("leisure", "park"),
                    source: ProviderError::Service {
                        service: "overpass".into(),
                        message: "runtime error".into(),
                    },
                },
            },
        }
    }

    fn success(category: &str, features: usize) -> CategoryOutcome {
        CategoryOutcome {
            category: category.into(),
            result: CategoryResult::Success { features },
        }
    }

    #[rstest]
    fn failures_keep_configuration_order() {
        let report = RunReport::new(
            vec![failure("parks"), success("schools", 3), failure("rivers")],
            Vec::new(),
        );
        let names: Vec<_> = report.failures().map(|(name, _)| name).collect();
        assert_eq!(names, ["parks", "rivers"]);
        assert!(!report.all_failed());
    }

    #[rstest]
    fn all_failed_requires_outcomes() {
        assert!(!RunReport::default().all_failed());
        assert!(RunReport::new(vec![failure("parks")], Vec::new()).all_failed());
    }

    #[rstest]
    fn skipped_feature_renders_reason() {
        let skipped = SkippedFeature {
            id: ElementId::new(ElementKind::Way, 9),
            category: "parks".into(),
            osm_tag: "leisure=park".into(),
            reason: SkipReason::DegenerateRing,
        };
        assert_eq!(
            skipped.to_string(),
            "skipped way/9 (leisure=park) in category \"parks\": geometry cannot form a closed ring"
        );
    }
}
