//! District containment aggregation.
//!
//! Attributes segment-feature length to city-district polygons. A feature
//! counts toward a district only when its line is *fully contained* in the
//! district boundary; boundary-crossing features are excluded from every
//! district's tally rather than split proportionally. That is a deliberate
//! simplification, documented here and on [`aggregate_district_shares`].
//!
//! Boundaries come from a pluggable [`BoundaryProvider`] so the core never
//! depends on a live mapping service; tests and callers inject fixed polygon
//! sets ([`FixedBoundaries`], [`districts_from_geojson`]).
//!
//! An R-tree over feature envelopes pre-filters candidates per district
//! before the exact containment predicate runs.

use geo::{BoundingRect, Contains, Coord, GeodesicArea, LineString, MultiPolygon, Polygon};
use geojson::GeoJson;
use log::{debug, info};
use rstar::{RTree, RTreeObject, AABB};
use serde::Serialize;

use crate::{error::ReportError, geo_utils, geometry::Crs, SegmentFeatureCollection};

// ============================================================================
// Boundary Input
// ============================================================================

/// A named district boundary with its surface area.
#[derive(Debug, Clone, PartialEq)]
pub struct DistrictPolygon {
    pub name: String,
    pub boundary: MultiPolygon<f64>,
    /// District surface area in square meters.
    pub area_m2: f64,
}

impl DistrictPolygon {
    pub fn new(name: impl Into<String>, boundary: MultiPolygon<f64>, area_m2: f64) -> Self {
        Self {
            name: name.into(),
            boundary,
            area_m2,
        }
    }

    /// Build a district with its area derived from the boundary geometry
    /// (unsigned geodesic area on the WGS84 ellipsoid), for providers that
    /// carry no area attribute.
    pub fn with_derived_area(name: impl Into<String>, boundary: MultiPolygon<f64>) -> Self {
        let area_m2 = boundary.geodesic_area_unsigned();
        Self::new(name, boundary, area_m2)
    }
}

/// Source of district boundaries.
///
/// The containment stage treats boundaries as a read-only collaborator; any
/// retrieval (file, fixture, upstream service snapshot) happens behind this
/// trait, never inside the aggregation.
pub trait BoundaryProvider {
    /// Coordinate reference system of the supplied polygons.
    fn crs(&self) -> Crs;

    /// The district polygon set.
    fn districts(&self) -> Result<Vec<DistrictPolygon>, ReportError>;
}

/// An in-memory, fixed polygon set.
#[derive(Debug, Clone)]
pub struct FixedBoundaries {
    crs: Crs,
    districts: Vec<DistrictPolygon>,
}

impl FixedBoundaries {
    pub fn new(crs: Crs, districts: Vec<DistrictPolygon>) -> Self {
        Self { crs, districts }
    }

    /// Fixed boundaries in geographic WGS84.
    pub fn wgs84(districts: Vec<DistrictPolygon>) -> Self {
        Self::new(Crs::wgs84(), districts)
    }
}

impl BoundaryProvider for FixedBoundaries {
    fn crs(&self) -> Crs {
        self.crs.clone()
    }

    fn districts(&self) -> Result<Vec<DistrictPolygon>, ReportError> {
        Ok(self.districts.clone())
    }
}

fn ring_from_positions(positions: &[Vec<f64>]) -> Result<LineString<f64>, ReportError> {
    let coords = positions
        .iter()
        .map(|pos| {
            if pos.len() < 2 {
                return Err(ReportError::Boundary {
                    reason: "position with fewer than two coordinates".to_string(),
                });
            }
            Ok(Coord { x: pos[0], y: pos[1] })
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(LineString::new(coords))
}

fn polygon_from_rings(rings: &[Vec<Vec<f64>>]) -> Result<Polygon<f64>, ReportError> {
    let mut iter = rings.iter();
    let exterior = iter.next().ok_or_else(|| ReportError::Boundary {
        reason: "polygon with no exterior ring".to_string(),
    })?;
    let interiors = iter
        .map(|ring| ring_from_positions(ring))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Polygon::new(ring_from_positions(exterior)?, interiors))
}

/// Parse a GeoJSON `FeatureCollection` of named polygons into districts.
///
/// Each feature must carry a string `name` property and a `Polygon` or
/// `MultiPolygon` geometry. Areas are derived from the geometry.
pub fn districts_from_geojson(text: &str) -> Result<Vec<DistrictPolygon>, ReportError> {
    let geojson: GeoJson = text.parse().map_err(|e: geojson::Error| ReportError::Boundary {
        reason: e.to_string(),
    })?;

    let GeoJson::FeatureCollection(collection) = geojson else {
        return Err(ReportError::Boundary {
            reason: "expected a FeatureCollection".to_string(),
        });
    };

    let mut districts = Vec::with_capacity(collection.features.len());
    for feature in collection.features {
        let name = feature
            .properties
            .as_ref()
            .and_then(|props| props.get("name"))
            .and_then(|v| v.as_str())
            .ok_or_else(|| ReportError::Boundary {
                reason: "feature without a string \"name\" property".to_string(),
            })?
            .to_string();

        let geometry = feature.geometry.ok_or_else(|| ReportError::Boundary {
            reason: format!("district {name:?} has no geometry"),
        })?;

        let boundary = match geometry.value {
            geojson::Value::Polygon(ref rings) => MultiPolygon(vec![polygon_from_rings(rings)?]),
            geojson::Value::MultiPolygon(ref polys) => MultiPolygon(
                polys
                    .iter()
                    .map(|rings| polygon_from_rings(rings))
                    .collect::<Result<Vec<_>, _>>()?,
            ),
            _ => {
                return Err(ReportError::Boundary {
                    reason: format!("district {name:?} has non-polygon geometry"),
                })
            }
        };

        districts.push(DistrictPolygon::with_derived_area(name, boundary));
    }

    info!("parsed {} district boundaries from GeoJSON", districts.len());
    Ok(districts)
}

// ============================================================================
// Containment Aggregation
// ============================================================================

/// Per-district length attribution, raw and area-normalized.
///
/// Both share columns sum to 1 over all districts. Re-derived every run,
/// never persisted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DistrictShare {
    pub district_name: String,
    /// Contained length divided by total contained length.
    pub raw_length_share: f64,
    /// Contained length per district area, normalized the same way.
    pub area_normalized_share: f64,
}

/// A feature envelope stored in the R-tree, pointing back at its feature.
struct FeatureEntry {
    index: usize,
    envelope: AABB<[f64; 2]>,
}

impl RTreeObject for FeatureEntry {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

fn line_envelope(line: &LineString<f64>) -> Option<AABB<[f64; 2]>> {
    let rect = line.bounding_rect()?;
    Some(AABB::from_corners(
        [rect.min().x, rect.min().y],
        [rect.max().x, rect.max().y],
    ))
}

/// Attribute contained feature length to districts and normalize.
///
/// Per district, sums the geodesic length of the features fully contained in
/// its boundary, then emits `raw_length_share` (length over total contained
/// length) and `area_normalized_share` (length density over total density).
/// Features that cross a district boundary count toward no district at all,
/// a simplifying approximation, not proportional splitting.
///
/// # Errors
///
/// - [`ReportError::CrsMismatch`] when features and boundaries are in
///   different reference systems; mismatched geometries are never compared.
/// - [`ReportError::NoDistricts`] when the provider supplies no polygons.
/// - [`ReportError::InvalidDistrictArea`] when a polygon's area is not a
///   positive finite number.
/// - [`ReportError::NoContainedLength`] when every district's contained
///   length is zero, which would make both normalizations undefined.
///
/// A single district with zero contained length is not an error: its shares
/// are 0.
pub fn aggregate_district_shares(
    features: &SegmentFeatureCollection,
    provider: &dyn BoundaryProvider,
) -> Result<Vec<DistrictShare>, ReportError> {
    let boundary_crs = provider.crs();
    if features.crs != boundary_crs {
        return Err(ReportError::CrsMismatch {
            features: features.crs.to_string(),
            districts: boundary_crs.to_string(),
        });
    }

    let districts = provider.districts()?;
    if districts.is_empty() {
        return Err(ReportError::NoDistricts);
    }
    for district in &districts {
        if !(district.area_m2.is_finite() && district.area_m2 > 0.0) {
            return Err(ReportError::InvalidDistrictArea {
                name: district.name.clone(),
            });
        }
    }

    // Envelope pre-filter: index the features once, query per district.
    let entries: Vec<FeatureEntry> = features
        .features
        .iter()
        .enumerate()
        .filter_map(|(index, f)| {
            Some(FeatureEntry {
                index,
                envelope: line_envelope(&f.line)?,
            })
        })
        .collect();
    let rtree = RTree::bulk_load(entries);

    let mut raw_lengths = Vec::with_capacity(districts.len());
    for district in &districts {
        let Some(rect) = district.boundary.bounding_rect() else {
            raw_lengths.push(0.0);
            continue;
        };
        let district_envelope =
            AABB::from_corners([rect.min().x, rect.min().y], [rect.max().x, rect.max().y]);

        let contained_length: f64 = rtree
            .locate_in_envelope_intersecting(&district_envelope)
            .filter(|entry| {
                let line = &features.features[entry.index].line;
                district.boundary.contains(line)
            })
            .map(|entry| geo_utils::line_length(&features.features[entry.index].line))
            .sum();

        debug!(
            "district {:?}: {:.0}m contained",
            district.name, contained_length
        );
        raw_lengths.push(contained_length);
    }

    let total_length: f64 = raw_lengths.iter().sum();
    if total_length <= 0.0 {
        return Err(ReportError::NoContainedLength);
    }

    let densities: Vec<f64> = districts
        .iter()
        .zip(&raw_lengths)
        .map(|(district, length)| length / district.area_m2)
        .collect();
    let total_density: f64 = densities.iter().sum();

    let shares = districts
        .iter()
        .zip(raw_lengths.iter().zip(&densities))
        .map(|(district, (length, density))| DistrictShare {
            district_name: district.name.clone(),
            raw_length_share: length / total_length,
            area_normalized_share: density / total_density,
        })
        .collect();

    Ok(shares)
}
