//! Geographic bounds validation.

use serde_json::Value;

use crate::geo::GeoBounds;

/// Boxes larger than this (180° × 90°) are flagged as near-global.
const LARGE_AREA_SQ_DEG: f64 = 180.0 * 90.0;

/// Boxes smaller than this (0.001° × 0.001°) are flagged as implausibly tiny.
const TINY_AREA_SQ_DEG: f64 = 0.001 * 0.001;

/// Derived measurements of a bounding box, reported for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundsMetrics {
    pub width_deg: f64,
    pub height_deg: f64,
    pub area_sq_deg: f64,
    /// Centre as `(lat, lon)`.
    pub center: (f64, f64),
}

/// Outcome of validating a bounding box.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundsReport {
    pub valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    /// Present whenever all four edges were finite numbers.
    pub metrics: Option<BoundsMetrics>,
}

impl BoundsReport {
    fn invalid(error: impl Into<String>) -> Self {
        Self {
            valid: false,
            errors: vec![error.into()],
            warnings: Vec::new(),
            metrics: None,
        }
    }
}

/// Validates geographic bounding boxes.
///
/// Latitude ordering is enforced (`south < north`); longitude ordering is
/// not, because a box with `west > east` legitimately crosses the
/// antimeridian.
#[derive(Debug, Clone, Copy, Default)]
pub struct BoundsValidator;

impl BoundsValidator {
    /// Validates typed bounds.
    pub fn validate(bounds: &GeoBounds) -> BoundsReport {
        let edges = [
            ("south", bounds.south),
            ("west", bounds.west),
            ("north", bounds.north),
            ("east", bounds.east),
        ];
        let non_finite: Vec<&str> = edges
            .iter()
            .filter(|(_, v)| !v.is_finite())
            .map(|(name, _)| *name)
            .collect();
        if !non_finite.is_empty() {
            return BoundsReport::invalid(format!(
                "Bounds contain non-finite values: {}",
                non_finite.join(", ")
            ));
        }

        let mut errors = Vec::new();
        let mut warnings = Vec::new();

        for (name, value) in [("south", bounds.south), ("north", bounds.north)] {
            if !(-90.0..=90.0).contains(&value) {
                errors.push(format!("{} latitude {} outside [-90, 90]", name, value));
            }
        }
        for (name, value) in [("west", bounds.west), ("east", bounds.east)] {
            if !(-180.0..=180.0).contains(&value) {
                errors.push(format!("{} longitude {} outside [-180, 180]", name, value));
            }
        }
        if bounds.south >= bounds.north {
            errors.push(format!(
                "South ({}) must be less than north ({})",
                bounds.south, bounds.north
            ));
        }

        let metrics = BoundsMetrics {
            width_deg: bounds.width_deg(),
            height_deg: bounds.height_deg(),
            area_sq_deg: bounds.width_deg() * bounds.height_deg(),
            center: bounds.center(),
        };

        if errors.is_empty() {
            if metrics.area_sq_deg > LARGE_AREA_SQ_DEG {
                warnings.push(format!(
                    "Bounds cover {:.1} square degrees, which is close to global",
                    metrics.area_sq_deg
                ));
            } else if metrics.area_sq_deg < TINY_AREA_SQ_DEG {
                warnings.push(format!(
                    "Bounds cover only {:e} square degrees",
                    metrics.area_sq_deg
                ));
            }
        }

        BoundsReport {
            valid: errors.is_empty(),
            errors,
            warnings,
            metrics: Some(metrics),
        }
    }

    /// Validates bounds given as untyped JSON.
    ///
    /// Accepts `[[south, west], [north, east]]` or an object with `south`,
    /// `west`, `north` and `east` members.
    pub fn validate_json(value: &Value) -> BoundsReport {
        match Self::parse_json(value) {
            Ok(bounds) => Self::validate(&bounds),
            Err(reason) => BoundsReport::invalid(reason),
        }
    }

    /// Extracts typed bounds from JSON without checking ranges.
    pub fn parse_json(value: &Value) -> Result<GeoBounds, String> {
        match value {
            Value::Array(pairs) => {
                if pairs.len() != 2 {
                    return Err(format!(
                        "Bounds must be a pair of corners, got {} elements",
                        pairs.len()
                    ));
                }
                let south_west = corner(&pairs[0], "south-west")?;
                let north_east = corner(&pairs[1], "north-east")?;
                Ok(GeoBounds::from_corners([south_west, north_east]))
            }
            Value::Object(map) => {
                let edge = |name: &str| -> Result<f64, String> {
                    map.get(name)
                        .and_then(Value::as_f64)
                        .ok_or_else(|| format!("Bounds object is missing numeric '{}'", name))
                };
                Ok(GeoBounds::new(
                    edge("south")?,
                    edge("west")?,
                    edge("north")?,
                    edge("east")?,
                ))
            }
            other => Err(format!("Bounds must be an array or object, got {}", other)),
        }
    }
}

fn corner(value: &Value, label: &str) -> Result<[f64; 2], String> {
    let pair = value
        .as_array()
        .filter(|pair| pair.len() == 2)
        .ok_or_else(|| format!("The {} corner must be a [lat, lon] pair", label))?;
    let lat = pair[0]
        .as_f64()
        .ok_or_else(|| format!("The {} latitude is not a number", label))?;
    let lon = pair[1]
        .as_f64()
        .ok_or_else(|| format!("The {} longitude is not a number", label))?;
    Ok([lat, lon])
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    #[test]
    fn test_valid_small_region() {
        let report = BoundsValidator::validate(&GeoBounds::from_corners([
            [45.0, -123.0],
            [45.1, -122.9],
        ]));
        assert!(report.valid, "{:?}", report.errors);
        assert!(report.warnings.is_empty());
        let metrics = report.metrics.unwrap();
        assert!((metrics.height_deg - 0.1).abs() < 1e-9);
    }

    #[test]
    fn test_inverted_latitude_is_invalid() {
        let report = BoundsValidator::validate(&GeoBounds::new(10.0, 0.0, 5.0, 1.0));
        assert!(!report.valid);
        assert!(report.errors[0].contains("South"));
    }

    #[test]
    fn test_degenerate_latitude_is_invalid() {
        let report = BoundsValidator::validate(&GeoBounds::new(5.0, 0.0, 5.0, 1.0));
        assert!(!report.valid);
    }

    #[test]
    fn test_out_of_range_values() {
        let report = BoundsValidator::validate(&GeoBounds::new(-91.0, -181.0, 10.0, 10.0));
        assert!(!report.valid);
        assert_eq!(report.errors.len(), 2);
    }

    #[test]
    fn test_non_finite_values() {
        let report = BoundsValidator::validate(&GeoBounds::new(f64::NAN, 0.0, 1.0, f64::INFINITY));
        assert!(!report.valid);
        assert!(report.errors[0].contains("south"));
        assert!(report.errors[0].contains("east"));
        assert!(report.metrics.is_none());
    }

    #[test]
    fn test_antimeridian_crossing_is_valid() {
        let report = BoundsValidator::validate(&GeoBounds::new(-20.0, 170.0, -10.0, -170.0));
        assert!(report.valid, "{:?}", report.errors);
        assert!((report.metrics.unwrap().width_deg - 20.0).abs() < 1e-9);
    }

    #[test]
    fn test_near_global_warning() {
        let report = BoundsValidator::validate(&GeoBounds::new(-89.0, -180.0, 89.0, 180.0));
        assert!(report.valid);
        assert_eq!(report.warnings.len(), 1);
        assert!(report.warnings[0].contains("global"));
    }

    #[test]
    fn test_tiny_area_warning() {
        let report = BoundsValidator::validate(&GeoBounds::new(0.0, 0.0, 0.0001, 0.0001));
        assert!(report.valid);
        assert_eq!(report.warnings.len(), 1);
    }

    #[test]
    fn test_json_pair_form() {
        let report = BoundsValidator::validate_json(&json!([[45.0, -123.0], [45.1, -122.9]]));
        assert!(report.valid);
    }

    #[test]
    fn test_json_object_form() {
        let report = BoundsValidator::validate_json(&json!({
            "south": 45.0, "west": -123.0, "north": 45.1, "east": -122.9
        }));
        assert!(report.valid);
    }

    #[test]
    fn test_json_malformed_shapes() {
        for value in [
            json!(null),
            json!("45,-123,46,-122"),
            json!([[45.0, -123.0]]),
            json!([[45.0], [45.1, -122.9]]),
            json!([[45.0, "x"], [45.1, -122.9]]),
            json!({"south": 1.0, "west": 2.0, "north": 3.0}),
        ] {
            let report = BoundsValidator::validate_json(&value);
            assert!(!report.valid, "expected {} to be rejected", value);
            assert_eq!(report.errors.len(), 1);
        }
    }

    proptest! {
        #[test]
        fn prop_validate_is_total(
            south in -1000.0f64..1000.0,
            west in -1000.0f64..1000.0,
            north in -1000.0f64..1000.0,
            east in -1000.0f64..1000.0,
        ) {
            let report = BoundsValidator::validate(&GeoBounds::new(south, west, north, east));
            prop_assert_eq!(report.valid, report.errors.is_empty());
            if south >= north {
                prop_assert!(!report.valid);
            }
        }

        #[test]
        fn prop_longitude_order_never_matters(
            south in -90.0f64..89.0,
            height in 0.01f64..1.0,
            west in -180.0f64..=180.0,
            east in -180.0f64..=180.0,
        ) {
            let report = BoundsValidator::validate(&GeoBounds::new(south, west, south + height, east));
            prop_assert!(report.valid, "{:?}", report.errors);
        }
    }
}
