//! Bounds command - check a bounding box before using it for an overlay.

use console::style;
use lidarlayer::geo::GeoBounds;
use lidarlayer::validation::{BoundsReport, BoundsValidator};

use crate::error::CliError;

/// Run the bounds command.
pub fn run(south: f64, west: f64, north: f64, east: f64) -> Result<(), CliError> {
    let bounds = GeoBounds::new(south, west, north, east);
    let report = BoundsValidator::validate(&bounds);
    print!("{}", render(&bounds, &report));

    if report.valid {
        Ok(())
    } else {
        Err(CliError::InvalidBounds(report.errors.join("; ")))
    }
}

fn render(bounds: &GeoBounds, report: &BoundsReport) -> String {
    let mut out = String::new();
    let status = if report.valid {
        style("valid").green().to_string()
    } else {
        style("invalid").red().bold().to_string()
    };
    out.push_str(&format!(
        "Bounds [{}, {}] - [{}, {}]: {}\n",
        bounds.south, bounds.west, bounds.north, bounds.east, status
    ));

    if let Some(m) = &report.metrics {
        out.push_str(&format!("  Width:   {:.6}°\n", m.width_deg));
        out.push_str(&format!("  Height:  {:.6}°\n", m.height_deg));
        out.push_str(&format!("  Area:    {:.6} sq°\n", m.area_sq_deg));
        out.push_str(&format!("  Center:  {:.6}, {:.6}\n", m.center.0, m.center.1));
        if bounds.crosses_antimeridian() {
            out.push_str("  Crosses the antimeridian\n");
        }
    }
    for error in &report.errors {
        out.push_str(&format!("  {} {}\n", style("error:").red(), error));
    }
    for warning in &report.warnings {
        out.push_str(&format!("  {} {}\n", style("warning:").yellow(), warning));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_bounds() {
        assert!(run(42.90, -122.20, 42.96, -122.10).is_ok());
    }

    #[test]
    fn test_inverted_latitude_is_error() {
        let err = run(42.96, -122.20, 42.90, -122.10).unwrap_err();
        assert!(matches!(err, CliError::InvalidBounds(_)));
    }

    #[test]
    fn test_render_mentions_antimeridian() {
        let bounds = GeoBounds::new(-20.0, 170.0, -10.0, -170.0);
        let report = BoundsValidator::validate(&bounds);
        let text = render(&bounds, &report);
        assert!(text.contains("antimeridian"));
        assert!(text.contains("Width:   20.000000"));
    }
}
