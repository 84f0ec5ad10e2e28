//! Map overlay of the water mask.
//!
//! The mask is thresholded, colored and clipped on the server; the resulting
//! thumbnail URL is placed over an OpenStreetMap base layer in a standalone
//! Leaflet page.

use crate::query::{AreaError, WaterMask};
use std::path::Path;
use tracing::{debug, info};
use waterbox_ee::{expr, Expression, GeoService};
use waterbox_geo::BoundingBox;

/// Appearance of the overlay.
#[derive(Debug, Clone, PartialEq)]
pub struct OverlayStyle {
    /// Initial zoom level.
    pub zoom: u8,
    /// Overlay opacity in [0, 1].
    pub opacity: f64,
    /// Hex colors for water pixels.
    pub palette: Vec<String>,
    /// Longer side of the thumbnail in pixels.
    pub max_dimension: u32,
    /// Water probability above which a pixel is drawn.
    pub threshold: f64,
}

impl Default for OverlayStyle {
    fn default() -> Self {
        Self {
            zoom: 10,
            opacity: 0.7,
            palette: vec!["0000FF".to_string()],
            max_dimension: 512,
            threshold: 0.5,
        }
    }
}

/// A rendered overlay ready to be embedded in a map.
#[derive(Debug, Clone, PartialEq)]
pub struct MapOverlay {
    /// Map center as (lat, lon).
    pub center: (f64, f64),
    /// Initial zoom level.
    pub zoom: u8,
    /// URL of the overlay image.
    pub image_url: String,
    /// Geographic extent of the image.
    pub bounds: BoundingBox,
    /// Overlay opacity.
    pub opacity: f64,
}

const LEAFLET_VERSION: &str = "1.9.4";

const HTML_TEMPLATE: &str = r#"<!DOCTYPE html>
<html>
<head>
  <meta charset="utf-8">
  <title>Water overlay</title>
  <link rel="stylesheet" href="https://unpkg.com/leaflet@{{LEAFLET}}/dist/leaflet.css">
  <script src="https://unpkg.com/leaflet@{{LEAFLET}}/dist/leaflet.js"></script>
  <style>html, body, #map { height: 100%; margin: 0; }</style>
</head>
<body>
  <div id="map"></div>
  <script>
    var map = L.map('map').setView({{CENTER}}, {{ZOOM}});
    L.tileLayer('https://{s}.tile.openstreetmap.org/{z}/{x}/{y}.png', {
      maxZoom: 19,
      attribution: '&copy; OpenStreetMap contributors'
    }).addTo(map);
    var water = L.imageOverlay({{IMAGE_URL}}, {{BOUNDS}}, { opacity: {{OPACITY}} }).addTo(map);
    L.control.layers(null, { 'Water': water }, { collapsed: false }).addTo(map);
  </script>
</body>
</html>
"#;

/// JSON literal safe to place inside a `<script>` element.
fn script_literal(value: &serde_json::Value) -> String {
    value.to_string().replace("</", "<\\/")
}

impl MapOverlay {
    /// Standalone HTML page showing the overlay.
    pub fn to_html(&self) -> String {
        let (lat, lon) = self.center;
        let b = &self.bounds;
        let bounds = serde_json::json!([[b.min_lat(), b.min_lon()], [b.max_lat(), b.max_lon()]]);

        HTML_TEMPLATE
            .replace("{{LEAFLET}}", LEAFLET_VERSION)
            .replace("{{CENTER}}", &serde_json::json!([lat, lon]).to_string())
            .replace("{{ZOOM}}", &self.zoom.to_string())
            .replace(
                "{{IMAGE_URL}}",
                &script_literal(&serde_json::Value::from(self.image_url.as_str())),
            )
            .replace("{{BOUNDS}}", &bounds.to_string())
            .replace("{{OPACITY}}", &serde_json::json!(self.opacity).to_string())
    }

    /// Write the page to `path`.
    pub fn write_html<P: AsRef<Path>>(&self, path: P) -> std::io::Result<()> {
        let path = path.as_ref();
        std::fs::write(path, self.to_html())?;
        info!("Wrote map overlay to {}", path.display());
        Ok(())
    }
}

/// Expression producing the colored, clipped overlay image.
pub fn overlay_expression(mask: &WaterMask, bbox: &BoundingBox, style: &OverlayStyle) -> Expression {
    let water = expr::self_mask(expr::greater_than(mask.image.clone(), style.threshold));
    let colored = expr::visualize(water, &mask.band, 0.0, 1.0, &style.palette);
    Expression::new(expr::clip_to_bounds_and_scale(
        colored,
        expr::rectangle(bbox),
        style.max_dimension,
    ))
}

/// Render the water mask over `bbox` and describe the resulting map.
///
/// Thumbnail failures are returned as errors rather than producing a map
/// without an overlay.
pub fn render_overlay<S: GeoService>(
    service: &S,
    mask: &WaterMask,
    bbox: &BoundingBox,
    style: &OverlayStyle,
) -> Result<MapOverlay, AreaError> {
    let image_url = service.thumbnail_url(&overlay_expression(mask, bbox, style))?;
    debug!("Overlay image at {}", image_url);

    Ok(MapOverlay {
        center: bbox.centroid(),
        zoom: style.zoom,
        image_url,
        bounds: *bbox,
        opacity: style.opacity,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use waterbox_ee::ValueNode;

    fn mask() -> WaterMask {
        WaterMask {
            image: expr::select_bands(expr::pixel_area(), &["water"]),
            band: "water".to_string(),
        }
    }

    fn bbox() -> BoundingBox {
        BoundingBox::new(20.0, 52.0, 21.0, 53.0).unwrap()
    }

    #[test]
    fn test_overlay_expression_structure() {
        let expression = overlay_expression(&mask(), &bbox(), &OverlayStyle::default());
        let root = expression.root();

        assert_eq!(root.function_name(), Some("Image.clipToBoundsAndScale"));
        assert_eq!(root.argument("maxDimension"), Some(&ValueNode::constant(512u32)));

        let visualized = root.argument("input").unwrap();
        assert_eq!(visualized.function_name(), Some("Image.visualize"));
        assert_eq!(visualized.argument("palette"), Some(&ValueNode::constant(vec!["0000FF"])));
        assert_eq!(visualized.argument("min"), Some(&ValueNode::constant(0.0)));
        assert_eq!(visualized.argument("max"), Some(&ValueNode::constant(1.0)));

        let masked = visualized.argument("image").unwrap();
        assert_eq!(masked.function_name(), Some("Image.selfMask"));
        assert!(masked.invokes("Image.gt"));
    }

    #[test]
    fn test_html_embeds_values() {
        let overlay = MapOverlay {
            center: (52.5, 20.5),
            zoom: 10,
            image_url: "https://example.test/thumb?a=1&b=\"2\"".to_string(),
            bounds: bbox(),
            opacity: 0.7,
        };
        let html = overlay.to_html();

        assert!(html.contains("setView([52.5,20.5], 10)"));
        assert!(html.contains("opacity: 0.7"));
        assert!(html.contains("[[52.0,20.0],[53.0,21.0]]"));
        assert!(html.contains(r#""https://example.test/thumb?a=1&b=\"2\"""#));
        assert!(html.contains("leaflet@1.9.4"));
        assert!(!html.contains("{{"));
    }

    #[test]
    fn test_image_url_cannot_close_script() {
        let overlay = MapOverlay {
            center: (52.5, 20.5),
            zoom: 10,
            image_url: "https://example.test/thumb?x=</script><script>alert(1)</script>".to_string(),
            bounds: bbox(),
            opacity: 0.7,
        };
        let html = overlay.to_html();

        assert_eq!(html.matches("</script>").count(), 2);
        assert!(html.contains(r#""https://example.test/thumb?x=<\/script><script>alert(1)<\/script>""#));
    }

    #[test]
    fn test_write_html() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("map.html");
        let overlay = MapOverlay {
            center: (52.5, 20.5),
            zoom: 10,
            image_url: "https://example.test/thumb".to_string(),
            bounds: bbox(),
            opacity: 0.7,
        };
        overlay.write_html(&path).unwrap();
        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.starts_with("<!DOCTYPE html>"));
    }
}
