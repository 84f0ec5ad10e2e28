//! Earth Engine expression graphs.
//!
//! Server-side objects (collections, images, reducers) never exist locally.
//! They are described as a tree of function invocations which the service
//! evaluates on request. [`ValueNode`] is one node of that tree and serializes
//! to the REST API's `ValueNode` JSON; [`Expression`] wraps a root node.
//!
//! The free functions in this module build the handful of algorithms the
//! water-area workflow needs, named after the server algorithms they invoke.

use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use waterbox_geo::{BoundingBox, DateRange};

/// Dynamic World land-cover collection.
pub const DYNAMIC_WORLD_COLLECTION: &str = "GOOGLE/DYNAMICWORLD/V1";

/// Property holding an image's acquisition time.
const TIME_START_PROPERTY: &str = "system:time_start";

/// One node of an expression graph.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ValueNode {
    /// A literal JSON value.
    ConstantValue(Value),
    /// A call to a server algorithm.
    FunctionInvocationValue(FunctionInvocation),
    /// A list of nodes.
    ArrayValue {
        /// Elements.
        values: Vec<ValueNode>,
    },
}

/// A call to a named server algorithm with named arguments.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionInvocation {
    /// Algorithm name, e.g. `Image.select`.
    pub function_name: String,
    /// Arguments by parameter name.
    pub arguments: BTreeMap<String, ValueNode>,
}

impl ValueNode {
    /// A constant node.
    pub fn constant(value: impl Into<Value>) -> Self {
        ValueNode::ConstantValue(value.into())
    }

    /// A call to `function_name` with the given arguments.
    pub fn invoke<'a>(
        function_name: &str,
        arguments: impl IntoIterator<Item = (&'a str, ValueNode)>,
    ) -> Self {
        ValueNode::FunctionInvocationValue(FunctionInvocation {
            function_name: function_name.to_string(),
            arguments: arguments
                .into_iter()
                .map(|(name, node)| (name.to_string(), node))
                .collect(),
        })
    }

    /// A call to `function_name` without arguments.
    pub fn call(function_name: &str) -> Self {
        ValueNode::FunctionInvocationValue(FunctionInvocation {
            function_name: function_name.to_string(),
            arguments: BTreeMap::new(),
        })
    }

    /// A list node.
    pub fn array(values: Vec<ValueNode>) -> Self {
        ValueNode::ArrayValue { values }
    }

    /// Name of the invoked algorithm, if this node is a call.
    pub fn function_name(&self) -> Option<&str> {
        match self {
            ValueNode::FunctionInvocationValue(call) => Some(&call.function_name),
            _ => None,
        }
    }

    /// Argument `name` of this call, if any.
    pub fn argument(&self, name: &str) -> Option<&ValueNode> {
        match self {
            ValueNode::FunctionInvocationValue(call) => call.arguments.get(name),
            _ => None,
        }
    }

    /// True if this node or any descendant invokes `function_name`.
    pub fn invokes(&self, function_name: &str) -> bool {
        match self {
            ValueNode::ConstantValue(_) => false,
            ValueNode::FunctionInvocationValue(call) => {
                call.function_name == function_name
                    || call.arguments.values().any(|arg| arg.invokes(function_name))
            }
            ValueNode::ArrayValue { values } => values.iter().any(|v| v.invokes(function_name)),
        }
    }
}

/// A complete expression: a graph with a designated result node.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Expression {
    result: String,
    values: BTreeMap<String, ValueNode>,
}

impl Expression {
    /// Expression whose result is `root`.
    pub fn new(root: ValueNode) -> Self {
        let mut values = BTreeMap::new();
        values.insert("0".to_string(), root);
        Self {
            result: "0".to_string(),
            values,
        }
    }

    /// The result node.
    pub fn root(&self) -> &ValueNode {
        &self.values[&self.result]
    }
}

impl From<ValueNode> for Expression {
    fn from(root: ValueNode) -> Self {
        Expression::new(root)
    }
}

// ============================================================================
// Geometry
// ============================================================================

/// Planar rectangle over `[min_lon, min_lat, max_lon, max_lat]`.
pub fn rectangle(bbox: &BoundingBox) -> ValueNode {
    ValueNode::invoke(
        "GeometryConstructors.Rectangle",
        [
            ("coordinates", ValueNode::constant(bbox.coords().to_vec())),
            ("geodesic", ValueNode::constant(false)),
        ],
    )
}

// ============================================================================
// Filters and collections
// ============================================================================

/// Load an image collection by asset id.
pub fn image_collection(id: &str) -> ValueNode {
    ValueNode::invoke("ImageCollection.load", [("id", ValueNode::constant(id))])
}

/// Elements whose footprint intersects `geometry`.
pub fn filter_bounds(geometry: ValueNode) -> ValueNode {
    ValueNode::invoke(
        "Filter.intersects",
        [
            ("leftField", ValueNode::constant(".all")),
            ("rightValue", geometry),
        ],
    )
}

/// Elements acquired within `range` (start inclusive, end exclusive on the server).
pub fn filter_date(range: &DateRange) -> ValueNode {
    let date = |iso: String| ValueNode::invoke("Date", [("value", ValueNode::constant(iso))]);
    ValueNode::invoke(
        "Filter.dateRangeContains",
        [
            (
                "leftValue",
                ValueNode::invoke(
                    "DateRange",
                    [
                        ("start", date(range.start_iso())),
                        ("end", date(range.end_iso())),
                    ],
                ),
            ),
            ("rightField", ValueNode::constant(TIME_START_PROPERTY)),
        ],
    )
}

/// Conjunction of filters.
pub fn filter_and(filters: Vec<ValueNode>) -> ValueNode {
    ValueNode::invoke("Filter.and", [("filters", ValueNode::array(filters))])
}

/// Apply `filter` to `collection`.
pub fn filter_collection(collection: ValueNode, filter: ValueNode) -> ValueNode {
    ValueNode::invoke(
        "Collection.filter",
        [("collection", collection), ("filter", filter)],
    )
}

/// Number of elements in `collection`.
pub fn collection_size(collection: ValueNode) -> ValueNode {
    ValueNode::invoke("Collection.size", [("collection", collection)])
}

/// First element of `collection` in its default order.
pub fn collection_first(collection: ValueNode) -> ValueNode {
    ValueNode::invoke("Collection.first", [("collection", collection)])
}

// ============================================================================
// Images
// ============================================================================

/// Keep only `bands` of `image`.
pub fn select_bands(image: ValueNode, bands: &[&str]) -> ValueNode {
    ValueNode::invoke(
        "Image.select",
        [
            ("input", image),
            ("bandSelectors", ValueNode::constant(bands.to_vec())),
        ],
    )
}

/// Image whose pixels hold their own area in m².
pub fn pixel_area() -> ValueNode {
    ValueNode::call("Image.pixelArea")
}

/// Constant image.
pub fn constant_image(value: f64) -> ValueNode {
    ValueNode::invoke("Image.constant", [("value", ValueNode::constant(value))])
}

/// Pixelwise product.
pub fn multiply(image1: ValueNode, image2: ValueNode) -> ValueNode {
    ValueNode::invoke("Image.multiply", [("image1", image1), ("image2", image2)])
}

/// Pixelwise `image > threshold`, yielding 0/1.
pub fn greater_than(image: ValueNode, threshold: f64) -> ValueNode {
    ValueNode::invoke(
        "Image.gt",
        [("image1", image), ("image2", constant_image(threshold))],
    )
}

/// Mask out pixels whose value is zero.
pub fn self_mask(image: ValueNode) -> ValueNode {
    ValueNode::invoke("Image.selfMask", [("image", image)])
}

/// Sum of every band over `geometry` at `scale` meters per pixel.
///
/// Evaluates to a dictionary keyed by band name; a band with no valid pixels
/// maps to null.
pub fn reduce_region_sum(image: ValueNode, geometry: ValueNode, scale: f64) -> ValueNode {
    ValueNode::invoke(
        "Image.reduceRegion",
        [
            ("image", image),
            ("reducer", ValueNode::call("Reducer.sum")),
            ("geometry", geometry),
            ("scale", ValueNode::constant(scale)),
        ],
    )
}

/// Render `image` to RGB with a value range and palette.
pub fn visualize(image: ValueNode, band: &str, min: f64, max: f64, palette: &[String]) -> ValueNode {
    ValueNode::invoke(
        "Image.visualize",
        [
            ("image", image),
            ("bands", ValueNode::constant(vec![band])),
            ("min", ValueNode::constant(min)),
            ("max", ValueNode::constant(max)),
            ("palette", ValueNode::constant(palette.to_vec())),
        ],
    )
}

/// Crop `image` to `geometry` and scale so the longer side is `max_dimension` pixels.
pub fn clip_to_bounds_and_scale(image: ValueNode, geometry: ValueNode, max_dimension: u32) -> ValueNode {
    ValueNode::invoke(
        "Image.clipToBoundsAndScale",
        [
            ("input", image),
            ("geometry", geometry),
            ("maxDimension", ValueNode::constant(max_dimension)),
        ],
    )
}
