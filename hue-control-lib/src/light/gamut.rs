use std::collections::BTreeMap;

use log::{debug, warn};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::light::light_ref::LightRef;
use crate::util::error::{HubError, ValueError};

/// A point in xy chromaticity space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 2]", into = "[f64; 2]")]
pub struct XyPoint {
    pub x: f64,
    pub y: f64,
}

impl XyPoint {
    pub fn new(x: f64, y: f64) -> Self {
        XyPoint { x, y }
    }

    /// Like [`XyPoint::new`] but rejects coordinates outside the unit square.
    pub fn checked(x: f64, y: f64) -> Result<Self, ValueError> {
        if (0.0..=1.0).contains(&x) && (0.0..=1.0).contains(&y) {
            Ok(XyPoint { x, y })
        } else {
            Err(ValueError::Xy(x, y))
        }
    }
}

impl From<[f64; 2]> for XyPoint {
    fn from([x, y]: [f64; 2]) -> Self {
        XyPoint { x, y }
    }
}

impl From<XyPoint> for [f64; 2] {
    fn from(point: XyPoint) -> Self {
        [point.x, point.y]
    }
}

/// The triangle of colors a light can reproduce.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ColorGamut {
    vertices: [XyPoint; 3],
}

impl ColorGamut {
    pub fn new(vertices: [XyPoint; 3]) -> Result<Self, ValueError> {
        for vertex in &vertices {
            XyPoint::checked(vertex.x, vertex.y)?;
        }
        Ok(ColorGamut { vertices })
    }

    /// Parses the `colorgamut` array the hub reports, e.g. `[[0.6915, 0.3083], [0.17, 0.7], [0.1532, 0.0475]]`.
    pub fn from_value(value: &Value) -> Result<Self, HubError> {
        let points: Vec<XyPoint> = serde_json::from_value(value.clone())
            .map_err(|e| HubError::MalformedResponse(format!("invalid color gamut: {}", e)))?;
        let vertices: [XyPoint; 3] = points.try_into().map_err(|points: Vec<XyPoint>| {
            HubError::MalformedResponse(format!(
                "color gamut has {} vertices, expected 3",
                points.len()
            ))
        })?;
        Ok(ColorGamut::new(vertices)?)
    }

    pub fn vertices(&self) -> &[XyPoint; 3] {
        &self.vertices
    }

    /// Blends along the edge leaving `segment`: `frac` weights `vertex[segment]` and
    /// `1 - frac` weights the next vertex, wrapping after the third.
    pub fn edge_point(&self, segment: usize, frac: f64) -> XyPoint {
        let from = self.vertices[segment % 3];
        let to = self.vertices[(segment + 1) % 3];
        XyPoint {
            x: frac * from.x + (1.0 - frac) * to.x,
            y: frac * from.y + (1.0 - frac) * to.y,
        }
    }

    /// Whether `point` lies inside the triangle or on its border, within `epsilon`.
    pub fn contains(&self, point: XyPoint, epsilon: f64) -> bool {
        let [a, b, c] = self.vertices;
        let cross = |p: XyPoint, q: XyPoint, r: XyPoint| (q.x - p.x) * (r.y - p.y) - (q.y - p.y) * (r.x - p.x);
        let d1 = cross(a, b, point);
        let d2 = cross(b, c, point);
        let d3 = cross(c, a, point);
        let has_neg = d1 < -epsilon || d2 < -epsilon || d3 < -epsilon;
        let has_pos = d1 > epsilon || d2 > epsilon || d3 > epsilon;
        !(has_neg && has_pos)
    }
}

/// Gamut triangles for every color-capable light, keyed by light.
///
/// Built once from the light metadata. It does not refresh itself, so rebuild it when the
/// hub's light list changes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GamutRegistry {
    gamuts: BTreeMap<LightRef, ColorGamut>,
}

impl GamutRegistry {
    /// Extracts `capabilities.control.colorgamut` from the `GET lights` map.
    ///
    /// Lights without a gamut (white-only bulbs) are left out. A gamut that is present but
    /// malformed fails the whole build.
    pub fn build(lights: &Map<String, Value>) -> Result<Self, HubError> {
        let mut gamuts = BTreeMap::new();
        for (id, metadata) in lights {
            match metadata.pointer("/capabilities/control/colorgamut") {
                Some(value) => {
                    let gamut = ColorGamut::from_value(value)?;
                    debug!("light {} gamut {:?}", id, gamut.vertices());
                    gamuts.insert(LightRef::new(id.as_str()), gamut);
                }
                None => warn!("light {} reports no color gamut, skipping", id),
            }
        }
        Ok(GamutRegistry { gamuts })
    }

    pub fn get(&self, light: &LightRef) -> Option<&ColorGamut> {
        self.gamuts.get(light)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&LightRef, &ColorGamut)> {
        self.gamuts.iter()
    }

    pub fn lights(&self) -> Vec<LightRef> {
        self.gamuts.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.gamuts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.gamuts.is_empty()
    }
}

impl FromIterator<(LightRef, ColorGamut)> for GamutRegistry {
    fn from_iter<T: IntoIterator<Item = (LightRef, ColorGamut)>>(iter: T) -> Self {
        GamutRegistry {
            gamuts: iter.into_iter().collect(),
        }
    }
}
