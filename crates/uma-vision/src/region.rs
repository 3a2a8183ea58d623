use image::{GenericImageView, ImageBuffer, Pixel};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Pixel-space box `(start_x, start_y) - (end_x, end_y)` in the coordinates of the
/// image it was measured on.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub start_x: f64,
    pub start_y: f64,
    pub end_x: f64,
    pub end_y: f64,
}

impl BoundingBox {
    pub fn new(start_x: f64, start_y: f64, end_x: f64, end_y: f64) -> Self {
        Self {
            start_x,
            start_y,
            end_x,
            end_y,
        }
    }

    pub fn width(&self) -> f64 {
        self.end_x - self.start_x
    }

    pub fn height(&self) -> f64 {
        self.end_y - self.start_y
    }

    /// `end > start` on both axes.
    pub fn is_valid(&self) -> bool {
        self.end_x > self.start_x && self.end_y > self.start_y
    }

    pub fn scaled(&self, k: f64) -> Self {
        Self::new(
            self.start_x * k,
            self.start_y * k,
            self.end_x * k,
            self.end_y * k,
        )
    }

    pub fn intersection_over_union(&self, other: &BoundingBox) -> f64 {
        let ix = (self.end_x.min(other.end_x) - self.start_x.max(other.start_x)).max(0.0);
        let iy = (self.end_y.min(other.end_y) - self.start_y.max(other.start_y)).max(0.0);
        let inter = ix * iy;
        let union = self.width() * self.height() + other.width() * other.height() - inter;
        if union <= 0.0 {
            0.0
        } else {
            inter / union
        }
    }

    /// Integer pixel rectangle `(x, y, w, h)` inside a `width` x `height` image.
    /// Coordinates are rounded and clamped; `None` when nothing is left.
    pub fn pixel_rect(&self, width: u32, height: u32) -> Option<(u32, u32, u32, u32)> {
        let clamp = |v: f64, max: u32| -> u32 { v.round().clamp(0.0, max as f64) as u32 };
        let x0 = clamp(self.start_x, width);
        let y0 = clamp(self.start_y, height);
        let x1 = clamp(self.end_x, width);
        let y1 = clamp(self.end_y, height);
        if x1 <= x0 || y1 <= y0 {
            return None;
        }
        Some((x0, y0, x1 - x0, y1 - y0))
    }
}

/// Crop `bbox` out of `image`. Returns `None` for boxes that fall outside the image
/// or collapse to zero pixels.
pub fn crop<I>(
    image: &I,
    bbox: &BoundingBox,
) -> Option<ImageBuffer<I::Pixel, Vec<<I::Pixel as Pixel>::Subpixel>>>
where
    I: GenericImageView + 'static,
{
    let (x, y, w, h) = bbox.pixel_rect(image.width(), image.height())?;
    Some(image.view(x, y, w, h).to_image())
}

/// Which corner of the anchor an offset is measured from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Edge {
    #[default]
    Start,
    End,
}

/// One coordinate of a derived box: `edge + factor * unit`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Offset {
    #[serde(default)]
    pub edge: Edge,
    pub factor: f64,
}

impl Offset {
    pub const fn start(factor: f64) -> Self {
        Self {
            edge: Edge::Start,
            factor,
        }
    }

    pub const fn end(factor: f64) -> Self {
        Self {
            edge: Edge::End,
            factor,
        }
    }
}

/// Declarative rule deriving a named field box from an anchor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionSpec {
    pub name: String,
    pub x0: Offset,
    pub y0: Offset,
    pub x1: Offset,
    pub y1: Offset,
}

impl RegionSpec {
    /// All four multipliers measured from the anchor's start corner.
    pub fn new(name: impl Into<String>, dx0: f64, dy0: f64, dx1: f64, dy1: f64) -> Self {
        Self::with_offsets(
            name,
            Offset::start(dx0),
            Offset::start(dy0),
            Offset::start(dx1),
            Offset::start(dy1),
        )
    }

    pub fn with_offsets(
        name: impl Into<String>,
        x0: Offset,
        y0: Offset,
        x1: Offset,
        y1: Offset,
    ) -> Self {
        Self {
            name: name.into(),
            x0,
            y0,
            x1,
            y1,
        }
    }
}

/// Local coordinate frame established by a matched anchor.
///
/// `unit` is normally the anchor's own size. Repeated rows borrow the unit of the
/// element that located them (the skill tab) while keeping their own corners.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Anchor {
    pub bbox: BoundingBox,
    pub unit_w: f64,
    pub unit_h: f64,
}

impl Anchor {
    pub fn with_unit(bbox: BoundingBox, unit_w: f64, unit_h: f64) -> Self {
        Self {
            bbox,
            unit_w,
            unit_h,
        }
    }

    fn x(&self, offset: Offset) -> f64 {
        let origin = match offset.edge {
            Edge::Start => self.bbox.start_x,
            Edge::End => self.bbox.end_x,
        };
        origin + offset.factor * self.unit_w
    }

    fn y(&self, offset: Offset) -> f64 {
        let origin = match offset.edge {
            Edge::Start => self.bbox.start_y,
            Edge::End => self.bbox.end_y,
        };
        origin + offset.factor * self.unit_h
    }

    pub fn derive_one(&self, spec: &RegionSpec) -> BoundingBox {
        BoundingBox::new(
            self.x(spec.x0),
            self.y(spec.y0),
            self.x(spec.x1),
            self.y(spec.y1),
        )
    }
}

impl From<BoundingBox> for Anchor {
    fn from(bbox: BoundingBox) -> Self {
        Self::with_unit(bbox, bbox.width(), bbox.height())
    }
}

/// Field name to derived box.
pub type Regions = BTreeMap<String, BoundingBox>;

/// Derive every field box of a screen from one anchor.
pub fn derive(anchor: impl Into<Anchor>, specs: &[RegionSpec]) -> Regions {
    let anchor = anchor.into();
    specs
        .iter()
        .map(|spec| (spec.name.clone(), anchor.derive_one(spec)))
        .collect()
}
