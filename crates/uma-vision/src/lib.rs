pub mod icon;
pub mod matcher;
pub mod ncc;
pub mod ocr;
pub mod preprocess;
pub mod region;
pub mod repeated;

pub use icon::IconClassifier;
pub use matcher::{MatchResult, MultiScaleMatcher, ScaleRange};
pub use ncc::{match_template, PreparedTemplate, ScoreMap};
pub use ocr::{digits_only, LineBox, Ocr, TesseractOcr};
pub use region::{crop, derive, Anchor, BoundingBox, Edge, Offset, RegionSpec, Regions};
pub use repeated::{sort_reading_order, RepeatedElementLocator};
