//! Resolution-independent coordinate model.
//!
//! ROI tables are authored at a reference resolution per aspect ratio and
//! resolved for the live window's client size at the start of each scan.

pub mod builtin;
pub mod coords;
pub mod profile;

pub use builtin::roi;
pub use coords::{Axis, Point, Rect};
pub use profile::{indexed, resolve_screen_profile, ScreenProfile};
