pub mod aggregate;
pub mod chart;
pub mod error;
pub mod identity;
pub mod locate;
pub mod parse;
pub mod registry;
pub mod report;

pub use error::{ChartError, NameError, Result};
pub use identity::{normalize, CanonicalIdentity};
pub use registry::{SeriesRegistry, StyleLookup};
