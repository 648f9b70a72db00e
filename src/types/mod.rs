pub mod errors;
pub mod ids;
pub mod plan;
pub mod report;

pub use errors::*;
pub use ids::*;
pub use plan::*;
pub use report::*;
