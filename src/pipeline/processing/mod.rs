// Silver and Gold processing: schema, projection, quality gate, partitioning,
// type normalization and aggregation

pub mod gold;
pub mod normalize;
pub mod partition;
pub mod projection;
pub mod quality_gate;
pub mod schema;
pub mod silver;

pub use quality_gate::{QuarantineReason, RuleCode, ValidationEngine};
pub use schema::{Schema, SchemaLoader};
pub use silver::{run_silver, SilverOutput};
