pub mod integrity_checker;
pub mod star_schema;

pub use integrity_checker::{IntegrityChecker, IntegrityReport, IntegrityViolation, ViolationType};
pub use star_schema::{StarSchema, TransformPipeline, TransformReport};
