#![deny(missing_docs)]
#![doc = "Shared error surface and configuration schema for the expmat \
experiment matrix engine."]

pub mod errors;
pub mod schema;

pub use errors::{ErrorInfo, ExpmatError};
pub use schema::{
    from_yaml_str, is_reserved_name, AxisDecl, BuildDecl, BuildStepDecl, ConfigDoc,
    ExperimentDecl, GeneratorDecl, InstanceBlock, InstanceItemDecl, MatrixDecl, OneOrMany,
    RevisionDecl, VariantDecl, DEFAULT_DEV_NAME, RESERVED_PREFIX,
};
