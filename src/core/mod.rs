pub mod errors;
pub mod types;

pub use errors::{Error, Result, ResultExt};
pub use types::{
    CallerIdentity, DeadLetterConfig, Destination, DestinationConfig, Environment,
    EventSourceMapping, FileSystemConfig, FunctionAlias, FunctionDescriptor, LayerRef, VpcConfig,
    LATEST_VERSION,
};
