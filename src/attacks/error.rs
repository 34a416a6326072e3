//! @ai:module:intent Error types for attack resolution and transform invocation
//! @ai:module:layer domain
//! @ai:module:public_api AttackError, TransformError
//! @ai:module:stateless true

use thiserror::Error;

/// @ai:intent Failure inside a single transform: argument binding or pixel processing
#[derive(Error, Debug)]
pub enum TransformError {
    #[error("missing required argument '{0}'")]
    MissingArgument(String),

    #[error("unexpected argument '{0}'")]
    UnexpectedArgument(String),

    #[error("transform takes no positional argument")]
    NoPositionalArgument,

    #[error("invalid value for '{name}': {reason}")]
    InvalidArgument { name: String, reason: String },

    #[error("degenerate output geometry {width}x{height}")]
    Geometry { width: i64, height: i64 },

    #[error("image codec error: {0}")]
    Codec(#[from] image::ImageError),
}

/// @ai:intent Failure resolving or invoking an attack through the registry
#[derive(Error, Debug)]
pub enum AttackError {
    #[error("unknown attack category: {0}")]
    UnknownCategory(String),

    #[error("unknown attack '{name}' in category '{category}'")]
    UnknownAttack { category: String, name: String },

    #[error("attack {name}.{category} failed: {source}")]
    Failed {
        category: String,
        name: String,
        #[source]
        source: TransformError,
    },
}
