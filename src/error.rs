use thiserror::Error;

use crate::format::{FieldFormat, FieldName};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum FluidError {
    #[error("cannot allocate {field:?} with a zero-sized grid ({width}x{height})")]
    ZeroSized {
        field: FieldName,
        width: u32,
        height: u32,
    },
    #[error("format {format:?} requested for {field:?} is not supported by this runtime")]
    UnsupportedFormat { field: FieldName, format: FieldFormat },
    #[error("field {0:?} has not been allocated")]
    NotAllocated(FieldName),
    #[error("pass would read and write the single buffer of {0:?}")]
    FeedbackHazard(FieldName),
    #[error("texture for {0:?} is not resident on the GPU yet")]
    NotResident(FieldName),
    #[error("invalid simulation config: {0}")]
    InvalidConfig(String),
}

pub type FluidResult<T> = Result<T, FluidError>;
