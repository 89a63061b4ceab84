use crate::error::GrcError;

pub type GrcResult<T> = Result<T, GrcError>;
