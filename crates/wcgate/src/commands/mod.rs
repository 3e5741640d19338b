//! CLI command implementations.

pub(crate) mod serve;
pub(crate) mod sign;

pub(crate) use serve::ServeArgs;
pub(crate) use sign::SignArgs;
