//! HTTP request handlers.

pub(crate) mod proxy;
