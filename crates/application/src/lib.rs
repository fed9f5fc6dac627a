#![forbid(unsafe_code)]

pub mod admission_service_impl;
pub mod bootstrap;
pub mod command;
pub mod limiter_service_impl;
pub mod projection;
pub mod query;
pub mod rule_service_impl;

#[cfg(test)]
pub(crate) mod test_support;
