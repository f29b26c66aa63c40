//! Command implementations

pub mod capabilities;
pub mod new;
pub mod run;
pub mod validate;
