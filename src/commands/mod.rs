//! Command implementations for ccnd

pub mod interest;
pub mod run;
pub mod wire;
