//! EduFund Common Types
//!
//! Shared types for the EduFund currency service: currency codes, rate
//! tables, rounding rules, the clock abstraction and Dirham display helpers.

pub mod monetary;
pub mod error;
pub mod time;
pub mod display;

pub use monetary::*;
pub use error::*;
pub use time::*;
pub use display::*;
