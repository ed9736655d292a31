//! Function libraries and the calculator session built on them

pub mod calculator;
pub mod filter;
pub mod math;

pub use calculator::{Calculator, MathLibrary, ANSWER};
pub use math::ExtendedMath;
