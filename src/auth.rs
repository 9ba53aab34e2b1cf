//! Bearer token model.

pub mod token;

pub use token::*;
