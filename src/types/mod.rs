pub mod conversions;
pub mod token;

pub use token::{Token, NATIVE_TOKEN_ADDRESS};
