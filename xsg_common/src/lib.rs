mod piconero;

pub mod op;
mod secret;

pub use piconero::{Piconero, PiconeroConversionError, PICONERO_PER_XMR};
pub use secret::Secret;
