//! Document rendering helpers for printed purchase orders.
//!
//! Pure functions only: no IO, no configuration.

pub mod amount_words;
pub mod cardinal;

pub use amount_words::{amount_to_words, title_case, WordsError};
pub use cardinal::cardinal_words;
