//! Text processors applied before synthesis

mod cleaner;
mod segmenter;

pub use cleaner::clean_markup;
pub use segmenter::{segment, word_count};
