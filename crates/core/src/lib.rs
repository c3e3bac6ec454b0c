//! Aligns lecture transcripts with slide decks by finding, in the lecture
//! recording, when each slide is on screen.

pub mod matching;
pub mod pipeline;
pub mod shared;
pub mod slides;
pub mod timeline;
pub mod transcript;
pub mod video;

#[cfg(test)]
pub(crate) mod test_support;
