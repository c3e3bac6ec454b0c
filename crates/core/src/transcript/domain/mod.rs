pub mod transcript_segment;
