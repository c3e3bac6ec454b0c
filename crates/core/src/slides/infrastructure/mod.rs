pub mod slide_decoder;
