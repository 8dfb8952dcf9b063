pub mod content_stream;
pub mod font;
pub mod reader;
pub mod text_lines;
