pub mod channel_writer;
pub mod part;

pub use channel_writer::PartChannelWriter;
pub use part::Part;
