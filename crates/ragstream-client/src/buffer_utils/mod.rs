mod buffering;
mod utf8;

pub use buffering::LineBuffer;
pub use utf8::Utf8Decoder;
