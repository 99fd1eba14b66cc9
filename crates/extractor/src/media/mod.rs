pub mod data;
pub mod filename;
pub mod media_type;
pub mod stream;

pub use data::Data;
pub use filename::{limit_length, sanitize_title};
pub use media_type::MediaType;
pub use stream::{Part, Stream};
