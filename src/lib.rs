mod chunks;
mod filters;
mod flatten;
mod image_data;
mod pixel;
mod utils;

pub use flatten::{flatten_file, flatten_to_white, resolve_output_path};
pub use pixel::Pixel;
