mod build;
mod info;

pub use build::*;
pub use info::*;
