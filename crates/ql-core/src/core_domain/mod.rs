mod error;
mod ports;
mod refine;
mod reward;
mod selection;
mod types;
mod verdict;

#[cfg(test)]
pub(crate) mod testing;

pub use error::*;
pub use ports::*;
pub use refine::*;
pub use reward::*;
pub use selection::*;
pub use types::*;
pub use verdict::*;
