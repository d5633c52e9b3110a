pub mod export;
pub mod models;
pub mod reward_model;
pub mod store;

pub use export::*;
pub use models::*;
pub use reward_model::*;
pub use store::*;
