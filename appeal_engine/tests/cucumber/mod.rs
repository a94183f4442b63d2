pub mod appeal_world;
pub mod setups;
pub mod steps;

pub use appeal_world::AppealWorld;
