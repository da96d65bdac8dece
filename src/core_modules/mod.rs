pub mod classifier;
pub mod hand;
pub mod state_machine;
