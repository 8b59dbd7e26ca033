pub mod plan;
pub mod saved;
pub mod setup;
pub mod squad;
pub mod suggest;
pub mod ui;
