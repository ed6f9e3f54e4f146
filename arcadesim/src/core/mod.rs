pub mod car;
pub mod context;
pub mod driver;
pub mod dynamics;
pub mod handle_race;
pub mod input;
pub mod race;
pub mod resources;
pub mod scheduler;
pub mod state_handler;
pub mod telemetry;
pub mod track;
pub mod upgrades;
