pub mod entsoe;
pub mod heartbeat;
