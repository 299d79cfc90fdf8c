pub mod config;
pub mod driver;
pub mod emit;
pub mod keyboard;
pub mod mistake;
pub mod model;
pub mod pause;
pub mod playback;
pub mod session;
pub mod sim;
pub mod speed;
pub mod trace;
