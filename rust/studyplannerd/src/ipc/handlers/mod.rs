pub mod core;
pub mod generate;
pub mod session;
pub mod setup;
pub mod submissions;
