pub mod def;
pub mod session;
pub mod state;
