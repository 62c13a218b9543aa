pub mod general;
pub mod racetime;
