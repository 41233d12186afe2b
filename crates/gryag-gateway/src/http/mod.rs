pub mod admin;
pub mod health;
pub mod proactive;
pub mod process;
