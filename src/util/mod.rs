pub mod file;
pub mod xdg;
