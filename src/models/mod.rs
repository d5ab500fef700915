pub mod event;
pub mod file;
pub mod generation;
pub mod material;
pub mod question;
pub mod test;
