pub mod bounce;
pub mod triangle;
