pub mod hd6301;
pub use hd6301::Hd6301;
