pub mod index;
pub mod thirteenf;
pub mod utils;
pub mod xml;
