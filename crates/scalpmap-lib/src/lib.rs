pub mod electrode;
pub mod export;
pub mod field;
pub mod frame;
pub mod montage;

pub use electrode::*;
pub use field::*;
pub use frame::*;
pub use montage::*;
