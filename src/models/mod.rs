pub mod ack;
pub mod product;
pub mod report;

pub use ack::*;
pub use product::*;
pub use report::*;
