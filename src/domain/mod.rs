pub mod device;
pub mod droop;
pub mod edit;
pub mod merge;

pub use device::*;
pub use droop::*;
pub use edit::*;
pub use merge::*;
