pub mod design;
pub mod shared;
pub mod submission;
