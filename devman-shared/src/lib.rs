pub mod device;
pub mod tags;
