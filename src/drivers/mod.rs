pub mod driver;
pub mod driver_init;
pub use driver::driver_names;
pub use driver::open;
pub use driver_init::init;

pub mod request;

pub mod dummy;
pub mod simulator;

#[cfg(feature = "btle_driver")]
pub mod btle;
