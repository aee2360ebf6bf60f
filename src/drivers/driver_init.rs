use crate::drivers;
use crate::error::DynResult;
#[cfg(feature = "btle_driver")]
use drivers::btle;
use drivers::driver::add_driver;
use drivers::{dummy, simulator};

pub fn init() -> DynResult<()> {
    add_driver(dummy::driver_info());
    add_driver(simulator::driver_info());
    #[cfg(feature = "btle_driver")]
    add_driver(btle::driver_info());
    Ok(())
}
