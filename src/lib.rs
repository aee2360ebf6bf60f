pub mod error;

pub mod protocol {
    pub mod cmd_defs;
    pub mod convert;
    pub mod response;
}

pub mod drivers;

pub mod utils {
    pub mod dyn_future;
    pub mod scene_table;
}

pub mod lamp {
    pub mod controller;
}
