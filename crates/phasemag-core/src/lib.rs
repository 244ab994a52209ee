pub mod consts;
pub mod error;
pub mod frame;
pub mod io;
pub mod magnify;
pub mod packing;
pub mod pipeline;
pub mod pyramid;
pub mod temporal;
