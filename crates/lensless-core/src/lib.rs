pub mod analysis;
pub mod array;
pub mod consts;
pub mod convert;
pub mod error;
pub mod hardware;
pub mod io;
pub mod normalize;
