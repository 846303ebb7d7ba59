/// Node bus engine - split by concern
mod core;
mod emitters;
mod handlers;
mod management;
mod stats;

pub use self::core::NodeBus;
pub use stats::BusStats;
