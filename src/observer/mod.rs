mod error;
mod geometry;
mod ground_station;
mod signal;

pub use error::GeometryError;
pub use geometry::{ecef_to_enu, observe, range_rate, Observation};
pub use ground_station::GroundObserver;
pub use signal::{estimate_signal, free_space_path_loss_db, AntennaGains, SignalModel};
