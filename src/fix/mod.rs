mod nmea;
mod types;

pub use nmea::{NmeaAccumulator, NmeaError};
pub use types::{Fix, FixTime, Position};
