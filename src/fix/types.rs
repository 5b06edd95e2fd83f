/// Geographic position in signed decimal degrees (south/west negative).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Position {
    pub latitude_deg: f64,
    pub longitude_deg: f64,
}

/// Receiver date/time, kept field-by-field exactly as reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixTime {
    pub year: i32,
    pub month: u32,
    pub day: u32,
    pub hour: u32,
    pub minute: u32,
    pub second: u32,
    pub centisecond: u32,
}

/// One instantaneous positioning reading.
///
/// Fields the receiver flagged invalid are `None` and must be omitted from
/// any output entirely, never defaulted. `position` doubles as the fix
/// validity flag: without it a reading cannot be logged at all.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Fix {
    pub position: Option<Position>,
    pub time: FixTime,
    pub altitude_m: Option<f64>,
    pub speed_mps: Option<f64>,
    pub course_deg: Option<f64>,
    pub satellites: Option<u32>,
    pub hdop: Option<f64>,
}

impl Fix {
    pub fn has_fix(&self) -> bool {
        self.position.is_some()
    }
}
