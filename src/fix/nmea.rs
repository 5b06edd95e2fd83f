//! Minimal NMEA-0183 layer: sentence framing/checksum validation plus the two
//! sentences the logger needs, RMC and GGA.
//!
//! A receiver emits one sentence burst per cycle with RMC last among the ones
//! we read, so the accumulator folds GGA fields into its state and emits a
//! complete fix snapshot for every RMC.

use thiserror::Error;

use super::types::{Fix, FixTime, Position};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum NmeaError {
    #[error("sentence framing invalid")]
    Framing,
    #[error("checksum mismatch: computed {computed:02X}, stated {stated:02X}")]
    Checksum { computed: u8, stated: u8 },
    #[error("malformed {0} field")]
    Field(&'static str),
}

const KNOTS_TO_MPS: f64 = 0.514444;

/// Folds successive sentences into the current receiver state.
#[derive(Debug, Default)]
pub struct NmeaAccumulator {
    altitude_m: Option<f64>,
    satellites: Option<u32>,
    hdop: Option<f64>,
}

impl NmeaAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one raw line. Returns a fix snapshot when the line completes a
    /// receiver cycle; sentences we do not read are accepted and ignored.
    pub fn apply(&mut self, line: &str) -> Result<Option<Fix>, NmeaError> {
        let body = checksum(line)?;
        let fields: Vec<&str> = body.split(',').collect();
        let talker = field(&fields, 0);
        if talker.ends_with("GGA") {
            self.apply_gga(&fields)?;
            Ok(None)
        } else if talker.ends_with("RMC") {
            self.complete(&fields).map(Some)
        } else {
            Ok(None)
        }
    }

    fn apply_gga(&mut self, fields: &[&str]) -> Result<(), NmeaError> {
        let quality = optional_u32(field(fields, 6), "quality")?.unwrap_or(0);
        if quality == 0 {
            self.altitude_m = None;
            self.satellites = None;
            self.hdop = None;
            return Ok(());
        }
        self.satellites = optional_u32(field(fields, 7), "satellites")?;
        self.hdop = optional_f64(field(fields, 8), "hdop")?;
        self.altitude_m = optional_f64(field(fields, 9), "altitude")?;
        Ok(())
    }

    fn complete(&self, fields: &[&str]) -> Result<Fix, NmeaError> {
        let (hour, minute, second, centisecond) = parse_time(field(fields, 1))?;
        let (day, month, year) = parse_date(field(fields, 9))?;

        let position = if field(fields, 2) == "A" {
            let latitude = parse_coordinate(field(fields, 3), field(fields, 4), 2)?;
            let longitude = parse_coordinate(field(fields, 5), field(fields, 6), 3)?;
            match (latitude, longitude) {
                (Some(latitude_deg), Some(longitude_deg)) => Some(Position {
                    latitude_deg,
                    longitude_deg,
                }),
                _ => None,
            }
        } else {
            None
        };

        Ok(Fix {
            position,
            time: FixTime {
                year,
                month,
                day,
                hour,
                minute,
                second,
                centisecond,
            },
            altitude_m: self.altitude_m,
            speed_mps: optional_f64(field(fields, 7), "speed")?.map(|knots| knots * KNOTS_TO_MPS),
            course_deg: optional_f64(field(fields, 8), "course")?,
            satellites: self.satellites,
            hdop: self.hdop,
        })
    }
}

/// Strip `$...*hh` framing and verify the XOR checksum over the body.
fn checksum(line: &str) -> Result<&str, NmeaError> {
    let body = line.trim().strip_prefix('$').ok_or(NmeaError::Framing)?;
    let (body, stated) = body.rsplit_once('*').ok_or(NmeaError::Framing)?;
    let stated = u8::from_str_radix(stated.trim(), 16).map_err(|_| NmeaError::Framing)?;
    let computed = body.bytes().fold(0u8, |acc, byte| acc ^ byte);
    if computed != stated {
        return Err(NmeaError::Checksum { computed, stated });
    }
    Ok(body)
}

fn field<'a>(fields: &[&'a str], index: usize) -> &'a str {
    fields.get(index).copied().unwrap_or("")
}

fn optional_f64(raw: &str, name: &'static str) -> Result<Option<f64>, NmeaError> {
    if raw.is_empty() {
        return Ok(None);
    }
    raw.parse().map(Some).map_err(|_| NmeaError::Field(name))
}

fn optional_u32(raw: &str, name: &'static str) -> Result<Option<u32>, NmeaError> {
    if raw.is_empty() {
        return Ok(None);
    }
    raw.parse().map(Some).map_err(|_| NmeaError::Field(name))
}

/// `hhmmss[.ss]` to hour/minute/second/centisecond.
fn parse_time(raw: &str) -> Result<(u32, u32, u32, u32), NmeaError> {
    let invalid = || NmeaError::Field("time");
    let (whole, fraction) = raw.split_once('.').unwrap_or((raw, ""));
    if whole.len() != 6 || !whole.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }
    let hour = whole[0..2].parse().map_err(|_| invalid())?;
    let minute = whole[2..4].parse().map_err(|_| invalid())?;
    let second = whole[4..6].parse().map_err(|_| invalid())?;
    let centisecond = match fraction.len() {
        0 => 0,
        1 => fraction.parse::<u32>().map_err(|_| invalid())? * 10,
        _ => fraction[..2].parse().map_err(|_| invalid())?,
    };
    Ok((hour, minute, second, centisecond))
}

/// `ddmmyy` to day/month/year, with the receiver's 2000-based year.
fn parse_date(raw: &str) -> Result<(u32, u32, i32), NmeaError> {
    let invalid = || NmeaError::Field("date");
    if raw.len() != 6 || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }
    let day = raw[0..2].parse().map_err(|_| invalid())?;
    let month = raw[2..4].parse().map_err(|_| invalid())?;
    let year: i32 = raw[4..6].parse().map_err(|_| invalid())?;
    Ok((day, month, 2000 + year))
}

/// `ddmm.mmmm`/`dddmm.mmmm` plus hemisphere to signed decimal degrees. An
/// empty coordinate or hemisphere is a valid "no data" marker.
fn parse_coordinate(
    raw: &str,
    hemisphere: &str,
    degree_digits: usize,
) -> Result<Option<f64>, NmeaError> {
    if raw.is_empty() || hemisphere.is_empty() {
        return Ok(None);
    }
    let invalid = || NmeaError::Field("coordinate");
    if raw.len() <= degree_digits {
        return Err(invalid());
    }
    let degrees: f64 = raw[..degree_digits].parse().map_err(|_| invalid())?;
    let minutes: f64 = raw[degree_digits..].parse().map_err(|_| invalid())?;
    let value = degrees + minutes / 60.0;
    match hemisphere {
        "N" | "E" => Ok(Some(value)),
        "S" | "W" => Ok(Some(-value)),
        _ => Err(invalid()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GGA: &str = "$GPGGA,101530.00,3540.87416,N,13946.02750,E,1,08,1.20,45.40,M,39.0,M,,*59";
    const RMC: &str = "$GPRMC,101530.00,A,3540.87416,N,13946.02750,E,0.5,75.2,010324,,,A*6E";

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-6
    }

    #[test]
    fn gga_then_rmc_yields_a_full_fix() {
        let mut receiver = NmeaAccumulator::new();
        assert_eq!(receiver.apply(GGA).unwrap(), None);
        let fix = receiver.apply(RMC).unwrap().unwrap();

        let position = fix.position.unwrap();
        assert!(close(position.latitude_deg, 35.681236));
        assert!(close(position.longitude_deg, 139.767125));
        assert_eq!(
            fix.time,
            FixTime {
                year: 2024,
                month: 3,
                day: 1,
                hour: 10,
                minute: 15,
                second: 30,
                centisecond: 0,
            }
        );
        assert!(close(fix.altitude_m.unwrap(), 45.4));
        assert!(close(fix.speed_mps.unwrap(), 0.5 * KNOTS_TO_MPS));
        assert!(close(fix.course_deg.unwrap(), 75.2));
        assert_eq!(fix.satellites, Some(8));
        assert!(close(fix.hdop.unwrap(), 1.2));
    }

    #[test]
    fn rmc_alone_leaves_gga_fields_invalid() {
        let mut receiver = NmeaAccumulator::new();
        let fix = receiver.apply(RMC).unwrap().unwrap();
        assert!(fix.position.is_some());
        assert_eq!(fix.altitude_m, None);
        assert_eq!(fix.satellites, None);
        assert_eq!(fix.hdop, None);
    }

    #[test]
    fn void_rmc_reports_no_position_but_keeps_the_time() {
        let mut receiver = NmeaAccumulator::new();
        let fix = receiver
            .apply("$GPRMC,101530.00,V,,,,,,,010324,,,N*7F")
            .unwrap()
            .unwrap();
        assert!(fix.position.is_none());
        assert_eq!(fix.time.hour, 10);
        assert_eq!(fix.time.year, 2024);
    }

    #[test]
    fn unfixed_gga_clears_stored_fields() {
        let mut receiver = NmeaAccumulator::new();
        receiver.apply(GGA).unwrap();
        receiver
            .apply("$GPGGA,101530.00,,,,,0,00,,,M,,M,,*4E")
            .unwrap();
        let fix = receiver.apply(RMC).unwrap().unwrap();
        assert_eq!(fix.altitude_m, None);
        assert_eq!(fix.satellites, None);
        assert_eq!(fix.hdop, None);
    }

    #[test]
    fn southern_and_western_hemispheres_negate() {
        let mut receiver = NmeaAccumulator::new();
        let fix = receiver
            .apply("$GPRMC,101530.00,A,3340.87416,S,15846.02750,W,0.5,75.2,010324,,,A*60")
            .unwrap()
            .unwrap();
        let position = fix.position.unwrap();
        assert!(close(position.latitude_deg, -33.681236));
        assert!(close(position.longitude_deg, -158.767125));
    }

    #[test]
    fn fractional_seconds_become_centiseconds() {
        let mut receiver = NmeaAccumulator::new();
        let fix = receiver
            .apply("$GPRMC,101530.50,A,3540.87416,N,13946.02750,E,,,010324,,,A*5E")
            .unwrap()
            .unwrap();
        assert_eq!(fix.time.centisecond, 50);
        assert_eq!(fix.speed_mps, None);
        assert_eq!(fix.course_deg, None);
    }

    #[test]
    fn other_talkers_are_accepted() {
        let mut receiver = NmeaAccumulator::new();
        let fix = receiver
            .apply("$GNRMC,101530.00,A,3540.87416,N,13946.02750,E,0.5,75.2,010324,,,A*70")
            .unwrap()
            .unwrap();
        assert!(fix.position.is_some());
    }

    #[test]
    fn unread_sentences_are_ignored() {
        let mut receiver = NmeaAccumulator::new();
        let result = receiver
            .apply("$GPGSV,3,1,11,03,03,111,00,04,15,270,00,06,01,010,00,13,06,292,00*74")
            .unwrap();
        assert_eq!(result, None);
    }

    #[test]
    fn corrupted_sentences_are_rejected() {
        let mut receiver = NmeaAccumulator::new();
        // One digit flipped, checksum left alone.
        let tampered = GGA.replace(",08,", ",09,");
        assert!(matches!(
            receiver.apply(&tampered),
            Err(NmeaError::Checksum { .. })
        ));
        assert_eq!(receiver.apply("no frame"), Err(NmeaError::Framing));
        assert_eq!(
            receiver.apply("$GPRMC,missing,checksum"),
            Err(NmeaError::Framing)
        );
    }
}
