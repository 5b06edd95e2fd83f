use std::io::{Seek, SeekFrom, Write};
use std::path::PathBuf;
use std::time::Duration;

use log::error;

use super::error::LoggerError;
use super::format::{format_scalar, format_timestamp};
use super::session::{Session, GPX_EPILOGUE};
use crate::fix::{Fix, Position};

// Precision contracts per point field: (field width, fraction digits).
const LATLON: (usize, usize) = (10, 6);
const ELEVATION: (usize, usize) = (5, 2);
const SPEED: (usize, usize) = (5, 1);
const COURSE: (usize, usize) = (5, 1);
const HDOP: (usize, usize) = (5, 2);

/// Track logger: owns the session lifecycle and decides, fix by fix, what is
/// worth writing.
///
/// Sessions open lazily on the first valid fix and re-open after any write
/// failure. Samples are throttled against monotonic uptime, never wall-clock,
/// and the first sample of a fresh session is always accepted.
pub struct TrackLogger {
    base: PathBuf,
    offset_hours: i32,
    sample_interval: Duration,
    available: bool,
    session: Option<Session>,
    last_sample: Option<Duration>,
}

impl TrackLogger {
    pub fn new(base: PathBuf, offset_hours: i32, sample_interval: Duration) -> Self {
        Self {
            base,
            offset_hours,
            sample_interval,
            available: false,
            session: None,
            last_sample: None,
        }
    }

    /// Mount-time check. A missing volume disables track logging for the
    /// rest of the process lifetime; nothing is retried later.
    pub fn setup(&mut self, fix: Option<&Fix>) {
        if let Err(e) = self.mount() {
            error!("{e}, track logging disabled");
            return;
        }
        if let Some(fix) = fix {
            if fix.has_fix() {
                self.open_session(fix);
            }
        }
    }

    fn mount(&mut self) -> Result<(), LoggerError> {
        if !self.base.is_dir() {
            return Err(LoggerError::StorageUnavailable(self.base.clone()));
        }
        self.available = true;
        Ok(())
    }

    /// One driver iteration: make sure a session is open, then append a point
    /// if the throttle window has elapsed. Invalid fixes are ignored outright.
    pub fn tick(&mut self, fix: &Fix, uptime: Duration) {
        if !self.available {
            return;
        }
        let Some(position) = fix.position else {
            return;
        };

        if self.session.is_none() && !self.open_session(fix) {
            return;
        }
        if !self.due(uptime) {
            return;
        }

        let point = render_point(fix, &position, self.offset_hours);
        let Some(session) = self.session.as_mut() else {
            return;
        };
        match append_point(session, &point) {
            Ok(()) => self.last_sample = Some(uptime),
            Err(e) => {
                // Handle is gone; a fresh session opens on the next valid fix.
                error!("track file handle lost: {e}");
                self.session = None;
            }
        }
    }

    pub fn shutdown(&mut self) {
        if let Some(session) = self.session.take() {
            if let Err(e) = session.file.sync_all() {
                error!("closing {}: {e}", session.path().display());
            }
        }
        self.available = false;
    }

    fn open_session(&mut self, fix: &Fix) -> bool {
        match Session::create(&self.base, &fix.time, self.offset_hours) {
            Ok(session) => {
                self.session = Some(session);
                self.last_sample = None;
                true
            }
            Err(e) => {
                error!("cannot start track session: {e}");
                false
            }
        }
    }

    fn due(&self, uptime: Duration) -> bool {
        match self.last_sample {
            None => true,
            Some(last) => uptime.saturating_sub(last) >= self.sample_interval,
        }
    }
}

/// Insert one point just ahead of the closing fragment.
///
/// The file always ends with `GPX_EPILOGUE`; seeking back by its fixed length
/// and rewriting point-then-fragment grows the document by exactly one point
/// while keeping it closed at every completed append. A crash between the two
/// writes leaves the document unterminated until the next mount.
fn append_point(session: &mut Session, point: &str) -> Result<(), LoggerError> {
    let file = &mut session.file;
    file.seek(SeekFrom::End(-(GPX_EPILOGUE.len() as i64)))?;
    file.write_all(point.as_bytes())?;
    file.write_all(GPX_EPILOGUE.as_bytes())?;
    file.sync_data()?;
    Ok(())
}

fn render_point(fix: &Fix, position: &Position, offset_hours: i32) -> String {
    let mut out = String::with_capacity(192);

    let (width, precision) = LATLON;
    out.push_str("\t\t<trkpt lat=\"");
    out.push_str(&format_scalar(position.latitude_deg, width, precision));
    out.push_str("\" lon=\"");
    out.push_str(&format_scalar(position.longitude_deg, width, precision));
    out.push_str("\">");

    out.push_str("<time>");
    out.push_str(&format_timestamp(&fix.time, offset_hours));
    out.push_str("</time>");

    if let Some(altitude) = fix.altitude_m {
        let (width, precision) = ELEVATION;
        out.push_str("<ele>");
        out.push_str(&format_scalar(altitude, width, precision));
        out.push_str("</ele>");
    }
    if let Some(speed) = fix.speed_mps {
        let (width, precision) = SPEED;
        out.push_str("<speed>");
        out.push_str(&format_scalar(speed, width, precision));
        out.push_str("</speed>");
    }
    if let Some(course) = fix.course_deg {
        let (width, precision) = COURSE;
        out.push_str("<course>");
        out.push_str(&format_scalar(course, width, precision));
        out.push_str("</course>");
    }
    if let Some(satellites) = fix.satellites {
        out.push_str("<sat>");
        out.push_str(&satellites.to_string());
        out.push_str("</sat>");
    }
    if let Some(hdop) = fix.hdop {
        let (width, precision) = HDOP;
        out.push_str("<hdop>");
        out.push_str(&format_scalar(hdop, width, precision));
        out.push_str("</hdop>");
    }

    out.push_str("</trkpt>\n");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fix::FixTime;
    use std::fs;
    use std::path::Path;
    use tempfile::tempdir;

    const INTERVAL: Duration = Duration::from_secs(1);

    fn fix() -> Fix {
        Fix {
            position: Some(Position {
                latitude_deg: 35.681236,
                longitude_deg: 139.767125,
            }),
            time: FixTime {
                year: 2024,
                month: 3,
                day: 1,
                hour: 10,
                minute: 15,
                second: 30,
                centisecond: 0,
            },
            altitude_m: None,
            speed_mps: None,
            course_deg: None,
            satellites: None,
            hdop: None,
        }
    }

    fn logger(base: &Path, offset_hours: i32) -> TrackLogger {
        let mut logger = TrackLogger::new(base.to_path_buf(), offset_hours, INTERVAL);
        logger.setup(None);
        logger
    }

    fn read_track(logger: &TrackLogger) -> String {
        let path = logger.session.as_ref().unwrap().path();
        fs::read_to_string(path).unwrap()
    }

    fn assert_well_formed(content: &str, points: usize) {
        assert!(content.starts_with("<?xml version=\"1.0\""));
        assert!(content.ends_with(GPX_EPILOGUE));
        assert_eq!(content.matches("<trkpt").count(), points);
        assert_eq!(content.matches("</trkpt>").count(), points);
        assert_eq!(content.matches("</gpx>").count(), 1);
    }

    #[test]
    fn setup_with_valid_fix_opens_an_empty_session() {
        let base = tempdir().unwrap();
        let mut logger = TrackLogger::new(base.path().to_path_buf(), 0, INTERVAL);
        logger.setup(Some(&fix()));
        assert_well_formed(&read_track(&logger), 0);
    }

    #[test]
    fn document_stays_closed_after_every_append() {
        let base = tempdir().unwrap();
        let mut logger = logger(base.path(), 0);
        for k in 1..=5 {
            logger.tick(&fix(), Duration::from_secs(k * 2));
            assert_well_formed(&read_track(&logger), k as usize);
        }
    }

    #[test]
    fn throttle_accepts_one_sample_per_interval() {
        let base = tempdir().unwrap();
        let mut logger = logger(base.path(), 0);
        for ms in [0, 300, 600, 900, 1000, 1700, 2000] {
            logger.tick(&fix(), Duration::from_millis(ms));
        }
        assert_well_formed(&read_track(&logger), 3);
    }

    #[test]
    fn first_sample_after_session_open_ignores_elapsed_time() {
        let base = tempdir().unwrap();
        let mut logger = logger(base.path(), 0);
        // Well past any interval boundary; accepted because nothing has been
        // sampled in this session yet.
        logger.tick(&fix(), Duration::from_millis(123));
        assert_well_formed(&read_track(&logger), 1);
    }

    #[test]
    fn fix_without_position_is_never_appended() {
        let base = tempdir().unwrap();
        let mut logger = logger(base.path(), 0);
        let mut invalid = fix();
        invalid.position = None;
        logger.tick(&invalid, Duration::from_secs(60));
        assert!(logger.session.is_none());
        assert_eq!(fs::read_dir(base.path()).unwrap().count(), 0);
    }

    #[test]
    fn invalid_optional_fields_are_omitted_from_the_point() {
        let base = tempdir().unwrap();
        let mut logger = logger(base.path(), 0);
        let mut partial = fix();
        partial.satellites = Some(8);
        logger.tick(&partial, Duration::ZERO);
        let content = read_track(&logger);
        assert!(content.contains("<sat>8</sat>"));
        for tag in ["<ele>", "<speed>", "<course>", "<hdop>"] {
            assert!(!content.contains(tag), "unexpected {tag}");
        }
    }

    #[test]
    fn point_fields_render_in_fixed_order() {
        let base = tempdir().unwrap();
        let mut logger = logger(base.path(), 9);
        let full = Fix {
            altitude_m: Some(123.4),
            speed_mps: Some(2.5),
            course_deg: Some(271.0),
            satellites: Some(8),
            hdop: Some(1.2),
            ..fix()
        };
        logger.tick(&full, Duration::ZERO);
        let content = read_track(&logger);
        assert!(content.contains(
            "\t\t<trkpt lat=\"35.681236\" lon=\"139.767125\">\
             <time>2024-03-01T19:15:30.000Z</time>\
             <ele>123.40</ele><speed>2.5</speed><course>271.0</course>\
             <sat>8</sat><hdop>1.20</hdop></trkpt>\n"
        ));
    }

    #[test]
    fn position_only_fix_renders_no_optional_children() {
        let base = tempdir().unwrap();
        let mut logger = logger(base.path(), 9);
        logger.tick(&fix(), Duration::ZERO);
        let path = logger.session.as_ref().unwrap().path().to_path_buf();
        assert_eq!(path, base.path().join("20240301").join("191530.gpx"));
        let content = fs::read_to_string(path).unwrap();
        assert!(content.contains(
            "\t\t<trkpt lat=\"35.681236\" lon=\"139.767125\">\
             <time>2024-03-01T19:15:30.000Z</time></trkpt>\n"
        ));
    }

    #[test]
    fn missing_volume_disables_logging_for_good() {
        let base = tempdir().unwrap();
        let volume = base.path().join("sd");
        let mut logger = TrackLogger::new(volume.clone(), 0, INTERVAL);
        logger.setup(Some(&fix()));

        // Even if the volume shows up later, setup already gave up on it.
        fs::create_dir(&volume).unwrap();
        logger.tick(&fix(), Duration::from_secs(60));
        assert!(logger.session.is_none());
        assert_eq!(fs::read_dir(&volume).unwrap().count(), 0);
    }
}
