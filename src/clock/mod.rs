//! Monotonic nanosecond timestamp source with an optional calibrated
//! cycle-counter fast path.
//!
//! The clock is a configured dependency: each shard owns a [`Clock`] value
//! instead of reaching for process-wide mutable state. Calibration maps raw
//! cycle counts to nanoseconds via a measured `scale` (ns per tick) and
//! `offset` (ns); until a calibration is supplied, `now_ns` falls back to
//! the monotonic system clock and never blocks.
//!
//! Calibration state can be persisted as a small fixed-layout blob so a
//! restart skips the measurement sleep. A blob with a mismatched magic or
//! version simply disables the fast path.

use crate::errors::EngineError;
use crate::types::Timestamp;
use std::fs;
use std::path::Path;
use std::sync::OnceLock;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Magic header identifying a persisted calibration blob.
pub const CALIBRATION_MAGIC: [u8; 8] = *b"HFTTSC\0\0";

/// Current calibration blob format version.
pub const CALIBRATION_VERSION: u32 = 1;

/// Serialized blob size: magic + version + scale + offset + saved_time_ns.
const CALIBRATION_BLOB_LEN: usize = 8 + 4 + 8 + 8 + 8;

/// Minimum measurement interval; shorter requests are widened to this.
const MIN_CALIBRATION_INTERVAL: Duration = Duration::from_millis(20);

/// Process-wide monotonic anchor so every `Clock` (and the calibration
/// offset) measures nanoseconds on the same axis.
fn monotonic_ns() -> Timestamp {
    static BASE: OnceLock<Instant> = OnceLock::new();
    let base = *BASE.get_or_init(Instant::now);
    let elapsed = base.elapsed().as_nanos();
    if elapsed > u128::from(u64::MAX) {
        u64::MAX
    } else {
        elapsed as u64
    }
}

/// Reads the raw cycle counter, or 0 on hosts without one.
#[inline]
fn raw_cycles() -> u64 {
    #[cfg(target_arch = "x86_64")]
    {
        // Safety: RDTSC has no memory effects and is available on every
        // x86_64 target this crate supports.
        unsafe { core::arch::x86_64::_rdtsc() }
    }
    #[cfg(not(target_arch = "x86_64"))]
    {
        0
    }
}

/// Cycle-counter to nanosecond mapping: `ns = cycles * scale + offset`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CalibrationParams {
    /// Nanoseconds per cycle-counter tick. Always strictly positive.
    pub scale: f64,
    /// Offset aligning the cycle axis with the monotonic clock, in ns.
    pub offset: i64,
}

impl CalibrationParams {
    /// Loads a persisted calibration blob.
    ///
    /// # Errors
    /// Returns [`EngineError::CalibrationFormat`] for a truncated blob,
    /// wrong magic, wrong version, trailing data or a non-positive scale,
    /// and [`EngineError::Io`] for filesystem failures.
    pub fn load(path: &Path) -> Result<Self, EngineError> {
        let bytes = fs::read(path)?;
        if bytes.len() != CALIBRATION_BLOB_LEN {
            return Err(EngineError::CalibrationFormat("unexpected blob length"));
        }
        if bytes[0..8] != CALIBRATION_MAGIC {
            return Err(EngineError::CalibrationFormat("bad magic"));
        }
        let version = u32::from_le_bytes(bytes[8..12].try_into().expect("fixed slice"));
        if version != CALIBRATION_VERSION {
            return Err(EngineError::CalibrationFormat("unsupported version"));
        }
        let scale = f64::from_le_bytes(bytes[12..20].try_into().expect("fixed slice"));
        let offset = i64::from_le_bytes(bytes[20..28].try_into().expect("fixed slice"));
        if !(scale > 0.0) || !scale.is_finite() {
            return Err(EngineError::CalibrationFormat("non-positive scale"));
        }
        Ok(Self { scale, offset })
    }

    /// Persists this calibration as a fixed-layout little-endian blob.
    ///
    /// # Errors
    /// Returns [`EngineError::Io`] when the file cannot be written.
    pub fn save(&self, path: &Path) -> Result<(), EngineError> {
        let mut bytes = Vec::with_capacity(CALIBRATION_BLOB_LEN);
        bytes.extend_from_slice(&CALIBRATION_MAGIC);
        bytes.extend_from_slice(&CALIBRATION_VERSION.to_le_bytes());
        bytes.extend_from_slice(&self.scale.to_le_bytes());
        bytes.extend_from_slice(&self.offset.to_le_bytes());
        let saved_time_ns = monotonic_ns() as i64;
        bytes.extend_from_slice(&saved_time_ns.to_le_bytes());
        fs::write(path, bytes)?;
        Ok(())
    }
}

/// Monotonic nanosecond clock, optionally TSC-accelerated.
///
/// `now_ns` is non-decreasing within the owning shard; cross-shard
/// monotonicity is not guaranteed and not required.
#[derive(Debug, Clone)]
pub struct Clock {
    calibration: Option<CalibrationParams>,
}

impl Clock {
    /// A clock backed purely by the monotonic system clock.
    #[must_use]
    pub fn monotonic() -> Self {
        Self { calibration: None }
    }

    /// A clock using the calibrated cycle-counter fast path.
    ///
    /// On hosts without a cycle counter the calibration is ignored and the
    /// monotonic fallback is used.
    #[must_use]
    pub fn with_calibration(calibration: CalibrationParams) -> Self {
        if cfg!(target_arch = "x86_64") {
            Self {
                calibration: Some(calibration),
            }
        } else {
            warn!("cycle counter unavailable; calibrated clock degrades to monotonic");
            Self { calibration: None }
        }
    }

    /// True when the fast path is active.
    #[must_use]
    pub fn is_calibrated(&self) -> bool {
        self.calibration.is_some()
    }

    /// Measures the cycle-counter scale and offset against the monotonic
    /// clock over `interval` (widened to at least 20 ms).
    ///
    /// # Errors
    /// Returns [`EngineError::CalibrationUnavailable`] when the host has no
    /// cycle counter or the counter did not advance.
    pub fn calibrate(interval: Duration) -> Result<CalibrationParams, EngineError> {
        let interval = interval.max(MIN_CALIBRATION_INTERVAL);

        let c0 = raw_cycles();
        let t0 = monotonic_ns();
        std::thread::sleep(interval);
        let c1 = raw_cycles();
        let t1 = monotonic_ns();

        if c1 <= c0 || t1 <= t0 {
            return Err(EngineError::CalibrationUnavailable);
        }

        let scale = (t1 - t0) as f64 / (c1 - c0) as f64;
        if !(scale > 0.0) || !scale.is_finite() {
            return Err(EngineError::CalibrationUnavailable);
        }

        let mid_ns = (t0 as f64 + t1 as f64) * 0.5;
        let mid_cycles = (c0 as f64 + c1 as f64) * 0.5;
        let offset_d = mid_ns - mid_cycles * scale;
        let offset = offset_d.clamp(i64::MIN as f64, i64::MAX as f64) as i64;

        debug!(scale, offset, "cycle counter calibrated");
        Ok(CalibrationParams { scale, offset })
    }

    /// Loads a persisted calibration, or measures and persists a fresh one.
    ///
    /// A rejected blob (bad magic, version or scale) is logged and treated
    /// as absent rather than failing the caller.
    ///
    /// # Errors
    /// Returns [`EngineError::CalibrationUnavailable`] when measurement is
    /// impossible, or [`EngineError::Io`] when persisting fails.
    pub fn calibrate_and_persist(
        path: &Path,
        interval: Duration,
    ) -> Result<CalibrationParams, EngineError> {
        match CalibrationParams::load(path) {
            Ok(params) => return Ok(params),
            Err(EngineError::CalibrationFormat(reason)) => {
                warn!(?path, reason, "ignoring stale calibration blob");
            }
            Err(EngineError::Io(err)) if err.kind() == std::io::ErrorKind::NotFound => {}
            Err(err) => return Err(err),
        }
        let params = Self::calibrate(interval)?;
        params.save(path)?;
        Ok(params)
    }

    /// Current timestamp in nanoseconds.
    ///
    /// The calibrated path saturates: negative intermediate results clamp
    /// to 0 and overflow clamps to `u64::MAX`.
    #[inline]
    #[must_use]
    pub fn now_ns(&self) -> Timestamp {
        if let Some(cal) = &self.calibration {
            let ns_d = raw_cycles() as f64 * cal.scale + cal.offset as f64;
            if ns_d < 0.0 {
                return 0;
            }
            if ns_d > u64::MAX as f64 {
                return u64::MAX;
            }
            return ns_d as Timestamp;
        }
        monotonic_ns()
    }
}

impl Default for Clock {
    fn default() -> Self {
        Self::monotonic()
    }
}
