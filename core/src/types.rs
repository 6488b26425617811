//! Shared primitive types used across the entire simulation.

/// A simulated day number. Day N covers `[N, N+1) * day_length` seconds
/// after the slot's first touch.
pub type Day = u64;

/// Seconds since the Unix epoch.
pub type Timestamp = i64;

/// A CDN server position in integer degrees: (latitude, longitude).
pub type Coordinate = (i32, i32);

/// One entry of the view history: (views that day, cumulative views).
pub type ViewDay = (u64, u64);
