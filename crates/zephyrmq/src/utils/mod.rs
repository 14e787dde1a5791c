//! Small conversions shared by the service and transport layers. Kept
//! deliberately thin — `chrono` already does the heavy lifting.

pub mod time;
