/// Log file cleanup and rotation.
pub mod log_cleanup;
