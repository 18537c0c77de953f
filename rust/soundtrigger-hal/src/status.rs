//! HAL status values.
//!
//! A status is 0 on success and a negated errno on failure.

/// Status returned by a HAL operation.
pub type Status = i32;

pub const OK: Status = 0;
/// An argument is malformed.
pub const BAD_VALUE: Status = -libc::EINVAL;
/// The server or the addressed object is not initialized.
pub const NO_INIT: Status = -libc::ENODEV;
/// The operation is not valid in the current state.
pub const INVALID_OPERATION: Status = -libc::ENOSYS;
/// A resource limit was reached.
pub const NO_MEMORY: Status = -libc::ENOMEM;
/// The addressed object is already in use.
pub const BUSY: Status = -libc::EBUSY;

/// True for the success status.
pub fn is_ok(status: Status) -> bool {
    status == OK
}

/// Short name of a well-known status, for logs and failure messages.
pub fn name(status: Status) -> &'static str {
    match status {
        OK => "OK",
        BAD_VALUE => "BAD_VALUE",
        NO_INIT => "NO_INIT",
        INVALID_OPERATION => "INVALID_OPERATION",
        NO_MEMORY => "NO_MEMORY",
        BUSY => "BUSY",
        _ => "UNKNOWN",
    }
}
