//! wslup_payload - moving text into the guest unharmed
//!
//! The boundary channel does not preserve newlines or quoting reliably, so
//! every file written into the guest is base64-encoded on the host, passed
//! as a single argument, and decoded guest-side before any shell sees it.

pub mod bootstrap;
pub mod inject;
pub mod profile;

pub use bootstrap::{
    parse_guest_report, BootstrapArgs, GuestOutcome, GuestStep, BOOTSTRAP_SCRIPT,
    BOOTSTRAP_VERSION,
};
pub use inject::{inject, injection_scripts, FileMode, Payload, PayloadError, WriteMode};
pub use profile::{PROFILE_FRAGMENT, PROFILE_MARKER};
