//!  Storage is organized through [session_archive::SessionArchiveImpl].
//!  The basic idea is:
//!   - There is a directory with all finished sessions.
//!   - Every session is stored in its own pretty printed json file named after its start.
//!   - Files are only ever written once, then read or deleted.

pub mod entities;
pub mod session_archive;
