//! Help-request wire protocol and round bookkeeping.
//!
//! # Message Flow
//!
//! ```text
//! Requester                         Responder (x N)
//!    |                                  |
//!    |---- #NeedSupport_<period> ------>|  broadcast, one copy per responder
//!    |                                  |  think 0.5s..3.5s
//!    |<--------- Ok_<period> -----------|  40%  affirmative
//!    |<--------- No_<period> -----------|  50%  negative
//!    |                                  |  10%  silence
//! ```
//!
//! ## Wire Formats
//!
//! | Direction             | Format                  | Fields                 |
//! |-----------------------|-------------------------|------------------------|
//! | Requester → Responder | `#NeedSupport_<period>` | positive base-10 `u64` |
//! | Responder → Requester | `Ok_<period>`           | positive base-10 `u64` |
//! | Responder → Requester | `No_<period>`           | positive base-10 `u64` |
//!
//! All messages are UTF-8, case-sensitive and fit in a
//! [`MAX_DATAGRAM_SIZE`] byte buffer for any period below 10^19.
//!
//! ## Round State Machine
//!
//! ```text
//!   [Broadcasting] ── begin_collecting() ──> [Collecting]
//!                                               │     │
//!                       observe() hits quorum   │     │ expire()
//!                                               v     v
//!                                              [Closed]
//! ```
//!
//! The round wait budget (3.0s by default) is shorter than the slowest
//! responder thinking time (3.5s), so a valid `Ok` can land after its round
//! closed. Such a reply is discarded as stale by whichever round is open when
//! it arrives, or drained before the next broadcast.

mod message;
mod round;

pub use message::{max_encoded_len, Request, Response, Verdict};
pub use round::{CloseReason, Observation, Round, RoundOutcome, RoundState};

/// Tag that opens every request message
pub const REQUEST_TAG: &str = "#NeedSupport";

/// Separator between message fields
pub const FIELD_DELIMITER: char = '_';

/// Default receive buffer size in bytes
pub const MAX_DATAGRAM_SIZE: usize = 32;

/// Default number of affirmative replies required per period
pub const DEFAULT_QUORUM: usize = 2;
