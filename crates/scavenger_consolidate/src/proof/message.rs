//! Messages a donor signs.

use time::macros::format_description;
use time::{OffsetDateTime, UtcOffset};

pub const TRANSFER_MESSAGE_PREFIX: &str = "Assign accumulated Scavenger rights to: ";

/// Wall-clock source, swappable in tests.
pub trait Clock: Send + Sync {
    fn now_utc(&self) -> OffsetDateTime;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now_utc(&self) -> OffsetDateTime {
        OffsetDateTime::now_utc()
    }
}

/// Message the rewards service expects for `donate_to`. Recipient is embedded verbatim.
pub fn transfer_message(recipient: &str) -> String {
    format!("{}{}", TRANSFER_MESSAGE_PREFIX, recipient)
}

/// Default proof challenge when the caller gives none.
///
/// Embeds the current time, so calls at different instants sign different messages.
/// Callers that need a stable challenge must pass one explicitly.
pub fn synthesized_challenge(target: &str, now: OffsetDateTime) -> String {
    format!("scavenger-consolidate|target={}|ts={}", target, iso_timestamp(now))
}

/// UTC timestamp with millisecond precision, e.g. `2025-11-20T08:15:30.250Z`.
pub fn iso_timestamp(at: OffsetDateTime) -> String {
    let iso = format_description!(
        "[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond digits:3]Z"
    );
    at.to_offset(UtcOffset::UTC)
        .format(iso)
        .unwrap_or_else(|_| at.unix_timestamp().to_string())
}
