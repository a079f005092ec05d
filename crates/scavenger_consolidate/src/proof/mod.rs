//! Challenge messages and per-donor signing.

mod message;
mod signer;

pub use message::{
    iso_timestamp, synthesized_challenge, transfer_message, Clock, SystemClock,
    TRANSFER_MESSAGE_PREFIX,
};
pub use signer::sign_donor;
