//! The upstream feed boundary (spec §4 decode input, §4.D's alias step): the
//! wire shape of a PID row, the client that fetches it, and the station
//! alias table the decoder consults before validating a destination name.

mod alias;
mod client;
mod error;
mod raw;

pub use alias::{AliasTable, DefaultAliasTable, STATION_ALIASES};
pub use client::{FeedClient, TfgmFeedClient, TFGM_METROLINKS_URL};
pub use error::{FeedError, FeedResult};
pub use raw::{FeedEnvelope, RawPidRecord};
