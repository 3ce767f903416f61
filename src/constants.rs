//! Application constants and fixed experiment parameters.
//!
//! The experiment design is fixed: four participants (two buyers, two
//! sellers) and a bounded number of rounds.

/// Auction structure constants
pub mod auction {
    /// Default number of rounds when AUCTION_TOTAL_ROUNDS is not set
    pub const DEFAULT_TOTAL_ROUNDS: u32 = 8;

    /// Number of participants that must submit before a round clears
    pub const REQUIRED_PARTICIPANTS: usize = 4;
}
