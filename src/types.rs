use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Source
// ---------------------------------------------------------------------------

/// Which upstream a mirrored row came from. A sync pass may only delete rows
/// belonging to the partition it just recomputed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    Opensea,
    Tokenworks,
}

impl Source {
    pub fn as_str(self) -> &'static str {
        match self {
            Source::Opensea => "opensea",
            Source::Tokenworks => "tokenworks",
        }
    }
}

impl std::fmt::Display for Source {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Source {
    type Err = ();

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "opensea" => Ok(Source::Opensea),
            "tokenworks" => Ok(Source::Tokenworks),
            _ => Err(()),
        }
    }
}

// ---------------------------------------------------------------------------
// Listing
// ---------------------------------------------------------------------------

/// One live listing, post floor-reduction. `token_id` is the identity key:
/// a decimal-string-normalized integer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Listing {
    pub token_id: String,
    /// Display-unit (ETH) price, exact decimal.
    pub price: Decimal,
    pub owner: Option<String>,
    pub highest_offer: Option<Decimal>,
}

impl Listing {
    pub fn new(token_id: impl Into<String>, price: Decimal, owner: Option<String>) -> Self {
        Self {
            token_id: token_id.into(),
            price,
            owner,
            highest_offer: None,
        }
    }
}
