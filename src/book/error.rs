//! Price-level book error types

use std::fmt;

/// Errors that can occur while constructing or driving a price-level book.
#[derive(Debug)]
#[non_exhaustive]
pub enum BookError {
    /// The market-data feed rejected the subscription.
    FeedAttach {
        /// Symbol the subscription was requested for.
        symbol: String,
        /// Order source the subscription was requested for.
        source: String,
        /// Reason reported by the feed.
        message: String,
    },
}

impl fmt::Display for BookError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BookError::FeedAttach {
                symbol,
                source,
                message,
            } => {
                write!(f, "feed attach failed for {symbol}@{source}: {message}")
            }
        }
    }
}

impl std::error::Error for BookError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attach_error_display() {
        let err = BookError::FeedAttach {
            symbol: "AAPL".to_string(),
            source: "NTV".to_string(),
            message: "feed closed".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "feed attach failed for AAPL@NTV: feed closed"
        );
    }
}
