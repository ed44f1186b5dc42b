//! Application-layer datagrams.
//!
//! A [`Message`] is what the upper layer hands to entity A for delivery.  Its
//! payload is bounded by [`MAX_PAYLOAD`] characters; anything missing or
//! oversized is normalised to an empty payload and reported back to the
//! caller as a [`PayloadError`] instead of aborting.

use crate::error::PayloadError;

/// Maximum number of characters a message payload may carry.
pub const MAX_PAYLOAD: usize = 20;

/// A single upper-layer datagram.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Message {
    data: String,
}

impl Message {
    /// Build a message, normalising a missing or oversized payload to `""`.
    ///
    /// Use [`Message::try_new`] when the caller needs to know whether the
    /// payload was accepted.
    pub fn new(data: Option<&str>) -> Self {
        Self::try_new(data).unwrap_or_else(|(msg, _)| msg)
    }

    /// Build a message, returning the normalised (empty) message alongside the
    /// error when the payload is rejected.
    pub fn try_new(data: Option<&str>) -> Result<Self, (Self, PayloadError)> {
        let mut msg = Self::default();
        match msg.set_data(data) {
            Ok(()) => Ok(msg),
            Err(e) => Err((msg, e)),
        }
    }

    /// Replace the payload.
    ///
    /// On failure the payload is cleared and the reason is returned.
    pub fn set_data(&mut self, data: Option<&str>) -> Result<(), PayloadError> {
        match data {
            None => {
                self.data.clear();
                Err(PayloadError::Missing)
            }
            Some(s) if s.chars().count() > MAX_PAYLOAD => {
                self.data.clear();
                Err(PayloadError::TooLong {
                    len: s.chars().count(),
                    max: MAX_PAYLOAD,
                })
            }
            Some(s) => {
                self.data = s.to_owned();
                Ok(())
            }
        }
    }

    /// The payload text.
    pub fn data(&self) -> &str {
        &self.data
    }

    /// Consume the message and return its payload.
    pub fn into_data(self) -> String {
        self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_payload_up_to_limit() {
        let text = "x".repeat(MAX_PAYLOAD);
        let msg = Message::try_new(Some(&text)).unwrap();
        assert_eq!(msg.data(), text);
    }

    #[test]
    fn oversized_payload_is_emptied() {
        let text = "x".repeat(MAX_PAYLOAD + 1);
        let (msg, err) = Message::try_new(Some(&text)).unwrap_err();
        assert_eq!(msg.data(), "");
        assert_eq!(
            err,
            PayloadError::TooLong {
                len: MAX_PAYLOAD + 1,
                max: MAX_PAYLOAD
            }
        );
    }

    #[test]
    fn missing_payload_is_emptied() {
        let msg = Message::new(None);
        assert_eq!(msg.data(), "");

        let (_, err) = Message::try_new(None).unwrap_err();
        assert_eq!(err, PayloadError::Missing);
    }

    #[test]
    fn set_data_failure_clears_previous_payload() {
        let mut msg = Message::new(Some("hello"));
        assert!(msg.set_data(Some(&"y".repeat(64))).is_err());
        assert_eq!(msg.data(), "");

        assert!(msg.set_data(Some("again")).is_ok());
        assert_eq!(msg.into_data(), "again");
    }

    #[test]
    fn length_counts_characters_not_bytes() {
        // 20 two-byte characters still fit.
        let text = "é".repeat(MAX_PAYLOAD);
        assert!(Message::try_new(Some(&text)).is_ok());
    }
}
