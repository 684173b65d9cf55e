//! Per-upload options.

use vertex_swarm_postage::BatchId;
use vertex_swarm_primitives::{ChunkAddress, RedundancyLevel};

use crate::error::{FileError, FileResult};

/// Options of a single upload. Fixed for the duration of the run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadOptions {
    /// Batch the chunks are stamped from.
    pub batch_id: BatchId,
    /// Tag to attach to; zero starts a new one when tracking is needed.
    pub tag: u64,
    /// Keep the uploaded chunks pinned locally.
    pub pin: bool,
    /// Stage chunks locally instead of counting them as sent.
    pub deferred: bool,
    /// Encrypt every chunk with its own key.
    pub encrypt: bool,
    pub redundancy: RedundancyLevel,
    /// Wrap the root reference with the access controller.
    pub access_control: bool,
    /// Existing grant history to extend.
    pub history_address: Option<ChunkAddress>,
}

impl UploadOptions {
    /// Defaults for a deferred, unpinned, plain upload from `batch_id`.
    pub fn new(batch_id: BatchId) -> Self {
        Self {
            batch_id,
            tag: 0,
            pin: false,
            deferred: true,
            encrypt: false,
            redundancy: RedundancyLevel::None,
            access_control: false,
            history_address: None,
        }
    }

    pub fn with_tag(mut self, tag: u64) -> Self {
        self.tag = tag;
        self
    }

    pub fn with_pin(mut self, pin: bool) -> Self {
        self.pin = pin;
        self
    }

    pub fn with_deferred(mut self, deferred: bool) -> Self {
        self.deferred = deferred;
        self
    }

    pub fn with_encrypt(mut self, encrypt: bool) -> Self {
        self.encrypt = encrypt;
        self
    }

    pub fn with_redundancy(mut self, redundancy: RedundancyLevel) -> Self {
        self.redundancy = redundancy;
        self
    }

    pub fn with_access_control(mut self, history_address: Option<ChunkAddress>) -> Self {
        self.access_control = true;
        self.history_address = history_address;
        self
    }

    /// Whether this upload needs a tag to record its progress.
    pub(crate) fn tracked(&self) -> bool {
        self.tag != 0 || self.deferred || self.pin
    }

    /// Reject option combinations that cannot run.
    pub fn validate(&self) -> FileResult<()> {
        if self.batch_id.is_zero() {
            return Err(FileError::validation("batch id is required"));
        }
        if self.history_address.is_some() && !self.access_control {
            return Err(FileError::validation(
                "history address given without access control",
            ));
        }
        Ok(())
    }
}

/// Parse a redundancy level name such as `"strong"`.
pub fn parse_redundancy(level: &str) -> FileResult<RedundancyLevel> {
    level
        .parse()
        .map_err(|_| FileError::validation(format!("unknown redundancy level {level:?}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;

    #[test]
    fn test_zero_batch_rejected() {
        let err = UploadOptions::new(BatchId::ZERO).validate().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn test_history_requires_access_control() {
        let mut options = UploadOptions::new(BatchId::repeat_byte(1));
        options.history_address = Some(ChunkAddress::new([2u8; 32]));
        assert_eq!(options.validate().unwrap_err().kind(), ErrorKind::Validation);

        let options = options.with_access_control(Some(ChunkAddress::new([2u8; 32])));
        assert!(options.validate().is_ok());
    }

    #[test]
    fn test_tracking_rule() {
        let options = UploadOptions::new(BatchId::repeat_byte(1)).with_deferred(false);
        assert!(!options.tracked());
        assert!(options.clone().with_pin(true).tracked());
        assert!(options.clone().with_tag(4).tracked());
        assert!(options.with_deferred(true).tracked());
    }

    #[test]
    fn test_parse_redundancy() {
        assert_eq!(parse_redundancy("Strong").unwrap(), RedundancyLevel::Strong);
        assert_eq!(
            parse_redundancy("extreme").unwrap_err().kind(),
            ErrorKind::Validation
        );
    }
}
