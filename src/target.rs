//! The unit of work handed to the engine: hashes sharing one password length.
use std::collections::HashSet;
use std::num::NonZeroU32;

use crate::config::SizeTable;
use crate::digest::{HashDigest, PasswordLength};

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TargetError {
    #[error("no default size for length {0}")]
    UnmappedLength(PasswordLength),
    #[error("no hashes to crack")]
    Empty,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CampaignTarget {
    hashes: Vec<HashDigest>,
    length: PasswordLength,
    size_exponent: u32,
    threads: NonZeroU32,
}

impl CampaignTarget {
    /// Build a target, resolving the table size for `length`. Duplicate
    /// hashes are dropped; first occurrence keeps its position.
    pub fn new<I>(
        hashes: I,
        length: PasswordLength,
        sizes: &SizeTable,
        threads: NonZeroU32,
    ) -> Result<Self, TargetError>
    where
        I: IntoIterator<Item = HashDigest>,
    {
        let size_exponent = sizes
            .exponent(length)
            .ok_or(TargetError::UnmappedLength(length))?;
        let mut seen = HashSet::new();
        let hashes: Vec<HashDigest> = hashes
            .into_iter()
            .filter(|h| seen.insert(h.clone()))
            .collect();
        if hashes.is_empty() {
            return Err(TargetError::Empty);
        }
        Ok(Self {
            hashes,
            length,
            size_exponent,
            threads,
        })
    }

    pub fn hashes(&self) -> &[HashDigest] {
        &self.hashes
    }

    pub fn length(&self) -> PasswordLength {
        self.length
    }

    pub fn size_exponent(&self) -> u32 {
        self.size_exponent
    }

    pub fn threads(&self) -> NonZeroU32 {
        self.threads
    }

    /// Number of chains the Table Builder is asked for.
    pub fn chain_count(&self) -> u64 {
        1u64.checked_shl(self.size_exponent).unwrap_or(u64::MAX)
    }

    pub fn len(&self) -> usize {
        self.hashes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hashes.is_empty()
    }
}
