//! Immutable campaign configuration: the length → table-size mapping, the
//! fixed assignment buckets, tool locations and the optional run guard.
//!
//! Everything here is built once in `main` and handed to the driver by
//! reference; nothing is global.
use std::collections::BTreeMap;
use std::num::NonZeroU32;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::digest::{HashDigest, PasswordLength};

/// Default table-size exponents (chains = 2^exponent) per password length.
pub const DEFAULT_SIZE_EXPONENTS: &[(u32, u32)] = &[(4, 16), (5, 18), (6, 22), (7, 26), (8, 30)];

/// Largest exponent whose chain count still fits in a `u64`.
pub const MAX_SIZE_EXPONENT: u32 = 63;

pub const ASSIGNMENT_STORE_FILE: &str = "assignment_cracked_passwords.txt";

const DEFAULT_ASSIGNMENT: &[(u32, [&str; 10])] = &[
    (
        4,
        [
            "f8340c836d41f77cd92708bbd5443cbe",
            "a5da39d04c817287740f53e6bdc13b5c",
            "5321abb3b57f535e0e3186b7a3204dff",
            "626e33f13574402935a30b2d200ebe53",
            "ff293b3c17785c6eafcc1d0f0615f445",
            "212549071c902ae28bc239ce6f1eec49",
            "c1fdbe6dc8eb0ed6aeea0e877ba836dd",
            "727578e6768a6750ada716f8dbb0e47c",
            "c77e40f417dc4ed074b1df3b916f85c9",
            "11cd649a72075e28384bce23c72c253d",
        ],
    ),
    (
        5,
        [
            "2a06b95a264d30c1282c0eacc8fd4eff",
            "f367b5557726a7a7e3c412e2e2b8b67d",
            "0b912f372ae901469920803051d95b6c",
            "b6bb4144918a257b256293b7dfe080ae",
            "7f150f7990a25b72ff2881afe4b88b62",
            "258f7ebad296c6b14dcd7d11fd21fb57",
            "30ac5f6e343fcfa96718c465e69ea0e0",
            "0593bd4d2a40db0ede8c55bf62ee8646",
            "801c580fd61a3a36feea0f027b990c22",
            "7f0398784a0692bd301804aeb9436d76",
        ],
    ),
    (
        6,
        [
            "02188670c5291c33fe5176f9e47b5576",
            "986247dad9d3ae53fa971e0d8531612c",
            "8453086621fac9a8e4db75708a053b48",
            "aa926e31b4a1d349e1e8e0687be19b99",
            "48051a930667ac6d0ff9234c4aaf8fe3",
            "caf8601b997161d9d8b467a24fd50204",
            "211862bfd5b5fdad68474edf8ce59d1c",
            "5eb0ccb1e0cd2a5a3a853223113e124f",
            "272f3fe7cb9ad55d2be1ecdb9c836f67",
            "f967085d623bd170584d4e80211f38b0",
        ],
    ),
    (
        7,
        [
            "89c6a9638646d4d53080a304f23c7f4e",
            "c3ae09893fe58f0f399561fa96a6cb41",
            "8b91e9967cf6d5182b2a2861e639d39b",
            "ffa76fa867d0d075f2f77d99741c283b",
            "69120c685003f05595208316ba4579b4",
            "92b180339869ae0e74ff71ee24364059",
            "8da0500ff759af3268e93fd73ebaa7bc",
            "d847d60611ed814c33e8f7275e43d8bc",
            "2aafba15313c0c80e02d928a33c50755",
            "904041327eae3675f36efaeda1f1d3c1",
        ],
    ),
    (
        8,
        [
            "6d4cc6104ee5752052905ae366de1788",
            "25563e8dd502e79f89c02433f011eb9b",
            "763ef3ff10f5954eed462610bae034b5",
            "e40a7d82d7d3606a564849809ea8e882",
            "2e22961e4b41067df857aba6e50fd78a",
            "04dc6ed7007be8f32f2c27ddbbd00d2a",
            "a5f9d6ba84524791063a50bb1ecfd0b0",
            "523c034fc8c58b7a6a1e182bb23e015c",
            "d771d6576c6aee69a9778fef4fb345bc",
            "368dc45539edd49052642ee6360dd768",
        ],
    ),
];

/// Password length → table-size exponent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SizeTable {
    exponents: BTreeMap<PasswordLength, u32>,
}

impl Default for SizeTable {
    fn default() -> Self {
        let exponents = DEFAULT_SIZE_EXPONENTS
            .iter()
            .filter_map(|&(len, exp)| PasswordLength::new(len).map(|l| (l, exp)))
            .collect();
        Self { exponents }
    }
}

impl SizeTable {
    pub fn exponent(&self, length: PasswordLength) -> Option<u32> {
        self.exponents.get(&length).copied()
    }

    /// Insert or replace the exponent for `length`.
    pub fn set(&mut self, length: PasswordLength, exponent: u32) {
        self.exponents.insert(length, exponent);
    }

    pub fn lengths(&self) -> impl Iterator<Item = PasswordLength> + '_ {
        self.exponents.keys().copied()
    }
}

/// Parse a `LENGTH=EXPONENT` override as given on the command line.
pub fn parse_size_override(s: &str) -> Result<(PasswordLength, u32), String> {
    let (len, exp) = s
        .split_once('=')
        .ok_or_else(|| format!("expected LENGTH=EXPONENT, got {s:?}"))?;
    let length: PasswordLength = len.parse().map_err(|e| format!("{e}"))?;
    let exponent: u32 = exp
        .trim()
        .parse()
        .map_err(|_| format!("invalid exponent {:?}", exp.trim()))?;
    if exponent > MAX_SIZE_EXPONENT {
        return Err(format!(
            "exponent {exponent} exceeds maximum {MAX_SIZE_EXPONENT}"
        ));
    }
    Ok((length, exponent))
}

/// Fixed partition of hashes by password length.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    buckets: BTreeMap<PasswordLength, Vec<HashDigest>>,
}

impl Default for Assignment {
    fn default() -> Self {
        let buckets = DEFAULT_ASSIGNMENT
            .iter()
            .filter_map(|(len, hashes)| {
                let length = PasswordLength::new(*len)?;
                let digests = hashes
                    .iter()
                    .filter_map(|h| HashDigest::parse(h).ok())
                    .collect();
                Some((length, digests))
            })
            .collect();
        Self { buckets }
    }
}

impl Assignment {
    pub fn new(buckets: BTreeMap<PasswordLength, Vec<HashDigest>>) -> Self {
        Self { buckets }
    }

    /// Buckets in ascending length order.
    pub fn buckets(&self) -> impl Iterator<Item = (PasswordLength, &[HashDigest])> {
        self.buckets.iter().map(|(l, h)| (*l, h.as_slice()))
    }

    pub fn total_hashes(&self) -> usize {
        self.buckets.values().map(Vec::len).sum()
    }
}

/// External tool locations and the flags passed through to them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolSettings {
    pub table_bin: PathBuf,
    pub guess_bin: PathBuf,
    pub threads: NonZeroU32,
    pub verbose: bool,
}

impl Default for ToolSettings {
    fn default() -> Self {
        Self {
            table_bin: PathBuf::from("./bin/table"),
            guess_bin: PathBuf::from("./bin/guess"),
            threads: NonZeroU32::MIN,
            verbose: false,
        }
    }
}

/// Optional guard bounding a single engine run. Both unset means the engine
/// keeps regenerating tables until every hash is solved.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CrackLimits {
    pub max_iterations: Option<u32>,
    pub time_budget: Option<Duration>,
}

#[derive(Debug, Clone)]
pub struct CampaignConfig {
    pub sizes: SizeTable,
    pub assignment: Assignment,
    pub tools: ToolSettings,
    pub limits: CrackLimits,
    pub data_dir: PathBuf,
    pub session_dir: PathBuf,
}

impl Default for CampaignConfig {
    fn default() -> Self {
        Self {
            sizes: SizeTable::default(),
            assignment: Assignment::default(),
            tools: ToolSettings::default(),
            limits: CrackLimits::default(),
            data_dir: PathBuf::from("./data"),
            session_dir: PathBuf::from("./bin"),
        }
    }
}

impl CampaignConfig {
    pub fn assignment_store_path(&self) -> PathBuf {
        self.data_dir.join(ASSIGNMENT_STORE_FILE)
    }

    /// Input hash files are resolved relative to the data directory.
    pub fn input_path(&self, name: &str) -> PathBuf {
        self.data_dir.join(name)
    }

    /// Result store for a hash input file, named after the file.
    pub fn file_store_path(&self, name: &str) -> PathBuf {
        let base = Path::new(name)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| name.to_string());
        self.data_dir.join(format!("cracked_{base}"))
    }
}
