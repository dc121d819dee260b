use rand::{rngs::SmallRng, Rng, SeedableRng};
use uuid::Uuid;

use crate::template::Fields;

/// Upper bound (exclusive) for the call duration in seconds.
pub const MAX_BILLSEC: u32 = 18_000;
/// Upper bound (exclusive) for the numeric tail of the called number.
pub const MAX_SUFFIX: u64 = 999_999_999;

pub const DEFAULT_PREFIXES: &[&str] = &["9023"];

pub const DEFAULT_CODES: &[&str] = &[
    "220", "22020", "22021", "22022", "2203", "2206", "2207", "2208", "2209", "22177", "22178",
    "2237", "22390", "22391", "22392", "22393", "22501", "22502", "22503", "22504", "22505",
    "22506", "22507", "22508", "22509", "22540", "22541", "22542", "22544", "22545", "22546",
    "22547", "22548", "22549", "22555", "22556", "22557", "22558", "22559", "22565", "22566",
    "22567", "22577", "2314", "2315", "2316", "2317", "23188", "23199", "23277", "23288",
    "235222", "235223", "235224", "235227", "235228", "2353", "2356", "2357", "2359", "25215",
    "25224", "25228", "25229", "25250", "25251", "25259", "25260", "25261", "25290", "25291",
    "25299", "255", "2557", "25777", "26377", "26378", "35568", "35569", "37740", "37741",
    "37742", "37743", "37744", "37745", "37746", "37747", "37748", "37749", "3816", "38160",
    "38161", "38162", "38163", "38164", "38165", "38166", "38168", "38169", "3897", "50931",
    "50936", "50937", "50938", "50946", "50947", "50948",
];

/// One synthetic call detail record. Built, rendered and dropped every iteration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub billsec: u32,
    pub billmsec: u64,
    pub uuid: Uuid,
    pub sip_to_user: String,
}

impl Record {
    pub fn fields(&self) -> Fields {
        let mut fields = Fields::new();
        fields.insert("billsec", self.billsec.to_string());
        fields.insert("billmsec", self.billmsec.to_string());
        fields.insert("uuid", self.uuid.to_string());
        fields.insert("sip_to_user", self.sip_to_user.clone());
        fields
    }
}

#[derive(Debug, thiserror::Error)]
#[error("{0} set must not be empty")]
pub struct EmptySetError(pub &'static str);

pub struct Synthesizer {
    prefixes: Vec<String>,
    codes: Vec<String>,
    rng: SmallRng,
}

impl Synthesizer {
    /// Seeded when `seed` is given, otherwise drawn from OS entropy. The seed
    /// covers billsec and the called number; UUIDs always come from `Uuid::new_v4`.
    pub fn new(
        prefixes: Vec<String>,
        codes: Vec<String>,
        seed: Option<u64>,
    ) -> Result<Self, EmptySetError> {
        if prefixes.is_empty() {
            return Err(EmptySetError("prefix"));
        }
        if codes.is_empty() {
            return Err(EmptySetError("code"));
        }
        Ok(Self {
            prefixes,
            codes,
            rng: seeded_rng(seed),
        })
    }

    pub fn with_defaults(seed: Option<u64>) -> Self {
        Self {
            prefixes: DEFAULT_PREFIXES.iter().map(|s| s.to_string()).collect(),
            codes: DEFAULT_CODES.iter().map(|s| s.to_string()).collect(),
            rng: seeded_rng(seed),
        }
    }

    pub fn next_record(&mut self) -> Record {
        let billsec = self.rng.gen_range(0..MAX_BILLSEC);
        let uuid = Uuid::new_v4();

        // both sets are non-empty, checked at construction
        let prefix = &self.prefixes[self.rng.gen_range(0..self.prefixes.len())];
        let code = &self.codes[self.rng.gen_range(0..self.codes.len())];
        let suffix = self.rng.gen_range(0..MAX_SUFFIX);

        Record {
            billsec,
            billmsec: u64::from(billsec) * 1000,
            uuid,
            sip_to_user: format!("{prefix}{code}{suffix}"),
        }
    }
}

fn seeded_rng(seed: Option<u64>) -> SmallRng {
    match seed {
        Some(seed) => SmallRng::seed_from_u64(seed),
        None => SmallRng::from_entropy(),
    }
}
