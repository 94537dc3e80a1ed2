//! Population statistics over fingerprints.
//!
//! Every capability field is a discrete random variable; the engine keeps the
//! empirical distribution of each one and scores a fingerprint by the
//! self-information of its field values. Fields are treated as independent,
//! which is an approximation: HT and VHT blocks for instance are correlated.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;
use tracing::warn;

use crate::error::EntropyError;
use crate::fingerprint::Fingerprint;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Field {
    TagPresence,
    SupportedRates,
    HtCapabilityInfo,
    HtAmpduParams,
    HtMcsSet,
    HtExtendedCapabilities,
    HtBeamforming,
    HtAsel,
    ExtendedCapabilities,
    Interworking,
    MultiBandId,
    MultiBandChannel,
    VhtCapabilityInfo,
    VhtMcsNssSet,
    VendorOuis,
}

impl Field {
    pub const ALL: [Field; 15] = [
        Field::TagPresence,
        Field::SupportedRates,
        Field::HtCapabilityInfo,
        Field::HtAmpduParams,
        Field::HtMcsSet,
        Field::HtExtendedCapabilities,
        Field::HtBeamforming,
        Field::HtAsel,
        Field::ExtendedCapabilities,
        Field::Interworking,
        Field::MultiBandId,
        Field::MultiBandChannel,
        Field::VhtCapabilityInfo,
        Field::VhtMcsNssSet,
        Field::VendorOuis,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Field::TagPresence => "tag_presence",
            Field::SupportedRates => "supported_rates",
            Field::HtCapabilityInfo => "ht_capability_info",
            Field::HtAmpduParams => "ht_ampdu_params",
            Field::HtMcsSet => "ht_mcs_set",
            Field::HtExtendedCapabilities => "ht_extended_capabilities",
            Field::HtBeamforming => "ht_beamforming",
            Field::HtAsel => "ht_asel",
            Field::ExtendedCapabilities => "extended_capabilities",
            Field::Interworking => "interworking",
            Field::MultiBandId => "multi_band_id",
            Field::MultiBandChannel => "multi_band_channel",
            Field::VhtCapabilityInfo => "vht_capability_info",
            Field::VhtMcsNssSet => "vht_mcs_nss_set",
            Field::VendorOuis => "vendor_ouis",
        }
    }

    /// Bitmap fields also keep a counter per set bit.
    pub fn is_bitmap(self) -> bool {
        matches!(self, Field::TagPresence | Field::SupportedRates)
    }

    pub fn value(self, fp: &Fingerprint) -> FieldValue {
        use FieldValue::{Absent, Bytes, Int};

        let ht = fp.ht.as_ref();
        let vht = fp.vht.as_ref();
        let value = match self {
            Field::TagPresence => Some(Int(fp.tag_presence.into())),
            Field::SupportedRates => Some(Int(fp.supported_rates)),
            Field::HtCapabilityInfo => ht.map(|ht| Int(ht.capability_info.into())),
            Field::HtAmpduParams => ht.map(|ht| Int(ht.ampdu_params.into())),
            Field::HtMcsSet => ht.map(|ht| Bytes(ht.mcs_set.to_vec())),
            Field::HtExtendedCapabilities => ht.map(|ht| Int(ht.extended_capabilities.into())),
            Field::HtBeamforming => ht.map(|ht| Int(ht.beamforming.into())),
            Field::HtAsel => ht.map(|ht| Int(ht.asel.into())),
            Field::ExtendedCapabilities => fp.extended_capabilities.map(|ext| Bytes(ext.to_vec())),
            Field::Interworking => fp.interworking.map(|options| Int(options.into())),
            Field::MultiBandId => fp.multi_band.map(|mb| Int(mb.band_id.into())),
            Field::MultiBandChannel => fp.multi_band.map(|mb| Int(mb.channel.into())),
            Field::VhtCapabilityInfo => vht.map(|vht| Int(vht.capability_info.into())),
            Field::VhtMcsNssSet => vht.map(|vht| Bytes(vht.mcs_nss_set.to_vec())),
            Field::VendorOuis => Some(Bytes(fp.vendor_ouis.iter().flatten().copied().collect())),
        };
        value.unwrap_or(Absent)
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One observed value of a field. `Absent` is a value of its own.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum FieldValue {
    Absent,
    Int(u64),
    Bytes(Vec<u8>),
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Absent => f.write_str("absent"),
            FieldValue::Int(v) => write!(f, "{v:#x}"),
            FieldValue::Bytes(bytes) => {
                for b in bytes {
                    write!(f, "{b:02x}")?;
                }
                Ok(())
            }
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntropyEngine {
    population: u64,
    values: BTreeMap<Field, BTreeMap<FieldValue, u64>>,
    bits: BTreeMap<Field, [u64; 64]>,
}

impl EntropyEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Counts one more fingerprint. Rejected without touching any counter if
    /// the population would overflow; no other counter can exceed it.
    pub fn update(&mut self, fp: &Fingerprint) -> Result<(), EntropyError> {
        let Some(population) = self.population.checked_add(1) else {
            warn!("entropy engine population saturated, dropping fingerprint");
            return Err(EntropyError::CounterOverflow);
        };

        for field in Field::ALL {
            let value = field.value(fp);
            if field.is_bitmap() {
                if let FieldValue::Int(bitmap) = value {
                    let counters = self.bits.entry(field).or_insert([0; 64]);
                    for (bit, counter) in counters.iter_mut().enumerate() {
                        if bitmap & (1 << bit) != 0 {
                            *counter += 1;
                        }
                    }
                }
            }
            *self.values.entry(field).or_default().entry(value).or_insert(0) += 1;
        }
        self.population = population;
        Ok(())
    }

    pub fn population_size(&self) -> u64 {
        self.population
    }

    pub fn distinct_values(&self, field: Field) -> usize {
        self.values.get(&field).map_or(0, BTreeMap::len)
    }

    /// Shannon entropy in bits of the field's empirical distribution.
    pub fn field_entropy(&self, field: Field) -> f64 {
        let Some(counts) = self.values.get(&field) else {
            return 0.0;
        };
        if self.population == 0 || counts.len() < 2 {
            return 0.0;
        }
        let n = self.population as f64;
        let h: f64 = counts
            .values()
            .map(|&count| {
                let p = count as f64 / n;
                -p * p.log2()
            })
            .sum();
        h.max(0.0)
    }

    /// Sum of every field's entropy: an upper bound on the information the
    /// whole fingerprint carries about a device.
    pub fn total_entropy(&self) -> f64 {
        Field::ALL.iter().map(|&field| self.field_entropy(field)).sum()
    }

    fn probability(&self, field: Field, value: &FieldValue) -> f64 {
        let count = self
            .values
            .get(&field)
            .and_then(|counts| counts.get(value))
            .copied()
            .unwrap_or(0);
        if count == 0 {
            // unseen value: rate it as if it were the next observation
            1.0 / (self.population as f64 + 1.0)
        } else {
            count as f64 / self.population as f64
        }
    }

    /// `-log2 P(fp)` with `P` the product of each field value's probability.
    /// Higher is rarer.
    pub fn fingerprint_score(&self, fp: &Fingerprint) -> f64 {
        let score: f64 = Field::ALL
            .iter()
            .map(|&field| -self.probability(field, &field.value(fp)).log2())
            .sum();
        score.max(0.0)
    }

    /// Expected number of observed fingerprints sharing every field value with `fp`.
    pub fn anonymity_set_size(&self, fp: &Fingerprint) -> f64 {
        self.population as f64 * (-self.fingerprint_score(fp)).exp2()
    }

    pub fn distribution_snapshot(&self, field: Field) -> BTreeMap<FieldValue, f64> {
        let n = self.population as f64;
        self.values
            .get(&field)
            .map(|counts| {
                counts
                    .iter()
                    .map(|(value, &count)| (value.clone(), count as f64 / n))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Share of fingerprints with each bit set, keyed by bit index (0 = LSB).
    /// Empty for fields that are not bitmaps.
    pub fn bit_frequencies(&self, field: Field) -> BTreeMap<u32, f64> {
        let n = self.population as f64;
        self.bits
            .get(&field)
            .map(|counters| {
                counters
                    .iter()
                    .enumerate()
                    .filter(|(_, &count)| count > 0)
                    .map(|(bit, &count)| (bit as u32, count as f64 / n))
                    .collect()
            })
            .unwrap_or_default()
    }
}
