//! Core data models for the heat engine

use crate::error::{HeatError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Resource axis along which temperature is computed independently
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    Cpu,
    HeapAllocRate,
    IoReadSyscallRate,
    IoWriteSyscallRate,
}

impl Dimension {
    pub const ALL: [Dimension; 4] = [
        Dimension::Cpu,
        Dimension::HeapAllocRate,
        Dimension::IoReadSyscallRate,
        Dimension::IoWriteSyscallRate,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Dimension::Cpu => "cpu",
            Dimension::HeapAllocRate => "heap_alloc_rate",
            Dimension::IoReadSyscallRate => "io_read_syscall_rate",
            Dimension::IoWriteSyscallRate => "io_write_syscall_rate",
        }
    }

    /// Tag used on the wire; 0 is reserved for "unspecified"
    pub fn wire_tag(&self) -> i32 {
        match self {
            Dimension::Cpu => 1,
            Dimension::HeapAllocRate => 2,
            Dimension::IoReadSyscallRate => 3,
            Dimension::IoWriteSyscallRate => 4,
        }
    }

    pub fn from_wire_tag(tag: i32) -> Result<Self> {
        Dimension::ALL
            .into_iter()
            .find(|d| d.wire_tag() == tag)
            .ok_or(HeatError::UnknownTag {
                kind: "dimension",
                tag,
            })
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Dimension {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
        Dimension::ALL
            .into_iter()
            .find(|d| d.as_str() == normalized)
            .ok_or_else(|| format!("unknown dimension: {}", s))
    }
}

/// Dimensionless relative-usage score in [0, 10]
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct NormalizedValue(f64);

impl NormalizedValue {
    pub const MIN: f64 = 0.0;
    pub const MAX: f64 = 10.0;
    pub const ZERO: NormalizedValue = NormalizedValue(0.0);

    /// Rejects non-finite values and anything outside [0, 10]
    pub fn new(value: f64) -> Result<Self> {
        if !value.is_finite() || !(Self::MIN..=Self::MAX).contains(&value) {
            return Err(HeatError::OutOfRange(value));
        }
        Ok(NormalizedValue(value))
    }

    pub fn value(&self) -> f64 {
        self.0
    }

    /// Signed difference `self - other`
    pub fn diff(&self, other: NormalizedValue) -> f64 {
        self.0 - other.0
    }
}

impl TryFrom<f64> for NormalizedValue {
    type Error = HeatError;

    fn try_from(value: f64) -> Result<Self> {
        NormalizedValue::new(value)
    }
}

impl From<NormalizedValue> for f64 {
    fn from(value: NormalizedValue) -> f64 {
        value.0
    }
}

impl fmt::Display for NormalizedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

/// Per-dimension temperatures of one shard
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TemperatureVector {
    values: BTreeMap<Dimension, NormalizedValue>,
}

impl TemperatureVector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrites whatever was recorded for the dimension before
    pub fn set(&mut self, dimension: Dimension, value: NormalizedValue) {
        self.values.insert(dimension, value);
    }

    pub fn get(&self, dimension: Dimension) -> Option<NormalizedValue> {
        self.values.get(&dimension).copied()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Dimension, NormalizedValue)> + '_ {
        self.values.iter().map(|(d, v)| (*d, *v))
    }
}

/// Classification of a shard relative to its node's average, hottest first
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HeatZone {
    Hot,
    Warm,
    Lukewarm,
    Cold,
}

impl HeatZone {
    pub const ALL: [HeatZone; 4] = [
        HeatZone::Hot,
        HeatZone::Warm,
        HeatZone::Lukewarm,
        HeatZone::Cold,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            HeatZone::Hot => "hot",
            HeatZone::Warm => "warm",
            HeatZone::Lukewarm => "lukewarm",
            HeatZone::Cold => "cold",
        }
    }

    /// Zone on the other side of the average
    pub fn mirror(&self) -> HeatZone {
        match self {
            HeatZone::Hot => HeatZone::Cold,
            HeatZone::Cold => HeatZone::Hot,
            other => *other,
        }
    }

    pub fn wire_tag(&self) -> i32 {
        match self {
            HeatZone::Hot => 1,
            HeatZone::Warm => 2,
            HeatZone::Lukewarm => 3,
            HeatZone::Cold => 4,
        }
    }

    pub fn from_wire_tag(tag: i32) -> Result<Self> {
        HeatZone::ALL
            .into_iter()
            .find(|z| z.wire_tag() == tag)
            .ok_or(HeatError::UnknownTag { kind: "zone", tag })
    }
}

impl fmt::Display for HeatZone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HeatZone {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        HeatZone::ALL
            .into_iter()
            .find(|z| z.as_str() == lower)
            .ok_or_else(|| format!("unknown heat zone: {}", s))
    }
}

/// Identity of a shard on the local node
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ShardKey {
    pub index_name: String,
    pub shard_id: i32,
}

impl ShardKey {
    pub fn new(index_name: impl Into<String>, shard_id: i32) -> Self {
        Self {
            index_name: index_name.into(),
            shard_id,
        }
    }
}

impl fmt::Display for ShardKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]", self.index_name, self.shard_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalized_value_bounds() {
        assert!(NormalizedValue::new(0.0).is_ok());
        assert!(NormalizedValue::new(10.0).is_ok());
        assert_eq!(
            NormalizedValue::new(10.5),
            Err(HeatError::OutOfRange(10.5))
        );
        assert!(NormalizedValue::new(-0.1).is_err());
        assert!(NormalizedValue::new(f64::NAN).is_err());
        assert!(NormalizedValue::new(f64::INFINITY).is_err());
    }

    #[test]
    fn test_normalized_value_serde_revalidates() {
        let v: NormalizedValue = serde_json::from_str("4.5").unwrap();
        assert_eq!(v.value(), 4.5);
        assert!(serde_json::from_str::<NormalizedValue>("12.0").is_err());
        assert_eq!(serde_json::to_string(&v).unwrap(), "4.5");
    }

    #[test]
    fn test_temperature_vector_overwrites() {
        let mut vector = TemperatureVector::new();
        vector.set(Dimension::Cpu, NormalizedValue::new(3.0).unwrap());
        vector.set(Dimension::Cpu, NormalizedValue::new(7.0).unwrap());
        assert_eq!(vector.len(), 1);
        assert_eq!(vector.get(Dimension::Cpu).unwrap().value(), 7.0);
        assert!(vector.get(Dimension::HeapAllocRate).is_none());
    }

    #[test]
    fn test_zone_order_and_mirror() {
        assert!(HeatZone::Hot < HeatZone::Warm);
        assert!(HeatZone::Lukewarm < HeatZone::Cold);
        assert_eq!(HeatZone::Hot.mirror(), HeatZone::Cold);
        assert_eq!(HeatZone::Lukewarm.mirror(), HeatZone::Lukewarm);
    }

    #[test]
    fn test_wire_tags() {
        for d in Dimension::ALL {
            assert_eq!(Dimension::from_wire_tag(d.wire_tag()).unwrap(), d);
        }
        for z in HeatZone::ALL {
            assert_eq!(HeatZone::from_wire_tag(z.wire_tag()).unwrap(), z);
        }
        assert!(Dimension::from_wire_tag(0).is_err());
        assert!(HeatZone::from_wire_tag(9).is_err());
    }

    #[test]
    fn test_parse_names() {
        assert_eq!("CPU".parse::<Dimension>().unwrap(), Dimension::Cpu);
        assert_eq!(
            "heap-alloc-rate".parse::<Dimension>().unwrap(),
            Dimension::HeapAllocRate
        );
        assert!("disk".parse::<Dimension>().is_err());
        assert_eq!("Hot".parse::<HeatZone>().unwrap(), HeatZone::Hot);
    }

    #[test]
    fn test_shard_key_display() {
        assert_eq!(ShardKey::new("geonames", 2).to_string(), "geonames[2]");
    }
}
