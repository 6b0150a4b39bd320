use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::lut;

/// The four boolean switches of an LBP operator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LbpOptions {
    /// Compare samples against the mean of the ring instead of the center.
    pub to_average: bool,
    /// Append the center-vs-average comparison as an extra low bit.
    pub add_avg_bit: bool,
    /// Collapse non-uniform patterns into a single label.
    pub uniform: bool,
    /// Map each code to its rotation class.
    pub rotation_invariant: bool,
}

impl LbpOptions {
    pub fn get(&self, name: OptionName) -> bool {
        match name {
            OptionName::ToAverage => self.to_average,
            OptionName::AddAvgBit => self.add_avg_bit,
            OptionName::Uniform => self.uniform,
            OptionName::RotInvariant => self.rotation_invariant,
        }
    }

    pub fn set(&mut self, name: OptionName, value: bool) {
        match name {
            OptionName::ToAverage => self.to_average = value,
            OptionName::AddAvgBit => self.add_avg_bit = value,
            OptionName::Uniform => self.uniform = value,
            OptionName::RotInvariant => self.rotation_invariant = value,
        }
    }
}

/// Names under which the options are exposed to option stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OptionName {
    ToAverage,
    AddAvgBit,
    Uniform,
    RotInvariant,
}

impl OptionName {
    pub const ALL: [OptionName; 4] = [
        OptionName::ToAverage,
        OptionName::AddAvgBit,
        OptionName::Uniform,
        OptionName::RotInvariant,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OptionName::ToAverage => "ToAverage",
            OptionName::AddAvgBit => "AddAvgBit",
            OptionName::Uniform => "Uniform",
            OptionName::RotInvariant => "RotInvariant",
        }
    }
}

impl fmt::Display for OptionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OptionName {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OptionName::ALL
            .into_iter()
            .find(|name| name.as_str() == s)
            .ok_or_else(|| Error::UnknownOption(s.to_string()))
    }
}

/// The lookup table an option set resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TableKind {
    /// No reduction.
    Raw,
    /// Raw code with the average bit appended.
    AverageBit,
    Uniform,
    RotationInvariant,
    UniformRotationInvariant,
}

impl TableKind {
    pub const COUNT: usize = 5;

    pub const ALL: [TableKind; TableKind::COUNT] = [
        TableKind::Raw,
        TableKind::AverageBit,
        TableKind::Uniform,
        TableKind::RotationInvariant,
        TableKind::UniformRotationInvariant,
    ];

    /// Rotation invariance takes precedence over uniformity, which takes
    /// precedence over the average bit. The average bit needs both
    /// `to_average` and `add_avg_bit`.
    pub fn from_options(options: &LbpOptions) -> Self {
        match (
            options.rotation_invariant,
            options.uniform,
            options.add_avg_bit && options.to_average,
        ) {
            (true, true, _) => TableKind::UniformRotationInvariant,
            (true, false, _) => TableKind::RotationInvariant,
            (false, true, _) => TableKind::Uniform,
            (false, false, true) => TableKind::AverageBit,
            (false, false, false) => TableKind::Raw,
        }
    }

    pub(crate) fn index(&self) -> usize {
        match self {
            TableKind::Raw => 0,
            TableKind::AverageBit => 1,
            TableKind::Uniform => 2,
            TableKind::RotationInvariant => 3,
            TableKind::UniformRotationInvariant => 4,
        }
    }

    /// Whether codes looked up in this table carry the extra average bit.
    pub fn uses_average_bit(&self) -> bool {
        matches!(self, TableKind::AverageBit)
    }

    /// Size of the output alphabet for `points` samples.
    ///
    /// Rotation-invariant outputs are minimal raw codes, so their alphabet
    /// is the raw range even though only a subset of values occurs.
    pub fn symbol_count(&self, points: u32) -> usize {
        match self {
            TableKind::Raw | TableKind::RotationInvariant => 1 << points,
            TableKind::AverageBit => 1 << (points + 1),
            TableKind::Uniform => lut::uniform_pattern_count(points) as usize + 1,
            TableKind::UniformRotationInvariant => points as usize + 2,
        }
    }
}
