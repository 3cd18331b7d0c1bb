// ============================================================
// Layer 3 — Backbone Architectures
// ============================================================
// The ResNet family as published by torchvision. Each variant
// knows its block type and how many blocks each of the four
// stages contains; Layer 5 turns that into Burn modules.
//
// Parsed from the command line through FromStr, so the CLI layer
// does not need to know about this enum's internals.

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Arch {
    Resnet18,
    Resnet34,
    Resnet50,
    Resnet101,
    Resnet152,
}

/// Residual block flavour used by an architecture
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockKind {
    /// Two 3x3 convolutions, expansion 1
    Basic,
    /// 1x1 → 3x3 → 1x1 convolutions, expansion 4
    Bottleneck,
}

impl BlockKind {
    pub fn expansion(self) -> usize {
        match self {
            BlockKind::Basic      => 1,
            BlockKind::Bottleneck => 4,
        }
    }
}

impl Arch {
    pub const ALL: [Arch; 5] = [
        Arch::Resnet18,
        Arch::Resnet34,
        Arch::Resnet50,
        Arch::Resnet101,
        Arch::Resnet152,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Arch::Resnet18  => "resnet18",
            Arch::Resnet34  => "resnet34",
            Arch::Resnet50  => "resnet50",
            Arch::Resnet101 => "resnet101",
            Arch::Resnet152 => "resnet152",
        }
    }

    pub fn block_kind(self) -> BlockKind {
        match self {
            Arch::Resnet18 | Arch::Resnet34 => BlockKind::Basic,
            _                               => BlockKind::Bottleneck,
        }
    }

    /// Number of residual blocks in each of the four stages
    pub fn stage_depths(self) -> [usize; 4] {
        match self {
            Arch::Resnet18  => [2, 2, 2, 2],
            Arch::Resnet34  => [3, 4, 6, 3],
            Arch::Resnet50  => [3, 4, 6, 3],
            Arch::Resnet101 => [3, 4, 23, 3],
            Arch::Resnet152 => [3, 8, 36, 3],
        }
    }

    /// Width of the pooled feature vector that feeds the classifier
    pub fn feature_dim(self) -> usize {
        512 * self.block_kind().expansion()
    }
}

impl Default for Arch {
    fn default() -> Self {
        Arch::Resnet101
    }
}

impl fmt::Display for Arch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Arch {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match Self::ALL.iter().find(|a| a.name() == s) {
            Some(a) => Ok(*a),
            None => {
                let names: Vec<&str> = Self::ALL.iter().map(|a| a.name()).collect();
                bail!("Unknown architecture '{s}' (expected one of: {})", names.join(" | "))
            }
        }
    }
}
