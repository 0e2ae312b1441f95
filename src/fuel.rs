//! Point-to-fuel quantization
//!
//! Points are rendered as liters across five fuel grades. A total is broken
//! into tanks greedily, largest grade first, which yields the minimum number
//! of liters for this denomination set. Quantization is always recomputed
//! from the current total, never cached.

use serde::{Deserialize, Serialize};

/// One liter's worth of fuel, by grade. Grade N is worth N points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FuelGrade {
    Diesel,
    Fuel91,
    Fuel95,
    Fuel98,
    Ethanol,
}

impl FuelGrade {
    /// Grade for a single point value in 1..=5.
    pub fn from_points(points: i64) -> Option<Self> {
        match points {
            1 => Some(FuelGrade::Diesel),
            2 => Some(FuelGrade::Fuel91),
            3 => Some(FuelGrade::Fuel95),
            4 => Some(FuelGrade::Fuel98),
            5 => Some(FuelGrade::Ethanol),
            _ => None,
        }
    }

    pub fn points(&self) -> i64 {
        match self {
            FuelGrade::Diesel => 1,
            FuelGrade::Fuel91 => 2,
            FuelGrade::Fuel95 => 3,
            FuelGrade::Fuel98 => 4,
            FuelGrade::Ethanol => 5,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            FuelGrade::Diesel => "diesel",
            FuelGrade::Fuel91 => "91",
            FuelGrade::Fuel95 => "95",
            FuelGrade::Fuel98 => "98",
            FuelGrade::Ethanol => "ethanol",
        }
    }
}

/// Liters held per grade. Doubles as the per-grade histogram used by the
/// export reports, where each approved request counts as one liter of its
/// grade.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FuelTanks {
    pub diesel: u64,
    pub fuel91: u64,
    pub fuel95: u64,
    pub fuel98: u64,
    pub ethanol: u64,
}

impl FuelTanks {
    /// Greedy largest-first decomposition of a point total.
    ///
    /// Negative totals quantize to empty tanks; the ledger may transiently
    /// dip below zero and display clamps at zero.
    pub fn quantize(total_points: i64) -> Self {
        let mut tanks = FuelTanks::default();
        let mut remaining = total_points.max(0) as u64;

        tanks.ethanol = remaining / 5;
        remaining %= 5;
        match remaining {
            4 => tanks.fuel98 = 1,
            3 => tanks.fuel95 = 1,
            2 => tanks.fuel91 = 1,
            1 => tanks.diesel = 1,
            _ => {}
        }

        tanks
    }

    /// Add one liter of the given grade (histogram use).
    pub fn add_grade(&mut self, grade: FuelGrade) {
        match grade {
            FuelGrade::Diesel => self.diesel += 1,
            FuelGrade::Fuel91 => self.fuel91 += 1,
            FuelGrade::Fuel95 => self.fuel95 += 1,
            FuelGrade::Fuel98 => self.fuel98 += 1,
            FuelGrade::Ethanol => self.ethanol += 1,
        }
    }

    /// Merge another tank set into this one.
    pub fn merge(&mut self, other: &FuelTanks) {
        self.diesel += other.diesel;
        self.fuel91 += other.fuel91;
        self.fuel95 += other.fuel95;
        self.fuel98 += other.fuel98;
        self.ethanol += other.ethanol;
    }

    pub fn total_liters(&self) -> u64 {
        self.diesel + self.fuel91 + self.fuel95 + self.fuel98 + self.ethanol
    }

    /// Point value represented by these tanks.
    pub fn points(&self) -> u64 {
        self.diesel + self.fuel91 * 2 + self.fuel95 * 3 + self.fuel98 * 4 + self.ethanol * 5
    }
}
