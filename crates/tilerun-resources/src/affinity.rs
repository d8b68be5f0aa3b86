//! CPU affinity tables
//!
//! An affinity string lists one CPU per tile in spawn order. Entries are
//! comma separated and may be:
//! - `N`: pin to CPU N
//! - `A-B`: pin to each CPU from A to B inclusive
//! - `A-B/S`: same, stepping by S
//! - `f`: one floating (unpinned) slot
//! - `fN`: N floating slots

use log::warn;
use nix::sched::{CpuSet, sched_getaffinity, sched_setaffinity};
use nix::unistd::Pid;
use std::fmt;
use std::str::FromStr;
use tilerun_core::{Result, TileError};

/// Maximum number of entries an affinity table may hold
pub const TABLE_MAX: usize = 1024;

/// Placement of one spawn ordinal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CpuSlot {
    Pinned(usize),
    Floating,
}

impl fmt::Display for CpuSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CpuSlot::Pinned(cpu) => write!(f, "{}", cpu),
            CpuSlot::Floating => f.write_str("floating"),
        }
    }
}

/// Spawn ordinal to CPU mapping
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AffinityTable {
    slots: Vec<CpuSlot>,
}

impl AffinityTable {
    pub fn parse(list: &str) -> Result<Self> {
        let cpu_limit = CpuSet::count();
        let mut slots = Vec::new();

        for raw in list.split(',') {
            let token = raw.trim();
            if token.is_empty() {
                if list.trim().is_empty() {
                    break;
                }
                return Err(invalid(list, "empty entry"));
            }

            if let Some(count) = token.strip_prefix('f') {
                let count = if count.is_empty() {
                    1
                } else {
                    parse_number(list, count)?
                };
                if count == 0 {
                    return Err(invalid(list, "floating count must be at least 1"));
                }
                slots.extend(std::iter::repeat_n(CpuSlot::Floating, count));
            } else if let Some((lo, rest)) = token.split_once('-') {
                let (hi, stride) = match rest.split_once('/') {
                    Some((hi, stride)) => (hi, parse_number(list, stride)?),
                    None => (rest, 1),
                };
                let lo = parse_number(list, lo)?;
                let hi = parse_number(list, hi)?;
                if lo > hi {
                    return Err(invalid(list, &format!("range {}-{} is reversed", lo, hi)));
                }
                if stride == 0 {
                    return Err(invalid(list, "stride must be at least 1"));
                }
                for cpu in (lo..=hi).step_by(stride) {
                    slots.push(pinned(list, cpu, cpu_limit)?);
                }
            } else {
                let cpu = parse_number(list, token)?;
                slots.push(pinned(list, cpu, cpu_limit)?);
            }

            if slots.len() > TABLE_MAX {
                return Err(invalid(list, &format!("more than {} entries", TABLE_MAX)));
            }
        }

        Ok(Self { slots })
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn slots(&self) -> &[CpuSlot] {
        &self.slots
    }

    /// Placement for a spawn ordinal; ordinals past the end float.
    pub fn slot(&self, ordinal: usize) -> CpuSlot {
        self.slots.get(ordinal).copied().unwrap_or(CpuSlot::Floating)
    }

    /// Fail unless the table names a CPU for each of `required` tiles.
    ///
    /// Extra entries are ignored with a warning.
    pub fn ensure_covers(&self, required: usize) -> Result<()> {
        if self.slots.len() < required {
            return Err(TileError::Configuration(format!(
                "affinity lists {} cpus but the topology requires {} tiles",
                self.slots.len(),
                required
            )));
        }
        if self.slots.len() > required {
            warn!(
                "affinity lists {} cpus but only {} tiles required, ignoring the rest",
                self.slots.len(),
                required
            );
        }
        Ok(())
    }

    /// Mask to apply before spawning `ordinal`.
    pub fn mask_for(&self, ordinal: usize, floating: &CpuSet) -> Result<CpuSet> {
        match self.slot(ordinal) {
            CpuSlot::Pinned(cpu) => single(cpu),
            CpuSlot::Floating => Ok(floating.clone()),
        }
    }
}

impl FromStr for AffinityTable {
    type Err = TileError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// Affinity mask of the calling thread
pub fn current() -> Result<CpuSet> {
    sched_getaffinity(Pid::from_raw(0))
        .map_err(|e| TileError::Syscall(format!("sched_getaffinity failed: {}", e)))
}

/// Apply a mask to the calling thread
pub fn apply(mask: &CpuSet) -> Result<()> {
    sched_setaffinity(Pid::from_raw(0), mask)
        .map_err(|e| TileError::Syscall(format!("sched_setaffinity failed: {}", e)))
}

/// Mask containing exactly one CPU
pub fn single(cpu: usize) -> Result<CpuSet> {
    let mut mask = CpuSet::new();
    mask.set(cpu)
        .map_err(|e| TileError::Configuration(format!("cpu {} out of range: {}", cpu, e)))?;
    Ok(mask)
}

/// CPUs set in a mask, lowest first
pub fn cpus_in(mask: &CpuSet) -> Vec<usize> {
    (0..CpuSet::count())
        .filter(|&cpu| mask.is_set(cpu).unwrap_or(false))
        .collect()
}

fn pinned(list: &str, cpu: usize, limit: usize) -> Result<CpuSlot> {
    if cpu >= limit {
        return Err(invalid(
            list,
            &format!("cpu {} is beyond the supported {} cpus", cpu, limit),
        ));
    }
    Ok(CpuSlot::Pinned(cpu))
}

fn parse_number(list: &str, raw: &str) -> Result<usize> {
    raw.trim()
        .parse::<usize>()
        .map_err(|_| invalid(list, &format!("'{}' is not a number", raw)))
}

fn invalid(list: &str, reason: &str) -> TileError {
    TileError::Configuration(format!("invalid affinity '{}': {}", list, reason))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_single_cpus() {
        let table = AffinityTable::parse("0,2,5").unwrap();
        assert_eq!(
            table.slots(),
            &[CpuSlot::Pinned(0), CpuSlot::Pinned(2), CpuSlot::Pinned(5)]
        );
    }

    #[test]
    fn parses_ranges_and_strides() {
        let table = AffinityTable::parse("1-3, 8-14/3").unwrap();
        let cpus: Vec<_> = table.slots().iter().map(|s| s.to_string()).collect();
        assert_eq!(cpus, ["1", "2", "3", "8", "11", "14"]);
    }

    #[test]
    fn parses_floating_slots() {
        let table = AffinityTable::parse("f,0,f3").unwrap();
        assert_eq!(table.len(), 5);
        assert_eq!(table.slot(0), CpuSlot::Floating);
        assert_eq!(table.slot(1), CpuSlot::Pinned(0));
        assert_eq!(table.slot(4), CpuSlot::Floating);
    }

    #[test]
    fn empty_string_is_empty_table() {
        assert!(AffinityTable::parse("").unwrap().is_empty());
        assert!(AffinityTable::parse("   ").unwrap().is_empty());
    }

    #[test]
    fn rejects_malformed_entries() {
        for bad in ["1,,2", "a", "3-1", "0-4/0", "f0", "1-", "99999"] {
            let err = AffinityTable::parse(bad).unwrap_err();
            assert!(
                matches!(err, TileError::Configuration(_)),
                "{} should be a configuration error",
                bad
            );
        }
    }

    #[test]
    fn rejects_oversized_tables() {
        let list = format!("f{}", TABLE_MAX + 1);
        assert!(AffinityTable::parse(&list).is_err());
    }

    #[test]
    fn slots_past_the_end_float() {
        let table = AffinityTable::parse("3").unwrap();
        assert_eq!(table.slot(7), CpuSlot::Floating);
    }

    #[test]
    fn short_table_does_not_cover_topology() {
        let table = AffinityTable::parse("0-5").unwrap();
        let err = table.ensure_covers(7).unwrap_err();
        assert!(err.to_string().contains("requires 7 tiles"));
        assert!(table.ensure_covers(6).is_ok());
        assert!(table.ensure_covers(2).is_ok());
    }

    #[test]
    fn mask_for_floating_reuses_saved_mask() {
        let floating = current().unwrap();
        let table = AffinityTable::parse("f").unwrap();
        let mask = table.mask_for(0, &floating).unwrap();
        assert_eq!(cpus_in(&mask), cpus_in(&floating));
    }

    #[test]
    fn single_mask_has_one_cpu() {
        let mask = single(0).unwrap();
        assert_eq!(cpus_in(&mask), vec![0]);
    }
}
