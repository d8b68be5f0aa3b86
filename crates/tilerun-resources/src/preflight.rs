//! Pre-flight permission checks
//!
//! Requirements are collected first and reported together, so an operator
//! sees every missing capability or limit in one run instead of fixing
//! them one at a time. Checks must run before any privilege is dropped.

use crate::rlimit::{Resource, get_rlimit, set_rlimit};
use log::debug;
use tilerun_core::{Capability, Result, TileError};

/// Accumulated requirement results
#[derive(Debug)]
pub struct Preflight {
    component: String,
    passed: Vec<String>,
    failures: Vec<String>,
}

impl Preflight {
    /// Start a check on behalf of `component` (used in messages)
    pub fn new(component: &str) -> Self {
        Self {
            component: component.to_string(),
            passed: Vec::new(),
            failures: Vec::new(),
        }
    }

    /// Require a capability in the effective set
    pub fn require_capability(&mut self, capability: Capability, justification: &str) -> &mut Self {
        if capability.is_effective() {
            self.passed
                .push(format!("{} ({})", capability.name(), justification));
        } else {
            self.failures.push(format!(
                "{} requires {} to {}",
                self.component,
                capability.name(),
                justification
            ));
        }
        self
    }

    /// Require a soft limit of at least `minimum`, raising it in place when
    /// the hard limit (or CAP_SYS_RESOURCE) allows.
    pub fn require_resource_limit(
        &mut self,
        resource: Resource,
        minimum: u64,
        justification: &str,
    ) -> &mut Self {
        match raise_to(resource, minimum) {
            Ok(()) => self
                .passed
                .push(format!("{:?} >= {} ({})", resource, minimum, justification)),
            Err(reason) => self.failures.push(format!(
                "{} requires {:?} of at least {} to {}: {}",
                self.component, resource, minimum, justification, reason
            )),
        }
        self
    }

    pub fn failures(&self) -> &[String] {
        &self.failures
    }

    pub fn is_ok(&self) -> bool {
        self.failures.is_empty()
    }

    /// Human-readable report, one requirement per line
    pub fn report(&self) -> String {
        self.passed
            .iter()
            .map(|line| format!("[ok] {}", line))
            .chain(self.failures.iter().map(|line| format!("[--] {}", line)))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Fail with every unmet requirement, or succeed if there were none
    pub fn finish(self) -> Result<()> {
        if self.failures.is_empty() {
            return Ok(());
        }
        Err(TileError::PermissionDenied(self.failures.join("; ")))
    }
}

fn raise_to(resource: Resource, minimum: u64) -> std::result::Result<(), String> {
    let (soft, hard) = get_rlimit(resource).map_err(|e| e.to_string())?;
    if soft >= minimum {
        return Ok(());
    }

    let new_hard = if hard >= minimum {
        hard
    } else if Capability::SysResource.is_effective() {
        minimum
    } else {
        return Err(format!(
            "current limit is {} with hard limit {}; raise it with `ulimit` or run with CAP_SYS_RESOURCE",
            soft, hard
        ));
    };

    set_rlimit(resource, minimum, new_hard).map_err(|e| e.to_string())?;
    debug!("raised {:?} from {} to {}", resource, soft, minimum);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_preflight_passes() {
        let preflight = Preflight::new("tilerun");
        assert!(preflight.is_ok());
        assert!(preflight.finish().is_ok());
    }

    #[test]
    fn satisfied_limit_passes() {
        let mut preflight = Preflight::new("tilerun");
        preflight.require_resource_limit(Resource::RLIMIT_NOFILE, 3, "keep stdio open");
        assert!(preflight.is_ok());
        assert!(preflight.report().starts_with("[ok]"));
    }

    #[test]
    fn impossible_limit_fails_with_justification() {
        let mut preflight = Preflight::new("tilerun");
        preflight.require_resource_limit(Resource::RLIMIT_NOFILE, u64::MAX - 1, "test");
        assert_eq!(preflight.failures().len(), 1);
        let err = preflight.finish().unwrap_err();
        assert!(matches!(err, TileError::PermissionDenied(_)));
        assert!(err.to_string().contains("RLIMIT_NOFILE"));
    }

    #[test]
    fn failures_are_aggregated() {
        let mut preflight = Preflight::new("tilerun");
        preflight
            .require_resource_limit(Resource::RLIMIT_NOFILE, u64::MAX - 1, "first")
            .require_resource_limit(Resource::RLIMIT_NOFILE, u64::MAX - 2, "second");
        let err = preflight.finish().unwrap_err().to_string();
        assert!(err.contains("first"));
        assert!(err.contains("second"));
    }

    #[test]
    fn capability_result_matches_effective_set() {
        let mut preflight = Preflight::new("tilerun");
        preflight.require_capability(Capability::SysAdmin, "create a pid namespace");
        assert_eq!(preflight.is_ok(), Capability::SysAdmin.is_effective());
    }
}
