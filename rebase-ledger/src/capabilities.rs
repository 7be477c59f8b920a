//! Role holders checked on every privileged call

use crate::{types::Address, Error, Result};
use serde::{Deserialize, Serialize};

/// Capability holders for the ledger and the monetary policy
///
/// The owner configures both components. Only the monetary policy may rebase
/// the ledger, and only the orchestrator may trigger a policy run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capabilities {
    /// Configuration authority
    pub owner: Address,

    /// Account allowed to call `rebase` on the ledger
    pub monetary_policy: Option<Address>,

    /// Account allowed to call `rebase` on the policy
    pub orchestrator: Option<Address>,
}

impl Capabilities {
    /// Owner only, no policy or orchestrator yet
    pub fn new(owner: Address) -> Self {
        Self {
            owner,
            monetary_policy: None,
            orchestrator: None,
        }
    }

    /// Set the monetary policy holder
    pub fn with_monetary_policy(mut self, monetary_policy: Address) -> Self {
        self.monetary_policy = Some(monetary_policy);
        self
    }

    /// Set the orchestrator
    pub fn with_orchestrator(mut self, orchestrator: Address) -> Self {
        self.orchestrator = Some(orchestrator);
        self
    }

    /// Fail unless `caller` is the owner
    pub fn require_owner(&self, caller: &Address) -> Result<()> {
        if *caller != self.owner {
            return Err(Error::NotAuthorized(format!(
                "{} is not the owner",
                caller
            )));
        }
        Ok(())
    }

    /// Fail unless `caller` is the configured monetary policy
    pub fn require_monetary_policy(&self, caller: &Address) -> Result<()> {
        match self.monetary_policy {
            Some(policy) if policy == *caller => Ok(()),
            _ => Err(Error::NotAuthorized(format!(
                "{} is not the monetary policy",
                caller
            ))),
        }
    }

    /// Fail unless `caller` is the configured orchestrator
    pub fn require_orchestrator(&self, caller: &Address) -> Result<()> {
        match self.orchestrator {
            Some(orchestrator) if orchestrator == *caller => Ok(()),
            _ => Err(Error::NotAuthorized(format!(
                "{} is not the orchestrator",
                caller
            ))),
        }
    }
}
