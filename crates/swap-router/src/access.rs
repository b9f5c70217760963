//! Access Gate
//!
//! Allow-list of agents authorized to invoke swap operations, plus a single
//! admin identity. The admin is implicitly authorized and manages the list;
//! handing the role over is its own privileged operation, so the admin can
//! never drop out of the registry by accident.

use std::collections::HashSet;

use tokio::sync::RwLock;

use conduit_core::{Address, Result, SwapError};

/// Agent registry and admin role
pub struct AccessGate {
    admin: RwLock<Address>,
    agents: RwLock<HashSet<Address>>,
}

impl AccessGate {
    pub fn new(admin: Address) -> Self {
        Self {
            admin: RwLock::new(admin),
            agents: RwLock::new(HashSet::new()),
        }
    }

    pub async fn admin(&self) -> Address {
        *self.admin.read().await
    }

    /// Registry membership. The admin is authorized implicitly and does not
    /// appear here unless registered explicitly.
    pub async fn is_agent(&self, address: &Address) -> bool {
        self.agents.read().await.contains(address)
    }

    /// Gate for every mutating entry point: admin or registered agent.
    pub async fn authorize(&self, caller: &Address) -> Result<()> {
        if *self.admin.read().await == *caller || self.agents.read().await.contains(caller) {
            return Ok(());
        }
        Err(SwapError::Unauthorized(*caller))
    }

    pub async fn require_admin(&self, caller: &Address) -> Result<()> {
        if *self.admin.read().await == *caller {
            return Ok(());
        }
        Err(SwapError::Unauthorized(*caller))
    }

    /// Add or remove an agent. Admin-only. Returns whether the registry
    /// changed; re-registering with an unchanged flag is an idempotent
    /// success and must not emit a duplicate event.
    pub async fn register(&self, caller: &Address, address: Address, enabled: bool) -> Result<bool> {
        self.require_admin(caller).await?;
        if address.is_zero() {
            return Err(SwapError::InvalidRequest {
                reason: "agent address must be non-zero".to_string(),
            });
        }
        let mut agents = self.agents.write().await;
        let changed = if enabled {
            agents.insert(address)
        } else {
            agents.remove(&address)
        };
        Ok(changed)
    }

    /// Hand the admin role to `new_admin`. Admin-only; returns the previous
    /// admin.
    pub async fn transfer_admin(&self, caller: &Address, new_admin: Address) -> Result<Address> {
        self.require_admin(caller).await?;
        if new_admin.is_zero() {
            return Err(SwapError::InvalidRequest {
                reason: "admin must be non-zero".to_string(),
            });
        }
        let mut admin = self.admin.write().await;
        let previous = *admin;
        *admin = new_admin;
        Ok(previous)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(n: u8) -> Address {
        let mut bytes = [0u8; 20];
        bytes[19] = n;
        Address::new(bytes)
    }

    #[tokio::test]
    async fn test_admin_is_implicitly_authorized() {
        let gate = AccessGate::new(addr(1));
        assert!(gate.authorize(&addr(1)).await.is_ok());
        assert!(!gate.is_agent(&addr(1)).await);
    }

    #[tokio::test]
    async fn test_non_agent_is_rejected() {
        let gate = AccessGate::new(addr(1));
        let err = gate.authorize(&addr(2)).await.unwrap_err();
        assert!(matches!(err, SwapError::Unauthorized(a) if a == addr(2)));
    }

    #[tokio::test]
    async fn test_register_and_revoke() {
        let gate = AccessGate::new(addr(1));
        assert!(gate.register(&addr(1), addr(2), true).await.unwrap());
        assert!(gate.is_agent(&addr(2)).await);
        assert!(gate.authorize(&addr(2)).await.is_ok());

        assert!(gate.register(&addr(1), addr(2), false).await.unwrap());
        assert!(!gate.is_agent(&addr(2)).await);
        assert!(gate.authorize(&addr(2)).await.is_err());
    }

    #[tokio::test]
    async fn test_reregistration_is_idempotent() {
        let gate = AccessGate::new(addr(1));
        assert!(gate.register(&addr(1), addr(2), true).await.unwrap());
        // same flag again: success, but nothing changed
        assert!(!gate.register(&addr(1), addr(2), true).await.unwrap());
        assert!(gate.is_agent(&addr(2)).await);

        assert!(gate.register(&addr(1), addr(2), false).await.unwrap());
        assert!(!gate.register(&addr(1), addr(2), false).await.unwrap());
    }

    #[tokio::test]
    async fn test_only_admin_registers() {
        let gate = AccessGate::new(addr(1));
        gate.register(&addr(1), addr(2), true).await.unwrap();

        let err = gate.register(&addr(2), addr(3), true).await.unwrap_err();
        assert!(matches!(err, SwapError::Unauthorized(_)));
        assert!(!gate.is_agent(&addr(3)).await);
    }

    #[tokio::test]
    async fn test_transfer_admin_is_distinct_and_privileged() {
        let gate = AccessGate::new(addr(1));
        assert!(gate.transfer_admin(&addr(2), addr(2)).await.is_err());

        let previous = gate.transfer_admin(&addr(1), addr(5)).await.unwrap();
        assert_eq!(previous, addr(1));
        assert_eq!(gate.admin().await, addr(5));
        // old admin loses implicit authorization
        assert!(gate.authorize(&addr(1)).await.is_err());
        assert!(gate.authorize(&addr(5)).await.is_ok());
    }

    #[tokio::test]
    async fn test_zero_addresses_rejected() {
        let gate = AccessGate::new(addr(1));
        assert!(gate.register(&addr(1), Address::ZERO, true).await.is_err());
        assert!(gate.transfer_admin(&addr(1), Address::ZERO).await.is_err());
    }
}
