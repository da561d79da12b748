//! Task-scoped tenant context
//!
//! The current tenant lives in a task-local slot opened by
//! [`TenantContext::scope`] or [`TenantContext::with_tenant`]. Each logical
//! request opens its own scope, so a worker thread that polls many tasks can
//! never observe another request's tenant.

use crate::errors::{Error, Result};
use crate::types::TenantId;
use std::cell::RefCell;
use std::future::Future;

tokio::task_local! {
    static CURRENT_TENANT: RefCell<Option<TenantId>>;
}

const NO_SCOPE: &str = "no tenant scope is active, wrap the request in TenantContext::scope";
const NOT_SET: &str = "make sure an identifier is set using TenantContext::set";

/// Accessors for the current task's tenant identifier
pub struct TenantContext;

impl TenantContext {
    /// Run `future` with a fresh, empty tenant slot
    pub async fn scope<F>(future: F) -> F::Output
    where
        F: Future,
    {
        CURRENT_TENANT.scope(RefCell::new(None), future).await
    }

    /// Run `future` with the slot preset to `identifier`
    pub async fn with_tenant<F>(identifier: TenantId, future: F) -> F::Output
    where
        F: Future,
    {
        CURRENT_TENANT
            .scope(RefCell::new(Some(identifier)), future)
            .await
    }

    /// Run a synchronous closure with the slot preset to `identifier`
    pub fn sync_with_tenant<F, R>(identifier: TenantId, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        CURRENT_TENANT.sync_scope(RefCell::new(Some(identifier)), f)
    }

    /// Store `identifier` for the rest of the current scope
    pub fn set(identifier: &str) -> Result<()> {
        let identifier = TenantId::new(identifier)?;
        CURRENT_TENANT
            .try_with(|slot| {
                slot.replace(Some(identifier));
            })
            .map_err(|_| Error::missing_tenant_context(NO_SCOPE))
    }

    /// Remove the identifier from the current scope; a no-op outside a scope
    pub fn clear() {
        let _ = CURRENT_TENANT.try_with(|slot| slot.replace(None));
    }

    /// The identifier set for the current scope, if any
    pub fn current() -> Option<TenantId> {
        CURRENT_TENANT
            .try_with(|slot| slot.borrow().clone())
            .ok()
            .flatten()
    }

    /// The identifier set for the current scope, or `MissingTenantContext`
    pub fn require() -> Result<TenantId> {
        Self::current().ok_or_else(|| Error::missing_tenant_context(NOT_SET))
    }
}
