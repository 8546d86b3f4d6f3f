//! The tenant registry.
//!
//! [`TenantRouter`] maps tenant ids to resolved clients. Credential
//! resolution happens outside the registry lock; the write lock is held only
//! for the map insert, so a slow role exchange never blocks lookups or sends
//! for other tenants.

use crate::error::{BatchRegistrationError, SesError, SesResult};
use crate::provider::MailProvider;
use crate::resolver::CredentialResolver;
use crate::types::TenantAccountConfig;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::{info, warn};

/// A registered tenant: its client and the address it sends from.
///
/// Replaced as a whole when the tenant is registered again.
#[derive(Clone)]
pub struct TenantSender {
    client: Arc<dyn MailProvider>,
    default_sender: String,
}

impl TenantSender {
    /// The tenant's mail client.
    pub fn client(&self) -> &Arc<dyn MailProvider> {
        &self.client
    }

    /// The `From` address used for the tenant's messages.
    pub fn default_sender(&self) -> &str {
        &self.default_sender
    }
}

impl fmt::Debug for TenantSender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TenantSender")
            .field("default_sender", &self.default_sender)
            .finish_non_exhaustive()
    }
}

/// Routes sends to per-tenant, credential-scoped clients.
///
/// Clones share one registry. Entries are never removed.
///
/// ```no_run
/// use integrations_aws_ses_router::config::RouterConfig;
/// use integrations_aws_ses_router::resolver::AssumeRoleResolver;
/// use integrations_aws_ses_router::router::TenantRouter;
/// use integrations_aws_ses_router::types::TenantAccountConfig;
/// use std::sync::Arc;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let resolver = AssumeRoleResolver::new(RouterConfig::from_env()?)?;
/// let router = TenantRouter::new(Arc::new(resolver));
///
/// router
///     .register(
///         "billing",
///         TenantAccountConfig::new(
///             "arn:aws:iam::123456789012:role/billing-mailer",
///             "eu-west-1",
///             "Billing <billing@example.com>",
///         ),
///     )
///     .await?;
///
/// let message_id = router
///     .send_simple("billing", "customer@example.com", "Your invoice", "Attached.")
///     .await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct TenantRouter {
    tenants: Arc<RwLock<HashMap<String, TenantSender>>>,
    resolver: Arc<dyn CredentialResolver>,
}

impl TenantRouter {
    /// Create an empty router.
    pub fn new(resolver: Arc<dyn CredentialResolver>) -> Self {
        Self {
            tenants: Arc::new(RwLock::new(HashMap::new())),
            resolver,
        }
    }

    /// Create a router and register `tenants` with
    /// [`register_batch`](Self::register_batch).
    pub async fn with_tenants<I>(
        resolver: Arc<dyn CredentialResolver>,
        tenants: I,
    ) -> Result<Self, BatchRegistrationError>
    where
        I: IntoIterator<Item = (String, TenantAccountConfig)>,
    {
        let router = Self::new(resolver);
        router.register_batch(tenants).await?;
        Ok(router)
    }

    /// Register `tenant_id`, replacing any previous registration.
    ///
    /// # Errors
    ///
    /// - [`SesError::InvalidArgument`] for an empty tenant id or an
    ///   incomplete `config`; no resolution is attempted.
    /// - [`SesError::Credential`] when resolution fails. The registry is
    ///   left untouched.
    pub async fn register(&self, tenant_id: &str, config: TenantAccountConfig) -> SesResult<()> {
        validate_registration(tenant_id, &config)?;

        let client = self.resolver.resolve(&config).await.map_err(|e| {
            warn!(tenant_id, error = %e, "Tenant registration failed");
            e.with_tenant(tenant_id)
        })?;

        let sender = TenantSender {
            client,
            default_sender: config.default_sender,
        };

        let replaced = self
            .tenants
            .write()
            .insert(tenant_id.to_string(), sender)
            .is_some();

        info!(tenant_id, region = %config.region, replaced, "Registered tenant");
        Ok(())
    }

    /// Register several tenants in iteration order.
    ///
    /// Every id and config is validated before anything is resolved, so an
    /// incomplete entry registers nothing. Resolution then runs one tenant at
    /// a time and stops at the first failure; tenants registered before it
    /// stay registered.
    ///
    /// # Errors
    ///
    /// [`BatchRegistrationError`] naming the failed tenant and those already
    /// registered.
    pub async fn register_batch<I>(&self, tenants: I) -> Result<(), BatchRegistrationError>
    where
        I: IntoIterator<Item = (String, TenantAccountConfig)>,
    {
        let tenants: Vec<_> = tenants.into_iter().collect();

        for (tenant_id, config) in &tenants {
            if let Err(source) = validate_registration(tenant_id, config) {
                return Err(BatchRegistrationError {
                    failed_tenant: tenant_id.clone(),
                    registered: Vec::new(),
                    source,
                });
            }
        }

        let mut registered = Vec::with_capacity(tenants.len());
        for (tenant_id, config) in tenants {
            if let Err(source) = self.register(&tenant_id, config).await {
                return Err(BatchRegistrationError {
                    failed_tenant: tenant_id,
                    registered,
                    source,
                });
            }
            registered.push(tenant_id);
        }

        Ok(())
    }

    /// The registration for `tenant_id`, if any.
    pub fn lookup(&self, tenant_id: &str) -> Option<TenantSender> {
        self.tenants.read().get(tenant_id).cloned()
    }

    /// `true` if `tenant_id` is registered.
    pub fn contains(&self, tenant_id: &str) -> bool {
        self.tenants.read().contains_key(tenant_id)
    }

    /// Registered tenant ids, sorted.
    pub fn tenant_ids(&self) -> Vec<String> {
        let mut ids: Vec<_> = self.tenants.read().keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Number of registered tenants.
    pub fn len(&self) -> usize {
        self.tenants.read().len()
    }

    /// `true` if no tenant is registered.
    pub fn is_empty(&self) -> bool {
        self.tenants.read().is_empty()
    }

    pub(crate) fn sender(&self, tenant_id: &str) -> SesResult<TenantSender> {
        if tenant_id.trim().is_empty() {
            return Err(SesError::invalid_argument("tenant_id", "must not be empty"));
        }
        self.lookup(tenant_id).ok_or_else(|| SesError::TenantNotFound {
            tenant_id: tenant_id.to_string(),
        })
    }
}

impl fmt::Debug for TenantRouter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TenantRouter")
            .field("tenants", &self.tenant_ids())
            .finish_non_exhaustive()
    }
}

fn validate_registration(tenant_id: &str, config: &TenantAccountConfig) -> SesResult<()> {
    if tenant_id.trim().is_empty() {
        return Err(SesError::invalid_argument("tenant_id", "must not be empty"));
    }
    config.validate()
}
