//! Customer address book.

use std::sync::Arc;

use till_core::CustomerProfile;
use tracing::{instrument, warn};

use crate::error::{Result, TillError};
use crate::remote::{RemoteService, Source};
use crate::store::{self, Collection, LocalStore};

/// Customer profiles, read through the `customers` collection.
pub struct CustomerBook {
    remote: Arc<dyn RemoteService>,
    store: Arc<dyn LocalStore>,
}

impl CustomerBook {
    #[must_use]
    pub fn new(remote: Arc<dyn RemoteService>, store: Arc<dyn LocalStore>) -> Self {
        Self { remote, store }
    }

    /// Fetch profiles, falling back to the cached copy.
    pub async fn load(&self) -> (Vec<CustomerProfile>, Source) {
        match self.remote.fetch_customer_data().await {
            Ok(profiles) => {
                if let Err(e) = store::save_all(
                    self.store.as_ref(),
                    Collection::Customers,
                    &profiles,
                    profile_key,
                )
                .await
                {
                    warn!(error = %e, "Failed to cache customers");
                }
                (profiles, Source::Remote)
            }
            Err(e) => {
                warn!(error = %e, "Customer data unavailable, using cached copy");
                (
                    store::load_or_empty(self.store.as_ref(), Collection::Customers).await,
                    Source::Cache,
                )
            }
        }
    }

    /// Profile with this phone number, if known.
    pub async fn find_by_phone(&self, phone: &str) -> Option<CustomerProfile> {
        let (profiles, _) = self.load().await;
        profiles
            .into_iter()
            .find(|p| p.customer_phone.as_deref() == Some(phone))
    }

    /// Store a profile remotely, then refresh the cache.
    ///
    /// # Errors
    ///
    /// Returns `TillError::Validation` for a profile with no details, or
    /// `TillError::Transport` if the service rejects it.
    #[instrument(skip(self, profile))]
    pub async fn save(&self, profile: &CustomerProfile) -> Result<()> {
        if profile.customer_name.is_none()
            && profile.customer_phone.is_none()
            && profile.customer_address.is_none()
        {
            return Err(TillError::Validation(
                "Customer details are empty".to_string(),
            ));
        }
        self.remote.save_customer_data(profile).await?;
        self.load().await;
        Ok(())
    }
}

fn profile_key(index: usize, profile: &CustomerProfile) -> String {
    profile
        .server_id
        .clone()
        .or_else(|| profile.customer_phone.clone())
        .unwrap_or_else(|| format!("customer-{index}"))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::remote::FakeRemote;
    use crate::store::MemoryStore;

    fn profile(name: &str, phone: &str) -> CustomerProfile {
        CustomerProfile {
            server_id: None,
            customer_name: Some(name.to_string()),
            customer_phone: Some(phone.to_string()),
            customer_address: None,
        }
    }

    #[tokio::test]
    async fn test_save_then_read_offline() {
        let remote = Arc::new(FakeRemote::new());
        let book = CustomerBook::new(remote.clone(), Arc::new(MemoryStore::new()));
        book.save(&profile("Asha", "9876543210")).await.unwrap();
        book.save(&profile("Ravi", "9123456780")).await.unwrap();

        remote.set_online(false).await;
        let (profiles, source) = book.load().await;
        assert_eq!(source, Source::Cache);
        assert_eq!(profiles.len(), 2);

        let asha = book.find_by_phone("9876543210").await.unwrap();
        assert_eq!(asha.customer_name.as_deref(), Some("Asha"));
        assert!(asha.server_id.is_some());
    }

    #[tokio::test]
    async fn test_empty_profile_is_rejected() {
        let book = CustomerBook::new(Arc::new(FakeRemote::new()), Arc::new(MemoryStore::new()));
        let empty = CustomerProfile {
            server_id: None,
            customer_name: None,
            customer_phone: None,
            customer_address: None,
        };
        assert!(matches!(
            book.save(&empty).await,
            Err(TillError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_save_offline_fails() {
        let remote = Arc::new(FakeRemote::new());
        remote.set_online(false).await;
        let book = CustomerBook::new(remote, Arc::new(MemoryStore::new()));
        assert!(matches!(
            book.save(&profile("Asha", "9876543210")).await,
            Err(TillError::Transport(_))
        ));
    }
}
