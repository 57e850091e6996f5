//! The aggregate repository seam.

use crate::aggregate::{Nav, NavId};
use anyhow::Result;
use async_trait::async_trait;

/// Scoped mutation passed to [`Repository::use_nav`].
pub type NavFn = Box<dyn FnOnce(&mut Nav) -> Result<()> + Send>;

/// Loads and persists Navs.
///
/// Implementations persist a Nav's uncommitted events and publish them
/// after they are durable. `fetch` of an unknown identity fails with
/// [`NavError::NotFound`](crate::NavError::NotFound).
#[async_trait]
pub trait Repository: Send + Sync {
    /// Persists the uncommitted events of `nav` and clears them.
    async fn save(&self, nav: &mut Nav) -> Result<()>;

    async fn fetch(&self, id: NavId) -> Result<Nav>;

    async fn delete(&self, nav: &Nav) -> Result<()>;

    /// Fetches the Nav, runs `f` on it and saves only if `f` succeeds.
    async fn use_nav(&self, id: NavId, f: NavFn) -> Result<Nav> {
        let mut nav = self.fetch(id).await?;
        f(&mut nav)?;
        self.save(&mut nav).await?;
        Ok(nav)
    }
}
