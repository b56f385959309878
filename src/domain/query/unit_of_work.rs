use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;

use crate::domain::DomainError;

/// Observer of unit-of-work boundaries (save changes / transaction commit)
#[cfg_attr(test, automock)]
#[async_trait]
pub trait UnitOfWorkListener: Send + Sync {
    /// Called after a unit of work committed `affected` changes
    async fn committed(&self, affected: u64) -> Result<(), DomainError>;

    /// Called after a unit of work was rolled back
    async fn rolled_back(&self) -> Result<(), DomainError> {
        Ok(())
    }
}
