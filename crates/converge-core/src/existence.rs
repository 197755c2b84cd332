//! Resource existence resolution with canonical-identity validation.

use tracing::debug;

use crate::error::{ConvergeError, ConvergeResult};
use crate::lookup::Lookup;
use crate::provider::{DirectoryResources, Resource, ResourceKind};

/// Whether the resource addressed by a key exists.
#[derive(Debug, Clone, PartialEq)]
pub enum Existence {
    Absent,
    Present(Resource),
}

impl Existence {
    #[must_use]
    pub fn is_present(&self) -> bool {
        matches!(self, Self::Present(_))
    }
}

/// Fail unless `resource` is canonically identified by `key`.
///
/// The comparison ignores case. A key that only resolves through an alias
/// must never be mutated.
pub fn ensure_canonical(kind: ResourceKind, key: &str, resource: &Resource) -> ConvergeResult<()> {
    if resource.canonical_key.to_lowercase() == key.to_lowercase() {
        Ok(())
    } else {
        Err(ConvergeError::IdentityMismatch {
            kind,
            key: key.to_string(),
            canonical: resource.canonical_key.clone(),
        })
    }
}

/// Look up `key` and classify the result.
///
/// Absence is the create branch. A lookup that failed for any other reason is
/// fatal, since it says nothing about whether the resource exists.
pub async fn resolve<R>(resources: &R, key: &str) -> ConvergeResult<Existence>
where
    R: DirectoryResources + ?Sized,
{
    let kind = resources.kind();
    match Lookup::from_result(resources.get(key).await) {
        Lookup::Found(resource) => {
            ensure_canonical(kind, key, &resource)?;
            debug!(kind = %kind, key = %key, "Resource exists");
            Ok(Existence::Present(resource))
        }
        Lookup::NotFound => {
            debug!(kind = %kind, key = %key, "Resource does not exist");
            Ok(Existence::Absent)
        }
        Lookup::TransportError(source) => Err(ConvergeError::Lookup {
            kind,
            key: key.to_string(),
            source,
        }),
    }
}
