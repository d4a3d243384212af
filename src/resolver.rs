use std::{
    borrow::Borrow,
    fmt,
    path::{Path, PathBuf},
};

use async_trait::async_trait;
use futures::future::try_join_all;
use tracing::trace;

use crate::error::{BoxError, LoaderError, Result};

/// Canonical absolute identity of a module, as produced by the host resolver.
///
/// Two identities are equal iff their strings are equal; no normalization is applied.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModuleId(String);

impl ModuleId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ModuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for ModuleId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<String> for ModuleId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for ModuleId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<PathBuf> for ModuleId {
    fn from(path: PathBuf) -> Self {
        Self(path.to_string_lossy().into_owned())
    }
}

/// The host pipeline's module resolution, the same one it applies to real imports.
#[async_trait]
pub trait Resolve: Send + Sync {
    async fn resolve(&self, context: &Path, request: &str) -> std::result::Result<ModuleId, BoxError>;
}

/// Resolves every request from `context` concurrently.
///
/// Results come back in the order of `requests`, not completion order. The
/// first failure aborts the whole batch.
pub async fn resolve_all<R>(resolver: &R, context: &Path, requests: &[String]) -> Result<Vec<ModuleId>>
where
    R: Resolve + ?Sized,
{
    try_join_all(requests.iter().map(|request| async move {
        let id = resolver
            .resolve(context, request)
            .await
            .map_err(|source| LoaderError::Resolution {
                request: request.clone(),
                context: context.to_path_buf(),
                source,
            })?;
        trace!(%request, %id, "resolved");
        Ok::<_, LoaderError>(id)
    }))
    .await
}

#[cfg(test)]
mod tests {
    use std::{collections::HashMap, time::Duration};

    use super::*;

    /// Answers from a fixed table; later requests answer sooner.
    struct TableResolver {
        table: HashMap<&'static str, &'static str>,
    }

    #[async_trait]
    impl Resolve for TableResolver {
        async fn resolve(&self, _context: &Path, request: &str) -> std::result::Result<ModuleId, BoxError> {
            let delay = 40u64.saturating_sub(request.len() as u64 * 5);
            tokio::time::sleep(Duration::from_millis(delay)).await;
            self.table
                .get(request)
                .map(|id| ModuleId::from(*id))
                .ok_or_else(|| format!("Cannot find module '{request}'").into())
        }
    }

    fn resolver() -> TableResolver {
        TableResolver {
            table: HashMap::from([
                ("./a", "/src/a.js"),
                ("./bb", "/src/bb.js"),
                ("./ccc", "/src/ccc.js"),
            ]),
        }
    }

    #[tokio::test]
    async fn test_results_follow_request_order() {
        let requests = vec!["./a".to_string(), "./bb".to_string(), "./ccc".to_string()];
        let ids = resolve_all(&resolver(), Path::new("/src"), &requests).await.unwrap();

        assert_eq!(
            ids,
            vec![
                ModuleId::from("/src/a.js"),
                ModuleId::from("/src/bb.js"),
                ModuleId::from("/src/ccc.js"),
            ]
        );
    }

    #[tokio::test]
    async fn test_any_failure_fails_the_batch() {
        let requests = vec!["./a".to_string(), "./missing".to_string()];
        let err = resolve_all(&resolver(), Path::new("/src"), &requests)
            .await
            .unwrap_err();

        match err {
            LoaderError::Resolution { request, context, .. } => {
                assert_eq!(request, "./missing");
                assert_eq!(context, PathBuf::from("/src"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_no_requests() {
        let ids = resolve_all(&resolver(), Path::new("/src"), &[]).await.unwrap();
        assert!(ids.is_empty());
    }
}
