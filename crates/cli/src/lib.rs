//! Session plumbing behind the `stateview` binary.

use anyhow::{bail, Context, Result};
use serde::Serialize;
use stateview_tree::{
    CaptureFile, NodeDescriptor, StateAfter, StateTreeService, TreeConfig, TreeHandle,
};
use std::path::Path;
use std::sync::Arc;

/// Parse a child-index path such as `0/2/1`.
///
/// An empty string, `/` or `root` address the root; the `root/…` form
/// printed in errors is accepted as well.
pub fn parse_indices(raw: &str) -> Result<Vec<u64>> {
    let trimmed = raw.trim().trim_matches('/');
    let trimmed = match trimmed.strip_prefix("root") {
        Some(rest) if rest.is_empty() || rest.starts_with('/') => rest.trim_start_matches('/'),
        _ => trimmed,
    };
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }
    trimmed
        .split('/')
        .map(|part| {
            part.trim()
                .parse::<u64>()
                .with_context(|| format!("invalid child index '{part}' in path '{raw}'"))
        })
        .collect()
}

/// Parse a command address: `12`, or `12.3` for a sub-command.
pub fn parse_command(raw: &str) -> Result<Vec<u64>> {
    let raw = raw.trim();
    if raw.is_empty() {
        bail!("command index must not be empty");
    }
    raw.split('.')
        .map(|part| {
            part.parse::<u64>()
                .with_context(|| format!("invalid command index '{part}' in '{raw}'"))
        })
        .collect()
}

/// Result of describing one requested path
#[derive(Debug, Clone, Serialize)]
pub struct NodeReport {
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub node: Option<NodeDescriptor>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// One page of a node's children
#[derive(Debug, Clone, Serialize)]
pub struct Listing {
    pub path: String,
    pub total: u64,
    pub offset: u64,
    pub children: Vec<NodeDescriptor>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ResolveReport {
    pub tree: String,
    pub after: String,
    pub group_limit: u64,
}

/// A capture loaded into a tree service, with one resolved tree
pub struct Session {
    service: StateTreeService,
    handle: TreeHandle,
    after: StateAfter,
    group_limit: u64,
}

impl Session {
    /// Load the capture at `capture` and register the tree for `command`.
    pub fn open(
        capture: &Path,
        command: Vec<u64>,
        group_limit: Option<u64>,
        config: TreeConfig,
    ) -> Result<Self> {
        let file = Arc::new(
            CaptureFile::load(capture)
                .with_context(|| format!("Failed to load capture {}", capture.display()))?,
        );
        let after = StateAfter::new(file.capture().clone(), command);
        let group_limit = group_limit.unwrap_or(config.default_group_limit);
        let constants = file.constants();
        let service = StateTreeService::new(file, constants, config)?;
        let handle = service.resolve_tree(&after, group_limit)?;
        log::debug!("Resolved {after} to tree {}", handle.id().short());
        Ok(Self {
            service,
            handle,
            after,
            group_limit,
        })
    }

    pub fn handle(&self) -> &TreeHandle {
        &self.handle
    }

    pub fn resolve_report(&self) -> ResolveReport {
        ResolveReport {
            tree: self.handle.id().to_string(),
            after: self.after.to_string(),
            group_limit: self.group_limit,
        }
    }

    pub fn describe(&self, indices: Vec<u64>) -> Result<NodeDescriptor> {
        Ok(self.service.node_at(&self.handle.node(indices))?)
    }

    /// Children of the node at `indices` from `offset`, at most `limit` of them.
    pub fn list(&self, indices: Vec<u64>, offset: u64, limit: u64) -> Result<Listing> {
        let path = self.handle.node(indices);
        let total = self.service.node_at(&path)?.num_children;
        let children = self
            .service
            .children_at(&path, offset..offset.saturating_add(limit))?;
        Ok(Listing {
            path: path.to_string(),
            total,
            offset,
            children,
        })
    }

    /// Describe every path on the blocking pool; reports keep request order.
    pub async fn describe_all(self: &Arc<Self>, paths: Vec<Vec<u64>>) -> Vec<NodeReport> {
        let tasks: Vec<_> = paths
            .into_iter()
            .map(|indices| {
                let session = Arc::clone(self);
                let path = session.handle.node(indices.clone()).to_string();
                let task = tokio::task::spawn_blocking(move || session.describe(indices));
                (path, task)
            })
            .collect();

        let mut reports = Vec::with_capacity(tasks.len());
        for (path, task) in tasks {
            let outcome = task
                .await
                .unwrap_or_else(|e| Err(anyhow::anyhow!("describe task failed: {e}")));
            reports.push(match outcome {
                Ok(node) => NodeReport {
                    path,
                    node: Some(node),
                    error: None,
                },
                Err(err) => NodeReport {
                    path,
                    node: None,
                    error: Some(format!("{err:#}")),
                },
            });
        }
        reports
    }
}
