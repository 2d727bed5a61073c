//! Linux camera permission check.
//!
//! There is no consent dialog for V4L2 devices: access is governed by the
//! permissions on the `/dev/video*` nodes (usually the `video` group). The
//! check opens each node read/write and classifies the outcome.

use std::fs::OpenOptions;
use std::io;
use std::path::{Path, PathBuf};

use id_capture_core::models::state::PermissionQuery;

/// Result of trying to open one device node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeAccess {
    Openable,
    Denied,
    Failed,
}

/// Check whether the current user may open a camera.
///
/// Returns `Unsupported` when no node exists, so the caller falls back to an
/// active request.
pub fn check_camera_permission() -> PermissionQuery {
    let nodes = video_nodes(Path::new("/dev"));
    let access: Vec<NodeAccess> = nodes.iter().map(|path| probe_node(path)).collect();
    let query = classify(&access);
    log::debug!("probed {} video node(s): {:?}", nodes.len(), query);
    query
}

/// `/dev/video*` entries under `dev`, sorted by path.
pub fn video_nodes(dev: &Path) -> Vec<PathBuf> {
    let mut nodes: Vec<PathBuf> = std::fs::read_dir(dev)
        .into_iter()
        .flatten()
        .flatten()
        .map(|entry| entry.path())
        .filter(|path| {
            path.file_name()
                .and_then(|n| n.to_str())
                .map(|n| n.starts_with("video"))
                .unwrap_or(false)
        })
        .collect();
    nodes.sort();
    nodes
}

fn probe_node(path: &Path) -> NodeAccess {
    match OpenOptions::new().read(true).write(true).open(path) {
        Ok(_) => NodeAccess::Openable,
        Err(e) if e.kind() == io::ErrorKind::PermissionDenied => {
            log::debug!("{}: permission denied", path.display());
            NodeAccess::Denied
        }
        Err(e) => {
            log::debug!("{}: {}", path.display(), e);
            NodeAccess::Failed
        }
    }
}

/// Any openable node grants access; otherwise a denial on any node denies it.
pub fn classify(access: &[NodeAccess]) -> PermissionQuery {
    if access.contains(&NodeAccess::Openable) {
        PermissionQuery::Granted
    } else if access.contains(&NodeAccess::Denied) {
        PermissionQuery::Denied
    } else {
        PermissionQuery::Unsupported
    }
}
