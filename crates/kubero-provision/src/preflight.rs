//! Required binaries

use std::path::PathBuf;

use crate::config::ClusterProvider;

/// A program the installer may shell out to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binary {
    pub name: &'static str,
    pub required: bool,
    /// When the binary is needed
    pub purpose: &'static str,
}

/// Everything the installer knows how to call
pub const BINARIES: [Binary; 3] = [
    Binary {
        name: "kubectl",
        required: true,
        purpose: "talks to the cluster",
    },
    Binary {
        name: "kind",
        required: false,
        purpose: "needed to start a local kind cluster",
    },
    Binary {
        name: "gcloud",
        required: false,
        purpose: "needed to start a GKE cluster",
    },
];

/// Result of looking up one binary
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinaryCheck {
    pub binary: Binary,
    pub path: Option<PathBuf>,
}

impl BinaryCheck {
    pub fn found(&self) -> bool {
        self.path.is_some()
    }
}

/// Look every binary up on `PATH`
pub fn check_binaries() -> Vec<BinaryCheck> {
    check_with(|name| which::which(name).ok())
}

/// Look binaries up with a custom resolver
pub fn check_with(mut resolve: impl FnMut(&str) -> Option<PathBuf>) -> Vec<BinaryCheck> {
    BINARIES
        .into_iter()
        .map(|binary| BinaryCheck {
            path: resolve(binary.name),
            binary,
        })
        .collect()
}

/// Required binaries that are missing
pub fn missing_required(checks: &[BinaryCheck]) -> Vec<&'static str> {
    checks
        .iter()
        .filter(|c| c.binary.required && !c.found())
        .map(|c| c.binary.name)
        .collect()
}

/// Binary the cluster provider's provisioning shells out to, if any
pub fn provider_binary(provider: ClusterProvider) -> Option<&'static str> {
    match provider {
        ClusterProvider::Kind => Some("kind"),
        ClusterProvider::Gke => Some("gcloud"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_kubectl_is_reported() {
        let checks = check_with(|name| (name == "kind").then(|| PathBuf::from("/usr/bin/kind")));
        assert_eq!(missing_required(&checks), vec!["kubectl"]);
        assert!(checks[1].found());
        assert!(!checks[2].found());
    }

    #[test]
    fn test_optional_binaries_do_not_block() {
        let checks =
            check_with(|name| (name == "kubectl").then(|| PathBuf::from("/usr/bin/kubectl")));
        assert!(missing_required(&checks).is_empty());
    }

    #[test]
    fn test_provider_binaries() {
        assert_eq!(provider_binary(ClusterProvider::Kind), Some("kind"));
        assert_eq!(provider_binary(ClusterProvider::Linode), None);
    }
}
