//! Error types for cluster topology operations

use thiserror::Error;

use crate::cluster::MINIMUM_NODES;

/// Result alias used throughout the topology crate
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors raised while building an environment or a cluster
#[derive(Debug, Error)]
pub enum Error {
    /// Fewer nodes than a viable cluster needs
    #[error("invalid node count: {nodes}. The cluster must have {} or more nodes", MINIMUM_NODES)]
    InvalidNodeCount { nodes: usize },

    /// No master requested
    #[error("invalid master count: {masters}. The cluster must have at least one master")]
    InvalidMasterCount { masters: usize },

    /// Environment has an empty resource pool registry
    #[error("must provide at least one resource pool for creating nodes")]
    NoResourcePools,

    /// Subnet string is not an IPv4 network in CIDR notation
    #[error("invalid subnet '{subnet}': {reason}")]
    InvalidSubnet { subnet: String, reason: String },

    /// Resource pools must carry a positive weight
    #[error("invalid weight {weight} for resource pool '{pool}': weight must be positive")]
    InvalidPoolWeight { pool: String, weight: u32 },

    /// Node name format cannot produce unique names
    #[error("invalid {node_type} name format '{format}': {reason}")]
    InvalidNameFormat {
        node_type: String,
        format: String,
        reason: String,
    },

    /// Resolving a platform object failed
    #[error("could not resolve {kind} '{name}': {source}")]
    Resolve {
        kind: &'static str,
        name: String,
        #[source]
        source: anyhow::Error,
    },

    /// The credential service did not issue a token
    #[error("could not issue credential token: {source}")]
    Credential {
        #[source]
        source: anyhow::Error,
    },

    /// A boot payload for a node could not be rendered
    #[error("could not render {template} for node {node}: {source}")]
    Template {
        node: String,
        template: String,
        #[source]
        source: TemplateError,
    },
}

impl Error {
    /// Wrap a provider failure for the given object kind and name
    pub fn resolve(kind: &'static str, name: impl Into<String>, source: anyhow::Error) -> Self {
        Self::Resolve {
            kind,
            name: name.into(),
            source,
        }
    }

    /// True for the cluster-level invariant violations
    pub fn is_invariant_violation(&self) -> bool {
        matches!(
            self,
            Self::InvalidNodeCount { .. } | Self::InvalidMasterCount { .. } | Self::NoResourcePools
        )
    }
}

/// Errors that can occur while rendering a template
#[derive(Debug, Error)]
pub enum TemplateError {
    /// The template source could not be read
    #[error("could not read template {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// No template with this name is known to the renderer
    #[error("template {0} not found")]
    NotFound(String),

    /// Syntax error or undefined variable
    #[error("template render error: {0}")]
    Render(#[from] minijinja::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_count_error_names_value() {
        let err = Error::InvalidNodeCount { nodes: 2 };
        assert!(err.to_string().contains("invalid node count: 2"));
        assert!(err.to_string().contains("3 or more"));
        assert!(err.is_invariant_violation());
    }

    #[test]
    fn template_error_is_not_an_invariant() {
        let err = Error::Template {
            node: "master01".to_owned(),
            template: "init.sh.j2".to_owned(),
            source: TemplateError::NotFound("init.sh.j2".to_owned()),
        };
        assert!(!err.is_invariant_violation());
        assert!(err.to_string().contains("master01"));
    }
}
