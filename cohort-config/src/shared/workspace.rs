use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::shared::ValidationError;

/// Genome assembly the workspace is aligned to.
///
/// Determines the coordinate-system identifier stamped on written tracks.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, Eq, PartialEq)]
pub enum GenomeAssembly {
    /// GRCh build 37 (1000 Genomes reference).
    #[serde(rename = "GRCh_37", alias = "GRCh_37_g1k")]
    Grch37,
    /// GRCh build 38.
    #[serde(rename = "GRCh_38")]
    Grch38,
}

impl GenomeAssembly {
    /// Returns the coordinate-system identifier for this assembly.
    pub fn coord_sys_id(&self) -> &'static str {
        match self {
            GenomeAssembly::Grch37 => "GRCh_37_g1k,Chromosome,Homo sapiens",
            GenomeAssembly::Grch38 => "GRCh_38,Chromosome,Homo sapiens",
        }
    }
}

/// Workspace layout the updater operates in.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct WorkspaceConfig {
    /// Root directory of the workspace.
    pub root: PathBuf,
    /// Genome assembly of the workspace.
    pub assembly: GenomeAssembly,
}

impl WorkspaceConfig {
    /// Directory holding shared annotation tracks.
    pub fn annotations_folder(&self) -> PathBuf {
        self.root.join("AppData/Common Data/Annotations")
    }

    /// Validates workspace configuration settings.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.root.as_os_str().is_empty() {
            return Err(ValidationError::invalid(
                "workspace.root",
                "must not be empty",
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coord_sys_id_per_assembly() {
        assert_eq!(
            GenomeAssembly::Grch37.coord_sys_id(),
            "GRCh_37_g1k,Chromosome,Homo sapiens"
        );
        assert_eq!(
            GenomeAssembly::Grch38.coord_sys_id(),
            "GRCh_38,Chromosome,Homo sapiens"
        );
    }

    #[test]
    fn test_empty_root_is_rejected() {
        let workspace = WorkspaceConfig {
            root: PathBuf::new(),
            assembly: GenomeAssembly::Grch38,
        };
        assert!(workspace.validate().is_err());
    }
}
