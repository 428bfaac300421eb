//! Service container for dependency injection
//!
//! Wires up all services with their dependencies.

use std::path::Path;
use std::sync::Arc;

use crate::application::services::{MergeService, VaultService};
use crate::application::ApplicationResult;
use crate::config::Settings;
use crate::domain::ConflictPolicy;
use crate::infrastructure::traits::{
    Editor, EnvironmentEditor, FileSystem, RealFileSystem, Selector, SkimSelector,
    VaultOutputWriter,
};

/// Container holding the I/O boundaries services are built from.
pub struct ServiceContainer {
    /// Application settings
    pub settings: Arc<Settings>,

    /// Filesystem abstraction
    pub fs: Arc<dyn FileSystem>,

    /// Interactive selection
    pub selector: Arc<dyn Selector>,

    /// Editor for config files
    pub editor: Arc<dyn Editor>,
}

impl ServiceContainer {
    /// Create a new service container with real implementations.
    pub fn new(settings: Settings) -> Self {
        Self::with_deps(
            settings,
            Arc::new(RealFileSystem),
            Arc::new(SkimSelector),
            Arc::new(EnvironmentEditor),
        )
    }

    /// Create a service container with custom dependencies (for testing).
    pub fn with_deps(
        settings: Settings,
        fs: Arc<dyn FileSystem>,
        selector: Arc<dyn Selector>,
        editor: Arc<dyn Editor>,
    ) -> Self {
        let settings = Arc::new(settings);

        Self {
            settings,
            fs,
            selector,
            editor,
        }
    }

    /// Vault service for `root`, using the configured note extensions.
    pub fn vault_service(&self, root: &Path) -> ApplicationResult<VaultService> {
        VaultService::new(
            self.fs.clone(),
            root.to_path_buf(),
            self.settings.vault.extensions.clone(),
            self.settings.vault.ignore_dirs.clone(),
        )
    }

    /// Merge service writing into `root` with the given conflict policy.
    /// Output names keep a configured note extension.
    pub fn merge_service(&self, root: &Path, policy: ConflictPolicy) -> MergeService {
        let writer = Arc::new(VaultOutputWriter::new(self.fs.clone(), policy));
        MergeService::new(self.fs.clone(), writer, root.to_path_buf())
            .with_note_extensions(self.settings.vault.extensions.clone())
    }
}
