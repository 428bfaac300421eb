//! Command dispatch

use std::io;
use std::path::{Path, PathBuf};

use clap::CommandFactory;
use tracing::{debug, instrument};

use crate::application::services::{CancelToken, VaultService};
use crate::application::IoResultExt;
use crate::cli::args::{Cli, Commands, ConfigCommands, SelectionArgs};
use crate::cli::tree::{positions, ToTree};
use crate::cli::{output, CliError, CliResult};
use crate::config::{global_config_path, vault_config_path, Settings};
use crate::domain::{
    ConflictPolicy, ExplicitOrder, HeadingLevel, LogicalOrder, MergeConfig, PrefixIndexOrder,
    SortMode,
};
use crate::infrastructure::di::ServiceContainer;
use crate::infrastructure::traits::{FileSystem, SelectionItem};
use crate::infrastructure::InfraError;

/// Options of the `merge` command beyond the selection.
#[derive(Debug, Default)]
pub struct MergeArgs {
    pub output: Option<String>,
    pub separator: Option<String>,
    pub headings: Option<u8>,
    pub no_headings: bool,
    pub on_conflict: Option<ConflictPolicy>,
    pub stdout: bool,
    pub dry_run: bool,
}

pub fn execute_command(cli: &Cli) -> CliResult<()> {
    match &cli.command {
        Some(Commands::Merge {
            selection,
            output,
            separator,
            headings,
            no_headings,
            on_conflict,
            stdout,
            dry_run,
        }) => {
            let args = MergeArgs {
                output: output.clone(),
                separator: separator.clone(),
                headings: *headings,
                no_headings: *no_headings,
                on_conflict: *on_conflict,
                stdout: *stdout,
                dry_run: *dry_run,
            };
            let ctx = Context::load(cli.vault.as_deref())?;
            cmd_merge(&ctx, selection, &args)
        }
        Some(Commands::List { selection }) => {
            let ctx = Context::load(cli.vault.as_deref())?;
            cmd_list(&ctx, selection)
        }
        Some(Commands::Tree { selection }) => {
            let ctx = Context::load(cli.vault.as_deref())?;
            cmd_tree(&ctx, selection)
        }
        Some(Commands::Config { command }) => cmd_config(cli.vault.as_deref(), command),
        Some(Commands::Completion { shell }) => {
            let mut cmd = Cli::command();
            let name = cmd.get_name().to_string();
            clap_complete::generate(*shell, &mut cmd, name, &mut io::stdout());
            Ok(())
        }
        None => Err(CliError::Usage("no command given, see --help".to_string())),
    }
}

/// Settings, services and vault shared by the merge commands.
pub struct Context {
    pub container: ServiceContainer,
    pub vault: VaultService,
}

impl Context {
    /// Resolve the vault (flag > config > cwd) and load its settings.
    pub fn load(vault_flag: Option<&Path>) -> CliResult<Self> {
        let vault_dir = resolve_vault_dir(vault_flag)?;
        let settings = Settings::load(Some(&vault_dir))?;
        Self::with_container(ServiceContainer::new(settings), &vault_dir)
    }

    pub fn with_container(container: ServiceContainer, vault_dir: &Path) -> CliResult<Self> {
        let vault = container.vault_service(vault_dir)?;
        Ok(Self { container, vault })
    }

    /// Build the merge parameters from flags over settings.
    pub fn merge_config(&self, selection: &SelectionArgs, args: &MergeArgs) -> CliResult<MergeConfig> {
        let defaults = &self.container.settings.merge;
        let include_nested_folders = self.include_nested(selection);
        let entries = self
            .vault
            .resolve(&self.selected_paths(selection)?, include_nested_folders)?;

        let headings = if args.no_headings {
            None
        } else {
            match args.headings {
                Some(level) => Some(HeadingLevel::new(level)?),
                None => defaults.headings,
            }
        };

        Ok(MergeConfig {
            entries,
            include_nested_folders,
            sort_mode: self.sort_mode(selection),
            output_file_name: args
                .output
                .clone()
                .unwrap_or_else(|| defaults.output_name.clone()),
            separator: args
                .separator
                .as_deref()
                .map(unescape)
                .unwrap_or_else(|| defaults.separator.clone()),
            headings,
        })
    }

    fn sort_mode(&self, selection: &SelectionArgs) -> SortMode {
        selection
            .sort
            .unwrap_or(self.container.settings.merge.sort_mode)
    }

    fn include_nested(&self, selection: &SelectionArgs) -> bool {
        if selection.nested {
            true
        } else if selection.no_nested {
            false
        } else {
            self.container.settings.merge.include_nested_folders
        }
    }

    /// Paths given on the command line, or picked interactively.
    ///
    /// Command-line paths are taken relative to the working directory when
    /// they exist there, otherwise relative to the vault.
    fn selected_paths(&self, selection: &SelectionArgs) -> CliResult<Vec<PathBuf>> {
        if selection.select {
            return self.pick_folders();
        }
        let cwd = std::env::current_dir()
            .map_err(|e| InfraError::io("determine working directory", e))?;
        Ok(selection
            .paths
            .iter()
            .map(|p| {
                let candidate = cwd.join(p);
                if self.container.fs.exists(&candidate) {
                    candidate
                } else {
                    p.clone()
                }
            })
            .collect())
    }

    fn pick_folders(&self) -> CliResult<Vec<PathBuf>> {
        let items: Vec<SelectionItem> = self
            .vault
            .folders()?
            .into_iter()
            .map(|f| SelectionItem {
                display: f.clone(),
                value: f,
            })
            .collect();

        let picked = self
            .container
            .selector
            .select_many(&items, "Folders to merge> ")
            .map_err(|message| InfraError::Selector { message })?;
        debug!("pick_folders: {} picked", picked.len());
        Ok(picked.into_iter().map(|i| PathBuf::from(i.value)).collect())
    }

    /// Strategy for `SortMode::Logical`: index note if configured, else
    /// numeric name prefixes.
    pub fn logical_order(&self, selection: &SelectionArgs) -> CliResult<Box<dyn LogicalOrder>> {
        let defaults = &self.container.settings.merge;
        if self.sort_mode(selection) != SortMode::Logical {
            return Ok(Box::new(PrefixIndexOrder::new()));
        }

        let order_file = selection
            .order_file
            .clone()
            .or_else(|| defaults.order_file.clone());
        if let Some(file) = order_file {
            let path = if file.is_absolute() || self.container.fs.exists(&file) {
                file
            } else {
                self.vault.root().join(file)
            };
            let text = self
                .container
                .fs
                .read_to_string(&path)
                .with_path_context("read order file", &path)?;
            let order = ExplicitOrder::from_index(&text)?;
            debug!("logical_order: {} entries from {}", order.len(), path.display());
            return Ok(Box::new(order));
        }

        match &defaults.index_pattern {
            Some(pattern) => Ok(Box::new(PrefixIndexOrder::with_pattern(pattern)?)),
            None => Ok(Box::new(PrefixIndexOrder::new())),
        }
    }
}

fn resolve_vault_dir(vault_flag: Option<&Path>) -> CliResult<PathBuf> {
    match vault_flag {
        Some(dir) => Ok(dir.to_path_buf()),
        None => Ok(Settings::load(None)?.vault_dir()),
    }
}

#[instrument(skip(ctx, args))]
fn cmd_merge(ctx: &Context, selection: &SelectionArgs, args: &MergeArgs) -> CliResult<()> {
    let config = ctx.merge_config(selection, args)?;
    if config.entries.is_empty() {
        output::warning("nothing selected, nothing merged");
        return Ok(());
    }

    let logical = ctx.logical_order(selection)?;
    let policy = args
        .on_conflict
        .unwrap_or(ctx.container.settings.merge.on_conflict);
    let service = ctx.container.merge_service(ctx.vault.root(), policy);
    let cancel = CancelToken::new();

    if args.stdout {
        let report = service.preview(&config, logical.as_ref(), &cancel)?;
        output::info(&report.content);
        return Ok(());
    }

    if args.dry_run {
        let report = service.preview(&config, logical.as_ref(), &cancel)?;
        let target = service.output_path(&config.output_file_name)?;
        output::header(&format!(
            "Would merge {} notes into {}",
            report.files.len(),
            target.display()
        ));
        for (i, file) in report.files.iter().enumerate() {
            output::numbered(i + 1, &file.path);
        }
        return Ok(());
    }

    let report = service.merge(&config, logical.as_ref(), &cancel)?;
    match &report.output {
        Some(path) => output::success(&format!(
            "Merged {} notes into {}",
            report.files.len(),
            path.display()
        )),
        None => output::warning("selection contains no notes, nothing merged"),
    }
    Ok(())
}

#[instrument(skip(ctx))]
fn cmd_list(ctx: &Context, selection: &SelectionArgs) -> CliResult<()> {
    let config = ctx.merge_config(selection, &MergeArgs::default())?;
    let logical = ctx.logical_order(selection)?;
    let service = ctx
        .container
        .merge_service(ctx.vault.root(), Default::default());

    let files = service.plan(&config, logical.as_ref());
    output::header(&format!(
        "{} notes, {} order",
        files.len(),
        config.sort_mode
    ));
    for (i, file) in files.iter().enumerate() {
        output::numbered(i + 1, &file.path);
    }
    Ok(())
}

#[instrument(skip(ctx))]
fn cmd_tree(ctx: &Context, selection: &SelectionArgs) -> CliResult<()> {
    let mut selection = selection.clone();
    if selection.paths.is_empty() && !selection.select {
        selection.paths.push(ctx.vault.root().to_path_buf());
    }
    let config = ctx.merge_config(&selection, &MergeArgs::default())?;
    let logical = ctx.logical_order(&selection)?;
    let service = ctx
        .container
        .merge_service(ctx.vault.root(), Default::default());

    let files = service.plan(&config, logical.as_ref());
    let positions = positions(&files);
    for entry in &config.entries {
        output::info(&entry.to_tree(&positions, config.include_nested_folders));
    }
    Ok(())
}

fn cmd_config(vault_flag: Option<&Path>, command: &ConfigCommands) -> CliResult<()> {
    let vault_dir = resolve_vault_dir(vault_flag)?;
    let container = ServiceContainer::new(Settings::default());
    match command {
        ConfigCommands::Show => {
            let settings = Settings::load(Some(&vault_dir))?;
            output::info(&settings.to_toml()?);
        }
        ConfigCommands::Path => {
            match global_config_path() {
                Some(p) => output::action("global", &mark_exists(&p)),
                None => output::action("global", &"(no config directory)"),
            }
            output::action("vault", &mark_exists(&vault_config_path(&vault_dir)));
        }
        ConfigCommands::Init { global } => {
            let path = config_target(*global, &vault_dir)?;
            if container.fs.exists(&path) {
                return Err(CliError::Usage(format!(
                    "config already exists: {}",
                    path.display()
                )));
            }
            write_template(container.fs.as_ref(), &path)?;
            output::success(&format!("Created {}", path.display()));
        }
        ConfigCommands::Edit { global } => {
            let path = config_target(*global, &vault_dir)?;
            if !container.fs.exists(&path) {
                write_template(container.fs.as_ref(), &path)?;
            }
            container
                .editor
                .open(&path)
                .map_err(|e| InfraError::Editor {
                    message: e.to_string(),
                })?;
        }
    }
    Ok(())
}

fn config_target(global: bool, vault_dir: &Path) -> CliResult<PathBuf> {
    if global {
        global_config_path()
            .ok_or_else(|| CliError::Usage("cannot determine config directory".to_string()))
    } else {
        Ok(vault_config_path(vault_dir))
    }
}

fn write_template(fs: &dyn FileSystem, path: &Path) -> CliResult<()> {
    fs.ensure_parent(path)
        .map_err(|e| InfraError::io(format!("create parent of {}", path.display()), e))?;
    fs.write(path, &Settings::template())
        .map_err(|e| InfraError::io(format!("write {}", path.display()), e))?;
    Ok(())
}

fn mark_exists(path: &Path) -> String {
    if path.exists() {
        path.display().to_string()
    } else {
        format!("{} (not found)", path.display())
    }
}

/// Expand `\n`, `\t` and `\\` in a separator given on the command line.
pub fn unescape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('\\') => out.push('\\'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn given_escaped_separator_when_unescaping_then_expands_known_escapes() {
        assert_eq!(unescape(r"\n---\n"), "\n---\n");
        assert_eq!(unescape(r"a\tb"), "a\tb");
        assert_eq!(unescape(r"c:\\x"), r"c:\x");
        assert_eq!(unescape(r"\q"), r"\q");
        assert_eq!(unescape("trailing\\"), "trailing\\");
    }
}
