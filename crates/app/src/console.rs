//! Line-oriented front end.
//!
//! Each subcommand is a short conversation with the [`AppService`]: send
//! commands, then print notifications until the operation settles.
//!
//! [`AppService`]: crate::services::app_service::AppService

use anyhow::{anyhow, bail, Result};
use sentinel_core::app::{CollectionView, Command, Notification};
use sentinel_core::navigator::DirectoryCursor;
use sentinel_core::ports::ClientConfig;
use sentinel_core::tracker::{OperationPhase, PullTrigger, ScanPhase};
use sentinel_core::{DirectoryEntry, RepoId, Repository};
use std::io::Write;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, Lines};
use tokio::sync::mpsc;
use tracing::debug;

use crate::cli::Action;

pub struct Console<I, W> {
    input: Lines<I>,
    out: W,
    config: ClientConfig,
}

impl<I, W> Console<I, W>
where
    I: AsyncBufRead + Unpin,
    W: Write,
{
    pub fn new(input: I, out: W, config: ClientConfig) -> Self {
        Self {
            input: input.lines(),
            out,
            config,
        }
    }

    /// Carry out `action`, then tell the service to quit
    pub async fn run(
        &mut self,
        action: Action,
        commands: mpsc::UnboundedSender<Command>,
        mut notifications: mpsc::UnboundedReceiver<Notification>,
    ) -> Result<()> {
        let result = {
            let mut session = Session {
                console: self,
                commands: &commands,
                notifications: &mut notifications,
            };
            session.dispatch(action).await
        };
        let _ = commands.send(Command::Quit);
        result
    }

    pub fn into_output(self) -> W {
        self.out
    }
}

struct Session<'a, I, W> {
    console: &'a mut Console<I, W>,
    commands: &'a mpsc::UnboundedSender<Command>,
    notifications: &'a mut mpsc::UnboundedReceiver<Notification>,
}

impl<I, W> Session<'_, I, W>
where
    I: AsyncBufRead + Unpin,
    W: Write,
{
    async fn dispatch(&mut self, action: Action) -> Result<()> {
        match action {
            Action::List { query, sort } => {
                let sort = sort.unwrap_or(self.console.config.ui.default_sort);
                self.send(Command::LoadRepositories)?;
                self.send(Command::SetFilter { query, sort })?;
                let view = self.settled_collection().await?;
                self.print_collection(&view)
            }
            Action::Show { id } => {
                let id = RepoId::new(id);
                self.send(Command::OpenDetails { id })?;
                loop {
                    match self.next().await? {
                        Notification::Details(repo) => return self.print_details(&repo),
                        Notification::Error(message) => bail!(message),
                        _ => continue,
                    }
                }
            }
            Action::Pull { id, quick } => self.pull(RepoId::new(id), quick).await,
            Action::Status { id } => {
                self.send(Command::FetchStatus { id: RepoId::new(id) })?;
                loop {
                    match self.next().await? {
                        Notification::StatusOutput { output, .. } => {
                            if output.trim().is_empty() {
                                writeln!(self.console.out, "Nothing to commit, working tree clean")?;
                            } else {
                                write!(self.console.out, "{}", output)?;
                                if !output.ends_with('\n') {
                                    writeln!(self.console.out)?;
                                }
                            }
                            return Ok(());
                        }
                        Notification::StatusFailed { message, .. } => bail!(message),
                        _ => continue,
                    }
                }
            }
            Action::Discard { id, yes } => self.discard(RepoId::new(id), yes).await,
            Action::Scan { path, depth, browse } => {
                let path = if browse {
                    match self.browse().await? {
                        Some(path) => path,
                        None => return Ok(()),
                    }
                } else {
                    path.unwrap_or_else(|| self.console.config.default_scan_path.display().to_string())
                };
                let depth = depth.unwrap_or(self.console.config.default_scan_depth);
                self.scan(path, depth).await
            }
            Action::Browse => {
                if let Some(path) = self.browse().await? {
                    writeln!(self.console.out, "{}", path)?;
                }
                Ok(())
            }
        }
    }

    async fn pull(&mut self, id: RepoId, quick: bool) -> Result<()> {
        let trigger = if quick {
            PullTrigger::Quick
        } else {
            self.send(Command::OpenDetails { id: id.clone() })?;
            PullTrigger::Detailed
        };
        self.send(Command::Pull { id: id.clone(), trigger })?;

        loop {
            match self.next().await? {
                Notification::PullLog { id: from, entry } if from == id => {
                    if !quick || entry.is_terminal() {
                        writeln!(self.console.out, "{}", entry)?;
                    }
                }
                Notification::PullFinished { id: from, phase } if from == id => {
                    return match phase {
                        OperationPhase::Completed => Ok(()),
                        _ => Err(anyhow!("Pull of {} failed", id)),
                    };
                }
                Notification::Error(message) => bail!(message),
                _ => continue,
            }
        }
    }

    async fn discard(&mut self, id: RepoId, yes: bool) -> Result<()> {
        self.send(Command::RequestDiscard { id: id.clone() })?;
        loop {
            match self.next().await? {
                Notification::DiscardConfirmationRequired { .. } => {
                    let confirmed = yes
                        || self
                            .ask(&format!(
                                "Discard ALL local changes in {}? Untracked files are deleted too. [y/N] ",
                                id
                            ))
                            .await?
                            .is_some_and(|answer| matches!(answer.trim(), "y" | "Y" | "yes"));
                    let next = if confirmed {
                        Command::ConfirmDiscard
                    } else {
                        Command::CancelDiscard
                    };
                    self.send(next)?;
                }
                Notification::DiscardCancelled { .. } => {
                    writeln!(self.console.out, "Discard cancelled")?;
                    return Ok(());
                }
                Notification::Discarded { message, .. } => {
                    writeln!(self.console.out, "{}", message)?;
                    return Ok(());
                }
                Notification::DiscardFailed { message, .. } | Notification::Error(message) => bail!(message),
                _ => continue,
            }
        }
    }

    async fn scan(&mut self, path: String, depth: u32) -> Result<()> {
        self.send(Command::StartScan { path, depth })?;
        loop {
            match self.next().await? {
                Notification::ScanMessage(message) => writeln!(self.console.out, "{}", message)?,
                Notification::ScanFinished { phase: ScanPhase::Completed, .. } => break,
                Notification::ScanFinished { error, .. } => {
                    bail!(error.unwrap_or_else(|| "Scan failed".to_string()))
                }
                _ => continue,
            }
        }

        // Completion triggers a refetch of the collection
        let view = self.settled_collection().await?;
        writeln!(self.console.out, "{}", view.summary())?;
        Ok(())
    }

    /// Walk the directory tree until a directory is selected or the user quits
    async fn browse(&mut self) -> Result<Option<String>> {
        self.send(Command::OpenBrowser)?;
        let mut entries: Vec<DirectoryEntry> = Vec::new();

        loop {
            match self.next().await? {
                Notification::Listing { cursor, error } => {
                    self.print_listing(&cursor, error.as_deref())?;
                    entries = cursor.entries;
                }
                Notification::BrowserError(message) => writeln!(self.console.out, "! {}", message)?,
                Notification::PathSelected(path) => return Ok(Some(path)),
                _ => continue,
            }

            loop {
                let Some(answer) = self.ask("[number] open  [..] up  [s] select  [r] retry  [q] quit > ").await? else {
                    self.send(Command::CloseBrowser)?;
                    return Ok(None);
                };
                let command = match answer.trim() {
                    "q" => {
                        self.send(Command::CloseBrowser)?;
                        return Ok(None);
                    }
                    ".." => Command::Ascend,
                    "s" => Command::SelectDirectory,
                    "r" => Command::RetryListing,
                    other => match other.parse::<usize>().ok().and_then(|n| n.checked_sub(1)).and_then(|i| entries.get(i)) {
                        Some(entry) => Command::Descend { entry: entry.clone() },
                        None => {
                            writeln!(self.console.out, "! No entry '{}'", other)?;
                            continue;
                        }
                    },
                };
                self.send(command)?;
                break;
            }
        }
    }

    /// Wait for the collection view once no fetch is in flight
    async fn settled_collection(&mut self) -> Result<CollectionView> {
        loop {
            match self.next().await? {
                Notification::RepositoriesChanged(view) if !view.loading => return Ok(view),
                Notification::RepositoriesFailed { message } => bail!(message),
                _ => continue,
            }
        }
    }

    fn print_collection(&mut self, view: &CollectionView) -> Result<()> {
        let out = &mut self.console.out;
        for row in &view.rows {
            let repo = &row.repository;
            let mut flags = String::new();
            if row.is_new {
                flags.push_str(" [new]");
            }
            if row.busy {
                flags.push_str(" [pulling]");
            }
            writeln!(
                out,
                "{:<28} {:<10} {}{}",
                repo.name,
                row.modified_ago.as_deref().unwrap_or("-"),
                repo.path,
                flags
            )?;
            writeln!(out, "  id: {}", repo.id)?;
        }
        writeln!(out, "{}", view.summary())?;
        Ok(())
    }

    fn print_details(&mut self, repo: &Repository) -> Result<()> {
        let out = &mut self.console.out;
        writeln!(out, "{}", repo.name)?;
        writeln!(out, "  path:          {}", repo.path)?;
        writeln!(out, "  branch:        {}", repo.current_branch.as_deref().unwrap_or("N/A"))?;
        writeln!(out, "  status:        {}", repo.status.as_deref().unwrap_or("N/A"))?;
        writeln!(out, "  last modified: {}", repo.last_modified)?;
        writeln!(out, "  remote:        {}", repo.primary_remote_url().unwrap_or("none"))?;
        Ok(())
    }

    fn print_listing(&mut self, cursor: &DirectoryCursor, error: Option<&str>) -> Result<()> {
        let out = &mut self.console.out;
        match &cursor.current_path {
            Some(path) => writeln!(out, "{}", path)?,
            None => writeln!(out, "(base paths)")?,
        }
        if let Some(error) = error {
            writeln!(out, "! {}", error)?;
        }
        for (i, entry) in cursor.entries.iter().enumerate() {
            let marker = if entry.is_directory() { "/" } else { "" };
            writeln!(out, "{:>3}  {}{}", i + 1, entry.name, marker)?;
        }
        Ok(())
    }

    async fn ask(&mut self, prompt: &str) -> Result<Option<String>> {
        write!(self.console.out, "{}", prompt)?;
        self.console.out.flush()?;
        Ok(self.console.input.next_line().await?)
    }

    fn send(&self, command: Command) -> Result<()> {
        debug!("Sending command: {:?}", command);
        self.commands
            .send(command)
            .map_err(|_| anyhow!("Application service stopped"))
    }

    async fn next(&mut self) -> Result<Notification> {
        self.notifications
            .recv()
            .await
            .ok_or_else(|| anyhow!("Application service stopped"))
    }
}
