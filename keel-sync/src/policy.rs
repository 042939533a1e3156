//! Policy resolver: maps a reconcile situation plus [`RunOptions`] to an action.
//!
//! Precedence:
//! 1. `prune`: destructive default for the situation, never prompts
//! 2. `prompt`: user choice from the situation's fixed option set
//! 3. otherwise: the non-destructive default
//!
//! Situations without an option set (outdated, modified, local-only) always
//! resolve to their fixed action.

use tracing::{debug, warn};

use keel_core::Platform;

use crate::prompt::{Choice, Prompter};
use crate::remote::LinkIssue;
use crate::SyncError;

// ---------------------------------------------------------------------------
// Run options
// ---------------------------------------------------------------------------

/// Flags threaded through every reconcile call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunOptions {
    /// Ask the user when a decision is ambiguous.
    pub prompt: bool,
    /// Apply destructive defaults without asking.
    pub prune: bool,
    /// Report actions without applying them.
    pub dry_run: bool,
}

impl RunOptions {
    pub fn mode_label(&self) -> &'static str {
        if self.prompt {
            "interactive"
        } else {
            "non_interactive"
        }
    }
}

/// Interactivity inputs gathered by the invoking layer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Interactivity {
    pub interactive: bool,
    pub non_interactive: bool,
    pub json: bool,
    pub stdin_tty: bool,
}

impl Interactivity {
    /// Whether prompts are enabled.
    ///
    /// Defaults to on, degrades silently without a TTY, is forced off for
    /// JSON output, and fails when `--interactive` cannot be honoured.
    pub fn resolve(self) -> Result<bool, SyncError> {
        let mut wanted = self.interactive || !self.non_interactive;
        if self.json {
            wanted = false;
        }
        if wanted && !self.stdin_tty {
            if self.interactive {
                return Err(SyncError::InteractiveUnavailable);
            }
            wanted = false;
        }
        Ok(wanted)
    }
}

// ---------------------------------------------------------------------------
// Actions
// ---------------------------------------------------------------------------

/// Every action a sync item can report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Import,
    Pull,
    Push,
    Keep,
    KeepLocal,
    Skip,
    Detach,
    PruneAlias,
    PruneAll,
    Prune,
    Clear,
    Relink,
    None,
    Validate,
    List,
    Load,
    Write,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Import => "import",
            Action::Pull => "pull",
            Action::Push => "push",
            Action::Keep => "keep",
            Action::KeepLocal => "keep-local",
            Action::Skip => "skip",
            Action::Detach => "detach",
            Action::PruneAlias => "prune-alias",
            Action::PruneAll => "prune-all",
            Action::Prune => "prune",
            Action::Clear => "clear",
            Action::Relink => "relink",
            Action::None => "none",
            Action::Validate => "validate",
            Action::List => "list",
            Action::Load => "load",
            Action::Write => "write",
        }
    }

    /// True for actions that change state when applied.
    pub fn is_applied(&self) -> bool {
        !matches!(
            self,
            Action::Keep
                | Action::KeepLocal
                | Action::None
                | Action::Validate
                | Action::List
                | Action::Load
                | Action::Write
        )
    }

    /// Reported label: `would-<action>` for applied actions under dry-run.
    pub fn label(&self, dry_run: bool) -> String {
        if dry_run && self.is_applied() {
            format!("would-{}", self.as_str())
        } else {
            self.as_str().to_string()
        }
    }
}

// ---------------------------------------------------------------------------
// Situations
// ---------------------------------------------------------------------------

/// Which alias map a duplicate belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Test,
    Workflow,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Test => "test",
            EntityKind::Workflow => "workflow",
        }
    }
}

/// A state that needs a decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Situation<'a> {
    Outdated,
    Modified,
    LocalOnly,
    OrphanedTest {
        alias: &'a str,
        issue: LinkIssue,
        has_local_file: bool,
    },
    StaleTest {
        alias: &'a str,
        has_local_file: bool,
        has_local_changes: bool,
    },
    Conflict {
        alias: &'a str,
    },
    StaleWorkflow {
        alias: &'a str,
    },
    Duplicate {
        kind: EntityKind,
        alias: &'a str,
        canonical: &'a str,
    },
    AppLink {
        key: &'a str,
        expected: Option<Platform>,
        missing: bool,
    },
}

impl Situation<'_> {
    /// Action taken with no flags set.
    pub fn default_action(&self) -> Action {
        match self {
            Situation::Outdated => Action::Pull,
            Situation::Modified => Action::Push,
            Situation::LocalOnly => Action::KeepLocal,
            Situation::Conflict { .. } => Action::Skip,
            _ => Action::Keep,
        }
    }

    /// Action taken under `prune`, if the situation has a destructive default.
    ///
    /// Orphaned links only detach; listing-stale tests without local edits
    /// lose their file too.
    pub fn prune_action(&self) -> Option<Action> {
        match self {
            Situation::OrphanedTest { .. } => Some(Action::Detach),
            Situation::StaleTest {
                has_local_file,
                has_local_changes,
                ..
            } => Some(match (has_local_file, has_local_changes) {
                (true, false) => Action::PruneAll,
                (true, true) => Action::Detach,
                (false, _) => Action::PruneAlias,
            }),
            Situation::StaleWorkflow { .. } => Some(Action::Prune),
            Situation::Duplicate {
                kind: EntityKind::Test,
                ..
            } => Some(Action::PruneAlias),
            Situation::Duplicate {
                kind: EntityKind::Workflow,
                ..
            } => Some(Action::Prune),
            Situation::AppLink { .. } => Some(Action::Clear),
            _ => None,
        }
    }

    /// Pre-selected answer when prompting.
    fn prompt_default(&self) -> Action {
        match self {
            Situation::OrphanedTest { .. } => Action::Detach,
            other => other.default_action(),
        }
    }

    /// The fixed option set offered to the user; empty when nothing is asked.
    pub fn options(&self) -> Vec<(Action, Choice)> {
        let keep = || (Action::Keep, Choice::new("Keep mapping", "Leave alias and local file unchanged."));
        let prune_all = || {
            (
                Action::PruneAll,
                Choice::new("Prune alias + file", "Remove alias and local test YAML."),
            )
        };
        let detach = || {
            (
                Action::Detach,
                Choice::new("Detach mapping", "Remove remote link and keep local test file."),
            )
        };

        match self {
            Situation::Outdated | Situation::Modified | Situation::LocalOnly => Vec::new(),
            Situation::OrphanedTest { has_local_file, .. } => {
                let mut options = vec![keep(), detach()];
                if *has_local_file {
                    options.push(prune_all());
                }
                options
            }
            Situation::StaleTest { has_local_file, .. } => {
                let mut options = vec![
                    keep(),
                    (
                        Action::PruneAlias,
                        Choice::new("Prune alias", "Remove alias from .keel/config.yaml."),
                    ),
                ];
                if *has_local_file {
                    options.push(detach());
                    options.push(prune_all());
                }
                options
            }
            Situation::Conflict { .. } => vec![
                (Action::Skip, Choice::new("Skip", "Leave conflict unresolved for now.")),
                (
                    Action::Pull,
                    Choice::new("Pull remote", "Overwrite local content with the registry copy."),
                ),
                (
                    Action::Push,
                    Choice::new("Push local", "Overwrite the registry copy with local content."),
                ),
            ],
            Situation::StaleWorkflow { .. } => vec![
                (Action::Keep, Choice::new("Keep mapping", "Leave workflow alias unchanged.")),
                (
                    Action::Prune,
                    Choice::new("Prune alias", "Remove alias from .keel/config.yaml."),
                ),
            ],
            Situation::Duplicate { kind, .. } => {
                let prune = match kind {
                    EntityKind::Test => Action::PruneAlias,
                    EntityKind::Workflow => Action::Prune,
                };
                vec![
                    (Action::Keep, Choice::new("Keep duplicate", "Retain both aliases.")),
                    (prune, Choice::new("Prune duplicate", "Remove duplicate alias mapping.")),
                ]
            }
            Situation::AppLink { .. } => vec![
                (Action::Keep, Choice::new("Keep as-is", "Leave app_id unchanged.")),
                (Action::Clear, Choice::new("Clear app_id", "Unset this platform app link.")),
                (
                    Action::Relink,
                    Choice::new("Relink app", "Select another app for this platform."),
                ),
            ],
        }
    }

    fn prompt(&self) -> String {
        match self {
            Situation::OrphanedTest { alias, issue, .. } => {
                format!("Test '{alias}' link is {}. Choose action:", issue_label(*issue))
            }
            Situation::StaleTest { alias, .. } => {
                format!("Test '{alias}' is missing upstream. Choose action:")
            }
            Situation::Conflict { alias } => {
                format!("Conflict for test '{alias}'. Choose action:")
            }
            Situation::StaleWorkflow { alias } => {
                format!("Workflow '{alias}' is missing upstream. Choose action:")
            }
            Situation::Duplicate {
                kind,
                alias,
                canonical,
            } => format!(
                "Duplicate {} alias '{alias}' (also '{canonical}'). Choose action:",
                kind.as_str()
            ),
            Situation::AppLink {
                key,
                expected,
                missing,
            } => {
                let mut msg = if *missing {
                    format!("App link for '{key}' points to a missing app.")
                } else {
                    format!("App link for '{key}' needs attention.")
                };
                if let Some(platform) = expected {
                    msg.push_str(&format!(" Expected platform: {platform}."));
                }
                msg
            }
            Situation::Outdated | Situation::Modified | Situation::LocalOnly => String::new(),
        }
    }
}

fn issue_label(issue: LinkIssue) -> &'static str {
    match issue {
        LinkIssue::Missing => "missing upstream",
        LinkIssue::InvalidId => "an invalid remote id",
        LinkIssue::Unauthorized => "unauthorized",
        LinkIssue::Forbidden => "access denied",
    }
}

// ---------------------------------------------------------------------------
// Resolver
// ---------------------------------------------------------------------------

/// Resolved action and whether the user was asked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decision {
    pub action: Action,
    pub prompted: bool,
}

/// Decides actions for situations under fixed [`RunOptions`].
pub struct PolicyResolver<'p> {
    options: RunOptions,
    prompter: &'p mut dyn Prompter,
}

impl<'p> PolicyResolver<'p> {
    pub fn new(options: RunOptions, prompter: &'p mut dyn Prompter) -> Self {
        Self { options, prompter }
    }

    pub fn options(&self) -> RunOptions {
        self.options
    }

    pub fn resolve(&mut self, situation: &Situation<'_>) -> Decision {
        if self.options.prune {
            if let Some(action) = situation.prune_action() {
                debug!(?situation, action = action.as_str(), "prune default");
                return Decision {
                    action,
                    prompted: false,
                };
            }
        }

        let options = situation.options();
        if !self.options.prompt || options.is_empty() {
            return Decision {
                action: situation.default_action(),
                prompted: false,
            };
        }

        let preselected = situation.prompt_default();
        let default = options
            .iter()
            .position(|(action, _)| *action == preselected)
            .unwrap_or(0);
        let choices: Vec<Choice> = options.iter().map(|(_, choice)| choice.clone()).collect();
        let action = match self.prompter.choose(&situation.prompt(), &choices, default) {
            Ok(idx) => options
                .get(idx)
                .map(|(action, _)| *action)
                .unwrap_or_else(|| situation.default_action()),
            Err(err) => {
                warn!(error = %err, "prompt failed; using non-destructive default");
                situation.default_action()
            }
        };
        Decision {
            action,
            prompted: true,
        }
    }

    /// Free-form pick among runtime candidates (relink targets).
    pub fn pick(
        &mut self,
        prompt: &str,
        options: &[Choice],
        default: usize,
    ) -> Result<usize, SyncError> {
        let idx = self.prompter.choose(prompt, options, default)?;
        if idx < options.len() {
            Ok(idx)
        } else {
            Err(SyncError::Prompt(format!("choice {idx} is out of range")))
        }
    }
}
