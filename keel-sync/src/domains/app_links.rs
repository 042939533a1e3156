//! App-links domain: validate `build.platforms.<key>.app_id` against the registry.

use tracing::{info, warn};

use keel_core::{Platform, ProjectManifest, RemoteId};

use super::{by_name_then_id, Reconciler};
use crate::policy::{Action, Situation};
use crate::prompt::Choice;
use crate::remote::RemoteApp;
use crate::report::{DomainReport, SyncItem};
use crate::SyncError;

/// Reconcile every build platform with a linked application.
pub fn reconcile(cx: &mut Reconciler<'_>, manifest: &mut ProjectManifest) -> DomainReport {
    let mut report = DomainReport::default();
    let dry_run = cx.options().dry_run;

    let linked: Vec<(String, RemoteId)> = manifest
        .build
        .platforms
        .iter()
        .filter(|(_, platform)| !platform.app_id.is_empty())
        .map(|(key, platform)| (key.clone(), platform.app_id.clone()))
        .collect();

    for (key, app_id) in linked {
        let expected = Platform::infer_from_key(&key);
        let mut item = SyncItem::new(key.as_str(), app_id.as_str(), "synced");

        let missing = match cx.registry.get_app(&app_id) {
            Ok(app) => {
                let actual = Platform::parse(&app.platform);
                if expected.is_none() || actual == expected {
                    item.set_action(Action::None, dry_run);
                    item.message = format!("linked to {} ({})", app.name, app.platform);
                    report.push(item);
                    continue;
                }
                item.status = "mismatch".to_string();
                item.message = format!("app platform is {}", app.platform);
                false
            }
            Err(err) if err.is_not_found() => {
                item.status = "stale".to_string();
                item.message = "linked app no longer exists".to_string();
                true
            }
            Err(err) => {
                item.status = "error".to_string();
                item.set_action(Action::Validate, dry_run);
                item.error = err.to_string();
                report.push(item);
                continue;
            }
        };

        let decision = cx.resolver.resolve(&Situation::AppLink {
            key: &key,
            expected,
            missing,
        });
        item.set_decision(decision, dry_run);
        if dry_run {
            report.push(item);
            continue;
        }

        match decision.action {
            Action::Clear => {
                if let Some(platform) = manifest.build.platforms.get_mut(&key) {
                    platform.app_id = RemoteId::default();
                    info!(%key, "cleared app link");
                    report.changed = true;
                    item.message = format!("{}; app link cleared", item.message);
                }
            }
            Action::Relink => match relink(cx, expected) {
                Ok(app) => {
                    if let Some(platform) = manifest.build.platforms.get_mut(&key) {
                        info!(%key, app = %app.id, "relinked app");
                        platform.app_id = app.id.clone();
                        report.changed = true;
                        item.message = format!("relinked to {}", app.name);
                    }
                }
                Err(err) => {
                    warn!(%key, error = %err, "relink failed");
                    item.error = err.to_string();
                }
            },
            _ => {}
        }
        report.push(item);
    }

    report
}

/// Ask the user to pick a replacement application of the expected platform.
fn relink(cx: &mut Reconciler<'_>, expected: Option<Platform>) -> Result<RemoteApp, SyncError> {
    let mut apps = cx.registry.list_apps(expected)?;
    if apps.is_empty() {
        return Err(SyncError::NoRelinkCandidates {
            platform: expected.map_or("matching", |p| p.as_str()).to_string(),
        });
    }
    apps.sort_by(|a, b| by_name_then_id((&a.name, a.id.as_str()), (&b.name, b.id.as_str())));

    let choices: Vec<Choice> = apps
        .iter()
        .map(|app| Choice::new(format!("{} ({})", app.name, app.platform), app.id.as_str()))
        .collect();
    let idx = cx.resolver.pick("Select app to relink:", &choices, 0)?;
    Ok(apps.swap_remove(idx))
}
