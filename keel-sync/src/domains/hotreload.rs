//! Hot reload validation: read-only checks of provider `platform_keys`.
//!
//! Every failed check (unknown target platform, missing build key, empty
//! `app_id`) is a `warning` item carrying an error, so the run fails.

use keel_core::{Platform, ProjectManifest};

use crate::policy::Action;
use crate::report::{DomainReport, SyncItem};

/// Validate every provider's target-platform → build-platform-key mapping.
pub fn validate(manifest: &ProjectManifest) -> DomainReport {
    let mut report = DomainReport::default();

    for (provider, config) in &manifest.hotreload.providers {
        for (target, key) in &config.platform_keys {
            let key = key.trim();
            if key.is_empty() {
                continue;
            }
            let mut item = SyncItem::new(format!("{provider}.{target}"), key, "warning");
            item.set_action(Action::Validate, false);

            if Platform::parse(target).is_none() {
                item.error =
                    format!("unknown target platform `{target}` in platform_keys (expected ios/android)");
            } else {
                match manifest.build.platforms.get(key) {
                    None => {
                        item.error = format!("mapped build platform `{key}` not found in build.platforms");
                    }
                    Some(platform) if platform.app_id.is_empty() => {
                        item.error = format!("mapped build platform `{key}` has no app_id");
                    }
                    Some(_) => {
                        item.status = "synced".to_string();
                        item.set_action(Action::None, false);
                        item.message = format!("mapped to build.platforms.{key}");
                    }
                }
            }
            report.push(item);
        }
    }

    report
}
