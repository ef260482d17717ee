//! Tagged-event classification of log lines.
//!
//! Raw events are matched against the untouched line text; clean events are
//! matched against the redacted text. Timestamps live on the ledger row, not
//! in the line itself.

use regex::Regex;
use std::sync::LazyLock;

static FINAL_VERSION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^Final schema version is ([0-9]+)").unwrap());
static UPGRADE_BEGIN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\*+ DB upgrade to state of (.*) starts \*+").unwrap());
static UPGRADE_END: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\*+ DB upgrade to state of (.*) finished \*+").unwrap());
static MIGRATION_CLASH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^Error: migration number .* appears more than once").unwrap()
});
static MIGRATION_BEGIN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([0-9]+) -> ([0-9]+)\.\.\.$").unwrap());

static GIT_CHECKOUT_PATH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"/srv/git-checkouts/[a-z]+/[a-z]+_refs_changes_[0-9_]+").unwrap()
});
static VENV_PATH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"/home/[a-z0-9]+/\.virtualenvs/refs_changes_[0-9_]+").unwrap()
});

const TOOLS_PATH: &str = "/srv/openstack-ci-tools";
const TOOLS_PLACEHOLDER: &str = "...";
const GIT_PLACEHOLDER: &str = "...git...";
const VENV_PLACEHOLDER: &str = "...venv...";

/// Event recognized on the untouched line text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawEvent {
    /// `Final schema version is <v>`
    FinalVersion(i64),
    /// `**** DB upgrade to state of <name> starts ****`
    UpgradeBegin(String),
    /// `**** DB upgrade to state of <name> finished ****`
    UpgradeEnd(String),
    /// `Error: migration number ... appears more than once`
    MigrationClash,
}

/// Event recognized on the redacted line text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CleanEvent {
    /// `<from> -> <to>...`
    MigrationBegin { from: i64, to: i64 },
    /// exactly `done`
    MigrationEnd,
}

pub fn classify_raw(text: &str) -> Option<RawEvent> {
    if let Some(caps) = FINAL_VERSION.captures(text) {
        return caps[1].parse().ok().map(RawEvent::FinalVersion);
    }
    if let Some(caps) = UPGRADE_BEGIN.captures(text) {
        return Some(RawEvent::UpgradeBegin(caps[1].to_string()));
    }
    if let Some(caps) = UPGRADE_END.captures(text) {
        return Some(RawEvent::UpgradeEnd(caps[1].to_string()));
    }
    if MIGRATION_CLASH.is_match(text) {
        return Some(RawEvent::MigrationClash);
    }
    None
}

pub fn classify_clean(cleaned: &str) -> Option<CleanEvent> {
    if cleaned == "done" {
        return Some(CleanEvent::MigrationEnd);
    }
    if let Some(caps) = MIGRATION_BEGIN.captures(cleaned) {
        let from = caps[1].parse().ok()?;
        let to = caps[2].parse().ok()?;
        return Some(CleanEvent::MigrationBegin { from, to });
    }
    None
}

/// Trim trailing whitespace and redact known absolute-path prefixes with
/// fixed placeholder tokens. HTML escaping is a rendering concern and
/// happens after classification.
pub fn clean(raw: &str) -> String {
    let trimmed = raw.trim_end();
    let redacted = trimmed.replace(TOOLS_PATH, TOOLS_PLACEHOLDER);
    let redacted = GIT_CHECKOUT_PATH.replace_all(&redacted, GIT_PLACEHOLDER);
    VENV_PATH.replace_all(&redacted, VENV_PLACEHOLDER).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_final_version() {
        assert_eq!(
            classify_raw("Final schema version is 161"),
            Some(RawEvent::FinalVersion(161))
        );
    }

    #[test]
    fn test_upgrade_markers() {
        assert_eq!(
            classify_raw("**** DB upgrade to state of trunk starts ****"),
            Some(RawEvent::UpgradeBegin("trunk".to_string()))
        );
        assert_eq!(
            classify_raw("**** DB upgrade to state of trunk finished ****"),
            Some(RawEvent::UpgradeEnd("trunk".to_string()))
        );
    }

    #[test]
    fn test_migration_clash() {
        assert_eq!(
            classify_raw("Error: migration number 152 appears more than once"),
            Some(RawEvent::MigrationClash)
        );
    }

    #[test]
    fn test_migration_steps() {
        assert_eq!(
            classify_clean("151 -> 152..."),
            Some(CleanEvent::MigrationBegin { from: 151, to: 152 })
        );
        assert_eq!(classify_clean("done"), Some(CleanEvent::MigrationEnd));
        // Anything trailing disqualifies the exact match.
        assert_eq!(classify_clean("done."), None);
    }

    #[test]
    fn test_unrecognized_line() {
        assert_eq!(classify_raw("just some output"), None);
        assert_eq!(classify_clean("just some output"), None);
    }

    #[test]
    fn test_clean_redacts_fixed_paths() {
        assert_eq!(
            clean("using /srv/openstack-ci-tools/gitcheckout.sh\n"),
            "using .../gitcheckout.sh"
        );
        assert_eq!(
            clean("cd /srv/git-checkouts/nova/nova_refs_changes_12345_2"),
            "cd ...git..."
        );
        assert_eq!(
            clean("activated /home/mikal/.virtualenvs/refs_changes_12345_2"),
            "activated ...venv..."
        );
    }
}
