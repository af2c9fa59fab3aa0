//! Baseline rows for a new install.
//!
//! Every section checks for existing rows first, so seeding runs on each
//! start without duplicating anything. Locked presets are matched by name
//! and re-created individually when missing.

use crate::steps::LOCKED_PRESETS;
use serde::Serialize;
use sg_core::{hash_password, StatusReporter, UsersConfig};
use sg_db::{Backend, DbError, DbResult, Namespace};
use sg_engine::{EngineResult, InitialData};

/// Categories the family account hides
pub const FAMILY_HIDDEN_CATEGORIES: &str =
    "ecchi,nudity,sex,sexual abuse,horror,erotic game,incest,18 restricted";

const FAMILY_USERNAME: &str = "Family Friendly";

/// Preset kinds stored in `FilterPreset.FilterType`
const FILTER_USER_DEFINED: i32 = 1;
const FILTER_CONTINUE_WATCHING: i32 = 2;
const FILTER_ALL: i32 = 4;

/// Editable presets created once
const DEFAULT_PRESETS: &[&str] = &[
    "Missing Episodes",
    "Newly Added Series",
    "Newly Airing Series",
    "Votes Needed",
    "Recently Watched",
];

const CUSTOM_TAGS: &[(&str, &str)] = &[
    ("Dropped", "Started watching this series, but have since dropped it"),
    ("Pinned", "Pinned this series for whatever reason you like"),
    ("Ongoing", "This series does not have an end date"),
    (
        "Waiting for Series Completion",
        "Will start watching this once this series is finished",
    ),
    (
        "Waiting for Blu-ray Completion",
        "Will start watching this once all episodes are available in Blu-Ray",
    ),
];

/// Settings of the default `WebAOM` renamer
#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct WebAomSettings {
    script: &'static str,
    group_aware_sorting: bool,
    max_path_length: u32,
}

impl Default for WebAomSettings {
    fn default() -> Self {
        Self {
            script: "%ann - %enr - %epn [%grp][%src][%crc]",
            group_aware_sorting: false,
            max_path_length: 255,
        }
    }
}

/// Default accounts, presets, renamer config and custom tags
#[derive(Debug, Clone, Default)]
pub struct BaselineSeed {
    users: UsersConfig,
}

impl BaselineSeed {
    pub fn new(users: UsersConfig) -> Self {
        Self { users }
    }
}

fn is_empty<B: Backend>(backend: &B, conn: &mut B::Conn, table: &str) -> DbResult<bool> {
    let sql = format!("SELECT COUNT(*) FROM {}", backend.namespace().table(table));
    Ok(backend.execute_scalar(conn, &sql)?.as_i64().unwrap_or(0) == 0)
}

fn insert_user<B: Backend>(
    backend: &B,
    conn: &mut B::Conn,
    username: &str,
    password: &str,
    hide_categories: &str,
) -> DbResult<()> {
    let ns = backend.namespace();
    backend.execute(
        conn,
        &format!(
            "INSERT INTO {} (Username, Password, IsAdmin, IsAniDBUser, IsTraktUser, HideCategories, CanEditServerSettings) \
             VALUES ({}, {}, 1, 1, 1, {}, 1)",
            ns.table("Users"),
            ns.literal(username),
            ns.literal(password),
            ns.literal(hide_categories)
        ),
    )
}

fn insert_preset<B: Backend>(
    backend: &B,
    conn: &mut B::Conn,
    name: &str,
    locked: bool,
    filter_type: i32,
    description: Option<&str>,
) -> DbResult<()> {
    let ns = backend.namespace();
    let description = description.map_or_else(|| "NULL".to_string(), |d| ns.literal(d));
    backend.execute(
        conn,
        &format!(
            "INSERT INTO {} (Name, Locked, ApplyAtSeriesLevel, FilterType, Hidden, Description) \
             VALUES ({}, {}, 1, {}, 0, {})",
            ns.table("FilterPreset"),
            ns.literal(name),
            i32::from(locked),
            filter_type,
            description
        ),
    )
}

impl BaselineSeed {
    fn users<B: Backend>(&self, backend: &B, conn: &mut B::Conn) -> DbResult<()> {
        if !is_empty(backend, conn, "Users")? {
            return Ok(());
        }
        let password = hash_password(&self.users.default_password);
        insert_user(backend, conn, &self.users.default_username, &password, "")?;
        insert_user(backend, conn, FAMILY_USERNAME, "", FAMILY_HIDDEN_CATEGORIES)?;
        log::info!("Created default users");
        Ok(())
    }

    fn filter_presets<B: Backend>(&self, backend: &B, conn: &mut B::Conn) -> DbResult<()> {
        if !is_empty(backend, conn, "FilterPreset")? {
            return Ok(());
        }
        for name in DEFAULT_PRESETS {
            insert_preset(backend, conn, name, false, FILTER_USER_DEFINED, None)?;
        }
        Ok(())
    }

    fn locked_presets<B: Backend>(&self, backend: &B, conn: &mut B::Conn) -> DbResult<()> {
        let ns = backend.namespace();
        for (name, description) in LOCKED_PRESETS {
            let sql = format!(
                "SELECT COUNT(*) FROM {} WHERE Locked = 1 AND Name = {}",
                ns.table("FilterPreset"),
                ns.literal(name)
            );
            if backend.execute_scalar(conn, &sql)?.as_i64().unwrap_or(0) > 0 {
                continue;
            }
            let filter_type = if *name == "All" {
                FILTER_ALL
            } else {
                FILTER_CONTINUE_WATCHING
            };
            insert_preset(backend, conn, name, true, filter_type, Some(description))?;
            log::info!("Created locked filter preset '{}'", name);
        }
        Ok(())
    }

    fn renamer_config<B: Backend>(&self, backend: &B, conn: &mut B::Conn) -> DbResult<()> {
        if !is_empty(backend, conn, "RenamerConfig")? {
            return Ok(());
        }
        let settings = serde_json::to_string(&WebAomSettings::default())
            .map_err(|e| DbError::ConversionError(e.to_string()))?;
        let ns = backend.namespace();
        backend.execute(
            conn,
            &format!(
                "INSERT INTO {} (Name, Type, Settings) VALUES ({}, {}, {})",
                ns.table("RenamerConfig"),
                ns.literal("Default"),
                ns.literal("WebAOM"),
                ns.literal(&settings)
            ),
        )
    }

    fn custom_tags<B: Backend>(&self, backend: &B, conn: &mut B::Conn) -> DbResult<()> {
        if !is_empty(backend, conn, "CustomTag")? {
            return Ok(());
        }
        let ns: &Namespace = backend.namespace();
        for (name, description) in CUSTOM_TAGS {
            backend.execute(
                conn,
                &format!(
                    "INSERT INTO {} (TagName, TagDescription) VALUES ({}, {})",
                    ns.table("CustomTag"),
                    ns.literal(name),
                    ns.literal(description)
                ),
            )?;
        }
        Ok(())
    }
}

fn announce(status: &dyn StatusReporter, section: &str) {
    log::debug!("Seeding {}", section);
    status.status(&format!("Database - Populating Data ({})...", section));
}

impl<B: Backend> InitialData<B> for BaselineSeed {
    fn seed(&self, backend: &B, conn: &mut B::Conn, status: &dyn StatusReporter) -> EngineResult<()> {
        announce(status, "Users");
        self.users(backend, conn)?;

        announce(status, "Filter Presets");
        self.filter_presets(backend, conn)?;

        announce(status, "Locked Filter Presets");
        self.locked_presets(backend, conn)?;

        announce(status, "Renamer Config");
        self.renamer_config(backend, conn)?;

        announce(status, "Custom Tags");
        if let Err(e) = self.custom_tags(backend, conn) {
            log::warn!("Could not create initial custom tags: {}", e);
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "seed_test.rs"]
mod tests;
