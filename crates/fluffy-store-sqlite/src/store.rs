//! The SQLite implementation of [`ProfileStore`].

use std::{
  collections::{HashMap, HashSet},
  os::raw::c_int,
  path::Path,
};

use chrono::Utc;
use rusqlite::{OptionalExtension as _, ffi};
use tracing::warn;
use uuid::Uuid;

use fluffy_core::{
  Error as CoreError,
  audit::{LogEntry, NewLogEntry},
  handle::{self, Handle},
  link::{
    Link, LinkFields, LinkPatch, LinkReplacement, NewLink, OrderUpdate,
    check_reorder_batch, reindex_plan, sort_links,
  },
  store::ProfileStore,
  theme::DEFAULT_THEME_ID,
  user::{Identity, ProfileChanges, Provisioned, User, refreshed_image},
  visit::{self, VisitOutcome, VisitTarget},
};

use crate::{
  Error, Result,
  encode::{
    LINK_COLUMNS, LOG_COLUMNS, RawLink, RawLogEntry, RawUser, USER_COLUMNS,
    encode_dt, encode_uuid,
  },
  schema::SCHEMA,
};

/// Handle candidates tried before provisioning gives up with `Conflict`.
const MAX_HANDLE_ATTEMPTS: u32 = 50;

// ─── Constraint helpers ──────────────────────────────────────────────────────

/// Whether `err` is a constraint failure with the given extended code.
fn violated(err: &rusqlite::Error, code: c_int) -> bool {
  matches!(
    err,
    rusqlite::Error::SqliteFailure(e, _) if e.extended_code == code
  )
}

fn unique_violation(err: &rusqlite::Error) -> bool {
  violated(err, ffi::SQLITE_CONSTRAINT_UNIQUE)
    || violated(err, ffi::SQLITE_CONSTRAINT_PRIMARYKEY)
}

fn foreign_key_violation(err: &rusqlite::Error) -> bool {
  violated(err, ffi::SQLITE_CONSTRAINT_FOREIGNKEY)
}

// ─── Row selection ───────────────────────────────────────────────────────────

fn select_user(
  conn: &rusqlite::Connection,
  user_id: &str,
) -> rusqlite::Result<Option<RawUser>> {
  conn
    .query_row(
      &format!("SELECT {USER_COLUMNS} FROM users WHERE user_id = ?1"),
      rusqlite::params![user_id],
      RawUser::from_row,
    )
    .optional()
}

fn select_links(
  conn: &rusqlite::Connection,
  user_id: &str,
) -> rusqlite::Result<Vec<RawLink>> {
  let mut stmt = conn.prepare(&format!(
    "SELECT {LINK_COLUMNS} FROM links WHERE user_id = ?1"
  ))?;
  stmt
    .query_map(rusqlite::params![user_id], RawLink::from_row)?
    .collect()
}

/// Ids in `ids` that exist and belong to `user_id`.
fn count_owned(
  conn: &rusqlite::Connection,
  user_id: &str,
  ids: &[String],
) -> rusqlite::Result<usize> {
  let mut stmt =
    conn.prepare("SELECT 1 FROM links WHERE link_id = ?1 AND user_id = ?2")?;
  let mut owned = 0;
  for id in ids {
    if stmt.exists(rusqlite::params![id, user_id])? {
      owned += 1;
    }
  }
  Ok(owned)
}

fn write_order(
  conn: &rusqlite::Connection,
  user_id: &str,
  link_id: &str,
  order: u32,
  at: &str,
) -> rusqlite::Result<usize> {
  conn.execute(
    "UPDATE links SET ord = ?1, updated_at = ?2
     WHERE link_id = ?3 AND user_id = ?4",
    rusqlite::params![order, at, link_id, user_id],
  )
}

fn write_fields(
  conn: &rusqlite::Connection,
  user_id: &str,
  link_id: &str,
  fields: &LinkFields,
  order: u32,
  at: &str,
) -> rusqlite::Result<usize> {
  conn.execute(
    "UPDATE links SET
       platform = ?1, title = ?2, url = ?3, subtitle = ?4, icon = ?5,
       enabled = ?6, ord = ?7, updated_at = ?8
     WHERE link_id = ?9 AND user_id = ?10",
    rusqlite::params![
      fields.platform.as_ref(),
      fields.title,
      fields.url,
      fields.subtitle,
      fields.icon,
      fields.enabled,
      order,
      at,
      link_id,
      user_id,
    ],
  )
}

/// Decode and sort into display order.
fn decode_links(raws: Vec<RawLink>) -> Result<Vec<Link>> {
  let mut links = raws
    .into_iter()
    .map(RawLink::into_link)
    .collect::<Result<Vec<_>>>()?;
  sort_links(&mut links);
  Ok(links)
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Fluffy profile store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// The user currently holding `handle_lower`, if any.
  async fn handle_owner(&self, handle_lower: String) -> Result<Option<String>> {
    let owner = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT user_id FROM users WHERE handle_lower = ?1",
              rusqlite::params![handle_lower],
              |r| r.get(0),
            )
            .optional()?,
        )
      })
      .await?;
    Ok(owner)
  }
}

// ─── ProfileStore impl ───────────────────────────────────────────────────────

impl ProfileStore for SqliteStore {
  type Error = Error;

  // ── Users ─────────────────────────────────────────────────────────────────

  async fn provision_user(
    &self,
    identity: Identity,
  ) -> Result<(User, Provisioned)> {
    let base = handle::from_display_name(&identity.display_name);
    let avatar = identity.avatar_url.clone().unwrap_or_default();
    let now = encode_dt(Utc::now());

    let (raw, provisioned) = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let id = identity.external_id;

        let provisioned = match select_user(&tx, &id)? {
          Some(existing) => {
            tx.execute(
              "UPDATE users SET name = ?1, image = ?2, provider_image = ?3,
                 updated_at = ?4
               WHERE user_id = ?5",
              rusqlite::params![
                identity.display_name,
                refreshed_image(&existing.image, &avatar),
                avatar,
                now,
                id,
              ],
            )?;
            Some(Provisioned::Refreshed)
          }
          None => {
            let mut created = None;
            for attempt in 1..=MAX_HANDLE_ATTEMPTS {
              let candidate: Handle = if attempt == 1 {
                base.clone()
              } else {
                handle::with_suffix(&base, attempt)
              };
              let inserted = tx.execute(
                "INSERT INTO users (
                   user_id, name, handle, handle_lower, theme, image,
                   provider_image, is_public, created_at, updated_at
                 ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 1, ?8, ?8)",
                rusqlite::params![
                  id,
                  identity.display_name,
                  candidate.display,
                  candidate.lower,
                  DEFAULT_THEME_ID,
                  avatar,
                  avatar,
                  now,
                ],
              );
              match inserted {
                Ok(_) => {
                  created = Some(Provisioned::Created);
                  break;
                }
                Err(e) if unique_violation(&e) => continue,
                Err(e) => return Err(e.into()),
              }
            }
            created
          }
        };

        let Some(provisioned) = provisioned else {
          return Ok(Err(CoreError::Conflict(format!(
            "no free handle for {:?}",
            base.display
          ))));
        };

        let raw = select_user(&tx, &id)?;
        tx.commit()?;
        Ok(Ok((raw, provisioned)))
      })
      .await??;

    let user = raw.ok_or(CoreError::NotFound)?.into_user()?;
    Ok((user, provisioned))
  }

  async fn get_user(&self, user_id: String) -> Result<Option<User>> {
    let raw = self
      .conn
      .call(move |conn| Ok(select_user(conn, &user_id)?))
      .await?;
    raw.map(RawUser::into_user).transpose()
  }

  async fn get_user_by_handle(&self, handle: String) -> Result<Option<User>> {
    let lower = handle.trim().to_lowercase();
    let raw = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!(
                "SELECT {USER_COLUMNS} FROM users WHERE handle_lower = ?1"
              ),
              rusqlite::params![lower],
              RawUser::from_row,
            )
            .optional()?,
        )
      })
      .await?;
    raw.map(RawUser::into_user).transpose()
  }

  async fn list_users(&self) -> Result<Vec<User>> {
    let raws: Vec<RawUser> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {USER_COLUMNS} FROM users ORDER BY created_at DESC"
        ))?;
        let rows = stmt
          .query_map([], RawUser::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawUser::into_user).collect()
  }

  async fn update_profile(
    &self,
    user_id: String,
    changes: ProfileChanges,
  ) -> Result<User> {
    let mut user = self
      .get_user(user_id.clone())
      .await?
      .ok_or(CoreError::NotFound)?;

    // Friendly pre-check; the UNIQUE constraint below is the real guard.
    if let Some(h) = &changes.handle
      && let Some(owner) = self.handle_owner(h.lower.clone()).await?
      && owner != user_id
    {
      return Err(CoreError::HandleTaken(h.display.clone()).into());
    }

    changes.apply(&mut user);
    user.updated_at = Utc::now();

    let row = user.clone();
    let at = encode_dt(row.updated_at);
    let written = self
      .conn
      .call(move |conn| {
        let res = conn.execute(
          "UPDATE users SET
             handle = ?1, handle_lower = ?2, bio = ?3, theme = ?4,
             theme_json = ?5, banner_url = ?6, image = ?7, is_public = ?8,
             profile_tag = ?9, updated_at = ?10
           WHERE user_id = ?11",
          rusqlite::params![
            row.handle,
            row.handle_lower,
            row.bio,
            row.theme,
            row.theme_json,
            row.banner_url,
            row.image,
            row.is_public,
            row.profile_tag,
            at,
            row.user_id,
          ],
        );
        match res {
          Ok(0) => Ok(Err(CoreError::NotFound)),
          Ok(_) => Ok(Ok(())),
          Err(e) if unique_violation(&e) => {
            Ok(Err(CoreError::HandleTaken(row.handle)))
          }
          Err(e) => Err(e.into()),
        }
      })
      .await?;
    written?;

    Ok(user)
  }

  async fn delete_user(&self, user_id: String) -> Result<()> {
    let deleted = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "DELETE FROM users WHERE user_id = ?1",
          rusqlite::params![user_id],
        )?)
      })
      .await?;
    if deleted == 0 {
      return Err(CoreError::NotFound.into());
    }
    Ok(())
  }

  // ── Links ─────────────────────────────────────────────────────────────────

  async fn list_links(&self, user_id: String) -> Result<Vec<Link>> {
    let raws = self
      .conn
      .call(move |conn| Ok(select_links(conn, &user_id)?))
      .await?;
    decode_links(raws)
  }

  async fn get_link(&self, link_id: Uuid) -> Result<Option<Link>> {
    let id_str = encode_uuid(link_id);
    let raw = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {LINK_COLUMNS} FROM links WHERE link_id = ?1"),
              rusqlite::params![id_str],
              RawLink::from_row,
            )
            .optional()?,
        )
      })
      .await?;
    raw.map(RawLink::into_link).transpose()
  }

  async fn append_link(
    &self,
    user_id: String,
    input: NewLink,
  ) -> Result<Vec<Link>> {
    let fields = input.resolve()?;
    let id_str = encode_uuid(Uuid::new_v4());
    let now = encode_dt(Utc::now());

    let raws = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        if select_user(&tx, &user_id)?.is_none() {
          return Ok(Err(CoreError::NotFound));
        }
        let count: u32 = tx.query_row(
          "SELECT COUNT(*) FROM links WHERE user_id = ?1",
          rusqlite::params![user_id],
          |r| r.get(0),
        )?;
        tx.execute(
          "INSERT INTO links (
             link_id, user_id, platform, title, url, subtitle, icon,
             enabled, ord, created_at, updated_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?10)",
          rusqlite::params![
            id_str,
            user_id,
            fields.platform.as_ref(),
            fields.title,
            fields.url,
            fields.subtitle,
            fields.icon,
            fields.enabled,
            count,
            now,
          ],
        )?;
        let raws = select_links(&tx, &user_id)?;
        tx.commit()?;
        Ok(Ok(raws))
      })
      .await??;

    decode_links(raws)
  }

  async fn update_link(
    &self,
    user_id: String,
    link_id: Uuid,
    patch: LinkPatch,
  ) -> Result<Vec<Link>> {
    let current = self
      .get_link(link_id)
      .await?
      .filter(|l| l.user_id == user_id)
      .ok_or(CoreError::NotFound)?;
    let (fields, order) = patch.apply(&current)?;

    let id_str = encode_uuid(link_id);
    let now = encode_dt(Utc::now());
    let raws = self
      .conn
      .call(move |conn| {
        if write_fields(conn, &user_id, &id_str, &fields, order, &now)? == 0 {
          return Ok(Err(CoreError::NotFound));
        }
        Ok(Ok(select_links(conn, &user_id)?))
      })
      .await??;

    decode_links(raws)
  }

  async fn replace_links(
    &self,
    user_id: String,
    links: Vec<LinkReplacement>,
  ) -> Result<Vec<Link>> {
    let resolved = links
      .iter()
      .map(LinkReplacement::resolve)
      .collect::<fluffy_core::Result<Vec<_>>>()?;
    let now = encode_dt(Utc::now());

    let raws = self
      .conn
      .call(move |conn| {
        let ids: Vec<String> =
          resolved.iter().map(|(id, ..)| encode_uuid(*id)).collect();
        let distinct: HashSet<&String> = ids.iter().collect();

        let tx = conn.transaction()?;
        if distinct.len() != ids.len()
          || count_owned(&tx, &user_id, &ids)? != ids.len()
        {
          return Ok(Err(CoreError::NotFound));
        }
        for (id, (_, fields, order)) in ids.iter().zip(&resolved) {
          write_fields(&tx, &user_id, id, fields, *order, &now)?;
        }
        let raws = select_links(&tx, &user_id)?;
        tx.commit()?;
        Ok(Ok(raws))
      })
      .await??;

    decode_links(raws)
  }

  async fn reorder_links(
    &self,
    user_id: String,
    orders: Vec<OrderUpdate>,
  ) -> Result<Vec<Link>> {
    check_reorder_batch(&orders)?;
    let now = encode_dt(Utc::now());

    let raws = self
      .conn
      .call(move |conn| {
        let ids: Vec<String> =
          orders.iter().map(|o| encode_uuid(o.link_id)).collect();
        let distinct: HashSet<&String> = ids.iter().collect();
        if distinct.len() != ids.len() {
          return Ok(Err(CoreError::InvalidInput(
            "a link appears more than once".to_owned(),
          )));
        }

        let tx = conn.transaction()?;
        if count_owned(&tx, &user_id, &ids)? != ids.len() {
          return Ok(Err(CoreError::Forbidden));
        }
        for (id, update) in ids.iter().zip(&orders) {
          write_order(&tx, &user_id, id, update.order, &now)?;
        }
        let raws = select_links(&tx, &user_id)?;
        tx.commit()?;
        Ok(Ok(raws))
      })
      .await??;

    decode_links(raws)
  }

  async fn delete_link(
    &self,
    user_id: String,
    link_id: Uuid,
  ) -> Result<Vec<Link>> {
    let id_str = encode_uuid(link_id);
    let owner = user_id.clone();
    let deleted = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "DELETE FROM links WHERE link_id = ?1 AND user_id = ?2",
          rusqlite::params![id_str, owner],
        )?)
      })
      .await?;
    if deleted == 0 {
      return Err(CoreError::NotFound.into());
    }

    // Reindex row by row. A failed write leaves a gap that the next delete or
    // reorder closes; reads stay stable through the creation-time tie-break.
    let remaining = self.list_links(user_id.clone()).await?;
    for update in reindex_plan(&remaining) {
      let owner = user_id.clone();
      let id_str = encode_uuid(update.link_id);
      let now = encode_dt(Utc::now());
      let res = self
        .conn
        .call(move |conn| {
          Ok(write_order(conn, &owner, &id_str, update.order, &now)?)
        })
        .await;
      if let Err(e) = res {
        warn!(link_id = %update.link_id, error = %e, "reindex write failed");
      }
    }

    self.list_links(user_id).await
  }

  // ── Visits ────────────────────────────────────────────────────────────────

  async fn record_visit(
    &self,
    target: VisitTarget,
    session_id: Option<String>,
  ) -> Result<VisitOutcome> {
    let Some(session) = visit::session_id(session_id.as_deref()).map(str::to_owned)
    else {
      return Ok(VisitOutcome::Skipped);
    };
    let now = encode_dt(Utc::now());

    let outcome = self
      .conn
      .call(move |conn| {
        let res = match &target {
          VisitTarget::Profile(user_id) => conn.execute(
            "INSERT INTO profile_visits (user_id, session_id, created_at)
             VALUES (?1, ?2, ?3)",
            rusqlite::params![user_id, session, now],
          ),
          VisitTarget::Link(link_id) => conn.execute(
            "INSERT INTO link_visits (link_id, session_id, created_at)
             VALUES (?1, ?2, ?3)",
            rusqlite::params![encode_uuid(*link_id), session, now],
          ),
        };
        match res {
          Ok(_) => Ok(Ok(VisitOutcome::Recorded)),
          Err(e) if unique_violation(&e) => Ok(Ok(VisitOutcome::AlreadyCounted)),
          Err(e) if foreign_key_violation(&e) => Ok(Err(CoreError::NotFound)),
          Err(e) => Err(e.into()),
        }
      })
      .await??;

    Ok(outcome)
  }

  async fn count_visits(
    &self,
    targets: Vec<VisitTarget>,
  ) -> Result<HashMap<VisitTarget, u64>> {
    let counts = self
      .conn
      .call(move |conn| {
        let mut profile = conn
          .prepare("SELECT COUNT(*) FROM profile_visits WHERE user_id = ?1")?;
        let mut link =
          conn.prepare("SELECT COUNT(*) FROM link_visits WHERE link_id = ?1")?;

        let mut counts = HashMap::with_capacity(targets.len());
        for target in targets {
          let n: u64 = match &target {
            VisitTarget::Profile(user_id) => {
              profile.query_row(rusqlite::params![user_id], |r| r.get(0))?
            }
            VisitTarget::Link(link_id) => link
              .query_row(rusqlite::params![encode_uuid(*link_id)], |r| r.get(0))?,
          };
          counts.insert(target, n);
        }
        Ok(counts)
      })
      .await?;
    Ok(counts)
  }

  // ── Audit log ─────────────────────────────────────────────────────────────

  async fn append_log(&self, entry: NewLogEntry) -> Result<LogEntry> {
    let entry = LogEntry {
      log_id:         Uuid::new_v4(),
      kind:           entry.kind,
      message:        entry.message,
      actor_user_id:  entry.actor_user_id,
      target_user_id: entry.target_user_id,
      ip:             entry.ip,
      created_at:     Utc::now(),
    };

    let row = entry.clone();
    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO logs (
             log_id, kind, message, actor_user_id, target_user_id, ip,
             created_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
          rusqlite::params![
            encode_uuid(row.log_id),
            row.kind.as_ref(),
            row.message,
            row.actor_user_id,
            row.target_user_id,
            row.ip,
            encode_dt(row.created_at),
          ],
        )?;
        Ok(())
      })
      .await?;

    Ok(entry)
  }

  async fn list_logs(&self, limit: usize) -> Result<Vec<LogEntry>> {
    let limit = i64::try_from(limit).unwrap_or(i64::MAX);
    let raws: Vec<RawLogEntry> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {LOG_COLUMNS} FROM logs ORDER BY rowid DESC LIMIT ?1"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![limit], RawLogEntry::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawLogEntry::into_entry).collect()
  }

  // ── Login sessions ────────────────────────────────────────────────────────

  async fn create_session(
    &self,
    user_id: String,
    token_hash: String,
  ) -> Result<()> {
    let now = encode_dt(Utc::now());
    self
      .conn
      .call(move |conn| {
        match conn.execute(
          "INSERT INTO sessions (token_hash, user_id, created_at)
           VALUES (?1, ?2, ?3)",
          rusqlite::params![token_hash, user_id, now],
        ) {
          Ok(_) => Ok(Ok(())),
          Err(e) if foreign_key_violation(&e) => Ok(Err(CoreError::NotFound)),
          Err(e) if unique_violation(&e) => Ok(Err(CoreError::Conflict(
            "session token already issued".to_owned(),
          ))),
          Err(e) => Err(e.into()),
        }
      })
      .await??;
    Ok(())
  }

  async fn session_user(&self, token_hash: String) -> Result<Option<String>> {
    let user_id = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT user_id FROM sessions WHERE token_hash = ?1",
              rusqlite::params![token_hash],
              |r| r.get(0),
            )
            .optional()?,
        )
      })
      .await?;
    Ok(user_id)
  }

  async fn delete_session(&self, token_hash: String) -> Result<()> {
    self
      .conn
      .call(move |conn| {
        conn.execute(
          "DELETE FROM sessions WHERE token_hash = ?1",
          rusqlite::params![token_hash],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}
