//! Invite repository for database queries.
//!
//! Every transition runs in one transaction with a guarded UPDATE on the
//! expected state, so concurrent calls resolve to exactly one winner and
//! the losers get a precise state error.

use super::models::{Invite, InviteOutcome, InviteStatus, PendingInvite};
use crate::db::DbError;
use sqlx::SqlitePool;
use uuid::Uuid;

/// Repository for invite workflow operations.
pub struct InviteRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> InviteRepository<'a> {
    /// Create a new invite repository.
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Create an invite for `invitee` into a channel.
    ///
    /// Authorization: the inviter must be the channel owner (ASCII
    /// case-insensitive) or an existing member (case-insensitive). An
    /// invitee who is already a member yields [`InviteOutcome::AlreadyMember`]
    /// without writing a row. At most one invite per (channel, invitee) may
    /// be active; the partial unique index backstops the in-transaction
    /// probe.
    ///
    /// Initial status: `pending_owner` when the channel is private and the
    /// inviter is not the owner; otherwise `pending_recipient`, with the
    /// approval fields stamped immediately for owner-issued invites into
    /// private channels.
    pub async fn create(
        &self,
        channel_id: i64,
        inviter: &str,
        invitee: &str,
    ) -> Result<InviteOutcome, DbError> {
        if inviter.eq_ignore_ascii_case(invitee) {
            return Err(DbError::SelfInvite);
        }

        let now = chrono::Utc::now().timestamp();

        let mut tx = self.pool.begin().await?;

        let channel = sqlx::query_as::<_, (bool, Option<String>)>(
            "SELECT is_private, owner_name FROM channels WHERE id = ?",
        )
        .bind(channel_id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some((is_private, owner_name)) = channel else {
            return Err(DbError::ChannelNotFound);
        };

        let inviter_is_owner = owner_name
            .as_deref()
            .is_some_and(|o| o.eq_ignore_ascii_case(inviter));

        if !inviter_is_owner {
            let member = sqlx::query_as::<_, (i64,)>(
                r#"
                SELECT 1 FROM channel_members
                WHERE channel_id = ? AND username = ? COLLATE NOCASE
                "#,
            )
            .bind(channel_id)
            .bind(inviter)
            .fetch_optional(&mut *tx)
            .await?;
            if member.is_none() {
                return Err(DbError::NotMember);
            }
        }

        let invitee_member = sqlx::query_as::<_, (i64,)>(
            r#"
            SELECT 1 FROM channel_members
            WHERE channel_id = ? AND username = ? COLLATE NOCASE
            "#,
        )
        .bind(channel_id)
        .bind(invitee)
        .fetch_optional(&mut *tx)
        .await?;
        if invitee_member.is_some() {
            return Ok(InviteOutcome::AlreadyMember);
        }

        let active = sqlx::query_as::<_, (String,)>(
            r#"
            SELECT status FROM channel_invites
            WHERE channel_id = ? AND invitee_username = ? COLLATE NOCASE
              AND status IN ('pending_owner', 'pending_recipient')
            "#,
        )
        .bind(channel_id)
        .bind(invitee)
        .fetch_optional(&mut *tx)
        .await?;
        if let Some((status,)) = active {
            let msg = match parse_status(&status)? {
                InviteStatus::PendingOwner => {
                    "an invite for this user is already awaiting owner approval"
                }
                _ => "an invite for this user is already awaiting their response",
            };
            return Err(DbError::InviteActive(msg.to_string()));
        }

        let requires_owner_approval = is_private && !inviter_is_owner;
        let status = if requires_owner_approval {
            InviteStatus::PendingOwner
        } else {
            InviteStatus::PendingRecipient
        };
        // Owner-issued invites into private channels carry an implicit,
        // immediately stamped approval.
        let (approved_by, approved_at) = if is_private && inviter_is_owner {
            (Some(inviter.to_string()), Some(now))
        } else {
            (None, None)
        };

        let invite_token = Uuid::new_v4().to_string();

        let result = sqlx::query(
            r#"
            INSERT INTO channel_invites
                (channel_id, invited_by, invitee_username, invite_token,
                 requires_owner_approval, status, created_at, approved_by, approved_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(channel_id)
        .bind(inviter)
        .bind(invitee)
        .bind(&invite_token)
        .bind(requires_owner_approval)
        .bind(status.as_str())
        .bind(now)
        .bind(&approved_by)
        .bind(approved_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            // A racing invite hit the active-pair partial unique index first
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.is_unique_violation()
            {
                return DbError::InviteActive(
                    "an active invite for this user already exists".to_string(),
                );
            }
            DbError::from(e)
        })?;

        let invite_id = result.last_insert_rowid();

        tx.commit().await?;

        Ok(InviteOutcome::Created(Invite {
            id: invite_id,
            channel_id,
            invited_by: inviter.to_string(),
            invitee_username: invitee.to_string(),
            invite_token,
            requires_owner_approval,
            status,
            created_at: now,
            approved_by,
            approved_at,
            responded_at: None,
        }))
    }

    /// Owner review of a `pending_owner` invite.
    ///
    /// Only the channel's recorded owner (exact match) may review. Approval
    /// moves the invite to `pending_recipient` and stamps the approval
    /// fields; decline is terminal.
    pub async fn review(
        &self,
        invite_id: i64,
        reviewer: &str,
        approve: bool,
    ) -> Result<(), DbError> {
        let now = chrono::Utc::now().timestamp();

        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, (String, Option<String>)>(
            r#"
            SELECT i.status, c.owner_name
            FROM channel_invites i
            JOIN channels c ON c.id = i.channel_id
            WHERE i.id = ?
            "#,
        )
        .bind(invite_id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some((status, owner_name)) = row else {
            return Err(DbError::InviteNotFound);
        };

        if owner_name.as_deref() != Some(reviewer) {
            return Err(DbError::NotOwner);
        }

        let status = parse_status(&status)?;
        if status != InviteStatus::PendingOwner {
            return Err(DbError::InviteState(state_message(status)));
        }

        let result = if approve {
            sqlx::query(
                r#"
                UPDATE channel_invites
                SET status = 'pending_recipient', approved_by = ?, approved_at = ?
                WHERE id = ? AND status = 'pending_owner'
                "#,
            )
            .bind(reviewer)
            .bind(now)
            .bind(invite_id)
            .execute(&mut *tx)
            .await?
        } else {
            sqlx::query(
                r#"
                UPDATE channel_invites
                SET status = 'declined', responded_at = ?
                WHERE id = ? AND status = 'pending_owner'
                "#,
            )
            .bind(now)
            .bind(invite_id)
            .execute(&mut *tx)
            .await?
        };

        if result.rows_affected() == 0 {
            let state = self.current_state(&mut tx, invite_id).await?;
            return Err(DbError::InviteState(state));
        }

        tx.commit().await?;
        Ok(())
    }

    /// Invitee response to a `pending_recipient` invite.
    ///
    /// Acceptance writes the membership (insert-if-absent, `member` role,
    /// using the invite's stored invitee spelling), clears any opt-out for
    /// the pair, and marks the invite accepted, all in one transaction.
    pub async fn respond(
        &self,
        invite_id: i64,
        responder: &str,
        accept: bool,
    ) -> Result<(), DbError> {
        let now = chrono::Utc::now().timestamp();

        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, (i64, String, String, bool, String, Option<i64>)>(
            r#"
            SELECT channel_id, invited_by, invitee_username,
                   requires_owner_approval, status, approved_at
            FROM channel_invites
            WHERE id = ?
            "#,
        )
        .bind(invite_id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some((channel_id, invited_by, invitee_username, requires_owner_approval, status, approved_at)) =
            row
        else {
            return Err(DbError::InviteNotFound);
        };

        let status = parse_status(&status)?;
        if status != InviteStatus::PendingRecipient {
            return Err(DbError::InviteState(state_message(status)));
        }

        if !responder.eq_ignore_ascii_case(&invitee_username) {
            return Err(DbError::NotRecipient);
        }

        // Unreachable through the state machine, but cheap to verify from
        // the row itself.
        if requires_owner_approval && approved_at.is_none() {
            return Err(DbError::InviteNotApproved);
        }

        if accept {
            sqlx::query(
                r#"
                INSERT OR IGNORE INTO channel_members
                    (channel_id, username, role, invited_by, joined_at)
                VALUES (?, ?, 'member', ?, ?)
                "#,
            )
            .bind(channel_id)
            .bind(&invitee_username)
            .bind(&invited_by)
            .bind(now)
            .execute(&mut *tx)
            .await?;

            sqlx::query(
                r#"
                DELETE FROM channel_opt_outs
                WHERE channel_id = ? AND username = ? COLLATE NOCASE
                "#,
            )
            .bind(channel_id)
            .bind(&invitee_username)
            .execute(&mut *tx)
            .await?;
        }

        let new_status = if accept { "accepted" } else { "declined" };
        let result = sqlx::query(
            r#"
            UPDATE channel_invites
            SET status = ?, responded_at = ?
            WHERE id = ? AND status = 'pending_recipient'
            "#,
        )
        .bind(new_status)
        .bind(now)
        .bind(invite_id)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            let state = self.current_state(&mut tx, invite_id).await?;
            return Err(DbError::InviteState(state));
        }

        tx.commit().await?;
        Ok(())
    }

    /// Pending invites addressed to `username` (case-insensitive), newest
    /// first.
    pub async fn pending_for_invitee(&self, username: &str) -> Result<Vec<PendingInvite>, DbError> {
        let rows = sqlx::query_as::<_, (i64, i64, String, bool, String, String, bool, i64)>(
            r#"
            SELECT i.id, i.channel_id, c.name, c.is_private, i.invited_by,
                   i.invitee_username, i.requires_owner_approval, i.created_at
            FROM channel_invites i
            JOIN channels c ON c.id = i.channel_id
            WHERE i.status = 'pending_recipient'
              AND i.invitee_username = ? COLLATE NOCASE
            ORDER BY i.created_at DESC, i.id DESC
            "#,
        )
        .bind(username)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(pending_from_row).collect())
    }

    /// Invites awaiting review in channels owned by `username` (exact
    /// match), newest first.
    pub async fn pending_approvals_for_owner(
        &self,
        username: &str,
    ) -> Result<Vec<PendingInvite>, DbError> {
        let rows = sqlx::query_as::<_, (i64, i64, String, bool, String, String, bool, i64)>(
            r#"
            SELECT i.id, i.channel_id, c.name, c.is_private, i.invited_by,
                   i.invitee_username, i.requires_owner_approval, i.created_at
            FROM channel_invites i
            JOIN channels c ON c.id = i.channel_id
            WHERE i.status = 'pending_owner'
              AND c.owner_name = ?
            ORDER BY i.created_at DESC, i.id DESC
            "#,
        )
        .bind(username)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(pending_from_row).collect())
    }

    /// Find invite by id.
    pub async fn find_by_id(&self, invite_id: i64) -> Result<Option<Invite>, DbError> {
        let row = sqlx::query_as::<_, (i64, i64, String, String, String, bool, String, i64, Option<String>, Option<i64>, Option<i64>)>(
            r#"
            SELECT id, channel_id, invited_by, invitee_username, invite_token,
                   requires_owner_approval, status, created_at,
                   approved_by, approved_at, responded_at
            FROM channel_invites
            WHERE id = ?
            "#,
        )
        .bind(invite_id)
        .fetch_optional(self.pool)
        .await?;

        let Some((
            id,
            channel_id,
            invited_by,
            invitee_username,
            invite_token,
            requires_owner_approval,
            status,
            created_at,
            approved_by,
            approved_at,
            responded_at,
        )) = row
        else {
            return Ok(None);
        };

        Ok(Some(Invite {
            id,
            channel_id,
            invited_by,
            invitee_username,
            invite_token,
            requires_owner_approval,
            status: parse_status(&status)?,
            created_at,
            approved_by,
            approved_at,
            responded_at,
        }))
    }

    /// Re-read an invite's state on the guarded-update cold path.
    async fn current_state(
        &self,
        tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
        invite_id: i64,
    ) -> Result<String, DbError> {
        let row = sqlx::query_as::<_, (String,)>(
            "SELECT status FROM channel_invites WHERE id = ?",
        )
        .bind(invite_id)
        .fetch_optional(&mut **tx)
        .await?;

        match row {
            Some((status,)) => Ok(state_message(parse_status(&status)?)),
            None => Ok("no longer present".to_string()),
        }
    }
}

fn pending_from_row(
    row: (i64, i64, String, bool, String, String, bool, i64),
) -> PendingInvite {
    let (id, channel_id, channel_name, is_private, invited_by, invitee_username, requires_owner_approval, created_at) =
        row;
    PendingInvite {
        id,
        channel_id,
        channel_name,
        is_private,
        invited_by,
        invitee_username,
        requires_owner_approval,
        created_at,
    }
}

fn parse_status(s: &str) -> Result<InviteStatus, DbError> {
    InviteStatus::parse(s)
        .ok_or_else(|| DbError::Sqlx(sqlx::Error::Decode(format!("unknown invite status: {s}").into())))
}

/// Human description of why a transition is rejected from `status`.
/// Rendered as "invite is {message}".
fn state_message(status: InviteStatus) -> String {
    match status {
        InviteStatus::PendingOwner => "still awaiting owner approval".to_string(),
        InviteStatus::PendingRecipient => "already approved and awaiting the invitee".to_string(),
        InviteStatus::Accepted => "already accepted".to_string(),
        InviteStatus::Declined => "already declined".to_string(),
    }
}
