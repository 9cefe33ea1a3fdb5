//! Member directory access.
//!
//! The salary engine does not decide who is a member; it only reads the directory to
//! find the salaried roster and to label report rows.

use crate::{
    config::settings::MemberSeed,
    entities::{Member, member},
    errors::{Error, Result},
};
use sea_orm::{QueryOrder, Set, prelude::*};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use tracing::info;

/// Organisation roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    /// Organisation leader
    Leader,
    /// Deputy leader
    ViceLeader,
    /// Regular formal member
    Member,
    /// Member on probation
    Intern,
    /// Not yet admitted
    Applicant,
}

impl Role {
    /// Roles that receive a salary record when a period is created.
    pub const SALARIED: [Self; 3] = [Self::Leader, Self::ViceLeader, Self::Intern];

    /// Stored string form.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Leader => "LEADER",
            Self::ViceLeader => "VICE_LEADER",
            Self::Member => "MEMBER",
            Self::Intern => "INTERN",
            Self::Applicant => "APPLICANT",
        }
    }

    /// Roster display order: leader first, interns last.
    #[must_use]
    pub const fn roster_order(self) -> u8 {
        match self {
            Self::Leader => 0,
            Self::ViceLeader => 1,
            Self::Member => 2,
            Self::Intern => 3,
            Self::Applicant => 4,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "LEADER" => Ok(Self::Leader),
            "VICE_LEADER" => Ok(Self::ViceLeader),
            "MEMBER" => Ok(Self::Member),
            "INTERN" => Ok(Self::Intern),
            "APPLICANT" => Ok(Self::Applicant),
            other => Err(Error::validation(format!("Unknown role '{other}'"))),
        }
    }
}

/// Parses a stored role, treating anything unrecognised as last in roster order.
#[must_use]
pub fn roster_order_of(role: &str) -> u8 {
    role.parse::<Role>().map_or(u8::MAX, Role::roster_order)
}

/// Members eligible for a salary record (leader, vice-leader, intern), by id.
///
/// This is the roster a new period is opened for. Regular members and applicants are
/// tracked in the directory but never paid from the pool.
pub async fn find_formal_members<C>(db: &C) -> Result<Vec<member::Model>>
where
    C: ConnectionTrait,
{
    let roles: Vec<&str> = Role::SALARIED.iter().map(|r| r.as_str()).collect();
    Member::find()
        .filter(member::Column::Role.is_in(roles))
        .order_by_asc(member::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Members holding any of `roles`, by id.
pub async fn find_members_by_roles<C>(db: &C, roles: &[Role]) -> Result<Vec<member::Model>>
where
    C: ConnectionTrait,
{
    let roles: Vec<&str> = roles.iter().map(|r| r.as_str()).collect();
    Member::find()
        .filter(member::Column::Role.is_in(roles))
        .order_by_asc(member::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Looks up one member.
pub async fn find_by_id<C>(db: &C, member_id: i64) -> Result<Option<member::Model>>
where
    C: ConnectionTrait,
{
    Member::find_by_id(member_id)
        .one(db)
        .await
        .map_err(Into::into)
}

/// Loads every member keyed by id.
///
/// Reports and the roster view label records from this map in one query instead of a
/// lookup per record. Records whose member was removed simply have no entry.
pub async fn members_by_id<C>(db: &C) -> Result<HashMap<i64, member::Model>>
where
    C: ConnectionTrait,
{
    Ok(Member::find()
        .all(db)
        .await?
        .into_iter()
        .map(|m| (m.id, m))
        .collect())
}

/// Adds a member to the directory.
///
/// Only used for seeding and tests; role changes belong to the directory itself.
///
/// # Errors
/// Returns a validation error if `username` is blank.
pub async fn create_member<C>(db: &C, username: &str, role: Role) -> Result<member::Model>
where
    C: ConnectionTrait,
{
    if username.trim().is_empty() {
        return Err(Error::validation("Member name cannot be empty"));
    }

    let member = member::ActiveModel {
        username: Set(username.trim().to_string()),
        role: Set(role.as_str().to_string()),
        created_at: Set(chrono::Utc::now()),
        ..Default::default()
    };

    Ok(member.insert(db).await?)
}

/// Inserts `seeds` when the directory is empty. Returns how many were inserted.
pub async fn seed_members_if_empty(db: &DatabaseConnection, seeds: &[MemberSeed]) -> Result<usize> {
    if Member::find().count(db).await? > 0 {
        return Ok(0);
    }

    for seed in seeds {
        let role: Role = seed.role.parse()?;
        create_member(db, &seed.username, role).await?;
    }

    info!("Seeded {} members into an empty directory", seeds.len());
    Ok(seeds.len())
}
