use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{Team, TeamMember};
use crate::store::{self, Store};

pub const DEFAULT_ROLE: &str = "member";

#[derive(Debug, Clone, Deserialize)]
pub struct NewTeam {
    pub owner_id: String,
    pub name: String,
}

pub fn create_team(store: &Store, data: NewTeam) -> AppResult<Team> {
    let now = Utc::now().format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string();
    let team = Team {
        id: Uuid::new_v4().to_string(),
        owner_id: data.owner_id,
        name: data.name,
        members: Vec::new(),
        created_at: now.clone(),
        updated_at: now,
    };

    let mut teams: Vec<Team> = store.load(store::TEAMS)?;
    teams.push(team.clone());
    store.save(store::TEAMS, &teams)?;

    Ok(team)
}

/// Add a user to a team. A user id appears at most once in the member
/// list; a second add fails and leaves the list untouched.
pub fn add_team_member(
    store: &Store,
    team_id: &str,
    user_id: &str,
    role: &str,
) -> AppResult<Team> {
    let mut teams: Vec<Team> = store.load(store::TEAMS)?;
    let idx = teams
        .iter()
        .position(|t| t.id == team_id)
        .ok_or_else(|| AppError::NotFound("Team not found".to_string()))?;

    if teams[idx].members.iter().any(|m| m.user_id == user_id) {
        return Err(AppError::AlreadyMember(user_id.to_string()));
    }

    let now = Utc::now().format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string();
    teams[idx].members.push(TeamMember {
        user_id: user_id.to_string(),
        role: role.to_string(),
        joined_at: now.clone(),
    });
    teams[idx].updated_at = now;

    let team = teams[idx].clone();
    store.save(store::TEAMS, &teams)?;

    Ok(team)
}

/// Teams the user owns or belongs to.
pub fn get_user_teams(store: &Store, user_id: &str) -> AppResult<Vec<Team>> {
    let teams: Vec<Team> = store.load(store::TEAMS)?;
    Ok(teams
        .into_iter()
        .filter(|t| t.owner_id == user_id || t.members.iter().any(|m| m.user_id == user_id))
        .collect())
}
