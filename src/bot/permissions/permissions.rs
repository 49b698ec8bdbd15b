use core::fmt;
use std::{collections::HashSet, fmt::Display};

use crate::bot::{chat_event::chat_event::ChatUser, db::UserId};

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug)]
pub enum PermissionLevel {
    Admin,
    Everyone,
}

impl Display for PermissionLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PermissionLevel::Admin => "admin",
            PermissionLevel::Everyone => "everyone",
        };
        write!(f, "{}", s)
    }
}

pub fn is_admin(admins: &HashSet<UserId>, user_id: UserId) -> bool {
    admins.contains(&user_id)
}

pub fn permission_of(user: &ChatUser, admins: &HashSet<UserId>) -> PermissionLevel {
    if is_admin(admins, user.id) {
        PermissionLevel::Admin
    } else {
        PermissionLevel::Everyone
    }
}

/// Lower level is more privileged.
pub fn has_permission(user: &ChatUser, required: PermissionLevel, admins: &HashSet<UserId>) -> bool {
    permission_of(user, admins) <= required
}
