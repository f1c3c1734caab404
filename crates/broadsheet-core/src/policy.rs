//! Access control.
//!
//! Every permission check goes through one table keyed by
//! `(Entity, Operation)`. Each entry names who is allowed and what a refused
//! caller gets back: a redirect to a safe listing or a plain forbidden
//! message. Operations without an entry are refused.

use serde::Serialize;

use crate::users::{Permission, User, UserId};

/// Kind of record being acted on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Entity {
    /// Mailing recipient.
    Recipient,
    /// Message template.
    Message,
    /// Newsletter aggregate.
    Newsletter,
    /// Send attempt.
    Attempt,
    /// Per-user statistics.
    Statistics,
    /// User account administration.
    User,
}

/// Action requested on an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    /// Browse a listing.
    List,
    /// Show one record.
    View,
    /// Create a record.
    Create,
    /// Change a record.
    Update,
    /// Remove a record.
    Delete,
    /// Run the send workflow.
    Send,
    /// Block or unblock.
    Block,
    /// Bulk delete.
    Clear,
}

/// Outcome for a refused caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Denial {
    /// Send the caller back to a listing.
    Redirect(&'static str),
    /// Refuse with a message.
    Forbidden(&'static str),
}

impl Denial {
    /// Text shown to the caller.
    #[must_use]
    pub const fn message(&self) -> &'static str {
        match self {
            Self::Redirect(_) => "Redirected",
            Self::Forbidden(message) => *message,
        }
    }
}

/// Who passes a check.
#[derive(Debug, Clone, Copy)]
struct Rule {
    /// Any authenticated user.
    anyone: bool,
    /// The record's owner.
    owner: bool,
    /// Staff members.
    staff: bool,
    /// Holders of this permission.
    permission: Option<Permission>,
}

impl Rule {
    const ANYONE: Self = Self {
        anyone: true,
        owner: false,
        staff: false,
        permission: None,
    };
    const OWNER: Self = Self {
        anyone: false,
        owner: true,
        staff: false,
        permission: None,
    };

    const fn or_staff(mut self) -> Self {
        self.staff = true;
        self
    }

    const fn or_permission(mut self, permission: Permission) -> Self {
        self.permission = Some(permission);
        self
    }

    const fn only(permission: Permission) -> Self {
        Self {
            anyone: false,
            owner: false,
            staff: false,
            permission: Some(permission),
        }
    }

    const NOBODY: Self = Self {
        anyone: false,
        owner: false,
        staff: false,
        permission: None,
    };

    const fn staff_only() -> Self {
        Self {
            anyone: false,
            owner: false,
            staff: true,
            permission: None,
        }
    }

    fn allows(&self, user: &User, owner: Option<UserId>) -> bool {
        self.anyone
            || (self.owner && owner == Some(user.id))
            || (self.staff && user.is_staff)
            || self.permission.is_some_and(|p| user.has_permission(p))
    }
}

const RECIPIENTS: Denial = Denial::Redirect("/recipients");
const MESSAGES: Denial = Denial::Redirect("/messages");
const VIEW_NEWSLETTER: Denial =
    Denial::Forbidden("You do not have permission to view newsletters.");
const CHANGE_NEWSLETTER: Denial =
    Denial::Forbidden("You do not have permission to change this newsletter.");
const BLOCK_NEWSLETTER: Denial =
    Denial::Forbidden("You do not have permission to block newsletters.");
const CLEAR_ATTEMPTS: Denial = Denial::Forbidden("You do not have permission to clear attempts.");
const MANAGE_USERS: Denial = Denial::Forbidden("You do not have permission to manage users.");
const DEFAULT_DENIAL: Denial =
    Denial::Forbidden("You do not have permission to perform this action.");

type Entry = (Entity, Operation, Rule, Denial);

const TABLE: &[Entry] = &[
    (Entity::Recipient, Operation::List, Rule::ANYONE, RECIPIENTS),
    (Entity::Recipient, Operation::Create, Rule::ANYONE, RECIPIENTS),
    (
        Entity::Recipient,
        Operation::View,
        Rule::OWNER.or_permission(Permission::ViewAllRecipients),
        RECIPIENTS,
    ),
    (Entity::Recipient, Operation::Update, Rule::OWNER, RECIPIENTS),
    (
        Entity::Recipient,
        Operation::Delete,
        Rule::OWNER.or_permission(Permission::DeleteRecipient),
        RECIPIENTS,
    ),
    (Entity::Message, Operation::List, Rule::ANYONE, MESSAGES),
    (Entity::Message, Operation::Create, Rule::ANYONE, MESSAGES),
    (
        Entity::Message,
        Operation::View,
        Rule::OWNER.or_permission(Permission::ViewAllMessages),
        MESSAGES,
    ),
    (Entity::Message, Operation::Update, Rule::OWNER, MESSAGES),
    (
        Entity::Message,
        Operation::Delete,
        Rule::OWNER.or_permission(Permission::DeleteMessage),
        MESSAGES,
    ),
    (Entity::Newsletter, Operation::List, Rule::ANYONE, VIEW_NEWSLETTER),
    (Entity::Newsletter, Operation::Create, Rule::ANYONE, CHANGE_NEWSLETTER),
    (
        Entity::Newsletter,
        Operation::View,
        Rule::OWNER
            .or_staff()
            .or_permission(Permission::ViewAllNewsletters),
        VIEW_NEWSLETTER,
    ),
    (
        Entity::Newsletter,
        Operation::Update,
        Rule::OWNER.or_staff(),
        CHANGE_NEWSLETTER,
    ),
    (
        Entity::Newsletter,
        Operation::Delete,
        Rule::OWNER.or_staff(),
        CHANGE_NEWSLETTER,
    ),
    (
        Entity::Newsletter,
        Operation::Send,
        Rule::OWNER.or_staff(),
        CHANGE_NEWSLETTER,
    ),
    (
        Entity::Newsletter,
        Operation::Block,
        Rule::only(Permission::DisableNewsletters),
        BLOCK_NEWSLETTER,
    ),
    (Entity::Attempt, Operation::List, Rule::ANYONE, DEFAULT_DENIAL),
    (Entity::Attempt, Operation::Clear, Rule::staff_only(), CLEAR_ATTEMPTS),
    (Entity::Statistics, Operation::View, Rule::ANYONE, DEFAULT_DENIAL),
    (Entity::User, Operation::View, Rule::OWNER, MANAGE_USERS),
    (Entity::User, Operation::Update, Rule::NOBODY, MANAGE_USERS),
    (Entity::User, Operation::Delete, Rule::NOBODY, MANAGE_USERS),
];

/// Check whether `user` may perform `operation` on a record of `entity`
/// owned by `owner`.
///
/// Superusers pass every check.
///
/// # Errors
///
/// Returns the [`Denial`] the caller should receive.
pub fn authorize(
    user: &User,
    operation: Operation,
    entity: Entity,
    owner: Option<UserId>,
) -> Result<(), Denial> {
    if user.is_superuser {
        return Ok(());
    }

    let Some((_, _, rule, denial)) = TABLE
        .iter()
        .find(|(e, op, _, _)| *e == entity && *op == operation)
    else {
        return Err(DEFAULT_DENIAL);
    };

    if rule.allows(user, owner) {
        Ok(())
    } else {
        Err(*denial)
    }
}

/// Whether listings of `entity` show every record to `user` rather than only
/// the records they own.
#[must_use]
pub fn sees_all(user: &User, entity: Entity) -> bool {
    match entity {
        Entity::Recipient => user.has_permission(Permission::ViewAllRecipients),
        Entity::Message => user.has_permission(Permission::ViewAllMessages),
        Entity::Newsletter => {
            user.is_staff || user.has_permission(Permission::ViewAllNewsletters)
        }
        Entity::Attempt => user.is_staff || user.has_permission(Permission::ViewAllAttempts),
        Entity::Statistics | Entity::User => false,
    }
}
