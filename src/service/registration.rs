//! The voter account lifecycle.
//!
//! Only [`approve`], [`reject`] and [`resubmit`] ever change an account's
//! validation status, and each does so with a conditional update so that two
//! concurrent admin decisions cannot produce an illegal transition.

use chrono::Utc;

use crate::error::{Error, Result};
use crate::model::{
    common::account::{StatusKind, ValidationStatus},
    db::account::{
        hash_password, normalise_email, verify_dummy_password, Account, NewAccount, Profile,
    },
    mongodb::Id,
};
use crate::store::AccountRepo;

/// Create a pending voter account.
pub async fn register<R>(repo: &R, mut profile: Profile, password: &str) -> Result<Account>
where
    R: AccountRepo + ?Sized,
{
    profile.email = normalise_email(&profile.email);
    let account = repo.insert_account(NewAccount::voter(profile, password)?).await?;
    info!("Registered account {}", account.id);
    Ok(account)
}

/// Check a login attempt. Only approved accounts get through.
///
/// Unknown emails and wrong passwords are indistinguishable. The account's
/// status is only revealed once the password has been checked.
pub async fn authenticate<R>(repo: &R, email: &str, password: &str) -> Result<Account>
where
    R: AccountRepo + ?Sized,
{
    let account = match repo.account_by_email(&normalise_email(email)).await? {
        Some(account) => account,
        None => {
            verify_dummy_password(password)?;
            return Err(Error::InvalidCredentials);
        }
    };
    if !account.verify_password(password)? {
        debug!("Wrong password for account {}", account.id);
        return Err(Error::InvalidCredentials);
    }
    if !account.validation.is_approved() {
        return Err(Error::NotApproved {
            status: account.validation.kind(),
            reason: account.validation.reason().map(str::to_string),
        });
    }
    Ok(account)
}

/// Approve an account awaiting review. Approving an approved account is a no-op.
pub async fn approve<R>(repo: &R, id: Id) -> Result<Account>
where
    R: AccountRepo + ?Sized,
{
    let moved = repo
        .transition(id, &StatusKind::AWAITING_REVIEW, ValidationStatus::Approved)
        .await?;
    let account = account_by_id(repo, id).await?;
    if moved {
        info!("Approved account {id}");
    } else if !account.validation.is_approved() {
        return Err(Error::InvalidTransition {
            from: account.validation.kind(),
            to: StatusKind::Approved,
        });
    }
    Ok(account)
}

/// Reject an account awaiting review, with a reason the holder will see.
pub async fn reject<R>(repo: &R, id: Id, reason: &str) -> Result<Account>
where
    R: AccountRepo + ?Sized,
{
    let reason = reason.trim();
    if reason.is_empty() {
        return Err(Error::Validation("A rejection reason is required".to_string()));
    }
    let rejected = ValidationStatus::Rejected {
        reason: reason.to_string(),
    };
    let moved = repo
        .transition(id, &StatusKind::AWAITING_REVIEW, rejected)
        .await?;
    let account = account_by_id(repo, id).await?;
    if !moved {
        return Err(Error::InvalidTransition {
            from: account.validation.kind(),
            to: StatusKind::Rejected,
        });
    }
    info!("Rejected account {id}");
    Ok(account)
}

/// Replace the profile of a rejected account and send it back for review.
///
/// The holder proves ownership with their current password, and may choose a
/// new one at the same time.
pub async fn resubmit<R>(
    repo: &R,
    email: &str,
    password: &str,
    mut profile: Profile,
    new_password: Option<&str>,
) -> Result<Account>
where
    R: AccountRepo + ?Sized,
{
    let account = repo
        .account_by_email(&normalise_email(email))
        .await?
        .ok_or_else(|| Error::not_found(format!("Account {email}")))?;
    if !account.verify_password(password)? {
        return Err(Error::InvalidCredentials);
    }
    let invalid = |from| Error::InvalidTransition {
        from,
        to: StatusKind::Resubmitted,
    };
    if account.validation.kind() != StatusKind::Rejected {
        return Err(invalid(account.validation.kind()));
    }

    profile.email = normalise_email(&profile.email);
    let password_hash = new_password.map(hash_password).transpose()?;
    if !repo
        .resubmit_account(account.id, profile, password_hash)
        .await?
    {
        // An admin acted on the account in the meantime.
        let current = account_by_id(repo, account.id).await?;
        return Err(invalid(current.validation.kind()));
    }
    info!("Account {} resubmitted for review", account.id);
    account_by_id(repo, account.id).await
}

/// Edit the holder's own profile. Never changes the validation status.
pub async fn update_profile<R>(repo: &R, id: Id, mut profile: Profile) -> Result<Account>
where
    R: AccountRepo + ?Sized,
{
    profile.email = normalise_email(&profile.email);
    repo.update_profile(id, profile)
        .await?
        .ok_or_else(|| Error::not_found(format!("Account {id}")))
}

/// Delete an account along with every vote it cast.
pub async fn delete_account<R>(repo: &R, id: Id) -> Result<()>
where
    R: AccountRepo + ?Sized,
{
    if !repo.delete_account(id).await? {
        return Err(Error::not_found(format!("Account {id}")));
    }
    info!("Deleted account {id} and its votes");
    Ok(())
}

/// Create the configured admin account unless some admin already exists.
///
/// This operation is idempotent.
pub async fn ensure_admin_exists<R>(repo: &R, email: &str, password: &str) -> Result<()>
where
    R: AccountRepo + ?Sized,
{
    if repo.admin_exists().await? {
        return Ok(());
    }
    let profile = Profile {
        name: "Administrator".to_string(),
        email: normalise_email(email),
        city: String::new(),
        state: String::new(),
        dob: Utc::now().date_naive(),
        photo_url: None,
    };
    let admin = repo.insert_account(NewAccount::admin(profile, password)?).await?;
    warn!("No admin account found, created default admin {}", admin.profile.email);
    Ok(())
}

async fn account_by_id<R>(repo: &R, id: Id) -> Result<Account>
where
    R: AccountRepo + ?Sized,
{
    repo.account_by_id(id)
        .await?
        .ok_or_else(|| Error::not_found(format!("Account {id}")))
}
