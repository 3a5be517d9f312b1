use std::ops::{Deref, DerefMut};

use argon2::Config as Argon2Config;
use chrono::{Datelike, NaiveDate, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::model::{
    common::account::{Role, ValidationStatus},
    mongodb::Id,
};

/// The part of an account the holder fills in themselves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub name: String,
    /// Unique, normalised to lowercase.
    pub email: String,
    pub city: String,
    pub state: String,
    pub dob: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,
}

impl Profile {
    /// Age in whole years on the given date.
    pub fn age_on(&self, today: NaiveDate) -> u32 {
        let mut age = today.year() - self.dob.year();
        if (today.month(), today.day()) < (self.dob.month(), self.dob.day()) {
            age -= 1;
        }
        age.max(0) as u32
    }

    pub fn age(&self) -> u32 {
        self.age_on(Utc::now().date_naive())
    }
}

/// Normalise an email address so lookups are case-insensitive.
pub fn normalise_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Hash a plaintext password with a fresh random salt.
pub fn hash_password(password: &str) -> Result<String> {
    // 16 bytes is recommended for password hashing:
    //  https://en.wikipedia.org/wiki/Argon2
    let mut salt = [0_u8; 16];
    rand::thread_rng().fill(&mut salt);
    Ok(argon2::hash_encoded(
        password.as_bytes(),
        &salt,
        &Argon2Config::default(),
    )?)
}

lazy_static::lazy_static! {
    /// A hash that matches no account's password, for checks that must cost as
    /// much as a real one.
    static ref DUMMY_HASH: String = hash_password("no account has this password")
        .expect("Hashing with the default config is infallible");
}

/// Run a password check that always fails, taking as long as a real one.
/// Login attempts for unknown emails call this, so their timing matches a
/// wrong password.
pub fn verify_dummy_password(password: &str) -> Result<()> {
    argon2::verify_encoded(&DUMMY_HASH, password.as_bytes())?;
    Ok(())
}

/// Core account data, as stored in the database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountCore {
    #[serde(flatten)]
    pub profile: Profile,
    pub password_hash: String,
    pub role: Role,
    pub validation: ValidationStatus,
}

impl AccountCore {
    /// A freshly registered voter, awaiting validation.
    pub fn voter(profile: Profile, password: &str) -> Result<Self> {
        Ok(Self {
            profile,
            password_hash: hash_password(password)?,
            role: Role::Voter,
            validation: ValidationStatus::Pending,
        })
    }

    /// An administrator. Admins never go through validation.
    pub fn admin(profile: Profile, password: &str) -> Result<Self> {
        Ok(Self {
            profile,
            password_hash: hash_password(password)?,
            role: Role::Admin,
            validation: ValidationStatus::Approved,
        })
    }

    /// Check whether the given password is correct.
    pub fn verify_password<T: AsRef<[u8]>>(&self, password: T) -> Result<bool> {
        Ok(argon2::verify_encoded(
            &self.password_hash,
            password.as_ref(),
        )?)
    }
}

/// An account without an ID.
pub type NewAccount = AccountCore;

/// An account from the database, with its unique ID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub account: AccountCore,
}

impl Deref for Account {
    type Target = AccountCore;

    fn deref(&self) -> &Self::Target {
        &self.account
    }
}

impl DerefMut for Account {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.account
    }
}

/// Example data for tests.
#[cfg(test)]
pub mod examples {
    use super::*;

    pub const VOTER_PASSWORD: &str = "correct horse battery";
    pub const ADMIN_PASSWORD: &str = "returning officer";

    impl Profile {
        pub fn example() -> Self {
            Self {
                name: "Asha Verma".to_string(),
                email: "asha@example.com".to_string(),
                city: "Pune".to_string(),
                state: "Maharashtra".to_string(),
                dob: NaiveDate::from_ymd_opt(1990, 4, 12).unwrap(),
                photo_url: Some("/uploads/photos/asha.jpg".to_string()),
            }
        }

        pub fn example2() -> Self {
            Self {
                name: "Ravi Iyer".to_string(),
                email: "ravi@example.com".to_string(),
                city: "Chennai".to_string(),
                state: "Tamil Nadu".to_string(),
                dob: NaiveDate::from_ymd_opt(1985, 11, 30).unwrap(),
                photo_url: None,
            }
        }

        pub fn admin_example() -> Self {
            Self {
                name: "Returning Officer".to_string(),
                email: "officer@example.com".to_string(),
                city: "Delhi".to_string(),
                state: "Delhi".to_string(),
                dob: NaiveDate::from_ymd_opt(1970, 1, 1).unwrap(),
                photo_url: None,
            }
        }
    }

    impl AccountCore {
        pub fn pending_example() -> Self {
            Self::voter(Profile::example(), VOTER_PASSWORD).unwrap()
        }

        pub fn approved_example() -> Self {
            let mut account = Self::voter(Profile::example(), VOTER_PASSWORD).unwrap();
            account.validation = ValidationStatus::Approved;
            account
        }

        pub fn admin_example() -> Self {
            Self::admin(Profile::admin_example(), ADMIN_PASSWORD).unwrap()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::examples::VOTER_PASSWORD;
    use super::*;

    #[test]
    fn password_hash_is_salted_and_verifiable() {
        let first = hash_password("hunter2hunter2").unwrap();
        let second = hash_password("hunter2hunter2").unwrap();
        assert_ne!(first, second);
        assert!(!first.contains("hunter2"));

        let account = AccountCore {
            password_hash: first,
            ..AccountCore::pending_example()
        };
        assert!(account.verify_password("hunter2hunter2").unwrap());
        assert!(!account.verify_password("hunter3hunter3").unwrap());
    }

    #[test]
    fn new_voters_are_pending_and_admins_approved() {
        let voter = AccountCore::pending_example();
        assert_eq!(voter.role, Role::Voter);
        assert_eq!(voter.validation, ValidationStatus::Pending);

        let admin = AccountCore::admin_example();
        assert_eq!(admin.role, Role::Admin);
        assert!(admin.validation.is_approved());
    }

    #[test]
    fn age_counts_completed_years() {
        let profile = Profile::example(); // Born 1990-04-12.
        let day_before = NaiveDate::from_ymd_opt(2020, 4, 11).unwrap();
        let birthday = NaiveDate::from_ymd_opt(2020, 4, 12).unwrap();
        assert_eq!(profile.age_on(day_before), 29);
        assert_eq!(profile.age_on(birthday), 30);
    }

    #[test]
    fn dummy_password_check_runs_argon2() {
        assert!(DUMMY_HASH.starts_with("$argon2"));
        verify_dummy_password(VOTER_PASSWORD).unwrap();
        verify_dummy_password("").unwrap();
    }

    #[test]
    fn emails_are_normalised() {
        assert_eq!(normalise_email("  Asha@Example.COM "), "asha@example.com");
    }
}
