use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::model::{
    api::id::ApiId,
    common::account::{Role, StatusKind},
    db::account::{Account, Profile},
};

pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Profile fields as submitted by the account holder.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileSpec {
    pub name: String,
    pub email: String,
    pub city: String,
    pub state: String,
    pub dob: NaiveDate,
    #[serde(default)]
    pub photo_url: Option<String>,
}

impl TryFrom<ProfileSpec> for Profile {
    type Error = Error;

    /// Check every required field is present, the email is plausible and the
    /// voter is already born.
    fn try_from(spec: ProfileSpec) -> Result<Self> {
        let required = [
            ("name", &spec.name),
            ("email", &spec.email),
            ("city", &spec.city),
            ("state", &spec.state),
        ];
        if let Some((field, _)) = required.iter().find(|(_, value)| value.trim().is_empty()) {
            return Err(Error::Validation(format!("Missing {field}")));
        }
        if !spec.email.contains('@') {
            return Err(Error::Validation(format!("Invalid email {}", spec.email)));
        }
        if spec.dob > Utc::now().date_naive() {
            return Err(Error::Validation(format!(
                "Date of birth {} is in the future",
                spec.dob
            )));
        }
        Ok(Self {
            name: spec.name.trim().to_string(),
            email: spec.email,
            city: spec.city.trim().to_string(),
            state: spec.state.trim().to_string(),
            dob: spec.dob,
            photo_url: spec.photo_url.filter(|url| !url.trim().is_empty()),
        })
    }
}

fn check_password(password: &str) -> Result<()> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(Error::Validation(format!(
            "Password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }
    Ok(())
}

/// A new voter's registration. The password is plaintext and never stored.
#[derive(Clone, Deserialize, Serialize)]
pub struct RegistrationRequest {
    #[serde(flatten)]
    pub profile: ProfileSpec,
    pub password: String,
}

impl RegistrationRequest {
    /// Validate the request, yielding the profile and password.
    pub fn validate(self) -> Result<(Profile, String)> {
        check_password(&self.password)?;
        Ok((self.profile.try_into()?, self.password))
    }
}

/// Login credentials.
#[derive(Clone, Deserialize, Serialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

/// A corrected profile for a rejected account, authenticated by the current
/// credentials. Optionally changes the password too.
#[derive(Clone, Deserialize, Serialize)]
pub struct ResubmissionRequest {
    pub email: String,
    pub password: String,
    pub profile: ProfileSpec,
    #[serde(default)]
    pub new_password: Option<String>,
}

impl ResubmissionRequest {
    pub fn validate(self) -> Result<(Credentials, Profile, Option<String>)> {
        if let Some(new_password) = &self.new_password {
            check_password(new_password)?;
        }
        let credentials = Credentials {
            email: self.email,
            password: self.password,
        };
        Ok((credentials, self.profile.try_into()?, self.new_password))
    }
}

/// Why an admin refused an account.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RejectionRequest {
    pub reason: String,
}

/// An account as shown to its holder and to admins. Never includes the
/// password hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountDescription {
    pub id: ApiId,
    pub name: String,
    pub email: String,
    pub city: String,
    pub state: String,
    pub dob: NaiveDate,
    pub age: u32,
    pub photo_url: Option<String>,
    pub role: Role,
    pub status: StatusKind,
    /// Only present while the account is rejected.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub reason: Option<String>,
}

impl From<Account> for AccountDescription {
    fn from(account: Account) -> Self {
        let age = account.profile.age();
        let status = account.validation.kind();
        let reason = account.validation.reason().map(str::to_string);
        let profile = account.account.profile;
        Self {
            id: account.id.into(),
            name: profile.name,
            email: profile.email,
            city: profile.city,
            state: profile.state,
            dob: profile.dob,
            age,
            photo_url: profile.photo_url,
            role: account.account.role,
            status,
            reason,
        }
    }
}

/// A successful login: the signed token (also set as a cookie) and the account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    pub account: AccountDescription,
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_fields_are_rejected() {
        let spec = ProfileSpec {
            city: "   ".to_string(),
            ..ProfileSpec::example()
        };
        let result = Profile::try_from(spec);
        assert!(matches!(result, Err(Error::Validation(msg)) if msg.contains("city")));
    }

    #[test]
    fn email_needs_an_at_sign() {
        let spec = ProfileSpec {
            email: "asha.example.com".to_string(),
            ..ProfileSpec::example()
        };
        assert!(matches!(Profile::try_from(spec), Err(Error::Validation(_))));
    }

    #[test]
    fn date_of_birth_cannot_be_in_the_future() {
        let today = Utc::now().date_naive();
        let spec = ProfileSpec {
            dob: today + chrono::Duration::days(1),
            ..ProfileSpec::example()
        };
        let result = Profile::try_from(spec);
        assert!(matches!(result, Err(Error::Validation(msg)) if msg.contains("future")));

        let spec = ProfileSpec {
            dob: today,
            ..ProfileSpec::example()
        };
        assert!(Profile::try_from(spec).is_ok());
    }

    #[test]
    fn short_passwords_are_rejected() {
        let request = RegistrationRequest {
            password: "short".to_string(),
            ..RegistrationRequest::example()
        };
        assert!(matches!(request.validate(), Err(Error::Validation(_))));

        let (profile, password) = RegistrationRequest::example().validate().unwrap();
        assert_eq!(profile, Profile::example());
        assert!(password.len() >= MIN_PASSWORD_LENGTH);
    }

    #[test]
    fn description_hides_the_hash_and_shows_the_reason() {
        use crate::model::{
            common::account::ValidationStatus,
            db::account::AccountCore,
            mongodb::Id,
        };

        let mut account = Account {
            id: Id::new(),
            account: AccountCore::pending_example(),
        };
        account.validation = ValidationStatus::Rejected {
            reason: "blurry photo".to_string(),
        };
        let description = AccountDescription::from(account.clone());
        assert_eq!(description.status, StatusKind::Rejected);
        assert_eq!(description.reason.as_deref(), Some("blurry photo"));
        assert_eq!(*description.id, account.id);

        let json = rocket::serde::json::serde_json::to_string(&description).unwrap();
        assert!(!json.contains("password"));
        assert!(!json.contains(&account.password_hash));
    }
}
