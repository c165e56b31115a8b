//! Form payloads posted by the HTML pages, and the checks that turn them into
//! the typed inputs the stores accept.

use std::fmt;

use serde::Deserialize;

use crate::db::{rooms::RoomFields, users::{NewUser, ProfileUpdate}};

const MAX_NAME_LEN: usize = 200;
const MAX_USERNAME_LEN: usize = 150;
const MIN_PASSWORD_LEN: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

/// Ordered list of field errors. Empty means the form passed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormErrors(Vec<FieldError>);

impl FormErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(field: &'static str, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    pub fn add(&mut self, field: &'static str, message: impl Into<String>) {
        self.0.push(FieldError { field, message: message.into() });
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldError> {
        self.0.iter()
    }

    pub fn has(&self, field: &str) -> bool {
        self.0.iter().any(|e| e.field == field)
    }

    /// `Ok(value)` if nothing was recorded, otherwise the errors.
    pub fn finish<T>(self, value: T) -> Result<T, FormErrors> {
        if self.is_empty() { Ok(value) } else { Err(self) }
    }
}

impl fmt::Display for FormErrors {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let messages: Vec<&str> = self.0.iter().map(|e| e.message.as_str()).collect();
        write!(f, "{}", messages.join("; "))
    }
}

fn required(errors: &mut FormErrors, field: &'static str, label: &str, value: &str) -> String {
    let value = value.trim();
    if value.is_empty() {
        errors.add(field, format!("{label} is required"));
    }
    value.to_owned()
}

fn max_len(errors: &mut FormErrors, field: &'static str, label: &str, value: &str, max: usize) {
    if value.chars().count() > max {
        errors.add(field, format!("{label} must be at most {max} characters"));
    }
}

fn check_email(errors: &mut FormErrors, value: &str) -> String {
    let email = value.trim().to_owned();
    let valid = match email.split_once('@') {
        Some((local, domain)) => !local.is_empty() && !domain.is_empty() && !domain.contains('@'),
        None => false,
    };
    if !valid {
        errors.add("email", "Enter a valid email address");
    }
    email
}

fn check_username(errors: &mut FormErrors, value: &str) -> String {
    let username = value.trim().to_lowercase();
    if username.is_empty() {
        errors.add("username", "Username is required");
    } else if username.chars().count() > MAX_USERNAME_LEN {
        errors.add("username", format!("Username must be at most {MAX_USERNAME_LEN} characters"));
    } else if !username.chars().all(|c| c.is_alphanumeric() || "@.+-_".contains(c)) {
        errors.add("username", "Username may only contain letters, digits and @/./+/-/_");
    }
    username
}

fn optional(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_owned())
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RoomForm {
    #[serde(default)]
    pub room_topic: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
}

impl RoomForm {
    pub fn validate(self) -> Result<RoomFields, FormErrors> {
        let mut errors = FormErrors::new();
        let topic = required(&mut errors, "room_topic", "Topic", &self.room_topic);
        max_len(&mut errors, "room_topic", "Topic", &topic, MAX_NAME_LEN);
        let name = required(&mut errors, "name", "Name", &self.name);
        max_len(&mut errors, "name", "Name", &name, MAX_NAME_LEN);

        errors.finish(RoomFields {
            topic,
            name,
            description: self.description.trim().to_owned(),
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MessageForm {
    #[serde(default)]
    pub body: String,
}

impl MessageForm {
    pub fn validate(self) -> Result<String, FormErrors> {
        let mut errors = FormErrors::new();
        let body = required(&mut errors, "body", "Message", &self.body);
        errors.finish(body)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RegisterForm {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password1: String,
    #[serde(default)]
    pub password2: String,
}

impl RegisterForm {
    pub fn validate(self) -> Result<NewUser, FormErrors> {
        let mut errors = FormErrors::new();
        let email = check_email(&mut errors, &self.email);
        let username = check_username(&mut errors, &self.username);

        if self.password1.chars().count() < MIN_PASSWORD_LEN {
            errors.add("password1", format!("Password must be at least {MIN_PASSWORD_LEN} characters"));
        }
        if self.password1 != self.password2 {
            errors.add("password2", "The two password fields didn't match");
        }

        errors.finish(NewUser {
            email,
            username,
            password: self.password1,
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub return_url: String,
}

impl LoginForm {
    pub fn validate(self) -> Result<(String, String), FormErrors> {
        let mut errors = FormErrors::new();
        let email = required(&mut errors, "email", "Email", &self.email);
        if self.password.is_empty() {
            errors.add("password", "Password is required");
        }
        errors.finish((email, self.password))
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub avatar: String,
    #[serde(default)]
    pub bio: String,
}

impl ProfileForm {
    pub fn validate(self) -> Result<ProfileUpdate, FormErrors> {
        let mut errors = FormErrors::new();
        let username = check_username(&mut errors, &self.username);
        let email = check_email(&mut errors, &self.email);

        errors.finish(ProfileUpdate {
            username,
            email,
            avatar: optional(&self.avatar),
            bio: optional(&self.bio),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn room_form_trims_and_requires_topic_and_name() {
        let fields = RoomForm {
            room_topic: "  Math ".into(),
            name: " Calculus ".into(),
            description: " limits ".into(),
        }
        .validate()
        .unwrap();
        assert_eq!(fields.topic, "Math");
        assert_eq!(fields.name, "Calculus");
        assert_eq!(fields.description, "limits");

        let errors = RoomForm { room_topic: " ".into(), ..Default::default() }.validate().unwrap_err();
        assert!(errors.has("room_topic"));
        assert!(errors.has("name"));
        assert!(!errors.has("description"));
    }

    #[test]
    fn room_form_rejects_long_names() {
        let errors = RoomForm {
            room_topic: "Math".into(),
            name: "x".repeat(201),
            description: String::new(),
        }
        .validate()
        .unwrap_err();
        assert!(errors.has("name"));
    }

    #[test]
    fn blank_message_is_rejected() {
        assert!(MessageForm { body: " \n ".into() }.validate().is_err());
        assert_eq!(MessageForm { body: " hi ".into() }.validate().unwrap(), "hi");
    }

    #[test]
    fn register_lowercases_username() {
        let user = RegisterForm {
            email: "ada@example.com".into(),
            username: "Ada".into(),
            password1: "correct horse".into(),
            password2: "correct horse".into(),
        }
        .validate()
        .unwrap();
        assert_eq!(user.username, "ada");
        assert_eq!(user.email, "ada@example.com");
    }

    #[test]
    fn register_collects_every_problem() {
        let errors = RegisterForm {
            email: "not-an-email".into(),
            username: "bad name!".into(),
            password1: "short".into(),
            password2: "different".into(),
        }
        .validate()
        .unwrap_err();
        let fields: Vec<&str> = errors.iter().map(|e| e.field).collect();
        assert_eq!(fields, ["email", "username", "password1", "password2"]);
    }

    #[test]
    fn profile_blank_avatar_and_bio_become_none() {
        let update = ProfileForm {
            username: "ada".into(),
            email: "ada@example.com".into(),
            avatar: "  ".into(),
            bio: "".into(),
        }
        .validate()
        .unwrap();
        assert_eq!(update.avatar, None);
        assert_eq!(update.bio, None);
    }

    #[test]
    fn form_errors_display_joins_messages() {
        let mut errors = FormErrors::single("email", "User does not exist");
        errors.add("password", "Incorrect password");
        assert_eq!(errors.to_string(), "User does not exist; Incorrect password");
    }
}
