//! Form checks run before any network call.

use thiserror::Error;

use crate::{
    error::ClientError,
    types::{LoginCredentials, SignupForm},
};

/// Interests a profile may list.
pub const INTERESTS: [&str; 18] = [
    "Travel",
    "Photography",
    "Cooking",
    "Music",
    "Sports",
    "Reading",
    "Movies",
    "Art",
    "Dancing",
    "Hiking",
    "Gaming",
    "Yoga",
    "Technology",
    "Fashion",
    "Food",
    "Fitness",
    "Nature",
    "Animals",
];

pub const MAX_PHOTOS: usize = 5;

/// Input rejected by a form check. Display strings are user-facing.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Please fill in all required fields")]
    MissingField(&'static str),
    #[error("Passwords don't match")]
    PasswordMismatch,
    #[error("Please enter a valid age")]
    InvalidAge,
    #[error("You can upload a maximum of 5 photos")]
    TooManyPhotos,
    #[error("Unknown interest: {0}")]
    UnknownInterest(String),
}

impl From<ValidationError> for ClientError {
    fn from(err: ValidationError) -> Self {
        ClientError::validation(err.to_string())
    }
}

pub fn is_known_interest(interest: &str) -> bool {
    INTERESTS.contains(&interest)
}

pub fn validate_login(credentials: &LoginCredentials) -> Result<(), ValidationError> {
    require("email", &credentials.email)?;
    require("password", &credentials.password)
}

pub fn validate_signup(form: &SignupForm) -> Result<(), ValidationError> {
    require("name", &form.name)?;
    require("email", &form.email)?;
    require("age", &form.age)?;
    require("location", &form.location)?;
    require("password", &form.password)?;
    require("confirm_password", &form.confirm_password)?;

    if form.password != form.confirm_password {
        return Err(ValidationError::PasswordMismatch);
    }
    if form.age.trim().parse::<u32>().is_err() {
        return Err(ValidationError::InvalidAge);
    }
    if form.photos.len() > MAX_PHOTOS {
        return Err(ValidationError::TooManyPhotos);
    }
    if let Some(unknown) = form
        .interests
        .iter()
        .find(|interest| !is_known_interest(interest))
    {
        return Err(ValidationError::UnknownInterest(unknown.clone()));
    }
    Ok(())
}

fn require(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        Err(ValidationError::MissingField(field))
    } else {
        Ok(())
    }
}
