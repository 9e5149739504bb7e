use std::collections::HashSet;

use serde::Deserialize;

use super::{
    error::{ApiResult, Error, HtmlError},
    media::{decode_image, DecodedImage},
    schema::Id,
};
use crate::constants::{
    COOKING_TIME_MIN, INGREDIENT_AMOUNT_MIN, RECIPE_NAME_MAX_LENGTH, RESERVED_USERNAMES,
    USER_EMAIL_MAX_LENGTH, USER_FIELD_MAX_LENGTH,
};

const REQUIRED: &str = "This field is required.";
const BLANK: &str = "This field may not be blank.";

/// Configurable minimums for recipe fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    pub cooking_time_min: i32,
    pub ingredient_amount_min: i32,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            cooking_time_min: COOKING_TIME_MIN,
            ingredient_amount_min: INGREDIENT_AMOUNT_MIN,
        }
    }
}

fn required<T>(value: Option<T>, field: &str) -> ApiResult<T> {
    value.ok_or_else(|| HtmlError::InvalidRequest.field(field, REQUIRED))
}

fn not_blank(value: Option<String>, field: &str, max_length: usize) -> ApiResult<String> {
    let value = required(value, field)?;
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(HtmlError::InvalidRequest.field(field, BLANK));
    }
    if trimmed.chars().count() > max_length {
        return Err(HtmlError::InvalidRequest.field(
            field,
            &format!("Ensure this field has no more than {max_length} characters."),
        ));
    }
    Ok(trimmed.to_owned())
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
pub struct IngredientAmount {
    pub id: Id,
    pub amount: i32,
}

/// Body of recipe create and update requests.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RecipePayload {
    pub name: Option<String>,
    pub text: Option<String>,
    pub cooking_time: Option<i32>,
    pub image: Option<String>,
    pub tags: Option<Vec<Id>>,
    pub ingredients: Option<Vec<IngredientAmount>>,
}

#[derive(Debug, Clone)]
pub struct RecipeDraft {
    pub name: String,
    pub text: String,
    pub cooking_time: i32,
    pub image: Option<DecodedImage>,
    pub tags: Vec<Id>,
    pub ingredients: Vec<IngredientAmount>,
}

impl RecipePayload {
    /// Checks everything that can be checked without the database.
    /// `image_required` is set on creation; updates keep the stored image when none is sent.
    pub fn validate(self, limits: &Limits, image_required: bool) -> ApiResult<RecipeDraft> {
        let ingredients = required(self.ingredients, "ingredients")?;
        let tags = required(self.tags, "tags")?;
        let cooking_time = required(self.cooking_time, "cooking_time")?;
        let name = not_blank(self.name, "name", RECIPE_NAME_MAX_LENGTH)?;
        let text = not_blank(self.text, "text", usize::MAX)?;

        validate_ingredients(&ingredients, limits)?;
        validate_tags(&tags)?;

        if cooking_time < limits.cooking_time_min {
            return Err(HtmlError::InvalidRequest.field(
                "cooking_time",
                &format!(
                    "Cooking time must be at least {} minute(s).",
                    limits.cooking_time_min
                ),
            ));
        }

        let image = match self.image {
            Some(data) if !data.trim().is_empty() => Some(decode_image(&data)?),
            _ if image_required => return Err(HtmlError::InvalidRequest.field("image", REQUIRED)),
            _ => None,
        };

        Ok(RecipeDraft {
            name,
            text,
            cooking_time,
            image,
            tags,
            ingredients,
        })
    }
}

pub fn validate_ingredients(ingredients: &[IngredientAmount], limits: &Limits) -> ApiResult<()> {
    if ingredients.is_empty() {
        return Err(HtmlError::InvalidRequest.field("ingredients", "Add at least one ingredient."));
    }

    let mut seen = HashSet::new();
    for ingredient in ingredients {
        if !seen.insert(ingredient.id) {
            return Err(HtmlError::InvalidRequest.field(
                "ingredients",
                &format!("Ingredient {} is already in the recipe.", ingredient.id),
            ));
        }
        if ingredient.amount < limits.ingredient_amount_min {
            return Err(HtmlError::InvalidRequest.field(
                "ingredients",
                &format!(
                    "Ingredient amount must be at least {}.",
                    limits.ingredient_amount_min
                ),
            ));
        }
    }
    Ok(())
}

pub fn validate_tags(tags: &[Id]) -> ApiResult<()> {
    if tags.is_empty() {
        return Err(HtmlError::InvalidRequest.field("tags", "Add at least one tag."));
    }
    let mut seen = HashSet::new();
    if let Some(tag) = tags.iter().find(|tag| !seen.insert(**tag)) {
        return Err(HtmlError::InvalidRequest.field(
            "tags",
            &format!("Tag {tag} is listed more than once."),
        ));
    }
    Ok(())
}

/// Body of `POST /api/users/`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserPayload {
    pub email: Option<String>,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub password: String,
}

impl UserPayload {
    pub fn validate(self) -> ApiResult<NewUser> {
        let email = not_blank(self.email, "email", USER_EMAIL_MAX_LENGTH)?;
        validate_email(&email)?;
        let username = not_blank(self.username, "username", USER_FIELD_MAX_LENGTH)?;
        validate_username(&username)?;
        let first_name = not_blank(self.first_name, "first_name", USER_FIELD_MAX_LENGTH)?;
        let last_name = not_blank(self.last_name, "last_name", USER_FIELD_MAX_LENGTH)?;
        let password = required(self.password, "password")?;
        if password.is_empty() {
            return Err(HtmlError::InvalidRequest.field("password", BLANK));
        }

        Ok(NewUser {
            email: email.to_lowercase(),
            username,
            first_name,
            last_name,
            password,
        })
    }
}

fn validate_email(email: &str) -> ApiResult<()> {
    let invalid = || HtmlError::InvalidRequest.field("email", "Enter a valid email address.");
    if email.chars().any(char::is_whitespace) {
        return Err(invalid());
    }
    match email.split_once('@') {
        Some((local, domain))
            if !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.') =>
        {
            Ok(())
        }
        _ => Err(invalid()),
    }
}

fn validate_username(username: &str) -> ApiResult<()> {
    let allowed = |c: char| c.is_alphanumeric() || matches!(c, '_' | '.' | '@' | '+' | '-');
    if !username.chars().all(allowed) {
        return Err(HtmlError::InvalidRequest.field(
            "username",
            "Enter a valid username. This value may contain only letters, numbers, and @/./+/-/_ characters.",
        ));
    }
    if RESERVED_USERNAMES
        .iter()
        .any(|reserved| reserved.eq_ignore_ascii_case(username))
    {
        return Err(HtmlError::InvalidRequest.field("username", "This username is reserved."));
    }
    Ok(())
}

/// Body of `POST /api/users/set_password/`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SetPasswordPayload {
    pub current_password: Option<String>,
    pub new_password: Option<String>,
}

impl SetPasswordPayload {
    pub fn validate(self) -> ApiResult<(String, String)> {
        let current = required(self.current_password, "current_password")?;
        let new = required(self.new_password, "new_password")?;
        if new.is_empty() {
            return Err(HtmlError::InvalidRequest.field("new_password", BLANK));
        }
        Ok((current, new))
    }
}

/// Body of `POST /api/auth/token/login/`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoginPayload {
    pub email: Option<String>,
    pub password: Option<String>,
}

impl LoginPayload {
    pub fn validate(self) -> ApiResult<(String, String)> {
        let email = required(self.email, "email")?;
        let password = required(self.password, "password")?;
        Ok((email.trim().to_lowercase(), password))
    }
}

pub fn invalid_credentials() -> Error {
    HtmlError::InvalidRequest.field(
        "non_field_errors",
        "Unable to log in with provided credentials.",
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    const PIXEL: &str = "data:image/png;base64,iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mNkYPhfDwAChwGA60e6kgAAAABJRU5ErkJggg==";

    fn payload() -> RecipePayload {
        RecipePayload {
            name: Some(String::from("Pancakes")),
            text: Some(String::from("Mix and fry.")),
            cooking_time: Some(20),
            image: Some(String::from(PIXEL)),
            tags: Some(vec![1, 2]),
            ingredients: Some(vec![
                IngredientAmount { id: 10, amount: 200 },
                IngredientAmount { id: 11, amount: 2 },
            ]),
        }
    }

    #[test]
    fn valid_payload_becomes_draft() {
        let draft = payload().validate(&Limits::default(), true).unwrap();
        assert_eq!(draft.name, "Pancakes");
        assert_eq!(draft.tags, vec![1, 2]);
        assert_eq!(draft.ingredients.len(), 2);
        assert_eq!(draft.image.unwrap().extension, "png");
    }

    #[test]
    fn duplicate_ingredient_fails() {
        let mut payload = payload();
        payload.ingredients = Some(vec![
            IngredientAmount { id: 10, amount: 200 },
            IngredientAmount { id: 10, amount: 50 },
        ]);
        let error = payload.validate(&Limits::default(), true).unwrap_err();
        assert_eq!(error.field(), Some("ingredients"));
    }

    #[test]
    fn cooking_time_below_minimum_fails() {
        let mut payload = payload();
        payload.cooking_time = Some(4);
        let limits = Limits {
            cooking_time_min: 5,
            ..Limits::default()
        };
        let error = payload.validate(&limits, true).unwrap_err();
        assert_eq!(error.field(), Some("cooking_time"));

        let mut payload = self::payload();
        payload.cooking_time = Some(5);
        assert!(payload.validate(&limits, true).is_ok());
    }

    #[rstest]
    #[case(0)]
    #[case(-3)]
    fn amount_below_minimum_fails(#[case] amount: i32) {
        let mut payload = payload();
        payload.ingredients = Some(vec![IngredientAmount { id: 10, amount }]);
        let error = payload.validate(&Limits::default(), true).unwrap_err();
        assert_eq!(error.field(), Some("ingredients"));
    }

    #[test]
    fn empty_collections_fail_on_their_field() {
        let mut no_ingredients = payload();
        no_ingredients.ingredients = Some(vec![]);
        assert_eq!(
            no_ingredients
                .validate(&Limits::default(), true)
                .unwrap_err()
                .field(),
            Some("ingredients")
        );

        let mut no_tags = payload();
        no_tags.tags = Some(vec![]);
        assert_eq!(
            no_tags.validate(&Limits::default(), true).unwrap_err().field(),
            Some("tags")
        );

        let mut repeated_tags = payload();
        repeated_tags.tags = Some(vec![3, 3]);
        assert_eq!(
            repeated_tags
                .validate(&Limits::default(), true)
                .unwrap_err()
                .field(),
            Some("tags")
        );
    }

    #[test]
    fn missing_fields_are_required() {
        let error = RecipePayload::default()
            .validate(&Limits::default(), true)
            .unwrap_err();
        assert_eq!(error.field(), Some("ingredients"));
        assert_eq!(error.message(), REQUIRED);

        let mut blank_name = payload();
        blank_name.name = Some(String::from("   "));
        assert_eq!(
            blank_name.validate(&Limits::default(), true).unwrap_err().field(),
            Some("name")
        );
    }

    #[test]
    fn image_is_optional_only_on_update() {
        let mut without_image = payload();
        without_image.image = None;
        assert_eq!(
            without_image
                .clone()
                .validate(&Limits::default(), true)
                .unwrap_err()
                .field(),
            Some("image")
        );
        assert!(without_image
            .validate(&Limits::default(), false)
            .unwrap()
            .image
            .is_none());
    }

    #[test]
    fn long_names_are_rejected() {
        let mut payload = payload();
        payload.name = Some("x".repeat(RECIPE_NAME_MAX_LENGTH + 1));
        assert_eq!(
            payload.validate(&Limits::default(), true).unwrap_err().field(),
            Some("name")
        );
    }

    fn user() -> UserPayload {
        UserPayload {
            email: Some(String::from("Cook@Example.com")),
            username: Some(String::from("cook.book")),
            first_name: Some(String::from("Ann")),
            last_name: Some(String::from("Smith")),
            password: Some(String::from("s3cret-pass")),
        }
    }

    #[test]
    fn registration_normalizes_email() {
        let user = user().validate().unwrap();
        assert_eq!(user.email, "cook@example.com");
        assert_eq!(user.username, "cook.book");
    }

    #[rstest]
    #[case("plainaddress")]
    #[case("@example.com")]
    #[case("cook@localhost")]
    #[case("co ok@example.com")]
    #[case("cook@@example.com")]
    fn registration_rejects_bad_emails(#[case] email: &str) {
        let mut payload = user();
        payload.email = Some(email.to_owned());
        assert_eq!(payload.validate().unwrap_err().field(), Some("email"));
    }

    #[rstest]
    #[case("with space")]
    #[case("semi;colon")]
    #[case("me")]
    fn registration_rejects_bad_usernames(#[case] username: &str) {
        let mut payload = user();
        payload.username = Some(username.to_owned());
        assert_eq!(payload.validate().unwrap_err().field(), Some("username"));
    }

    #[test]
    fn login_requires_both_fields() {
        let error = LoginPayload {
            email: Some(String::from("a@b.co")),
            password: None,
        }
        .validate()
        .unwrap_err();
        assert_eq!(error.field(), Some("password"));
    }
}
