pub const RECIPE_COUNT_PER_PAGE: i64 = 6;
pub const MAX_PAGE_SIZE: i64 = 100;

pub const COOKING_TIME_MIN: i32 = 1;
pub const INGREDIENT_AMOUNT_MIN: i32 = 1;

pub const RECIPE_NAME_MAX_LENGTH: usize = 255;
pub const USER_EMAIL_MAX_LENGTH: usize = 254;
pub const USER_FIELD_MAX_LENGTH: usize = 150;

pub const TOKEN_LIFETIME_HOURS: i64 = 24 * 7;

/// Upper bound for JSON bodies; recipe images travel inline as base64.
pub const MAX_BODY_SIZE: u64 = 10 * 1024 * 1024;

pub const IMAGE_DIRECTORY: &str = "recipes/images";

pub const IMAGE_TYPES: &[(&str, &str)] = &[
    ("image/png", "png"),
    ("image/jpeg", "jpg"),
    ("image/jpg", "jpg"),
    ("image/gif", "gif"),
    ("image/webp", "webp"),
];

pub const RESERVED_USERNAMES: &[&str] = &["me", "subscriptions", "set_password"];

pub const SHOPPING_LIST_HEADER: &str = "Shopping list:";
pub const SHOPPING_LIST_FILENAME: &str = "shopping_list.txt";
