use std::{fmt, str::FromStr};

use chrono::Utc;
use rand::{distributions::Alphanumeric, Rng};
use serde::{Deserialize, Serialize};

/// Declares a string-backed enum that is stored and serialised in lowercase.
macro_rules! lowercase_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Deserialize, Serialize)]
        #[serde(rename_all = "lowercase")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = String;

            fn from_str(value: &str) -> Result<Self, Self::Err> {
                match value.trim().to_lowercase().as_str() {
                    $($text => Ok($name::$variant),)+
                    other => Err(format!(
                        "Invalid {} '{}'",
                        stringify!($name).to_lowercase(),
                        other
                    )),
                }
            }
        }
    };
}

lowercase_enum!(
    /// Physical site of the university. Also the intended shard key.
    Campus {
        Hanoi => "hanoi",
        Danang => "danang",
        Hcm => "hcm",
    }
);

lowercase_enum!(UserRole {
    Admin => "admin",
    Lecturer => "lecturer",
    Student => "student",
});

lowercase_enum!(UserStatus {
    Active => "active",
    Inactive => "inactive",
    Suspended => "suspended",
});

lowercase_enum!(CourseStatus {
    Active => "active",
    Inactive => "inactive",
});

lowercase_enum!(MaterialType {
    Slide => "slide",
    Video => "video",
    Document => "document",
    Quiz => "quiz",
    Assignment => "assignment",
});

lowercase_enum!(Visibility {
    Public => "public",
    Course => "course",
    Private => "private",
});

lowercase_enum!(ActionType {
    View => "view",
    Download => "download",
    Upload => "upload",
    Edit => "edit",
    Delete => "delete",
    Login => "login",
    Search => "search",
});

lowercase_enum!(TargetType {
    Material => "material",
    Course => "course",
    User => "user",
});

impl Default for UserRole {
    fn default() -> Self {
        UserRole::Student
    }
}

impl Default for UserStatus {
    fn default() -> Self {
        UserStatus::Active
    }
}

impl Default for CourseStatus {
    fn default() -> Self {
        CourseStatus::Active
    }
}

impl Default for Visibility {
    fn default() -> Self {
        Visibility::Course
    }
}

/// Builds a record id: prefix, unix millis, then nine random alphanumerics.
pub fn generate_id(prefix: &str) -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(9)
        .map(|c| char::from(c).to_ascii_lowercase())
        .collect();

    format!("{}{}{}", prefix, Utc::now().timestamp_millis(), suffix)
}
